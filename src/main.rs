use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use stockboard::seed::{self, SeedEntity};
use stockboard::server::{MetricsServer, ServerState};
use stockboard::state::api::Endpoint;
use stockboard::state::{set_is_dark_mode, set_is_sidebar_collapsed};
use stockboard::{db, Config, HttpFetcher, StoreProvider};

#[derive(Parser)]
#[command(name = "stockboard", version, about = "Inventory dashboard backend and client store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the dashboard metrics over HTTP
    Serve {
        /// Overrides PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Replace the database contents with the JSON files in DIR
    Seed {
        dir: PathBuf,
        /// Only reload these files, e.g. --only products.json
        #[arg(long = "only", value_name = "FILE")]
        only: Vec<String>,
    },
    /// Fetch the dashboard through a client store and print it
    Dashboard {
        /// Do not read or write persisted preferences
        #[arg(long)]
        headless: bool,
        /// Ignore anything cached and fetch again
        #[arg(long)]
        refresh: bool,
    },
    /// Show or change the persisted UI preferences
    Prefs {
        #[arg(long)]
        sidebar_collapsed: Option<bool>,
        #[arg(long)]
        dark_mode: Option<bool>,
        /// Forget the stored preferences
        #[arg(long, conflicts_with_all = ["sidebar_collapsed", "dark_mode"])]
        purge: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Serve { port } => serve(&config, port.unwrap_or(config.port)).await,
        Command::Seed { dir, only } => seed_database(&config, &dir, &only),
        Command::Dashboard { headless, refresh } => dashboard(&config, headless, refresh).await,
        Command::Prefs {
            sidebar_collapsed,
            dark_mode,
            purge,
        } => prefs(&config, sidebar_collapsed, dark_mode, purge).await,
    }
}

async fn serve(config: &Config, port: u16) -> anyhow::Result<()> {
    let pool = db::init_database(&config.database_path)?;
    let server = MetricsServer::bind(&format!("0.0.0.0:{}", port), ServerState::new(pool))?;

    match server.local_addr() {
        Some(addr) => log::info!("Server running on port {}", addr.port()),
        None => log::info!("Server running"),
    }

    tokio::task::spawn_blocking(move || server.run())
        .await
        .context("server thread failed")?;
    Ok(())
}

fn seed_database(config: &Config, dir: &std::path::Path, only: &[String]) -> anyhow::Result<()> {
    let entities = if only.is_empty() {
        SeedEntity::ORDERED.to_vec()
    } else {
        only.iter()
            .map(|name| SeedEntity::from_file_name(name))
            .collect::<Result<Vec<_>, _>>()?
    };

    let pool = db::init_database(&config.database_path)?;
    let mut conn = pool.get()?;
    let report = seed::seed_entities(&mut conn, dir, &entities)
        .with_context(|| format!("seeding from {} failed", dir.display()))?;

    for (entity, count) in &report.loaded {
        println!("{:<24} {}", entity, count);
    }
    log::info!("Seeded {} rows", report.total());
    Ok(())
}

async fn dashboard(config: &Config, headless: bool, refresh: bool) -> anyhow::Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(config.api_url.clone()));
    let provider = StoreProvider::for_host(&config.host(headless), fetcher);

    if !provider.rehydrated().await {
        bail!("store was torn down before preferences were restored");
    }

    let store = provider.store();
    let global = store.select(|state| state.global);
    log::info!(
        "Preferences: sidebar collapsed = {}, dark mode = {}",
        global.is_sidebar_collapsed,
        global.is_dark_mode
    );

    let endpoint = Endpoint::GetDashboardMetrics;
    let entry = if refresh {
        store.refetch(endpoint).await
    } else {
        store.query(endpoint).await
    }
    .context("store was disposed while fetching")?;

    if let Some(error) = &entry.error {
        bail!("failed to load dashboard: {}", error);
    }
    let metrics = entry
        .dashboard_metrics()
        .context("response did not contain dashboard metrics")?;

    println!("{}", serde_json::to_string_pretty(metrics)?);
    Ok(())
}

async fn prefs(
    config: &Config,
    sidebar_collapsed: Option<bool>,
    dark_mode: Option<bool>,
    purge: bool,
) -> anyhow::Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(config.api_url.clone()));
    let provider = StoreProvider::for_host(&config.host(false), fetcher);

    if !provider.rehydrated().await {
        bail!("store was torn down before preferences were restored");
    }

    let store = provider.store();
    if purge {
        provider.persistor().purge().await;
    } else {
        if let Some(value) = sidebar_collapsed {
            store.dispatch(set_is_sidebar_collapsed(value));
        }
        if let Some(value) = dark_mode {
            store.dispatch(set_is_dark_mode(value));
        }
        provider.persistor().flush().await;
    }

    let global = store.select(|state| state.global);
    println!("{}", serde_json::to_string_pretty(&global)?);
    Ok(())
}
