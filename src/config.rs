//! Runtime configuration
//!
//! Read from the process environment, after a `.env` file (if any) has been
//! loaded into it by the binary.

use std::path::PathBuf;

use crate::storage::Host;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

const APP_DIR: &str = "stockboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Port the metrics server listens on
    pub port: u16,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Base URL the dashboard fetches remote data from
    pub api_url: String,
    /// Where client-side storage lives; `None` when the platform has no data directory
    pub data_dir: Option<PathBuf>,
    /// Origin client-side storage is scoped to
    pub origin: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source, e.g. a map in tests
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .unwrap_or_else(|| {
                    log::warn!("Invalid PORT {:?}, using {}", raw, DEFAULT_PORT);
                    DEFAULT_PORT
                }),
            None => DEFAULT_PORT,
        };

        let data_dir = var("STOCKBOARD_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)));

        let database_path = var("DATABASE_PATH").map(PathBuf::from).unwrap_or_else(|| {
            data_dir
                .as_ref()
                .map(|dir| dir.join("stockboard.db"))
                .unwrap_or_else(|| PathBuf::from("stockboard.db"))
        });

        let api_url = var("STOCKBOARD_API_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let origin = var("STOCKBOARD_ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_string());

        Self {
            port,
            database_path,
            api_url,
            data_dir,
            origin,
        }
    }

    /// The host a store runs in: headless runs and hosts without a data
    /// directory persist nothing
    pub fn host(&self, headless: bool) -> Host {
        match (&self.data_dir, headless) {
            (Some(data_dir), false) => Host::Client {
                origin: self.origin.clone(),
                data_dir: data_dir.clone(),
            },
            _ => {
                log::debug!("Using non-persistent storage");
                Host::Server
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn port_defaults_when_missing_or_invalid() {
        assert_eq!(config(&[]).port, DEFAULT_PORT);
        assert_eq!(config(&[("PORT", "not-a-port")]).port, DEFAULT_PORT);
        assert_eq!(config(&[("PORT", "")]).port, DEFAULT_PORT);
        assert_eq!(config(&[("PORT", "0")]).port, DEFAULT_PORT);
        assert_eq!(config(&[("PORT", "8080")]).port, 8080);
    }

    #[test]
    fn explicit_values_win() {
        let config = config(&[
            ("STOCKBOARD_DATA_DIR", "/tmp/board"),
            ("DATABASE_PATH", "/tmp/inventory.db"),
            ("STOCKBOARD_API_URL", "http://api.internal:9000"),
            ("STOCKBOARD_ORIGIN", "https://board.example"),
        ]);

        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/board")));
        assert_eq!(config.database_path, PathBuf::from("/tmp/inventory.db"));
        assert_eq!(config.api_url, "http://api.internal:9000");
        assert_eq!(config.origin, "https://board.example");
    }

    #[test]
    fn api_url_follows_port() {
        assert_eq!(config(&[("PORT", "4000")]).api_url, "http://localhost:4000");
    }

    #[test]
    fn database_defaults_into_data_dir() {
        let config = config(&[("STOCKBOARD_DATA_DIR", "/tmp/board")]);
        assert_eq!(config.database_path, PathBuf::from("/tmp/board/stockboard.db"));
    }

    #[test]
    fn host_selection() {
        let config = config(&[("STOCKBOARD_DATA_DIR", "/tmp/board")]);
        assert_eq!(
            config.host(false),
            Host::Client {
                origin: DEFAULT_ORIGIN.to_string(),
                data_dir: PathBuf::from("/tmp/board"),
            }
        );
        assert_eq!(config.host(true), Host::Server);

        let mut without_dir = config.clone();
        without_dir.data_dir = None;
        assert_eq!(without_dir.host(false), Host::Server);
    }
}
