//! Database module for stockboard
//!
//! Provides SQLite database access via Diesel ORM.

pub mod models;
pub mod repository;
pub mod schema;

use diesel::r2d2::{self, ConnectionManager};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;

use crate::error::{Error, Result};

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Establish a connection pool to the SQLite database
pub fn establish_connection(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Ok(r2d2::Pool::builder().max_size(5).build(manager)?)
}

/// Run pending database migrations
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Migration(e.to_string()))?;
    Ok(())
}

/// Initialize the database with a connection pool
pub fn init_database(database_path: &Path) -> Result<DbPool> {
    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let database_url = database_path.display().to_string();
    log::info!("Opening database at {}", database_url);

    let pool = establish_connection(&database_url)?;

    // Run migrations
    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}
