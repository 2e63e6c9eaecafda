//! Server state management

use diesel::sqlite::SqliteConnection;

use crate::db::{DbConnection, DbPool};
use crate::error::Result;

/// State shared by every request handler
pub struct ServerState {
    /// Database connection pool
    pub db: DbPool,
}

impl ServerState {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Check out a connection and run `f` with it
    pub fn with_connection<T>(&self, f: impl FnOnce(&mut SqliteConnection) -> Result<T>) -> Result<T> {
        let mut conn: DbConnection = self.db.get()?;
        f(&mut conn)
    }
}
