//! Error types for the fallible parts of stockboard: the database, the seed
//! loader and the metrics server. The client store never returns these; its
//! failures end up as state.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("database migration failed: {0}")]
    Migration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("seed file {path} is not valid: {source}")]
    SeedFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("seed file {0} does not exist")]
    MissingSeedFile(PathBuf),

    #[error("unknown seed entity {0:?}")]
    UnknownSeedEntity(String),

    #[error("could not bind metrics server to {addr}: {reason}")]
    Bind { addr: String, reason: String },
}
