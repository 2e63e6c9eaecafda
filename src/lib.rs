//! Stockboard - Inventory Dashboard
//!
//! The data layer of an inventory dashboard: a persisted client store holding
//! UI preferences and cached remote data, and the metrics server that data is
//! fetched from.
//!
//! A view tree gets its store through a [`StoreProvider`]. The store restores
//! the `global` preferences region from [`storage`] on start and writes it back
//! as it changes; the `api` region caches responses from the server's
//! `/dashboard` and `/products` endpoints.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod persist;
pub mod provider;
pub mod seed;
pub mod server;
pub mod state;
pub mod storage;
pub mod store;
mod wire;

pub use client::{Fetcher, HttpFetcher};
pub use config::Config;
pub use error::{Error, Result};
pub use metrics::DashboardMetrics;
pub use persist::{persist_store, PersistConfig, Persistor};
pub use provider::{RehydrationGate, StoreProvider};
pub use state::{Action, RootState};
pub use storage::{FileStorage, Host, NoopStorage, Storage};
pub use store::{make_store, Store, StoreBuilder};
