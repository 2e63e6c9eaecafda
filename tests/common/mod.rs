#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use stockboard::client::Fetcher;
use stockboard::db::{self, DbPool};
use stockboard::seed;
use stockboard::server::{MetricsServer, ServerHandle, ServerState};
use stockboard::state::api::{Endpoint, FetchError};
use stockboard::state::Action;
use stockboard::storage::Storage;
use stockboard::store::{Middleware, Next, Store};
use stockboard::DashboardMetrics;

pub fn seed_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("seed_data")
}

/// A migrated and seeded database inside `dir`
pub fn seeded_pool(dir: &Path) -> DbPool {
    let pool = db::init_database(&dir.join("inventory.db")).unwrap();
    let mut conn = pool.get().unwrap();
    seed::seed_directory(&mut conn, &seed_dir()).unwrap();
    pool
}

pub fn spawn_server(pool: DbPool) -> (ServerHandle, String) {
    let handle = MetricsServer::bind("127.0.0.1:0", ServerState::new(pool))
        .unwrap()
        .spawn();
    let base_url = handle.base_url().unwrap();
    (handle, base_url)
}

/// Fetcher that answers every request with an empty dashboard after `delay`
pub struct CountingFetcher {
    pub calls: AtomicUsize,
    delay: Duration,
}

impl CountingFetcher {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, _endpoint: &Endpoint) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(serde_json::to_value(DashboardMetrics::default()).unwrap())
    }
}

/// Fetcher for tests that never reach the network
pub struct Unreachable;

#[async_trait]
impl Fetcher for Unreachable {
    async fn fetch(&self, _endpoint: &Endpoint) -> Result<Value, FetchError> {
        Err(FetchError::Network {
            error: "offline".to_string(),
        })
    }
}

/// Storage that takes `delay` to answer reads
pub struct SlowStorage {
    value: Mutex<Option<String>>,
    delay: Duration,
}

impl SlowStorage {
    pub fn new(value: Option<&str>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(value.map(str::to_string)),
            delay,
        })
    }
}

#[async_trait]
impl Storage for SlowStorage {
    async fn get(&self, _key: &str) -> Option<String> {
        tokio::time::sleep(self.delay).await;
        self.value.lock().unwrap().clone()
    }

    async fn set(&self, _key: &str, value: String) -> String {
        *self.value.lock().unwrap() = Some(value.clone());
        value
    }

    async fn remove(&self, _key: &str) {
        *self.value.lock().unwrap() = None;
    }
}

/// Records the type of every action that reaches it
#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<&'static str>>,
}

impl Recorder {
    pub fn seen(&self) -> Vec<&'static str> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_with_prefix(&self, prefix: &str) -> Vec<&'static str> {
        self.seen()
            .into_iter()
            .filter(|action_type| action_type.starts_with(prefix))
            .collect()
    }
}

impl Middleware for Recorder {
    fn handle(&self, _store: &Store, action: &Action) -> Next {
        self.seen.lock().unwrap().push(action.action_type());
        Next::Continue
    }
}
