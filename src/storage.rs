//! Key/value storage behind the persisted client store
//!
//! Two backends share one async interface: [`FileStorage`] keeps values on disk,
//! scoped to an origin, and [`NoopStorage`] silently drops everything. Which one
//! is used is decided by the [`Host`] the store runs in, never sniffed at call
//! time. None of the operations fail; disk errors are logged and swallowed so
//! the persistence layer above never has to handle them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Asynchronous string key/value store
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a value, `None` when absent or unreadable
    async fn get(&self, key: &str) -> Option<String>;

    /// Write a value and hand it back
    async fn set(&self, key: &str, value: String) -> String;

    /// Delete a value if present
    async fn remove(&self, key: &str);
}

/// Storage for hosts without a persistent backend (server rendering)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

#[async_trait]
impl Storage for NoopStorage {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, value: String) -> String {
        value
    }

    async fn remove(&self, _key: &str) {}
}

/// On-disk storage, one directory per origin and one file per key
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage for `origin` rooted at `data_dir`
    pub fn new(data_dir: &Path, origin: &str) -> Self {
        Self {
            dir: data_dir.join("storage").join(digest(origin)),
        }
    }

    /// Directory holding this origin's values
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", digest(key)))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Some(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("Failed to read storage key {:?}: {}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: String) -> String {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let result = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&tmp, value.as_bytes()).await?;
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = result {
            log::warn!("Failed to write storage key {:?}: {}", key, e);
        }

        value
    }

    async fn remove(&self, key: &str) {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove storage key {:?}: {}", key, e),
        }
    }
}

/// The environment a store is hosted in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    /// An interactive client with a data directory to persist into
    Client { origin: String, data_dir: PathBuf },
    /// Server-side rendering; nothing is persisted
    Server,
}

impl Host {
    pub fn storage(&self) -> Arc<dyn Storage> {
        match self {
            Host::Client { origin, data_dir } => Arc::new(FileStorage::new(data_dir, origin)),
            Host::Server => Arc::new(NoopStorage),
        }
    }
}

fn digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_storage_never_yields_a_value() {
        let storage = NoopStorage;
        assert_eq!(storage.set("root", "{}".to_string()).await, "{}");
        assert_eq!(storage.get("root").await, None);
        assert_eq!(storage.get("").await, None);
        storage.remove("root").await;
        assert_eq!(storage.get("persist:root").await, None);
    }

    #[tokio::test]
    async fn file_storage_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), "http://localhost:3000");

        assert_eq!(storage.get("persist:root").await, None);
        storage.set("persist:root", "{\"a\":1}".to_string()).await;
        assert_eq!(storage.get("persist:root").await.as_deref(), Some("{\"a\":1}"));

        storage.remove("persist:root").await;
        assert_eq!(storage.get("persist:root").await, None);
        storage.remove("persist:root").await;
    }

    #[tokio::test]
    async fn origins_do_not_share_values() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileStorage::new(dir.path(), "http://a.example");
        let b = FileStorage::new(dir.path(), "http://b.example");

        a.set("persist:root", "a".to_string()).await;
        assert_eq!(b.get("persist:root").await, None);
        assert_ne!(a.dir(), b.dir());
    }

    #[tokio::test]
    async fn server_host_selects_noop_storage() {
        let storage = Host::Server.storage();
        storage.set("persist:root", "x".to_string()).await;
        assert_eq!(storage.get("persist:root").await, None);
    }
}
