//! Persistence of whitelisted state regions across sessions
//!
//! [`PersistConfig`] declares what is kept and where; [`persist_store`] starts a
//! [`Persistor`] that rehydrates the store from [`Storage`] and then writes the
//! whitelisted regions back whenever they change. The stored record looks like
//!
//! ```json
//! {"global":{"isSidebarCollapsed":true,"isDarkMode":false},"_persist":{"version":-1,"rehydrated":true}}
//! ```
//!
//! and lives under `persist:<key>`. A missing, corrupt or foreign-version
//! record rehydrates as "nothing stored": the regions keep their defaults.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::state::api::{ApiState, REDUCER_PATH};
use crate::state::global::{GlobalState, SLICE_NAME};
use crate::state::{Action, RootState};
use crate::storage::Storage;
use crate::store::Store;

pub const KEY_PREFIX: &str = "persist:";
pub const DEFAULT_VERSION: i32 = -1;

pub const FLUSH: &str = "persist/FLUSH";
pub const REHYDRATE: &str = "persist/REHYDRATE";
pub const PAUSE: &str = "persist/PAUSE";
pub const PERSIST: &str = "persist/PERSIST";
pub const PURGE: &str = "persist/PURGE";
pub const REGISTER: &str = "persist/REGISTER";

/// Lifecycle action types; their payloads are not serializable
pub const LIFECYCLE_ACTIONS: [&str; 6] = [FLUSH, REHYDRATE, PAUSE, PERSIST, PURGE, REGISTER];

/// Top-level regions of [`RootState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Global,
    Api,
}

impl Region {
    pub fn name(&self) -> &'static str {
        match self {
            Region::Global => SLICE_NAME,
            Region::Api => REDUCER_PATH,
        }
    }
}

#[derive(Clone)]
pub struct PersistConfig {
    pub key: String,
    pub storage: Arc<dyn Storage>,
    /// Only these regions are written and read back
    pub whitelist: Vec<Region>,
    pub version: i32,
}

impl fmt::Debug for PersistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistConfig")
            .field("key", &self.key)
            .field("whitelist", &self.whitelist)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl PersistConfig {
    /// The dashboard's configuration: `root`, keeping only the `global` region
    pub fn root(storage: Arc<dyn Storage>) -> Self {
        Self {
            key: "root".to_string(),
            storage,
            whitelist: vec![Region::Global],
            version: DEFAULT_VERSION,
        }
    }

    pub fn storage_key(&self) -> String {
        format!("{}{}", KEY_PREFIX, self.key)
    }

    pub fn persists(&self, region: Region) -> bool {
        self.whitelist.contains(&region)
    }

    /// Serialize the whitelisted regions of `state` into a storage record
    pub fn encode(&self, state: &RootState) -> String {
        let mut record = Map::new();

        for region in &self.whitelist {
            let value = match region {
                Region::Global => serde_json::to_value(state.global),
                Region::Api => serde_json::to_value(&state.api),
            };
            match value {
                Ok(value) => {
                    record.insert(region.name().to_string(), value);
                }
                Err(e) => log::warn!("Failed to serialize region {}: {}", region.name(), e),
            }
        }

        record.insert(
            "_persist".to_string(),
            json!({ "version": self.version, "rehydrated": true }),
        );

        Value::Object(record).to_string()
    }

    /// Parse a storage record, keeping only whitelisted regions
    pub fn decode(&self, raw: &str) -> Option<Restored> {
        let mut record = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(record)) => record,
            Ok(_) => {
                log::warn!("Ignoring persisted state for {}: not an object", self.key);
                return None;
            }
            Err(e) => {
                log::warn!("Ignoring persisted state for {}: {}", self.key, e);
                return None;
            }
        };

        let version = record
            .get("_persist")
            .and_then(|meta| meta.get("version"))
            .and_then(Value::as_i64);
        if version != Some(i64::from(self.version)) {
            log::warn!(
                "Ignoring persisted state for {}: version {:?}, expected {}",
                self.key,
                version,
                self.version
            );
            return None;
        }

        let mut restored = Restored::default();
        for region in &self.whitelist {
            let Some(value) = record.remove(region.name()) else {
                continue;
            };
            match region {
                Region::Global => restored.global = decode_region(region, value),
                Region::Api => restored.api = decode_region(region, value),
            }
        }

        Some(restored)
    }
}

fn decode_region<T: serde::de::DeserializeOwned>(region: &Region, value: Value) -> Option<T> {
    serde_json::from_value(value)
        .map_err(|e| log::warn!("Discarding persisted region {}: {}", region.name(), e))
        .ok()
}

/// Regions read back from storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Restored {
    pub global: Option<GlobalState>,
    pub api: Option<ApiState>,
}

/// Bookkeeping kept under `_persist` in the root state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistMeta {
    pub version: i32,
    pub rehydrated: bool,
}

impl Default for PersistMeta {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            rehydrated: false,
        }
    }
}

pub type RehydrateError = Arc<dyn std::error::Error + Send + Sync>;

/// Persistence lifecycle actions
#[derive(Debug, Clone)]
pub enum PersistAction {
    Flush,
    Rehydrate {
        key: String,
        payload: Option<Restored>,
        err: Option<RehydrateError>,
    },
    Pause,
    Persist { key: String, version: i32 },
    Purge { key: String },
    Register { key: String },
}

impl PersistAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            PersistAction::Flush => FLUSH,
            PersistAction::Rehydrate { .. } => REHYDRATE,
            PersistAction::Pause => PAUSE,
            PersistAction::Persist { .. } => PERSIST,
            PersistAction::Purge { .. } => PURGE,
            PersistAction::Register { .. } => REGISTER,
        }
    }
}

/// Root-level handling of the lifecycle actions
pub fn reduce(state: &RootState, action: &PersistAction) -> RootState {
    let mut next = state.clone();

    match action {
        PersistAction::Rehydrate { payload, err, .. } => {
            // Rehydration happens once; later copies must not clobber live state.
            if state.persist.rehydrated {
                return next;
            }
            if let Some(err) = err {
                log::warn!("Rehydration failed, keeping defaults: {}", err);
            }
            if let Some(restored) = payload {
                if let Some(global) = restored.global {
                    next.global = global;
                }
                if let Some(api) = &restored.api {
                    next.api = api.clone();
                }
            }
            next.persist.rehydrated = true;
        }
        PersistAction::Persist { version, .. } => {
            if !state.persist.rehydrated {
                next.persist.version = *version;
            }
        }
        PersistAction::Purge { .. } => next.global = GlobalState::default(),
        PersistAction::Flush | PersistAction::Pause | PersistAction::Register { .. } => {}
    }

    next
}

enum Command {
    Flush(oneshot::Sender<()>),
    Pause,
    Resume,
    Purge(oneshot::Sender<()>),
}

/// Handle to the background task that keeps a store and its storage in sync
pub struct Persistor {
    store: Store,
    key: String,
    version: i32,
    commands: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
}

/// Start rehydrating `store` and persisting it according to `config`
///
/// Needs a tokio runtime. Without one nothing can be read, so the store is
/// marked rehydrated with its defaults straight away.
pub fn persist_store(store: &Store, config: PersistConfig) -> Persistor {
    let (commands, receiver) = mpsc::unbounded_channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let key = config.key.clone();
    let version = config.version;

    let task = match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.spawn(run(
            store.clone(),
            config,
            receiver,
            Arc::clone(&cancelled),
        ))),
        Err(e) => {
            log::warn!("No async runtime, persistence disabled: {}", e);
            store.dispatch(PersistAction::Rehydrate {
                key: key.clone(),
                payload: None,
                err: Some(Arc::new(e)),
            });
            None
        }
    };

    Persistor {
        store: store.clone(),
        key,
        version,
        commands,
        task,
        cancelled,
    }
}

impl Persistor {
    /// Write the current state now and wait for the write to finish
    pub async fn flush(&self) {
        self.store.dispatch(PersistAction::Flush);
        self.round_trip(Command::Flush).await;
    }

    /// Stop writing changes until [`Persistor::persist`] is called
    pub fn pause(&self) {
        self.store.dispatch(PersistAction::Pause);
        let _ = self.commands.send(Command::Pause);
    }

    /// Resume writing changes after a pause
    pub fn persist(&self) {
        self.store.dispatch(PersistAction::Persist {
            key: self.key.clone(),
            version: self.version,
        });
        let _ = self.commands.send(Command::Resume);
    }

    /// Reset persisted regions to their defaults and delete the stored record
    pub async fn purge(&self) {
        self.store.dispatch(PersistAction::Purge {
            key: self.key.clone(),
        });
        self.round_trip(Command::Purge).await;
    }

    /// Wait until the store has been rehydrated; false if it never will be
    pub async fn rehydrated(&self) -> bool {
        self.store
            .wait_for(|state| state.persist.rehydrated.then_some(()))
            .await
            .is_some()
    }

    /// Abandon any in-flight read or write; nothing is dispatched afterwards
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn round_trip(&self, command: impl FnOnce(oneshot::Sender<()>) -> Command) {
        if self.task.is_none() || self.is_cancelled() {
            return;
        }
        let (done, wait) = oneshot::channel();
        if self.commands.send(command(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

async fn run(
    store: Store,
    config: PersistConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cancelled: Arc<AtomicBool>,
) {
    let storage_key = config.storage_key();

    store.dispatch(PersistAction::Register {
        key: config.key.clone(),
    });
    store.dispatch(PersistAction::Persist {
        key: config.key.clone(),
        version: config.version,
    });

    let raw = config.storage.get(&storage_key).await;
    if cancelled.load(Ordering::SeqCst) || store.is_disposed() {
        log::debug!("Rehydration of {} abandoned", config.key);
        return;
    }

    let payload = raw.as_deref().and_then(|raw| config.decode(raw));
    let restored_anything = payload.is_some();
    store.dispatch(PersistAction::Rehydrate {
        key: config.key.clone(),
        payload,
        err: None,
    });
    log::debug!("Rehydrated {} (stored record: {})", config.key, restored_anything);

    let mut changes = store.subscribe();
    let mut last_written = restored_anything.then(|| config.encode(&store.state()));
    let mut paused = false;

    write_if_changed(&store, &config, &mut last_written).await;

    loop {
        // Commands first, so a pause or purge is seen before the change that follows it.
        tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(Command::Flush(done)) => {
                    let record = config.encode(&store.state());
                    config.storage.set(&storage_key, record.clone()).await;
                    last_written = Some(record);
                    let _ = done.send(());
                }
                Some(Command::Pause) => paused = true,
                Some(Command::Resume) => {
                    paused = false;
                    write_if_changed(&store, &config, &mut last_written).await;
                }
                Some(Command::Purge(done)) => {
                    config.storage.remove(&storage_key).await;
                    last_written = Some(config.encode(&store.state()));
                    let _ = done.send(());
                }
                None => break,
            },
            changed = changes.changed() => {
                if changed.is_err() || store.is_disposed() {
                    break;
                }
                if !paused {
                    write_if_changed(&store, &config, &mut last_written).await;
                }
            }
        }
    }
}

async fn write_if_changed(store: &Store, config: &PersistConfig, last_written: &mut Option<String>) {
    let record = config.encode(&store.state());
    if last_written.as_deref() == Some(record.as_str()) {
        return;
    }
    config.storage.set(&config.storage_key(), record.clone()).await;
    *last_written = Some(record);
}

impl From<PersistAction> for Action {
    fn from(action: PersistAction) -> Self {
        Action::Persist(action)
    }
}
