//! Scoped store ownership for one view tree
//!
//! A [`StoreProvider`] is created once per view tree and passed down
//! explicitly. The first call to [`StoreProvider::store`] builds the store and
//! starts rehydration; every later call returns that same store. Views that
//! depend on persisted preferences go through a [`RehydrationGate`], which
//! renders the caller's placeholder until rehydration has finished. Dropping
//! the provider abandons a rehydration still in flight and disposes the store.

use std::sync::{Arc, OnceLock};

use crate::client::Fetcher;
use crate::persist::{persist_store, PersistConfig, Persistor};
use crate::state::RootState;
use crate::storage::{Host, Storage};
use crate::store::{make_store, Store};

struct Activated {
    store: Store,
    persistor: Persistor,
}

pub struct StoreProvider {
    storage: Arc<dyn Storage>,
    fetcher: Arc<dyn Fetcher>,
    activated: OnceLock<Activated>,
}

impl StoreProvider {
    pub fn new(storage: Arc<dyn Storage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            storage,
            fetcher,
            activated: OnceLock::new(),
        }
    }

    /// Provider whose storage backend is the one `host` supports
    pub fn for_host(host: &Host, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::new(host.storage(), fetcher)
    }

    fn activate(&self) -> &Activated {
        self.activated.get_or_init(|| {
            let store = make_store(Arc::clone(&self.fetcher));
            let persistor = persist_store(&store, PersistConfig::root(Arc::clone(&self.storage)));
            log::debug!("Store created for view tree");
            Activated { store, persistor }
        })
    }

    /// The tree's store, created on first use
    pub fn store(&self) -> &Store {
        &self.activate().store
    }

    pub fn persistor(&self) -> &Persistor {
        &self.activate().persistor
    }

    pub fn gate(&self) -> RehydrationGate<'_> {
        RehydrationGate {
            store: self.store(),
        }
    }

    /// Wait for rehydration; false if the store was torn down first
    pub async fn rehydrated(&self) -> bool {
        self.persistor().rehydrated().await
    }
}

impl Drop for StoreProvider {
    fn drop(&mut self) {
        if let Some(activated) = self.activated.get() {
            activated.persistor.cancel();
            activated.store.dispose();
        }
    }
}

/// Holds back views that read persisted state until it has been restored
pub struct RehydrationGate<'a> {
    store: &'a Store,
}

impl RehydrationGate<'_> {
    pub fn is_open(&self) -> bool {
        self.store.select(|state| state.persist.rehydrated)
    }

    /// `children` once rehydrated, `placeholder` before that
    pub fn render<T>(&self, placeholder: T, children: impl FnOnce(&RootState) -> T) -> T {
        let state = self.store.state();
        if state.persist.rehydrated {
            children(&state)
        } else {
            placeholder
        }
    }
}
