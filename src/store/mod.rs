//! The state container the dashboard reads from and dispatches to
//!
//! A [`Store`] owns one [`RootState`]. Every change goes through
//! [`Store::dispatch`]: the middleware chain sees the action first, then the
//! root reducer produces the next state under the store's single writer, and
//! subscribers are woken with the new snapshot. Stores are cheap to clone and
//! clones share the same state; separately built stores share nothing.

mod middleware;

pub use middleware::{ApiMiddleware, Middleware, Next, SerializableCheck};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::client::Fetcher;
use crate::persist;
use crate::state::api::{ApiAction, Endpoint, QueryEntry};
use crate::state::{self, Action, RootState};

struct Inner {
    state: watch::Sender<RootState>,
    middleware: Vec<Arc<dyn Middleware>>,
    disposed: AtomicBool,
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("middleware", &self.inner.middleware.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Build a store with the default middleware
pub fn make_store(fetcher: Arc<dyn Fetcher>) -> Store {
    StoreBuilder::new(fetcher).build()
}

pub struct StoreBuilder {
    fetcher: Arc<dyn Fetcher>,
    middleware: Vec<Arc<dyn Middleware>>,
    preloaded: RootState,
}

impl StoreBuilder {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            middleware: Vec::new(),
            preloaded: RootState::default(),
        }
    }

    /// Extra middleware, run after the serializability check and before the
    /// remote-data middleware
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn preloaded_state(mut self, state: RootState) -> Self {
        self.preloaded = state;
        self
    }

    pub fn build(self) -> Store {
        let mut chain: Vec<Arc<dyn Middleware>> = Vec::with_capacity(self.middleware.len() + 2);
        chain.push(Arc::new(SerializableCheck::new(
            persist::LIFECYCLE_ACTIONS.to_vec(),
        )));
        chain.extend(self.middleware);
        chain.push(Arc::new(ApiMiddleware::new(self.fetcher)));

        let (state, _) = watch::channel(self.preloaded);

        Store {
            inner: Arc::new(Inner {
                state,
                middleware: chain,
                disposed: AtomicBool::new(false),
            }),
        }
    }
}

impl Store {
    /// Run an action through the middleware chain and the reducer
    pub fn dispatch(&self, action: impl Into<Action>) {
        let action = action.into();

        if self.is_disposed() {
            log::debug!("Ignoring {} on a disposed store", action.action_type());
            return;
        }

        for middleware in &self.inner.middleware {
            if let Next::Stop = middleware.handle(self, &action) {
                return;
            }
        }

        self.inner.state.send_if_modified(|current| {
            let next = state::reduce(current, &action);
            if next == *current {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RootState {
        self.inner.state.borrow().clone()
    }

    /// Read part of the state without cloning all of it
    ///
    /// `f` must not dispatch.
    pub fn select<R>(&self, f: impl FnOnce(&RootState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Receiver woken after every change
    pub fn subscribe(&self) -> watch::Receiver<RootState> {
        self.inner.state.subscribe()
    }

    /// Wait until `f` yields a value; `None` once the store is disposed
    pub async fn wait_for<R>(&self, f: impl Fn(&RootState) -> Option<R>) -> Option<R> {
        let mut changes = self.subscribe();
        loop {
            if self.is_disposed() {
                return None;
            }
            let found = {
                let state = changes.borrow_and_update();
                f(&state)
            };
            if found.is_some() {
                return found;
            }
            if changes.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Request `endpoint` (served from cache when already fulfilled) and wait
    /// for the entry to settle
    pub async fn query(&self, endpoint: Endpoint) -> Option<QueryEntry> {
        self.dispatch(ApiAction::Initiate {
            endpoint: endpoint.clone(),
            force_refetch: false,
        });
        self.settled(&endpoint).await
    }

    /// Fetch `endpoint` again even if cached, and wait for the new result
    pub async fn refetch(&self, endpoint: Endpoint) -> Option<QueryEntry> {
        self.dispatch(ApiAction::Initiate {
            endpoint: endpoint.clone(),
            force_refetch: true,
        });
        self.settled(&endpoint).await
    }

    /// Wait until the entry for `endpoint` is fulfilled or rejected
    pub async fn settled(&self, endpoint: &Endpoint) -> Option<QueryEntry> {
        let key = endpoint.query_key();
        self.wait_for(|state| {
            state
                .api
                .queries
                .get(&key)
                .filter(|entry| entry.is_settled())
                .cloned()
        })
        .await
    }

    /// Stop accepting dispatches and release anyone waiting on this store
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            self.inner.state.send_modify(|_| {});
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Whether two handles point at the same store
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
