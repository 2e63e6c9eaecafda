//! Dispatch middleware

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::Store;
use crate::client::Fetcher;
use crate::state::api::{ApiAction, FetchError, QueryStatus};
use crate::state::Action;

/// What the store does after a middleware has seen an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Pass the action on to the next middleware and then the reducer
    Continue,
    /// The action has been handled; stop here
    Stop,
}

pub trait Middleware: Send + Sync {
    fn handle(&self, store: &Store, action: &Action) -> Next;
}

/// Reports actions whose payload cannot be turned into JSON
///
/// Persistence lifecycle actions carry handles and errors by design and are
/// listed in `ignored_actions`.
pub struct SerializableCheck {
    ignored_actions: Vec<&'static str>,
    violations: AtomicUsize,
}

impl SerializableCheck {
    pub fn new(ignored_actions: Vec<&'static str>) -> Self {
        Self {
            ignored_actions,
            violations: AtomicUsize::new(0),
        }
    }

    /// Number of offending actions seen so far
    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::Relaxed)
    }
}

impl Middleware for SerializableCheck {
    fn handle(&self, _store: &Store, action: &Action) -> Next {
        let action_type = action.action_type();
        if !self.ignored_actions.contains(&action_type) && action.to_json().is_none() {
            self.violations.fetch_add(1, Ordering::Relaxed);
            log::error!("A non-serializable value was detected in action {}", action_type);
        }
        Next::Continue
    }
}

/// Turns `initiate` requests into a fetch and its pending/fulfilled/rejected actions
///
/// A request for a key that is already pending is dropped, and a fulfilled
/// key is served from cache; `force_refetch` bypasses both and supersedes any
/// request still in flight.
pub struct ApiMiddleware {
    fetcher: Arc<dyn Fetcher>,
}

impl ApiMiddleware {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

impl Middleware for ApiMiddleware {
    fn handle(&self, store: &Store, action: &Action) -> Next {
        let Action::Api(ApiAction::Initiate {
            endpoint,
            force_refetch,
        }) = action
        else {
            return Next::Continue;
        };

        let status = store.select(|state| state.api.status(endpoint));
        if !force_refetch {
            match status {
                QueryStatus::Pending => {
                    log::debug!("{} already in flight", endpoint.query_key());
                    return Next::Stop;
                }
                QueryStatus::Fulfilled => {
                    log::debug!("{} served from cache", endpoint.query_key());
                    return Next::Stop;
                }
                QueryStatus::Uninitialized | QueryStatus::Rejected => {}
            }
        }

        let request_id = Uuid::new_v4().to_string();
        store.dispatch(ApiAction::Pending {
            endpoint: endpoint.clone(),
            request_id: request_id.clone(),
            started_at: Utc::now().timestamp_millis(),
        });

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                store.dispatch(ApiAction::Rejected {
                    endpoint: endpoint.clone(),
                    request_id,
                    error: FetchError::Network {
                        error: e.to_string(),
                    },
                });
                return Next::Stop;
            }
        };

        let fetcher = Arc::clone(&self.fetcher);
        let store = store.clone();
        let endpoint = endpoint.clone();
        runtime.spawn(async move {
            let outcome = fetcher
                .fetch(&endpoint)
                .await
                .and_then(|body| endpoint.decode(body));

            let action = match outcome {
                Ok(data) => ApiAction::Fulfilled {
                    endpoint,
                    request_id,
                    data,
                    fulfilled_at: Utc::now().timestamp_millis(),
                },
                Err(error) => {
                    log::warn!("{} failed: {}", endpoint.query_key(), error);
                    ApiAction::Rejected {
                        endpoint,
                        request_id,
                        error,
                    }
                }
            };
            store.dispatch(action);
        });

        Next::Stop
    }
}
