//! Remote-data cache for the server endpoints the dashboard reads
//!
//! Every request is recorded under a query key made from the endpoint name and
//! its serialized arguments, e.g. `getDashboardMetrics(undefined)`. An entry
//! moves `uninitialized -> pending -> fulfilled | rejected`; a refetch moves it
//! back to `pending` under a new request id, and any late result carrying an
//! older id is dropped. The slice only records what happened. The network call
//! itself is made by [`crate::store::ApiMiddleware`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::Product;
use crate::metrics::DashboardMetrics;

/// Region name of this slice in the root state
pub const REDUCER_PATH: &str = "api";

/// Cache tags used for invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    DashboardMetrics,
    Products,
}

/// Server endpoints known to the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Endpoint {
    /// `GET /dashboard`
    GetDashboardMetrics,
    /// `GET /products?search=`
    GetProducts { search: Option<String> },
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::GetDashboardMetrics => "getDashboardMetrics",
            Endpoint::GetProducts { .. } => "getProducts",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::GetDashboardMetrics => "/dashboard",
            Endpoint::GetProducts { .. } => "/products",
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::GetDashboardMetrics => Vec::new(),
            Endpoint::GetProducts { search } => search
                .iter()
                .map(|term| ("search", term.clone()))
                .collect(),
        }
    }

    pub fn provides(&self) -> Tag {
        match self {
            Endpoint::GetDashboardMetrics => Tag::DashboardMetrics,
            Endpoint::GetProducts { .. } => Tag::Products,
        }
    }

    /// Cache key: endpoint name plus serialized arguments
    pub fn query_key(&self) -> String {
        let args = match self {
            Endpoint::GetDashboardMetrics | Endpoint::GetProducts { search: None } => {
                "undefined".to_string()
            }
            Endpoint::GetProducts { search: Some(term) } => {
                serde_json::Value::String(term.clone()).to_string()
            }
        };
        format!("{}({})", self.name(), args)
    }

    /// Decode a response body into this endpoint's data
    pub fn decode(&self, body: serde_json::Value) -> Result<QueryData, FetchError> {
        let parsed = match self {
            Endpoint::GetDashboardMetrics => {
                serde_json::from_value(body).map(QueryData::DashboardMetrics)
            }
            Endpoint::GetProducts { .. } => serde_json::from_value(body).map(QueryData::Products),
        };
        parsed.map_err(|e| FetchError::Parsing {
            error: e.to_string(),
        })
    }
}

/// Why a request ended up `rejected`
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchError {
    /// Non-2xx response; `error` comes from the `{"error": ...}` body
    #[error("server responded with {code}: {error}")]
    Http { code: u16, error: String },

    #[error("request failed: {error}")]
    Network { error: String },

    #[error("could not decode response: {error}")]
    Parsing { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryData {
    DashboardMetrics(DashboardMetrics),
    Products(Vec<Product>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Uninitialized,
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntry {
    pub status: QueryStatus,
    pub endpoint: Endpoint,
    pub request_id: String,
    /// Last good payload; kept while a refetch is pending or after it fails
    pub data: Option<QueryData>,
    pub error: Option<FetchError>,
    pub started_time_stamp: i64,
    pub fulfilled_time_stamp: Option<i64>,
}

impl QueryEntry {
    pub fn is_settled(&self) -> bool {
        matches!(self.status, QueryStatus::Fulfilled | QueryStatus::Rejected)
    }

    pub fn dashboard_metrics(&self) -> Option<&DashboardMetrics> {
        match &self.data {
            Some(QueryData::DashboardMetrics(metrics)) => Some(metrics),
            _ => None,
        }
    }

    pub fn products(&self) -> Option<&[Product]> {
        match &self.data {
            Some(QueryData::Products(products)) => Some(products),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiState {
    pub queries: BTreeMap<String, QueryEntry>,
}

impl ApiState {
    pub fn entry(&self, endpoint: &Endpoint) -> Option<&QueryEntry> {
        self.queries.get(&endpoint.query_key())
    }

    pub fn status(&self, endpoint: &Endpoint) -> QueryStatus {
        self.entry(endpoint)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiAction {
    /// Request data; handled by the middleware, ignored by the reducer
    Initiate { endpoint: Endpoint, force_refetch: bool },
    Pending {
        endpoint: Endpoint,
        request_id: String,
        started_at: i64,
    },
    Fulfilled {
        endpoint: Endpoint,
        request_id: String,
        data: QueryData,
        fulfilled_at: i64,
    },
    Rejected {
        endpoint: Endpoint,
        request_id: String,
        error: FetchError,
    },
    /// Evict every entry providing one of these tags
    InvalidateTags(Vec<Tag>),
    ResetApiState,
}

impl ApiAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            ApiAction::Initiate { .. } => "api/executeQuery/initiate",
            ApiAction::Pending { .. } => "api/executeQuery/pending",
            ApiAction::Fulfilled { .. } => "api/executeQuery/fulfilled",
            ApiAction::Rejected { .. } => "api/executeQuery/rejected",
            ApiAction::InvalidateTags(_) => "api/invalidateTags",
            ApiAction::ResetApiState => "api/resetApiState",
        }
    }
}

pub fn reduce(state: &ApiState, action: &ApiAction) -> ApiState {
    let mut next = state.clone();

    match action {
        ApiAction::Initiate { .. } => {}
        ApiAction::Pending {
            endpoint,
            request_id,
            started_at,
        } => {
            let key = endpoint.query_key();
            let previous = next.queries.remove(&key);
            next.queries.insert(
                key,
                QueryEntry {
                    status: QueryStatus::Pending,
                    endpoint: endpoint.clone(),
                    request_id: request_id.clone(),
                    data: previous.as_ref().and_then(|entry| entry.data.clone()),
                    error: None,
                    started_time_stamp: *started_at,
                    fulfilled_time_stamp: previous.and_then(|entry| entry.fulfilled_time_stamp),
                },
            );
        }
        ApiAction::Fulfilled {
            endpoint,
            request_id,
            data,
            fulfilled_at,
        } => {
            if let Some(entry) = current_request(&mut next, endpoint, request_id) {
                entry.status = QueryStatus::Fulfilled;
                entry.data = Some(data.clone());
                entry.error = None;
                entry.fulfilled_time_stamp = Some(*fulfilled_at);
            }
        }
        ApiAction::Rejected {
            endpoint,
            request_id,
            error,
        } => {
            if let Some(entry) = current_request(&mut next, endpoint, request_id) {
                entry.status = QueryStatus::Rejected;
                entry.error = Some(error.clone());
            }
        }
        ApiAction::InvalidateTags(tags) => {
            next.queries
                .retain(|_, entry| !tags.contains(&entry.endpoint.provides()));
        }
        ApiAction::ResetApiState => next = ApiState::default(),
    }

    next
}

/// The pending entry for `endpoint`, only if `request_id` is still the one it waits on
fn current_request<'a>(
    state: &'a mut ApiState,
    endpoint: &Endpoint,
    request_id: &str,
) -> Option<&'a mut QueryEntry> {
    let entry = state.queries.get_mut(&endpoint.query_key())?;
    if entry.status == QueryStatus::Pending && entry.request_id == request_id {
        Some(entry)
    } else {
        log::debug!(
            "Dropping stale result for {} (request {})",
            endpoint.query_key(),
            request_id
        );
        None
    }
}
