//! Route handlers for the metrics server

use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};
use tiny_http::Method;

use super::state::ServerState;
use crate::db::repository;
use crate::metrics::DashboardMetrics;

/// Status and JSON body of a response
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self {
                status: 200,
                body: Some(body),
            },
            Err(e) => {
                log::error!("Failed to encode response: {}", e);
                Self::error(500, "Failed to encode response")
            }
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: Some(json!({ "error": message })),
        }
    }

    fn empty(status: u16) -> Self {
        Self { status, body: None }
    }
}

/// Dispatch a request to its handler
pub fn route(state: &ServerState, method: &Method, url: &str) -> Reply {
    let Ok(parsed) = Url::parse("http://localhost").and_then(|base| base.join(url)) else {
        return Reply::error(400, "Malformed request path");
    };

    let path = parsed.path().trim_end_matches('/');
    let known = matches!(path, "/dashboard" | "/products");

    match (method, path) {
        (Method::Options, _) if known => Reply::empty(204),
        (Method::Get, "/dashboard") => get_dashboard_metrics(state),
        (Method::Get, "/products") => {
            let search = parsed
                .query_pairs()
                .find(|(name, _)| name == "search")
                .map(|(_, value)| value.into_owned());
            get_products(state, search.as_deref())
        }
        (_, _) if known => Reply::error(405, "Method not allowed"),
        _ => Reply::error(404, "Not found"),
    }
}

fn get_dashboard_metrics(state: &ServerState) -> Reply {
    match state.with_connection(DashboardMetrics::load) {
        Ok(metrics) => Reply::json(&metrics),
        Err(e) => {
            log::error!("get_dashboard_metrics error: {}", e);
            Reply::error(500, "Failed to retrieve dashboard metrics")
        }
    }
}

fn get_products(state: &ServerState, search: Option<&str>) -> Reply {
    let result = state.with_connection(|conn| Ok(repository::get_products(conn, search)?));
    match result {
        Ok(products) => Reply::json(&products),
        Err(e) => {
            log::error!("get_products error: {}", e);
            Reply::error(500, "Failed to retrieve products")
        }
    }
}
