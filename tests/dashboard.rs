mod common;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use common::{seeded_pool, spawn_server, CountingFetcher, Recorder};
use stockboard::db;
use stockboard::db::repository::{POPULAR_PRODUCTS_LIMIT, SUMMARY_LIMIT};
use stockboard::state::api::{ApiAction, Endpoint, FetchError, QueryStatus, Tag};
use stockboard::{make_store, HttpFetcher, StoreBuilder};

#[tokio::test]
async fn dashboard_query_is_fulfilled_from_the_server() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, base_url) = spawn_server(seeded_pool(dir.path()));
    let store = make_store(Arc::new(HttpFetcher::new(base_url)));

    let entry = store.query(Endpoint::GetDashboardMetrics).await.unwrap();
    assert_eq!(entry.status, QueryStatus::Fulfilled);
    assert!(entry.error.is_none());

    let metrics = entry.dashboard_metrics().unwrap();
    assert_eq!(metrics.popular_products.len(), POPULAR_PRODUCTS_LIMIT as usize);
    assert!(metrics
        .popular_products
        .windows(2)
        .all(|pair| pair[0].stock_quantity >= pair[1].stock_quantity));

    assert_eq!(metrics.sales_summary.len(), SUMMARY_LIMIT as usize);
    assert!(metrics.sales_summary.windows(2).all(|pair| pair[0].date >= pair[1].date));
    assert_eq!(metrics.purchase_summary.len(), SUMMARY_LIMIT as usize);
    assert_eq!(metrics.expense_summary.len(), SUMMARY_LIMIT as usize);
    assert_eq!(metrics.expense_by_category_summary.len(), SUMMARY_LIMIT as usize);
    assert!(metrics
        .expense_by_category_summary
        .iter()
        .all(|entry| !entry.amount.is_empty()));
}

#[tokio::test]
async fn dashboard_payload_shape() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, base_url) = spawn_server(seeded_pool(dir.path()));

    let response = reqwest::get(format!("{}/dashboard", base_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN].to_str().unwrap(),
        "*"
    );
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: Value = response.json().await.unwrap();
    for field in [
        "popularProducts",
        "salesSummary",
        "purchaseSummary",
        "expenseSummary",
        "expenseByCategorySummary",
    ] {
        assert!(body[field].is_array(), "{} missing", field);
    }
    assert!(body["expenseByCategorySummary"][0]["amount"].is_string());
    assert!(body["popularProducts"][0]["stockQuantity"].is_i64());
    assert!(body["salesSummary"][0]["date"]
        .as_str()
        .unwrap()
        .ends_with('Z'));
}

#[tokio::test]
async fn unknown_routes_and_preflight() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, base_url) = spawn_server(seeded_pool(dir.path()));
    let client = reqwest::Client::new();

    let missing = client.get(format!("{}/inventory", base_url)).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "Not found");

    let preflight = client
        .request(Method::OPTIONS, format!("{}/dashboard", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), StatusCode::NO_CONTENT);

    let wrong_method = client
        .post(format!("{}/dashboard", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn database_failure_rejects_the_query() {
    let dir = tempfile::tempdir().unwrap();
    // No migrations, so every dashboard query fails.
    let pool = db::establish_connection(&dir.path().join("empty.db").display().to_string()).unwrap();
    let (_server, base_url) = spawn_server(pool);
    let store = make_store(Arc::new(HttpFetcher::new(base_url)));

    let entry = store.query(Endpoint::GetDashboardMetrics).await.unwrap();
    assert_eq!(entry.status, QueryStatus::Rejected);
    assert!(entry.data.is_none());
    assert_eq!(
        entry.error,
        Some(FetchError::Http {
            code: 500,
            error: "Failed to retrieve dashboard metrics".to_string(),
        })
    );
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let store = make_store(Arc::new(HttpFetcher::new("http://127.0.0.1:1")));

    let entry = store.query(Endpoint::GetDashboardMetrics).await.unwrap();
    assert_eq!(entry.status, QueryStatus::Rejected);
    assert!(matches!(entry.error, Some(FetchError::Network { .. })));
}

#[tokio::test]
async fn query_goes_through_pending_then_fulfilled() {
    let recorder = Arc::new(Recorder::default());
    let store = StoreBuilder::new(CountingFetcher::new(Duration::from_millis(10)))
        .middleware(recorder.clone())
        .build();

    store.dispatch(ApiAction::Initiate {
        endpoint: Endpoint::GetDashboardMetrics,
        force_refetch: false,
    });
    assert_eq!(
        store.state().api.status(&Endpoint::GetDashboardMetrics),
        QueryStatus::Pending
    );

    let entry = store.settled(&Endpoint::GetDashboardMetrics).await.unwrap();
    assert_eq!(entry.status, QueryStatus::Fulfilled);
    assert_eq!(
        recorder.seen_with_prefix("api/"),
        vec![
            "api/executeQuery/initiate",
            "api/executeQuery/pending",
            "api/executeQuery/fulfilled",
        ]
    );
}

#[tokio::test]
async fn in_flight_requests_are_deduplicated() {
    let fetcher = CountingFetcher::new(Duration::from_millis(50));
    let store = make_store(fetcher.clone());

    let (first, second) = tokio::join!(
        store.query(Endpoint::GetDashboardMetrics),
        store.query(Endpoint::GetDashboardMetrics),
    );
    assert_eq!(first.unwrap().status, QueryStatus::Fulfilled);
    assert_eq!(second.unwrap().status, QueryStatus::Fulfilled);
    assert_eq!(fetcher.calls(), 1);

    // Cached now; a plain query does not hit the network again.
    store.query(Endpoint::GetDashboardMetrics).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn refetch_bypasses_the_cache() {
    let fetcher = CountingFetcher::new(Duration::from_millis(5));
    let store = make_store(fetcher.clone());

    let first = store.query(Endpoint::GetDashboardMetrics).await.unwrap();
    let second = store.refetch(Endpoint::GetDashboardMetrics).await.unwrap();

    assert_eq!(fetcher.calls(), 2);
    assert_ne!(first.request_id, second.request_id);
    assert_eq!(second.status, QueryStatus::Fulfilled);
}

#[tokio::test]
async fn invalidated_entries_are_fetched_again() {
    let fetcher = CountingFetcher::new(Duration::from_millis(5));
    let store = make_store(fetcher.clone());

    store.query(Endpoint::GetDashboardMetrics).await.unwrap();
    store.dispatch(ApiAction::InvalidateTags(vec![Tag::DashboardMetrics]));
    assert_eq!(
        store.state().api.status(&Endpoint::GetDashboardMetrics),
        QueryStatus::Uninitialized
    );

    store.query(Endpoint::GetDashboardMetrics).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn product_search_filters_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, base_url) = spawn_server(seeded_pool(dir.path()));
    let store = make_store(Arc::new(HttpFetcher::new(base_url)));

    let entry = store
        .query(Endpoint::GetProducts {
            search: Some("Mug".to_string()),
        })
        .await
        .unwrap();
    let products = entry.products().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Ceramic Mug");

    let all = store
        .query(Endpoint::GetProducts { search: None })
        .await
        .unwrap();
    assert_eq!(all.products().unwrap().len(), 20);
}

#[tokio::test]
async fn disposing_releases_waiters() {
    let store = make_store(CountingFetcher::new(Duration::from_secs(5)));
    store.dispatch(ApiAction::Initiate {
        endpoint: Endpoint::GetDashboardMetrics,
        force_refetch: false,
    });

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { store.settled(&Endpoint::GetDashboardMetrics).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.dispose();

    assert!(waiter.await.unwrap().is_none());
}
