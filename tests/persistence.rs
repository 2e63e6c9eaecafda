mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use common::{SlowStorage, Unreachable};
use stockboard::state::global::GlobalState;
use stockboard::state::{set_is_dark_mode, set_is_sidebar_collapsed};
use stockboard::storage::{FileStorage, Host, Storage};
use stockboard::{make_store, StoreProvider};

const ORIGIN: &str = "http://localhost:3000";
const DARK_RECORD: &str =
    r#"{"global":{"isSidebarCollapsed":false,"isDarkMode":true},"_persist":{"version":-1,"rehydrated":true}}"#;

fn provider_with(storage: Arc<dyn Storage>) -> StoreProvider {
    StoreProvider::new(storage, Arc::new(Unreachable))
}

async fn stored_record(storage: &dyn Storage) -> Option<Value> {
    let raw = storage.get("persist:root").await?;
    Some(serde_json::from_str(&raw).unwrap())
}

#[tokio::test]
async fn separate_stores_share_nothing() {
    let a = make_store(Arc::new(Unreachable));
    let b = make_store(Arc::new(Unreachable));

    a.dispatch(set_is_dark_mode(true));

    assert!(!a.ptr_eq(&b));
    assert!(a.state().global.is_dark_mode);
    assert!(!b.state().global.is_dark_mode);
}

#[tokio::test]
async fn provider_hands_out_one_store() {
    let provider = provider_with(Arc::new(stockboard::NoopStorage));
    let first = provider.store().clone();
    assert!(first.ptr_eq(provider.store()));
}

#[tokio::test]
async fn first_run_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let provider = provider_with(Arc::new(FileStorage::new(dir.path(), ORIGIN)));

    assert!(provider.rehydrated().await);
    assert_eq!(provider.store().state().global, GlobalState::default());
}

#[tokio::test]
async fn flushed_preferences_land_in_storage() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path(), ORIGIN));
    let provider = provider_with(storage.clone());
    assert!(provider.rehydrated().await);

    provider.store().dispatch(set_is_dark_mode(true));
    provider.persistor().flush().await;

    let record = stored_record(storage.as_ref()).await.unwrap();
    assert_eq!(record["global"]["isDarkMode"], json!(true));
    assert_eq!(record["global"]["isSidebarCollapsed"], json!(false));
    assert!(record.get("api").is_none());
}

#[tokio::test]
async fn dispatch_alone_writes_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path(), ORIGIN));
    let provider = provider_with(storage.clone());
    assert!(provider.rehydrated().await);

    provider.store().dispatch(set_is_dark_mode(true));

    let mut dark = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if let Some(record) = stored_record(storage.as_ref()).await {
            if record["global"]["isDarkMode"] == json!(true) {
                dark = true;
                break;
            }
        }
    }
    assert!(dark, "dark mode was never written");
}

#[tokio::test]
async fn preferences_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let provider = provider_with(Arc::new(FileStorage::new(dir.path(), ORIGIN)));
        assert!(provider.rehydrated().await);
        provider.store().dispatch(set_is_sidebar_collapsed(true));
        provider.persistor().flush().await;
    }

    let provider = provider_with(Arc::new(FileStorage::new(dir.path(), ORIGIN)));
    assert!(provider.rehydrated().await);
    assert_eq!(
        provider.store().state().global,
        GlobalState {
            is_sidebar_collapsed: true,
            is_dark_mode: false,
        }
    );
}

#[tokio::test]
async fn other_origins_start_fresh() {
    let dir = tempfile::tempdir().unwrap();
    FileStorage::new(dir.path(), ORIGIN)
        .set("persist:root", DARK_RECORD.to_string())
        .await;

    let provider = provider_with(Arc::new(FileStorage::new(dir.path(), "http://other.example")));
    assert!(provider.rehydrated().await);
    assert!(!provider.store().state().global.is_dark_mode);
}

#[tokio::test]
async fn corrupt_record_rehydrates_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path(), ORIGIN));
    storage.set("persist:root", "{\"global\": tru".to_string()).await;

    let provider = provider_with(storage);
    assert!(provider.rehydrated().await);
    assert_eq!(provider.store().state().global, GlobalState::default());
}

#[tokio::test]
async fn record_from_another_version_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path(), ORIGIN));
    storage
        .set(
            "persist:root",
            json!({
                "global": {"isSidebarCollapsed": true, "isDarkMode": true},
                "_persist": {"version": 2, "rehydrated": true}
            })
            .to_string(),
        )
        .await;

    let provider = provider_with(storage);
    assert!(provider.rehydrated().await);
    assert_eq!(provider.store().state().global, GlobalState::default());
}

#[tokio::test]
async fn purge_forgets_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path(), ORIGIN));
    let provider = provider_with(storage.clone());
    assert!(provider.rehydrated().await);

    provider.store().dispatch(set_is_dark_mode(true));
    provider.persistor().flush().await;
    assert!(stored_record(storage.as_ref()).await.is_some());

    provider.persistor().purge().await;
    assert_eq!(provider.store().state().global, GlobalState::default());
    assert!(stored_record(storage.as_ref()).await.is_none());
}

#[tokio::test]
async fn paused_persistor_writes_nothing_until_resumed() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path(), ORIGIN));
    let provider = provider_with(storage.clone());
    assert!(provider.rehydrated().await);
    provider.persistor().flush().await;

    provider.persistor().pause();
    provider.store().dispatch(set_is_dark_mode(true));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let record = stored_record(storage.as_ref()).await.unwrap();
    assert_eq!(record["global"]["isDarkMode"], json!(false));

    provider.persistor().persist();
    provider.persistor().flush().await;
    let record = stored_record(storage.as_ref()).await.unwrap();
    assert_eq!(record["global"]["isDarkMode"], json!(true));
}

#[tokio::test]
async fn server_host_never_persists() {
    {
        let provider = StoreProvider::for_host(&Host::Server, Arc::new(Unreachable));
        assert!(provider.rehydrated().await);
        provider.store().dispatch(set_is_dark_mode(true));
        provider.persistor().flush().await;
    }

    let provider = StoreProvider::for_host(&Host::Server, Arc::new(Unreachable));
    assert!(provider.rehydrated().await);
    assert!(!provider.store().state().global.is_dark_mode);
}

#[tokio::test]
async fn gate_shows_placeholder_until_rehydrated() {
    let storage = SlowStorage::new(Some(DARK_RECORD), Duration::from_millis(50));
    let provider = provider_with(storage);

    let gate = provider.gate();
    assert!(!gate.is_open());
    assert_eq!(gate.render("loading", |_| "dashboard"), "loading");

    assert!(provider.rehydrated().await);

    let gate = provider.gate();
    assert!(gate.is_open());
    let rendered = gate.render(None, |state| Some(state.global.is_dark_mode));
    assert_eq!(rendered, Some(true));
}

#[tokio::test]
async fn dropping_provider_abandons_rehydration() {
    let storage = SlowStorage::new(Some(DARK_RECORD), Duration::from_millis(100));
    let provider = provider_with(storage);
    let store = provider.store().clone();

    drop(provider);
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(store.is_disposed());
    let state = store.state();
    assert!(!state.persist.rehydrated);
    assert_eq!(state.global, GlobalState::default());

    store.dispatch(set_is_dark_mode(true));
    assert!(!store.state().global.is_dark_mode);
}
