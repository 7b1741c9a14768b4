use super::test_helpers::test_app_state;
use crate::models;

#[tokio::test]
async fn test_state_shares_store_handle() {
    let (state, store) = test_app_state();
    let path = models::user_path("u1").unwrap();
    state.store.set(&path, serde_json::Map::new()).await.unwrap();
    assert!(store.snapshot().await.contains_key("users/u1"));
}

#[test]
fn test_state_is_ready() {
    let (state, _) = test_app_state();
    assert!(state.readiness.is_ready());
}

#[test]
fn new_state_is_not_ready() {
    let state = super::AppState::new(
        std::sync::Arc::new(crate::store::memory::MemoryStore::new()),
        super::test_helpers::test_config(),
    );
    assert!(!state.readiness.is_ready());
    assert!(!state.config.cookie_secure);
}
