//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the document store, the immutable config, and the auth readiness
//! signal the route guard waits on. All fields are cheap to clone.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::routes::guard::AuthReadiness;
use crate::store::DocumentStore;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
    pub readiness: AuthReadiness,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: AppConfig) -> Self {
        Self { store, config: Arc::new(config), readiness: AuthReadiness::new() }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
