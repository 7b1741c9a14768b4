//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api`, the health check, and the
//! guarded page routes into one Axum router. Service errors become
//! `{"code", "message"}` JSON bodies with a status derived from the variant.

pub mod auth;
pub mod boards;
pub mod guard;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::{ErrorCode, KanbanError};
use crate::state::AppState;

// =============================================================================
// ERROR RESPONSES
// =============================================================================

#[must_use]
pub fn status_for(err: &KanbanError) -> StatusCode {
    match err {
        KanbanError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        KanbanError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        KanbanError::NotFound { .. } => StatusCode::NOT_FOUND,
        KanbanError::Validation(_) => StatusCode::BAD_REQUEST,
        KanbanError::Remote(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for KanbanError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!(error = %self, code = self.error_code(), retryable = self.retryable(), "request failed");
        } else {
            warn!(error = %self, code = self.error_code(), "request rejected");
        }
        (status, Json(json!({ "code": self.error_code(), "message": self.to_string() }))).into_response()
    }
}

// =============================================================================
// ROUTERS
// =============================================================================

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/board", get(boards::get_board))
        .route("/api/board/structure", get(boards::verify_structure))
        .route("/api/board/{board_id}", get(boards::get_board_by_id))
        .route(
            "/api/board/{board_id}/columns",
            get(boards::list_columns).post(boards::create_column),
        )
        .route(
            "/api/board/{board_id}/columns/{column_id}/cards",
            get(boards::list_cards).post(boards::create_card),
        )
        .route("/api/board/{board_id}/cards/{card_id}/move", post(boards::move_card))
        .route("/healthz", get(healthz))
}

fn page_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(guard::page))
        .route(guard::LOGIN_PATH, get(guard::page))
        .route(guard::SIGNUP_PATH, get(guard::page))
        .route(guard::DASHBOARD_PATH, get(guard::page))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::route_guard))
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_routes()
        .merge(page_routes(&state))
        .fallback(guard::fallback)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 200 once startup has reached the store, 503 before.
async fn healthz(State(state): State<AppState>) -> StatusCode {
    if state.readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
