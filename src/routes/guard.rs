//! Route guard for the page routes.
//!
//! DESIGN
//! ======
//! `resolve` is the pure decision table. The `route_guard` middleware waits
//! for [`AuthReadiness`] (set once at startup after the store answered),
//! resolves the caller's session from the cookie, and either redirects or
//! hands the chosen [`View`] to the page handler through request extensions.
//! Unmatched paths go through `fallback`, which applies the same table.
//!
//! | path         | anonymous          | signed in               |
//! |--------------|--------------------|-------------------------|
//! | `/`          | redirect `/login`  | redirect `/login`       |
//! | `/login`     | login view         | redirect `/dashboard`   |
//! | `/signup`    | signup view        | redirect `/dashboard`   |
//! | `/dashboard` | redirect `/login`  | dashboard view          |
//! | other        | redirect `/login`  | redirect `/login`       |

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Extension;
use tokio::sync::watch;
use tracing::debug;

use crate::services::session::SessionContext;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const DASHBOARD_PATH: &str = "/dashboard";

// =============================================================================
// READINESS
// =============================================================================

/// One-way flag flipped once the auth backend has reported its first state.
#[derive(Debug, Clone)]
pub struct AuthReadiness {
    tx: Arc<watch::Sender<bool>>,
}

impl AuthReadiness {
    #[must_use]
    pub fn new() -> Self {
        Self { tx: Arc::new(watch::Sender::new(false)) }
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once `mark_ready` has been called.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for AuthReadiness {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// DECISIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Signup,
    Dashboard,
}

impl View {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(View),
    Redirect(&'static str),
    /// Unmatched `/api/...` paths are not pages.
    NotFound,
}

#[must_use]
pub fn resolve(path: &str, authenticated: bool) -> Navigation {
    match (path, authenticated) {
        (LOGIN_PATH, false) => Navigation::Render(View::Login),
        (SIGNUP_PATH, false) => Navigation::Render(View::Signup),
        (LOGIN_PATH | SIGNUP_PATH, true) => Navigation::Redirect(DASHBOARD_PATH),
        (DASHBOARD_PATH, true) => Navigation::Render(View::Dashboard),
        (DASHBOARD_PATH, false) => Navigation::Redirect(LOGIN_PATH),
        (p, _) if p == "/api" || p.starts_with("/api/") => Navigation::NotFound,
        _ => Navigation::Redirect(LOGIN_PATH),
    }
}

// =============================================================================
// MIDDLEWARE + PAGE
// =============================================================================

/// Gate every page request on readiness and the session cookie.
pub async fn route_guard(
    State(state): State<AppState>,
    ctx: SessionContext,
    mut request: Request,
    next: Next,
) -> Response {
    state.readiness.wait().await;

    let path = request.uri().path().to_owned();
    let navigation = resolve(&path, ctx.session().is_some());
    debug!(%path, ?navigation, "route guard");
    match navigation {
        Navigation::Render(view) => {
            request.extensions_mut().insert(view);
            next.run(request).await
        }
        Navigation::Redirect(to) => Redirect::to(to).into_response(),
        Navigation::NotFound => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Unmatched paths: redirect per the decision table, or 404 under `/api`.
pub async fn fallback(State(state): State<AppState>, ctx: SessionContext, uri: Uri) -> Response {
    state.readiness.wait().await;
    match resolve(uri.path(), ctx.session().is_some()) {
        Navigation::Redirect(to) => Redirect::to(to).into_response(),
        Navigation::Render(_) | Navigation::NotFound => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Minimal HTML shell naming the view; the client app mounts into `#app`.
pub async fn page(Extension(view): Extension<View>) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Kanboard | {name}</title></head>\n\
         <body data-view=\"{name}\"><div id=\"app\"></div></body>\n</html>\n",
        name = view.name()
    ))
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
