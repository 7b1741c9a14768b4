//! Auth routes: email/password signup and login, session cookie, extractors.

use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use crate::error::KanbanError;
use crate::models::UserProfile;
use crate::services::session::{Session, SessionContext};
use crate::services::{auth as auth_svc, board as board_svc};
use crate::state::AppState;

pub const COOKIE_NAME: &str = "session_token";

fn session_cookie(token: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(COOKIE_NAME).map(|c| c.value().to_owned()).filter(|t| !t.is_empty())
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Caller context from the session cookie. Missing, unknown and expired
/// tokens all produce an anonymous context.
impl<S> FromRequestParts<S> for SessionContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = KanbanError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = cookie_token(parts) else {
            return Ok(Self::anonymous());
        };
        let app_state = AppState::from_ref(state);
        Ok(auth_svc::current_session(app_state.store.as_ref(), &token)
            .await?
            .map_or_else(Self::anonymous, Self::authenticated))
    }
}

/// Authenticated session extracted from the cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub session: Session,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = KanbanError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = SessionContext::from_request_parts(parts, state).await?;
        let session = ctx.require()?.clone();
        Ok(Self { session })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

fn with_session_cookie(state: &AppState, jar: CookieJar, session: Session, status: StatusCode) -> Response {
    let cookie = session_cookie(session.token.clone(), state.config.cookie_secure, state.config.auth.session_ttl);
    (status, jar.add(cookie), Json(session)).into_response()
}

/// `POST /api/auth/signup`: create the account and its board, set cookie.
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Credentials>,
) -> Result<Response, KanbanError> {
    let session = auth_svc::signup(state.store.as_ref(), &state.config.auth, &body.email, &body.password).await?;
    Ok(with_session_cookie(&state, jar, session, StatusCode::CREATED))
}

/// `POST /api/auth/login`: verify credentials, set cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Credentials>,
) -> Result<Response, KanbanError> {
    let session = auth_svc::login(state.store.as_ref(), &state.config.auth, &body.email, &body.password).await?;
    Ok(with_session_cookie(&state, jar, session, StatusCode::OK))
}

/// `POST /api/auth/logout`: delete session, clear cookie. Idempotent.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse, KanbanError> {
    if let Some(token) = jar.get(COOKIE_NAME).map(|c| c.value().to_owned()) {
        auth_svc::logout(state.store.as_ref(), &token).await?;
    }
    let cleared = session_cookie(String::new(), state.config.cookie_secure, Duration::ZERO);
    Ok((jar.add(cleared), StatusCode::NO_CONTENT))
}

/// `GET /api/auth/me`: return current user.
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UserProfile>, KanbanError> {
    let ctx = SessionContext::authenticated(auth.session);
    Ok(Json(board_svc::get_current_user(state.store.as_ref(), &ctx).await?))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
