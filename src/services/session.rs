//! Session tokens and the explicit caller context.
//!
//! ARCHITECTURE
//! ============
//! A login produces an opaque random token stored at `sessions/{token}`.
//! The HTTP layer resolves the token once per request into a
//! `SessionContext`, which every board operation receives as a parameter.
//! There is no process-wide "current user".

use std::fmt::Write;

use rand::Rng;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::error::KanbanError;
use crate::models::{self, Record, SessionRecord};
use crate::store::DocumentStore;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// An authenticated caller, valid until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(skip)]
    pub token: String,
    pub user_id: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Identity of the caller for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    session: Option<Session>,
}

impl SessionContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { session: None }
    }

    #[must_use]
    pub fn authenticated(session: Session) -> Self {
        Self { session: Some(session) }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The caller's session, or `NotAuthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` for an anonymous context.
    pub fn require(&self) -> Result<&Session, KanbanError> {
        self.session.as_ref().ok_or(KanbanError::NotAuthenticated)
    }
}

/// Create a session for the given user, returning it with its token.
///
/// # Errors
///
/// Returns `Validation` if `ttl` reaches past the representable date range,
/// `Remote` if the store write fails.
pub async fn create_session(
    store: &dyn DocumentStore,
    user_id: &str,
    email: &str,
    ttl: Duration,
) -> Result<Session, KanbanError> {
    let now = OffsetDateTime::now_utc();
    let expires_at = now
        .checked_add(ttl)
        .ok_or_else(|| KanbanError::validation(format!("session ttl out of range: {ttl}")))?;
    let token = generate_token();
    let record = SessionRecord { user_id: user_id.to_owned(), email: email.to_owned(), created_at: now, expires_at };
    store.set(&models::session_path(&token)?, record.to_data()?).await?;

    Ok(Session { token, user_id: record.user_id, email: record.email, expires_at: record.expires_at })
}

/// Resolve a token to a live session. Unknown, malformed and expired tokens
/// all yield `None`.
///
/// # Errors
///
/// Returns `Remote` if the store read fails.
pub async fn validate_session(store: &dyn DocumentStore, token: &str) -> Result<Option<Session>, KanbanError> {
    let Ok(path) = models::session_path(token) else {
        return Ok(None);
    };
    let Some(doc) = store.get(&path).await? else {
        return Ok(None);
    };
    let record = SessionRecord::from_document(&doc)?;
    if record.expires_at <= OffsetDateTime::now_utc() {
        return Ok(None);
    }

    Ok(Some(Session {
        token: token.to_owned(),
        user_id: record.user_id,
        email: record.email,
        expires_at: record.expires_at,
    }))
}

/// Delete a session by token. Deleting an unknown token is a no-op.
///
/// # Errors
///
/// Returns `Remote` if the store write fails.
pub async fn delete_session(store: &dyn DocumentStore, token: &str) -> Result<(), KanbanError> {
    let Ok(path) = models::session_path(token) else {
        return Ok(());
    };
    store.delete(&path).await?;
    Ok(())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
