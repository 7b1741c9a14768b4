//! Email + password authentication.
//!
//! DESIGN
//! ======
//! Signup validates input before touching the store, then writes the user,
//! its credential, and a unique-email index entry in one transaction. The
//! index lives at `emails/{sha256(email)}`, so a concurrent duplicate signup
//! fails on `create` instead of producing two users.
//!
//! Password digests are iterated, salted SHA-256. Unknown email and wrong
//! password produce the same error so login does not leak which emails exist.

use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::error::KanbanError;
use crate::models::{self, Credential, EmailIndex, Record, UserProfile};
use crate::services::board;
use crate::services::session::{self, Session, SessionContext};
use crate::store::{DocumentStore, StoreError};

pub const MIN_PASSWORD_LEN: usize = 8;
/// `Validation` message for a signup whose email is already registered.
pub const EMAIL_IN_USE: &str = "email already in use";
const SALT_BYTES: usize = 16;
const HASH_ROUNDS: u32 = 10_000;

/// Knobs for account and session handling, resolved once from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub session_ttl: Duration,
    pub default_board_name: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self { session_ttl: Duration::days(7), default_board_name: "Main Board".into() }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Trim and lowercase an email, accepting only `local@domain.tld` shapes.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if normalized.chars().any(|c| c.is_whitespace() || c == '/') {
        return None;
    }
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.contains('@') {
        return None;
    }
    let (host, tld) = domain.rsplit_once('.')?;
    if host.is_empty() || tld.is_empty() || host.split('.').any(str::is_empty) {
        return None;
    }
    Some(normalized)
}

/// At least eight characters with at least one letter and one digit.
///
/// # Errors
///
/// Returns `Validation` describing the first unmet rule.
pub fn validate_password(password: &str) -> Result<(), KanbanError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(KanbanError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(KanbanError::validation("password must contain a letter and a digit"));
    }
    Ok(())
}

// =============================================================================
// DIGESTS
// =============================================================================

fn sha256_hex(bytes: &[u8]) -> String {
    session::bytes_to_hex(&Sha256::digest(bytes))
}

#[must_use]
pub fn generate_salt() -> String {
    let bytes: [u8; SALT_BYTES] = rand::random();
    session::bytes_to_hex(&bytes)
}

#[must_use]
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = Sha256::new().chain_update(salt.as_bytes()).chain_update(password.as_bytes()).finalize();
    for _ in 1..HASH_ROUNDS {
        digest = Sha256::new().chain_update(digest).chain_update(salt.as_bytes()).finalize();
    }
    session::bytes_to_hex(&digest)
}

/// Store key for the unique-email index.
#[must_use]
pub fn email_key(normalized_email: &str) -> String {
    sha256_hex(normalized_email.as_bytes())
}

fn invalid_login() -> KanbanError {
    // Same error for unknown email and wrong password.
    KanbanError::NotAuthenticated
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Register a new account, start its session, and provision its board.
///
/// # Errors
///
/// Returns `Validation` for a malformed email, weak password or taken email
/// (before any write for the first two), `Remote` for store failures.
pub async fn signup(
    store: &dyn DocumentStore,
    settings: &AuthSettings,
    email: &str,
    password: &str,
) -> Result<Session, KanbanError> {
    let email = normalize_email(email).ok_or_else(|| KanbanError::validation("invalid email address"))?;
    validate_password(password)?;

    let user_id = Uuid::new_v4().simple().to_string();
    let salt = generate_salt();
    let user = UserProfile { id: user_id.clone(), email: email.clone(), created_at: OffsetDateTime::now_utc() };
    let credential = Credential { password_hash: hash_password(password, &salt), password_salt: salt };

    let mut tx = store.begin().await?;
    match tx
        .create(&models::email_index_path(&email_key(&email))?, EmailIndex { user_id: user_id.clone() }.to_data()?)
        .await
    {
        Err(StoreError::AlreadyExists(_)) => return Err(KanbanError::validation(EMAIL_IN_USE)),
        other => other?,
    }
    tx.create(&models::user_path(&user_id)?, user.to_data()?).await?;
    tx.set(&models::credential_path(&user_id)?, credential.to_data()?).await?;
    tx.commit().await?;
    info!(%user_id, "user signed up");

    let session = session::create_session(store, &user_id, &email, settings.session_ttl).await?;
    let ctx = SessionContext::authenticated(session.clone());
    board::provision_user_board(store, &ctx, &settings.default_board_name).await?;
    Ok(session)
}

/// Verify credentials and start a new session. A user whose board is
/// missing (e.g. provisioning failed at signup) gets it provisioned here.
///
/// # Errors
///
/// Returns `NotAuthenticated` for bad credentials, `Remote` for store failures.
pub async fn login(
    store: &dyn DocumentStore,
    settings: &AuthSettings,
    email: &str,
    password: &str,
) -> Result<Session, KanbanError> {
    let email = normalize_email(email).ok_or_else(invalid_login)?;

    let Some(index) = store.get(&models::email_index_path(&email_key(&email))?).await? else {
        return Err(invalid_login());
    };
    let user_id = EmailIndex::from_document(&index)?.user_id;

    let Some(credential) = store.get(&models::credential_path(&user_id)?).await? else {
        return Err(invalid_login());
    };
    let credential = Credential::from_document(&credential)?;
    if hash_password(password, &credential.password_salt) != credential.password_hash {
        return Err(invalid_login());
    }

    let session = session::create_session(store, &user_id, &email, settings.session_ttl).await?;
    let ctx = SessionContext::authenticated(session.clone());
    if store.get(&models::board_path(&models::board_id_for_user(&user_id))?).await?.is_none() {
        board::provision_user_board(store, &ctx, &settings.default_board_name).await?;
    }
    info!(%user_id, "user logged in");
    Ok(session)
}

/// End a session. Unknown tokens are ignored.
///
/// # Errors
///
/// Returns `Remote` if the store delete fails.
pub async fn logout(store: &dyn DocumentStore, token: &str) -> Result<(), KanbanError> {
    session::delete_session(store, token).await
}

/// Resolve a token to its session, if still valid.
///
/// # Errors
///
/// Returns `Remote` if the store read fails.
pub async fn current_session(store: &dyn DocumentStore, token: &str) -> Result<Option<Session>, KanbanError> {
    session::validate_session(store, token).await
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
