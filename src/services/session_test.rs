use super::*;
use crate::store::memory::MemoryStore;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// SessionContext
// =============================================================================

#[test]
fn anonymous_context_requires_login() {
    let ctx = SessionContext::anonymous();
    assert!(ctx.session().is_none());
    assert!(matches!(ctx.require(), Err(KanbanError::NotAuthenticated)));
}

#[test]
fn authenticated_context_exposes_session() {
    let session = Session {
        token: "t".into(),
        user_id: "u1".into(),
        email: "user@example.com".into(),
        expires_at: OffsetDateTime::now_utc(),
    };
    let ctx = SessionContext::authenticated(session.clone());
    assert_eq!(ctx.require().unwrap(), &session);
}

#[test]
fn session_serialization_hides_token() {
    let session = Session {
        token: "secret".into(),
        user_id: "u1".into(),
        email: "user@example.com".into(),
        expires_at: OffsetDateTime::UNIX_EPOCH,
    };
    let value = serde_json::to_value(&session).unwrap();
    assert!(value.get("token").is_none());
    assert_eq!(value["userId"], "u1");
    assert_eq!(value["expiresAt"], "1970-01-01T00:00:00Z");
}

// =============================================================================
// Store round trips
// =============================================================================

#[tokio::test]
async fn create_then_validate_session() {
    let store = MemoryStore::new();
    let session = create_session(&store, "u1", "user@example.com", Duration::hours(1))
        .await
        .unwrap();
    let found = validate_session(&store, &session.token).await.unwrap().expect("session should be live");
    assert_eq!(found, session);
}

#[tokio::test]
async fn expired_session_is_rejected() {
    let store = MemoryStore::new();
    let session = create_session(&store, "u1", "user@example.com", Duration::seconds(-1))
        .await
        .unwrap();
    assert!(validate_session(&store, &session.token).await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_or_unknown_tokens_yield_none() {
    let store = MemoryStore::new();
    assert!(validate_session(&store, "").await.unwrap().is_none());
    assert!(validate_session(&store, "a/b").await.unwrap().is_none());
    assert!(validate_session(&store, &generate_token()).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_session_revokes_token() {
    let store = MemoryStore::new();
    let session = create_session(&store, "u1", "user@example.com", Duration::hours(1))
        .await
        .unwrap();
    delete_session(&store, &session.token).await.unwrap();
    assert!(validate_session(&store, &session.token).await.unwrap().is_none());
    // Second delete is a no-op.
    delete_session(&store, &session.token).await.unwrap();
}

#[tokio::test]
async fn ttl_past_the_date_range_is_rejected_without_writes() {
    let store = MemoryStore::new();
    let err = create_session(&store, "u1", "user@example.com", Duration::hours(100_000_000))
        .await
        .unwrap_err();
    assert!(matches!(err, KanbanError::Validation(_)));
    assert!(store.snapshot().await.is_empty());

    let err = create_session(&store, "u1", "user@example.com", Duration::MAX).await.unwrap_err();
    assert!(matches!(err, KanbanError::Validation(_)));
}
