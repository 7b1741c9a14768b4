//! Persisted record shapes and their document paths.
//!
//! DESIGN
//! ======
//! Field names are the wire-visible camelCase keys (`userId`, `boardId`,
//! `columnId`, `createdAt`). A record's `id` is never stored in the body;
//! it is the last segment of the document path and is injected on read.
//!
//! Layout:
//!
//! ```text
//! boards/{boardId}
//! boards/{boardId}/columns/{columnId}
//! boards/{boardId}/columns/{columnId}/cards/{cardId}
//! users/{userId}
//! users/{userId}/private/credential
//! emails/{emailKey}
//! sessions/{token}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::store::{CollectionPath, Data, DocPath, Document, StoreError};

pub const BOARDS: &str = "boards";
pub const COLUMNS: &str = "columns";
pub const CARDS: &str = "cards";
pub const USERS: &str = "users";
pub const EMAILS: &str = "emails";
pub const SESSIONS: &str = "sessions";

/// Sibling sort key shared by columns and cards.
pub const ORDER_FIELD: &str = "order";
pub const COLUMN_ID_FIELD: &str = "columnId";

// =============================================================================
// RECORD CODEC
// =============================================================================

/// A serde type stored as a document body.
pub trait Record: Serialize + DeserializeOwned {
    /// Decode a document, taking `id` from the path.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the body does not match the record shape.
    fn from_document(doc: &Document) -> Result<Self, StoreError> {
        let mut data = doc.data.clone();
        data.insert("id".into(), Value::String(doc.id().to_owned()));
        serde_json::from_value(Value::Object(data))
            .map_err(|e| StoreError::Malformed { path: doc.path.to_string(), message: e.to_string() })
    }

    /// Encode the body, dropping `id`.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the record does not serialize to a JSON object.
    fn to_data(&self) -> Result<Data, StoreError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut data)) => {
                data.remove("id");
                Ok(data)
            }
            Ok(other) => Err(StoreError::Malformed { path: String::new(), message: format!("not an object: {other}") }),
            Err(e) => Err(StoreError::Malformed { path: String::new(), message: e.to_string() }),
        }
    }
}

// =============================================================================
// RECORDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub user_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Record for Board {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub title: String,
    pub order: i64,
    pub board_id: String,
    pub user_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Record for Column {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub content: String,
    pub order: i64,
    pub column_id: String,
}

impl Record for Card {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Record for UserProfile {}

/// Password material. Lives under `users/{id}/private` and never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub password_salt: String,
    pub password_hash: String,
}

impl Record for Credential {}

/// Unique-email index entry pointing at the owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailIndex {
    pub user_id: String,
}

impl Record for EmailIndex {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Record for SessionRecord {}

// =============================================================================
// PATHS
// =============================================================================

/// Board id for a user. One board per user is enforced by construction.
#[must_use]
pub fn board_id_for_user(user_id: &str) -> String {
    format!("board-{user_id}")
}

pub fn board_path(board_id: &str) -> Result<DocPath, StoreError> {
    DocPath::root(BOARDS, board_id)
}

pub fn columns_path(board_id: &str) -> Result<CollectionPath, StoreError> {
    board_path(board_id)?.collection_of(COLUMNS)
}

pub fn column_path(board_id: &str, column_id: &str) -> Result<DocPath, StoreError> {
    columns_path(board_id)?.doc(column_id)
}

pub fn cards_path(board_id: &str, column_id: &str) -> Result<CollectionPath, StoreError> {
    column_path(board_id, column_id)?.collection_of(CARDS)
}

pub fn card_path(board_id: &str, column_id: &str, card_id: &str) -> Result<DocPath, StoreError> {
    cards_path(board_id, column_id)?.doc(card_id)
}

pub fn user_path(user_id: &str) -> Result<DocPath, StoreError> {
    DocPath::root(USERS, user_id)
}

pub fn credential_path(user_id: &str) -> Result<DocPath, StoreError> {
    user_path(user_id)?.child("private", "credential")
}

pub fn email_index_path(email_key: &str) -> Result<DocPath, StoreError> {
    DocPath::root(EMAILS, email_key)
}

pub fn session_path(token: &str) -> Result<DocPath, StoreError> {
    DocPath::root(SESSIONS, token)
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
