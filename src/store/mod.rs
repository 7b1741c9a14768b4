//! Document store abstraction.
//!
//! DESIGN
//! ======
//! Records live at hierarchical paths made of alternating collection and
//! document segments (`boards/{boardId}/columns/{columnId}/cards/{cardId}`).
//! A store exposes point reads, filtered/ordered queries, and transactions.
//! Writes outside an explicit transaction are single-write transactions.
//!
//! Two backends implement the trait: `postgres::PgStore` (JSONB rows, real
//! SQL transactions) and `memory::MemoryStore` (process-local, used by tests
//! and by `KANBOARD_STORE=memory`).
//!
//! TRANSACTIONS
//! ============
//! A `Transaction` is all-or-nothing. Dropping it without `commit` discards
//! every staged write. `lock` reads a document and holds it exclusively until
//! the transaction ends, which is what serializes concurrent appends under the
//! same parent.

pub mod memory;
pub mod postgres;

use std::cmp::Ordering;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Document body: a JSON object without its id.
pub type Data = serde_json::Map<String, Value>;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("document already exists: {0}")]
    AlreadyExists(String),
    #[error("transaction aborted: {0}")]
    Aborted(String),
    #[error("malformed document {path}: {message}")]
    Malformed { path: String, message: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// PATHS
// =============================================================================

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/') && segment.trim() == segment
}

fn split_segments(raw: &str) -> Option<Vec<&str>> {
    let segments = raw.split('/').collect::<Vec<_>>();
    segments.iter().all(|s| valid_segment(s)).then_some(segments)
}

/// Path of a single document. Always an even number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    /// Parse a raw path such as `boards/b1/columns/c1`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` when a segment is empty or the segment count is odd.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match split_segments(raw) {
            Some(segments) if segments.len() % 2 == 0 => Ok(Self(raw.to_owned())),
            _ => Err(StoreError::InvalidPath(raw.to_owned())),
        }
    }

    /// Top-level document, e.g. `users/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for empty or slash-containing segments.
    pub fn root(collection: &str, id: &str) -> Result<Self, StoreError> {
        CollectionPath::root(collection)?.doc(id)
    }

    /// Nested document under `self`, e.g. `{self}/columns/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for empty or slash-containing segments.
    pub fn child(&self, collection: &str, id: &str) -> Result<Self, StoreError> {
        self.collection_of(collection)?.doc(id)
    }

    /// Sub-collection of this document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if `name` is not a valid segment.
    pub fn collection_of(&self, name: &str) -> Result<CollectionPath, StoreError> {
        if !valid_segment(name) {
            return Err(StoreError::InvalidPath(format!("{}/{name}", self.0)));
        }
        Ok(CollectionPath(format!("{}/{name}", self.0)))
    }

    /// Last segment.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// The collection that directly contains this document.
    #[must_use]
    pub fn parent_collection(&self) -> CollectionPath {
        let cut = self.0.rfind('/').unwrap_or(0);
        CollectionPath(self.0[..cut].to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a collection. Always an odd number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Top-level collection.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if `name` is not a valid segment.
    pub fn root(name: &str) -> Result<Self, StoreError> {
        if !valid_segment(name) {
            return Err(StoreError::InvalidPath(name.to_owned()));
        }
        Ok(Self(name.to_owned()))
    }

    /// Document inside this collection.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if `id` is not a valid segment.
    pub fn doc(&self, id: &str) -> Result<DocPath, StoreError> {
        if !valid_segment(id) {
            return Err(StoreError::InvalidPath(format!("{}/{id}", self.0)));
        }
        Ok(DocPath(format!("{}/{id}", self.0)))
    }

    /// A fresh document path with a generated id.
    #[must_use]
    pub fn new_doc(&self) -> DocPath {
        DocPath(format!("{}/{}", self.0, new_document_id()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate an opaque document id (32 lowercase hex chars).
#[must_use]
pub fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

// =============================================================================
// DOCUMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub data: Data,
}

impl Document {
    #[must_use]
    pub fn id(&self) -> &str {
        self.path.id()
    }

    #[must_use]
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.data.get(field).and_then(Value::as_i64)
    }

    #[cfg(test)]
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}

// =============================================================================
// QUERIES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Equality filters, an optional sort key, and an optional limit.
///
/// When `order_by` is set, documents without the sort field are excluded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_owned(), value.into()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_owned(), direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `data` passes the filters and carries the sort field.
    #[must_use]
    pub fn matches(&self, data: &Data) -> bool {
        let filtered = self
            .filters
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected));
        let sortable = self
            .order_by
            .as_ref()
            .is_none_or(|(field, _)| data.contains_key(field));
        filtered && sortable
    }

    /// Apply sort and limit to already-filtered documents.
    pub fn finish(&self, docs: &mut Vec<Document>) {
        if let Some((field, direction)) = &self.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_values(a.data.get(field), b.data.get(field))
                    .then_with(|| a.path.cmp(&b.path));
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
    }
}

/// Same cross-type ranking as PostgreSQL `jsonb` comparison, so both
/// backends sort mixed-type fields alike.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: by type first, then by value.
#[must_use]
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = x.as_f64().unwrap_or(f64::NAN);
                    let y = y.as_f64().unwrap_or(f64::NAN);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            },
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => type_rank(a).cmp(&type_rank(b)),
        },
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// An open, all-or-nothing unit of work.
#[async_trait]
pub trait Transaction: Send {
    /// Read a document and hold it exclusively until the transaction ends.
    async fn lock(&mut self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Read a document, observing this transaction's own staged writes.
    async fn get(&mut self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    async fn query(&mut self, collection: &CollectionPath, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Write a new document. Fails with `AlreadyExists` if the path is taken.
    async fn create(&mut self, path: &DocPath, data: Data) -> Result<(), StoreError>;

    /// Overwrite (or create) a document.
    async fn set(&mut self, path: &DocPath, data: Data) -> Result<(), StoreError>;

    /// Remove a document. Missing documents are not an error.
    async fn delete(&mut self, path: &DocPath) -> Result<(), StoreError>;

    /// Make every staged write visible at once.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    async fn query(&self, collection: &CollectionPath, query: &Query) -> Result<Vec<Document>, StoreError>;

    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;

    /// Cheap round-trip used as a readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn set(&self, path: &DocPath, data: Data) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        tx.set(path, data).await?;
        tx.commit().await
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        tx.delete(path).await?;
        tx.commit().await
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
