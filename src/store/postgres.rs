//! PostgreSQL document store.
//!
//! DESIGN
//! ======
//! Every document is one row of the `documents` table: full path as primary
//! key, the containing collection path for scans, and the body as JSONB.
//! Filters and sort keys are JSONB field lookups (`data -> 'order'`), so the
//! store stays schema-less like the document database it stands in for.
//!
//! `Transaction::lock` is `SELECT ... FOR UPDATE` on the document row. Two
//! appends under the same parent both lock the parent first, so the second
//! one reads the first one's committed maximum.

use async_trait::async_trait;
use sqlx::postgres::PgExecutor;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{CollectionPath, Data, DocPath, Document, DocumentStore, Query, StoreError, Transaction};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// SQL HELPERS
// =============================================================================

fn to_document(path: String, data: Json<Data>) -> Result<Document, StoreError> {
    Ok(Document { path: DocPath::parse(&path)?, data: data.0 })
}

async fn fetch_doc<'e>(
    executor: impl PgExecutor<'e>,
    path: &DocPath,
    for_update: bool,
) -> Result<Option<Document>, StoreError> {
    let sql = if for_update {
        "SELECT path, data FROM documents WHERE path = $1 FOR UPDATE"
    } else {
        "SELECT path, data FROM documents WHERE path = $1"
    };
    let row = sqlx::query_as::<_, (String, Json<Data>)>(sql)
        .bind(path.as_str())
        .fetch_optional(executor)
        .await?;
    row.map(|(path, data)| to_document(path, data)).transpose()
}

/// Build the SELECT for a collection query.
pub(crate) fn build_query<'a>(collection: &'a CollectionPath, query: &'a Query) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new("SELECT path, data FROM documents WHERE collection = ");
    builder.push_bind(collection.as_str());
    for (field, value) in &query.filters {
        builder.push(" AND data -> ");
        builder.push_bind(field.as_str());
        builder.push(" = ");
        builder.push_bind(Json(value));
    }
    if let Some((field, direction)) = &query.order_by {
        builder.push(" AND data ? ");
        builder.push_bind(field.as_str());
        builder.push(" ORDER BY data -> ");
        builder.push_bind(field.as_str());
        builder.push(" ");
        builder.push(direction.as_sql());
        builder.push(", path ");
        builder.push(direction.as_sql());
    }
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    builder
}

async fn fetch_query<'e>(
    executor: impl PgExecutor<'e>,
    collection: &CollectionPath,
    query: &Query,
) -> Result<Vec<Document>, StoreError> {
    let mut builder = build_query(collection, query);
    let rows = builder
        .build_query_as::<(String, Json<Data>)>()
        .fetch_all(executor)
        .await?;
    rows.into_iter()
        .map(|(path, data)| to_document(path, data))
        .collect()
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        fetch_doc(&self.pool, path, false).await
    }

    async fn query(&self, collection: &CollectionPath, query: &Query) -> Result<Vec<Document>, StoreError> {
        fetch_query(&self.pool, collection, query).await
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn lock(&mut self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        fetch_doc(&mut *self.tx, path, true).await
    }

    async fn get(&mut self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        fetch_doc(&mut *self.tx, path, false).await
    }

    async fn query(&mut self, collection: &CollectionPath, query: &Query) -> Result<Vec<Document>, StoreError> {
        fetch_query(&mut *self.tx, collection, query).await
    }

    async fn create(&mut self, path: &DocPath, data: Data) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO documents (path, collection, doc_id, data) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (path) DO NOTHING",
        )
        .bind(path.as_str())
        .bind(path.parent_collection().as_str())
        .bind(path.id())
        .bind(Json(&data))
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        Ok(())
    }

    async fn set(&mut self, path: &DocPath, data: Data) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO documents (path, collection, doc_id, data, updated_at) VALUES ($1, $2, $3, $4, now()) \
             ON CONFLICT (path) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
        )
        .bind(path.as_str())
        .bind(path.parent_collection().as_str())
        .bind(path.id())
        .bind(Json(&data))
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete(&mut self, path: &DocPath) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE path = $1")
            .bind(path.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
