//! Ordering service: sibling order assignment and atomic card moves.
//!
//! DESIGN
//! ======
//! Columns (under a board) and cards (under a column) carry an integer
//! `order`. Appending reads the single sibling with the highest order and
//! writes the new entity at max + 1, or 1 when the parent is empty.
//!
//! The read and the write share one transaction that first locks the parent
//! document, so concurrent appends under the same parent serialize and each
//! one observes the previous one's result. Explicit orders skip the read.
//!
//! Moving a card writes the merged card at its new location and, when the
//! column changes, deletes the old location in the same transaction. The
//! card id survives the move.
//!
//! ERROR HANDLING
//! ==============
//! Missing parents and missing cards fail with `NotFound` before anything is
//! staged. A patch that would leave the card undecodable fails with
//! `Validation`, also before staging. A failed commit leaves the pre-move
//! state untouched.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::KanbanError;
use crate::models::{self, COLUMN_ID_FIELD, Card, ORDER_FIELD, Record};
use crate::store::{Data, Direction, DocPath, Document, DocumentStore, Query, Transaction};

/// Fields a move patch cannot override; the move arguments own them.
const RESERVED_PATCH_FIELDS: [&str; 3] = ["id", ORDER_FIELD, COLUMN_ID_FIELD];

/// Where to append: the parent document and the sibling collection under it.
#[derive(Debug, Clone, Copy)]
pub struct Siblings<'a> {
    pub parent: &'a DocPath,
    pub parent_kind: &'static str,
    pub collection: &'static str,
}

/// Result of an append.
#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    pub path: DocPath,
    pub order: i64,
    pub data: Data,
}

/// Order that follows the current maximum.
#[must_use]
pub fn next_order(max: Option<i64>) -> i64 {
    max.map_or(1, |max| max.saturating_add(1))
}

/// Highest `order` among the documents in `siblings`, read inside `tx`.
///
/// # Errors
///
/// Returns `Remote` if the query fails.
pub async fn max_order(tx: &mut dyn Transaction, siblings: &Siblings<'_>) -> Result<Option<i64>, KanbanError> {
    let collection = siblings.parent.collection_of(siblings.collection)?;
    let top = tx
        .query(&collection, &Query::new().order_by(ORDER_FIELD, Direction::Desc).limit(1))
        .await?;
    Ok(top.first().and_then(|doc| doc.get_i64(ORDER_FIELD)))
}

/// Persist `data` as a new sibling and return its assigned order.
///
/// With `explicit_order = None` the order is max + 1 (1 for an empty parent).
///
/// # Errors
///
/// Returns `NotFound` if the parent does not exist, `Remote` for store failures.
pub async fn append(
    store: &dyn DocumentStore,
    siblings: Siblings<'_>,
    mut data: Data,
    explicit_order: Option<i64>,
) -> Result<Appended, KanbanError> {
    let mut tx = store.begin().await?;
    if tx.lock(siblings.parent).await?.is_none() {
        return Err(KanbanError::not_found(siblings.parent_kind, siblings.parent.id()));
    }

    let order = match explicit_order {
        Some(order) => order,
        None => next_order(max_order(tx.as_mut(), &siblings).await?),
    };

    let path = siblings.parent.collection_of(siblings.collection)?.new_doc();
    data.insert(ORDER_FIELD.into(), Value::from(order));
    tx.create(&path, data.clone()).await?;
    tx.commit().await?;

    debug!(parent = %siblings.parent, %path, order, "appended sibling");
    Ok(Appended { path, order, data })
}

// =============================================================================
// MOVE
// =============================================================================

/// A card relocation request.
#[derive(Debug, Clone, PartialEq)]
pub struct CardMove {
    pub board_id: String,
    pub old_column_id: String,
    pub new_column_id: String,
    pub new_order: i64,
    pub card_id: String,
    /// Extra fields merged into the stored card.
    pub patch: Data,
}

impl CardMove {
    #[must_use]
    pub fn is_cross_column(&self) -> bool {
        self.old_column_id != self.new_column_id
    }
}

/// Stored card data with `patch` merged in and the move fields applied.
#[must_use]
pub fn merge_card(mut stored: Data, patch: &Data, new_column_id: &str, new_order: i64) -> Data {
    for (key, value) in patch {
        if RESERVED_PATCH_FIELDS.contains(&key.as_str()) {
            continue;
        }
        stored.insert(key.clone(), value.clone());
    }
    stored.insert(COLUMN_ID_FIELD.into(), Value::from(new_column_id));
    stored.insert(ORDER_FIELD.into(), Value::from(new_order));
    stored
}

/// Atomically relocate (or reorder) a card, returning it at its new location.
///
/// # Errors
///
/// Returns `NotFound` if the card is not under `old_column_id` or the target
/// column does not exist, `Validation` if the patched card no longer has the
/// card shape, `Remote` for store failures including a failed
/// commit (in which case nothing changed).
pub async fn move_card(store: &dyn DocumentStore, mv: &CardMove) -> Result<Document, KanbanError> {
    let old_path = models::card_path(&mv.board_id, &mv.old_column_id, &mv.card_id)?;
    let new_path = models::card_path(&mv.board_id, &mv.new_column_id, &mv.card_id)?;

    let mut tx = store.begin().await?;
    let Some(existing) = tx.lock(&old_path).await? else {
        return Err(KanbanError::not_found("card", &mv.card_id));
    };
    if mv.is_cross_column() {
        let target = models::column_path(&mv.board_id, &mv.new_column_id)?;
        if tx.lock(&target).await?.is_none() {
            return Err(KanbanError::not_found("column", &mv.new_column_id));
        }
    }

    let data = merge_card(existing.data, &mv.patch, &mv.new_column_id, mv.new_order);
    let moved = Document { path: new_path, data };
    Card::from_document(&moved).map_err(|e| KanbanError::validation(format!("patch does not fit a card: {e}")))?;
    tx.set(&moved.path, moved.data.clone()).await?;
    if mv.is_cross_column() {
        tx.delete(&old_path).await?;
    }
    tx.commit().await?;

    info!(
        board_id = %mv.board_id,
        card_id = %mv.card_id,
        from = %mv.old_column_id,
        to = %mv.new_column_id,
        order = mv.new_order,
        "card moved"
    );
    Ok(moved)
}

#[cfg(test)]
#[path = "ordering_test.rs"]
mod tests;
