//! Board service: session-aware board, column and card operations.
//!
//! DESIGN
//! ======
//! Every operation receives the caller's `SessionContext` explicitly. Writes
//! check, in order: a session exists (`NotAuthenticated`), the board exists
//! (`NotFound`), the caller owns it (`Unauthorized`). Order assignment and
//! card moves are delegated to the ordering service.
//!
//! Each user owns exactly one board at `boards/board-{userId}`, created at
//! signup together with the default "To Do", "Progress" and "Done" columns.

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::KanbanError;
use crate::models::{self, Board, CARDS, COLUMNS, Card, Column, ORDER_FIELD, Record, UserProfile};
use crate::services::ordering::{self, CardMove, Siblings};
use crate::services::session::{Session, SessionContext};
use crate::store::{Direction, Document, DocumentStore, Query};

/// Columns every new board starts with, in display order.
pub const DEFAULT_COLUMNS: [&str; 3] = ["To Do", "Progress", "Done"];

/// Demo cards as (content, column title).
pub const SAMPLE_CARDS: [(&str, &str); 3] = [
    ("Set up project structure", "To Do"),
    ("Write board API tests", "Progress"),
    ("Review pull requests", "Done"),
];

/// Extra column added by the sample seed, with its own card.
pub const SAMPLE_COLUMN: (&str, &str) = ("Review", "Write documentation");

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ColumnStatus {
    /// Present with the expected order.
    Ok { order: i64 },
    /// Present, but at a different order. Reported, never rewritten.
    OrderMismatch { expected: i64, found: i64 },
    /// Was missing and has been appended.
    Created { order: i64 },
}

/// Outcome of checking one default column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnCheck {
    pub title: String,
    #[serde(flatten)]
    pub status: ColumnStatus,
}

// =============================================================================
// HELPERS
// =============================================================================

async fn load_board(store: &dyn DocumentStore, board_id: &str) -> Result<Board, KanbanError> {
    let doc = store
        .get(&models::board_path(board_id)?)
        .await?
        .ok_or_else(|| KanbanError::not_found("board", board_id))?;
    Ok(Board::from_document(&doc)?)
}

/// Load a board and verify the session owns it.
///
/// # Errors
///
/// Returns `NotFound` for a missing board and `Unauthorized` for a board
/// owned by someone else.
pub async fn ensure_board_owner(
    store: &dyn DocumentStore,
    session: &Session,
    board_id: &str,
) -> Result<Board, KanbanError> {
    let board = load_board(store, board_id).await?;
    if board.user_id != session.user_id {
        warn!(user_id = %session.user_id, %board_id, "board access denied");
        return Err(KanbanError::Unauthorized { user_id: session.user_id.clone(), board_id: board_id.to_owned() });
    }
    Ok(board)
}

// =============================================================================
// BOARDS
// =============================================================================

/// Create (or overwrite) the caller's board.
///
/// # Errors
///
/// Returns `NotAuthenticated` without a session, `Remote` for store failures.
pub async fn create_user_board(
    store: &dyn DocumentStore,
    ctx: &SessionContext,
    name: &str,
) -> Result<Board, KanbanError> {
    let session = ctx.require()?;
    let board = Board {
        id: models::board_id_for_user(&session.user_id),
        name: name.to_owned(),
        user_id: session.user_id.clone(),
        created_at: OffsetDateTime::now_utc(),
    };
    store.set(&models::board_path(&board.id)?, board.to_data()?).await?;
    info!(board_id = %board.id, user_id = %board.user_id, "board created");
    Ok(board)
}

/// Create the caller's board and its default columns.
///
/// # Errors
///
/// Returns `NotAuthenticated` without a session, `Remote` for store failures.
pub async fn provision_user_board(
    store: &dyn DocumentStore,
    ctx: &SessionContext,
    name: &str,
) -> Result<Board, KanbanError> {
    let board = create_user_board(store, ctx, name).await?;
    for title in DEFAULT_COLUMNS {
        create_column(store, ctx, &board.id, title, None).await?;
    }
    Ok(board)
}

/// The caller's board.
///
/// # Errors
///
/// Returns `NotAuthenticated` without a session, `NotFound` if the board was
/// never provisioned.
pub async fn get_board(store: &dyn DocumentStore, ctx: &SessionContext) -> Result<Board, KanbanError> {
    let session = ctx.require()?;
    load_board(store, &models::board_id_for_user(&session.user_id)).await
}

/// A board by id, if the caller owns it.
///
/// # Errors
///
/// Returns `NotAuthenticated`, `NotFound` or `Unauthorized`.
pub async fn get_board_by_id(
    store: &dyn DocumentStore,
    ctx: &SessionContext,
    board_id: &str,
) -> Result<Board, KanbanError> {
    let session = ctx.require()?;
    ensure_board_owner(store, session, board_id).await
}

/// The caller's profile.
///
/// # Errors
///
/// Returns `NotAuthenticated` without a session, `NotFound` if the user
/// document is gone.
pub async fn get_current_user(store: &dyn DocumentStore, ctx: &SessionContext) -> Result<UserProfile, KanbanError> {
    let session = ctx.require()?;
    let doc = store
        .get(&models::user_path(&session.user_id)?)
        .await?
        .ok_or_else(|| KanbanError::not_found("user", &session.user_id))?;
    Ok(UserProfile::from_document(&doc)?)
}

// =============================================================================
// COLUMNS
// =============================================================================

/// Columns of a board in display order.
///
/// # Errors
///
/// Returns `NotAuthenticated`, `NotFound` or `Unauthorized`.
pub async fn list_columns(
    store: &dyn DocumentStore,
    ctx: &SessionContext,
    board_id: &str,
) -> Result<Vec<Column>, KanbanError> {
    let session = ctx.require()?;
    ensure_board_owner(store, session, board_id).await?;
    let docs = store
        .query(&models::columns_path(board_id)?, &Query::new().order_by(ORDER_FIELD, Direction::Asc))
        .await?;
    Ok(docs.iter().map(Column::from_document).collect::<Result<Vec<_>, _>>()?)
}

/// Append a column to a board, or place it at an explicit order.
///
/// # Errors
///
/// Returns `Validation` for an empty title, plus `NotAuthenticated`,
/// `NotFound` or `Unauthorized`. Nothing is written on error.
pub async fn create_column(
    store: &dyn DocumentStore,
    ctx: &SessionContext,
    board_id: &str,
    title: &str,
    order: Option<i64>,
) -> Result<Column, KanbanError> {
    let session = ctx.require()?;
    let title = title.trim();
    if title.is_empty() {
        return Err(KanbanError::validation("column title must not be empty"));
    }
    let board = ensure_board_owner(store, session, board_id).await?;
    let board_path = models::board_path(&board.id)?;

    let column = Column {
        id: String::new(),
        title: title.to_owned(),
        order: 0,
        board_id: board.id.clone(),
        user_id: session.user_id.clone(),
        created_at: OffsetDateTime::now_utc(),
    };

    let siblings = Siblings { parent: &board_path, parent_kind: "board", collection: COLUMNS };
    let appended = ordering::append(store, siblings, column.to_data()?, order).await?;
    info!(%board_id, column_id = appended.path.id(), order = appended.order, %title, "column created");

    Ok(Column::from_document(&Document { path: appended.path, data: appended.data })?)
}

// =============================================================================
// CARDS
// =============================================================================

/// Cards of a column in display order.
///
/// # Errors
///
/// Returns `NotAuthenticated`, `NotFound` or `Unauthorized`.
pub async fn list_cards(
    store: &dyn DocumentStore,
    ctx: &SessionContext,
    board_id: &str,
    column_id: &str,
) -> Result<Vec<Card>, KanbanError> {
    let session = ctx.require()?;
    ensure_board_owner(store, session, board_id).await?;
    if store.get(&models::column_path(board_id, column_id)?).await?.is_none() {
        return Err(KanbanError::not_found("column", column_id));
    }
    let docs = store
        .query(&models::cards_path(board_id, column_id)?, &Query::new().order_by(ORDER_FIELD, Direction::Asc))
        .await?;
    Ok(docs.iter().map(Card::from_document).collect::<Result<Vec<_>, _>>()?)
}

/// Append a card at the end of a column.
///
/// # Errors
///
/// Returns `NotAuthenticated`, `NotFound` (board or column) or
/// `Unauthorized`. Nothing is written on error.
pub async fn create_card(
    store: &dyn DocumentStore,
    ctx: &SessionContext,
    board_id: &str,
    column_id: &str,
    content: &str,
) -> Result<Card, KanbanError> {
    let session = ctx.require()?;
    ensure_board_owner(store, session, board_id).await?;
    let column_path = models::column_path(board_id, column_id)?;

    let card = Card { id: String::new(), content: content.to_owned(), order: 0, column_id: column_id.to_owned() };

    let siblings = Siblings { parent: &column_path, parent_kind: "column", collection: CARDS };
    let appended = ordering::append(store, siblings, card.to_data()?, None).await?;
    info!(%board_id, %column_id, card_id = appended.path.id(), order = appended.order, "card created");

    Ok(Card::from_document(&Document { path: appended.path, data: appended.data })?)
}

/// Move a card within or across columns of the caller's board.
///
/// # Errors
///
/// Returns `NotAuthenticated`, `Unauthorized`, `NotFound` (board, card or
/// target column), or `Remote` if the atomic write fails.
pub async fn move_card(store: &dyn DocumentStore, ctx: &SessionContext, mv: &CardMove) -> Result<Card, KanbanError> {
    let session = ctx.require()?;
    ensure_board_owner(store, session, &mv.board_id).await?;
    let doc = ordering::move_card(store, mv).await?;
    Ok(Card::from_document(&doc)?)
}

// =============================================================================
// STRUCTURE CHECK
// =============================================================================

/// Compare the caller's board against the default column layout.
///
/// Missing default columns are appended; existing ones with an unexpected
/// order are reported only.
///
/// # Errors
///
/// Returns `NotAuthenticated`, `NotFound` if the board does not exist, or
/// `Remote` for store failures.
pub async fn verify_board_structure(
    store: &dyn DocumentStore,
    ctx: &SessionContext,
) -> Result<Vec<ColumnCheck>, KanbanError> {
    let board = get_board(store, ctx).await?;
    let columns = models::columns_path(&board.id)?;

    let mut checks = Vec::with_capacity(DEFAULT_COLUMNS.len());
    for (expected, title) in (1_i64..).zip(DEFAULT_COLUMNS) {
        let query = Query::new().filter_eq("title", title).order_by(ORDER_FIELD, Direction::Asc).limit(1);
        let found = store.query(&columns, &query).await?;
        let status = match found.first().map(Column::from_document).transpose()? {
            Some(column) if column.order == expected => ColumnStatus::Ok { order: expected },
            Some(column) => {
                warn!(board_id = %board.id, %title, expected, found = column.order, "column order mismatch");
                ColumnStatus::OrderMismatch { expected, found: column.order }
            }
            None => {
                let created = create_column(store, ctx, &board.id, title, None).await?;
                ColumnStatus::Created { order: created.order }
            }
        };
        checks.push(ColumnCheck { title: title.to_owned(), status });
    }
    Ok(checks)
}

// =============================================================================
// SAMPLE CONTENT
// =============================================================================

/// Fill the caller's board with demo cards, plus a "Review" column holding
/// one more card. Cards whose column is missing are skipped. The extra
/// column is reused when it already exists.
///
/// # Errors
///
/// Returns `NotAuthenticated`, `NotFound` if the board does not exist, or
/// `Remote` for store failures.
pub async fn create_sample_content(store: &dyn DocumentStore, ctx: &SessionContext) -> Result<Vec<Card>, KanbanError> {
    let board = get_board(store, ctx).await?;
    let mut columns = list_columns(store, ctx, &board.id).await?;

    let mut created = Vec::with_capacity(SAMPLE_CARDS.len() + 1);
    for (content, title) in SAMPLE_CARDS {
        let Some(column) = columns.iter().find(|c| c.title == title) else {
            warn!(board_id = %board.id, %title, %content, "column missing; sample card skipped");
            continue;
        };
        created.push(create_card(store, ctx, &board.id, &column.id, content).await?);
    }

    let (title, content) = SAMPLE_COLUMN;
    let column_id = match columns.iter().position(|c| c.title == title) {
        Some(i) => columns.swap_remove(i).id,
        None => create_column(store, ctx, &board.id, title, None).await?.id,
    };
    created.push(create_card(store, ctx, &board.id, &column_id, content).await?);

    info!(board_id = %board.id, cards = created.len(), "sample content created");
    Ok(created)
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
