//! Board REST routes: thin wrappers over the board service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::error::KanbanError;
use crate::models::{Board, Card, Column};
use crate::services::board::{self as board_svc, ColumnCheck};
use crate::services::ordering::CardMove;
use crate::services::session::SessionContext;
use crate::state::AppState;
use crate::store::Data;

#[derive(Debug, Deserialize)]
pub struct CreateColumnBody {
    pub title: String,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCardBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardBody {
    pub from_column_id: String,
    pub to_column_id: String,
    pub order: i64,
    #[serde(default)]
    pub patch: Option<Data>,
}

/// `GET /api/board`: the caller's board.
pub async fn get_board(State(state): State<AppState>, ctx: SessionContext) -> Result<Json<Board>, KanbanError> {
    Ok(Json(board_svc::get_board(state.store.as_ref(), &ctx).await?))
}

/// `GET /api/board/{board_id}`: a board the caller owns.
pub async fn get_board_by_id(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(board_id): Path<String>,
) -> Result<Json<Board>, KanbanError> {
    Ok(Json(board_svc::get_board_by_id(state.store.as_ref(), &ctx, &board_id).await?))
}

/// `GET /api/board/structure`: default column check for the caller's board.
pub async fn verify_structure(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<Vec<ColumnCheck>>, KanbanError> {
    Ok(Json(board_svc::verify_board_structure(state.store.as_ref(), &ctx).await?))
}

pub async fn list_columns(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(board_id): Path<String>,
) -> Result<Json<Vec<Column>>, KanbanError> {
    Ok(Json(board_svc::list_columns(state.store.as_ref(), &ctx, &board_id).await?))
}

pub async fn create_column(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(board_id): Path<String>,
    Json(body): Json<CreateColumnBody>,
) -> Result<(StatusCode, Json<Column>), KanbanError> {
    let column = board_svc::create_column(state.store.as_ref(), &ctx, &board_id, &body.title, body.order).await?;
    Ok((StatusCode::CREATED, Json(column)))
}

pub async fn list_cards(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path((board_id, column_id)): Path<(String, String)>,
) -> Result<Json<Vec<Card>>, KanbanError> {
    Ok(Json(board_svc::list_cards(state.store.as_ref(), &ctx, &board_id, &column_id).await?))
}

pub async fn create_card(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path((board_id, column_id)): Path<(String, String)>,
    Json(body): Json<CreateCardBody>,
) -> Result<(StatusCode, Json<Card>), KanbanError> {
    let card = board_svc::create_card(state.store.as_ref(), &ctx, &board_id, &column_id, &body.content).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// `POST /api/board/{board_id}/cards/{card_id}/move`
pub async fn move_card(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path((board_id, card_id)): Path<(String, String)>,
    Json(body): Json<MoveCardBody>,
) -> Result<Json<Card>, KanbanError> {
    let mv = CardMove {
        board_id,
        old_column_id: body.from_column_id,
        new_column_id: body.to_column_id,
        new_order: body.order,
        card_id,
        patch: body.patch.unwrap_or_default(),
    };
    Ok(Json(board_svc::move_card(state.store.as_ref(), &ctx, &mv).await?))
}

#[cfg(test)]
#[path = "boards_test.rs"]
mod tests;
