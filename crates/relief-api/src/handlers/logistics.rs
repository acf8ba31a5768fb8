//! Logistics stock endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/posts/{id}/items` | Add an item (optional opening stock) |
//! | `GET` | `/api/posts/{id}/items` | Items at a post |
//! | `GET` | `/api/items/{id}` | Single item |
//! | `DELETE` | `/api/items/{id}` | Delete item and log |
//! | `POST` | `/api/items/{id}/transactions` | Record IN/OUT |
//! | `GET` | `/api/items/{id}/transactions` | Paged log |
//! | `GET` | `/api/items/{id}/verify` | Replay log against balance |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use relief_core::{NewItem, StockMovement};
use relief_types::{ItemId, PostId, SortOrder};

use super::parse_id;
use crate::error::ApiError;
use crate::extract::{Body, Operator, Params};
use crate::state::AppState;

/// Query parameters for `GET /api/items/{id}/transactions`.
#[derive(Debug, serde::Deserialize)]
pub struct TransactionsQuery {
    /// Rows to skip (default 0).
    pub offset: Option<u64>,
    /// Page size (default and maximum from configuration).
    pub limit: Option<u32>,
    /// `OLDEST_FIRST` (default) or `NEWEST_FIRST`.
    pub order: Option<SortOrder>,
}

/// Add an item to a post.
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(input): Body<NewItem>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id: PostId = parse_id(&id)?;
    let item = state
        .relief
        .logistics
        .create_item(post_id, input, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Items at a post.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id: PostId = parse_id(&id)?;
    let items = state.relief.logistics.list_items(post_id).await?;
    Ok(Json(serde_json::json!({
        "count": items.len(),
        "items": items,
    })))
}

/// Single item.
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item_id: ItemId = parse_id(&id)?;
    Ok(Json(state.relief.logistics.get_item(item_id).await?))
}

/// Delete an item and its log.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item_id: ItemId = parse_id(&id)?;
    let deleted_transactions = state.relief.logistics.delete_item(item_id, &actor).await?;
    Ok(Json(serde_json::json!({
        "item_id": item_id,
        "deleted_transactions": deleted_transactions,
    })))
}

/// Record a stock movement.
pub async fn record_transaction(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(movement): Body<StockMovement>,
) -> Result<impl IntoResponse, ApiError> {
    let item_id: ItemId = parse_id(&id)?;
    let recorded = state
        .relief
        .logistics
        .record(item_id, movement, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

/// One page of an item's log.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Params(params): Params<TransactionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let item_id: ItemId = parse_id(&id)?;
    let ledger = &state.relief.logistics;
    let page = ledger.page(
        params.offset.unwrap_or(0),
        params.limit,
        params.order.unwrap_or_default(),
    );
    Ok(Json(ledger.list_transactions(item_id, &page).await?))
}

/// Replay the log against the stored balance.
pub async fn verify_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item_id: ItemId = parse_id(&id)?;
    Ok(Json(state.relief.logistics.verify_item(item_id).await?))
}
