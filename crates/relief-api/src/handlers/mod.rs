//! REST API endpoint handlers, one module per component.
//!
//! Mutating endpoints read the operator from the `x-operator-id` header.
//! Path identifiers are parsed here so that a malformed UUID is a 400 with
//! the standard error body.

pub mod damage;
pub mod events;
pub mod logistics;
pub mod posts;
pub mod residents;

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /health` -- liveness plus the storage backend in use.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "storage": state.relief.store().backend_name(),
    }))
}

/// Parse a typed identifier from a path segment.
pub(crate) fn parse_id<T: From<Uuid>>(s: &str) -> Result<T, ApiError> {
    s.parse::<Uuid>()
        .map(T::from)
        .map_err(|e| ApiError::InvalidUuid(format!("{s}: {e}")))
}
