//! Disaster event endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/events` | Declare an event |
//! | `GET` | `/api/events` | All events, newest first |
//! | `GET` | `/api/events/active` | The active event (404 when none) |
//! | `GET` | `/api/events/{id}` | Single event |
//! | `POST` | `/api/events/{id}/resolve` | Resolve an event |
//! | `GET` | `/api/events/{id}/dashboard` | Event dashboard |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use relief_core::{NewEvent, ReliefError};
use relief_types::EventId;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::{Body, Operator};
use crate::state::AppState;

/// Declare a new event.
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Body(input): Body<NewEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.relief.events.create(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List every event.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.relief.events.list().await?;
    Ok(Json(serde_json::json!({
        "count": events.len(),
        "events": events,
    })))
}

/// The active event.
pub async fn active_event(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.relief.events.active().await?.ok_or_else(|| {
        ApiError::from(ReliefError::NotFound {
            entity: "active event",
            id: String::from("-"),
        })
    })?;
    Ok(Json(event))
}

/// Single event.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    Ok(Json(state.relief.events.get(event_id).await?))
}

/// Resolve an event.
pub async fn resolve_event(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    Ok(Json(state.relief.events.resolve(event_id, &actor).await?))
}

/// Aggregated dashboard.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    Ok(Json(state.relief.events.dashboard(event_id).await?))
}
