//! Affected resident endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/events/{id}/residents/registry` | Register by national ID (201 new, 200 updated) |
//! | `POST` | `/api/events/{id}/residents/registry/bulk` | Register many; per-ID outcomes |
//! | `POST` | `/api/events/{id}/residents/manual` | Register by hand |
//! | `GET` | `/api/events/{id}/residents` | Filtered listing |
//! | `GET` | `/api/events/{id}/residents/counts` | Counts per condition |
//! | `GET` | `/api/residents/{id}` | Single resident |
//! | `DELETE` | `/api/residents/{id}` | Hard delete |
//! | `PUT` | `/api/residents/{id}/condition` | Change condition and post link |
//! | `PUT` | `/api/residents/{id}/location` | Set location text |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use relief_core::{BulkRegistryEntry, ManualEntry, RegistryEntry};
use relief_types::{EventId, PostId, ResidentCondition, ResidentFilter, ResidentId};
use uuid::Uuid;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::{Body, Operator, Params};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/events/{id}/residents`.
#[derive(Debug, serde::Deserialize)]
pub struct ResidentsQuery {
    /// Only residents in this condition.
    pub condition: Option<ResidentCondition>,
    /// Only residents sheltered at this post.
    pub posko_id: Option<Uuid>,
    /// Only records changed at or after this RFC 3339 instant.
    pub updated_since: Option<DateTime<Utc>>,
}

/// Request body for `PUT /api/residents/{id}/condition`.
#[derive(Debug, serde::Deserialize)]
pub struct ConditionRequest {
    /// New condition.
    pub condition: ResidentCondition,
    /// Shelter post; ignored unless the condition occupies a shelter.
    #[serde(default)]
    pub posko_id: Option<PostId>,
}

/// Request body for `PUT /api/residents/{id}/location`.
#[derive(Debug, serde::Deserialize)]
pub struct LocationRequest {
    /// Free-text location.
    pub location: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Register (or re-register) a registry-linked resident.
pub async fn register_from_registry(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(entry): Body<RegistryEntry>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let registered = state
        .relief
        .residents
        .register_from_registry(event_id, entry, &actor)
        .await?;
    let status = if registered.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(registered)))
}

/// Register many registry-linked residents. Always 200; each entry of
/// `results` reports its own outcome, in request order.
pub async fn bulk_register(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(entry): Body<BulkRegistryEntry>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let external_ids = entry.external_ids.clone();
    let outcomes = state
        .relief
        .residents
        .bulk_register_from_registry(event_id, entry, &actor)
        .await;

    let mut failed = 0_usize;
    let results: Vec<serde_json::Value> = external_ids
        .iter()
        .zip(outcomes)
        .map(|(external_id, outcome)| match outcome {
            Ok(registered) => serde_json::json!({
                "external_id": external_id,
                "ok": true,
                "created": registered.created,
                "resident": registered.resident,
            }),
            Err(err) => {
                failed = failed.saturating_add(1);
                let err = ApiError::from(err);
                serde_json::json!({
                    "external_id": external_id,
                    "ok": false,
                    "error": err.to_string(),
                    "kind": err.kind(),
                })
            }
        })
        .collect();

    Ok(Json(serde_json::json!({
        "count": results.len(),
        "failed": failed,
        "results": results,
    })))
}

/// Register a resident by hand.
pub async fn register_manual(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(entry): Body<ManualEntry>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let resident = state
        .relief
        .residents
        .register_manual(event_id, entry, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(resident)))
}

/// Residents of an event.
///
/// # Query Parameters
///
/// - `condition`: e.g. `DISPLACED`
/// - `posko_id`: post UUID
/// - `updated_since`: RFC 3339 timestamp, for pollers
pub async fn list_residents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Params(params): Params<ResidentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let filter = ResidentFilter {
        condition: params.condition,
        posko_id: params.posko_id.map(PostId::from),
        updated_since: params.updated_since,
    };
    let residents = state.relief.residents.list(event_id, &filter).await?;
    Ok(Json(serde_json::json!({
        "count": residents.len(),
        "residents": residents,
    })))
}

/// Counts per condition.
pub async fn condition_counts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    Ok(Json(
        state.relief.residents.counts_by_condition(event_id).await?,
    ))
}

/// Single resident.
pub async fn get_resident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let resident_id: ResidentId = parse_id(&id)?;
    Ok(Json(state.relief.residents.get(resident_id).await?))
}

/// Hard-delete a resident.
pub async fn delete_resident(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let resident_id: ResidentId = parse_id(&id)?;
    state.relief.residents.delete(resident_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change condition and post link.
pub async fn update_condition(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(request): Body<ConditionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resident_id: ResidentId = parse_id(&id)?;
    let resident = state
        .relief
        .residents
        .update_condition(resident_id, request.condition, request.posko_id, &actor)
        .await?;
    Ok(Json(resident))
}

/// Set the location of an unsheltered resident.
pub async fn update_location(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(request): Body<LocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resident_id: ResidentId = parse_id(&id)?;
    let resident = state
        .relief
        .residents
        .update_location(resident_id, &request.location, &actor)
        .await?;
    Ok(Json(resident))
}
