//! Damage report endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/events/{id}/damage-reports` | File a report |
//! | `GET` | `/api/events/{id}/damage-reports` | Reports of an event |
//! | `GET` | `/api/events/{id}/damage-reports/severity` | Counts per severity |
//! | `GET` | `/api/damage-reports/{id}` | Single report |
//! | `PUT` | `/api/damage-reports/{id}/status` | Set status |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use relief_core::NewReport;
use relief_types::{EventId, ReportId, ReportStatus};

use super::parse_id;
use crate::error::ApiError;
use crate::extract::{Body, Operator};
use crate::state::AppState;

/// Request body for `PUT /api/damage-reports/{id}/status`.
#[derive(Debug, serde::Deserialize)]
pub struct StatusRequest {
    /// New status.
    pub status: ReportStatus,
}

/// File a damage report.
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(input): Body<NewReport>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let report = state.relief.damage.create(event_id, input, &actor).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Reports of an event.
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let reports = state.relief.damage.list(event_id).await?;
    Ok(Json(serde_json::json!({
        "count": reports.len(),
        "reports": reports,
    })))
}

/// Counts per severity.
pub async fn severity_counts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    Ok(Json(state.relief.damage.counts_by_severity(event_id).await?))
}

/// Single report.
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report_id: ReportId = parse_id(&id)?;
    Ok(Json(state.relief.damage.get(report_id).await?))
}

/// Set a report's status.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(request): Body<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report_id: ReportId = parse_id(&id)?;
    let report = state
        .relief
        .damage
        .update_status(report_id, request.status, &actor)
        .await?;
    Ok(Json(report))
}
