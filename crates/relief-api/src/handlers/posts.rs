//! Relief post endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/events/{id}/posts` | Open a post |
//! | `GET` | `/api/events/{id}/posts` | Posts of an event |
//! | `GET` | `/api/posts/{id}` | Single post |
//! | `PATCH` | `/api/posts/{id}` | Partial update |
//! | `DELETE` | `/api/posts/{id}` | Delete with cascade |
//! | `GET` | `/api/posts/{id}/occupancy` | Capacity against occupancy |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use relief_core::NewPost;
use relief_types::{EventId, PostId, PostUpdate};

use super::parse_id;
use crate::error::ApiError;
use crate::extract::{Body, Operator};
use crate::state::AppState;

/// Open a post under an event.
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(input): Body<NewPost>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let post = state.relief.posts.create(event_id, input, &actor).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Posts serving an event.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let posts = state.relief.posts.list(event_id).await?;
    Ok(Json(serde_json::json!({
        "count": posts.len(),
        "posts": posts,
    })))
}

/// Single post.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id: PostId = parse_id(&id)?;
    Ok(Json(state.relief.posts.get(post_id).await?))
}

/// Partially update a post.
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
    Body(update): Body<PostUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id: PostId = parse_id(&id)?;
    Ok(Json(state.relief.posts.update(post_id, &update, &actor).await?))
}

/// Delete a post, detaching residents and removing its stock.
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Operator(actor): Operator,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id: PostId = parse_id(&id)?;
    Ok(Json(state.relief.posts.delete(post_id, &actor).await?))
}

/// Capacity against occupancy.
pub async fn occupancy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id: PostId = parse_id(&id)?;
    Ok(Json(state.relief.posts.occupancy_summary(post_id).await?))
}
