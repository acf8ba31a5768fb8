//! Row locks shared by the `PostgreSQL` stores.
//!
//! Writes that depend on a parent event being active take a `FOR SHARE`
//! lock on the event row. Resolving an event updates that row, so the
//! status check and the dependent insert cannot interleave with a
//! resolution.

use relief_types::{EventId, EventStatus, PostId};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::codec::event_status_from_db;
use crate::error::DbError;

/// Lock an event row and require it to be active.
pub(crate) async fn lock_active_event(
    conn: &mut PgConnection,
    event_id: EventId,
) -> Result<(), DbError> {
    let status: Option<String> =
        sqlx::query_scalar(r"SELECT status FROM disaster_events WHERE id = $1 FOR SHARE")
            .bind(event_id.into_inner())
            .fetch_optional(&mut *conn)
            .await?;

    let status = status.ok_or_else(|| DbError::not_found("event", event_id))?;
    if event_status_from_db(&status)? == EventStatus::Active {
        Ok(())
    } else {
        tracing::debug!(event_id = %event_id, status = %status, "Write refused on inactive event");
        Err(DbError::EventNotActive { event_id })
    }
}

/// Lock an optional post row and require it to serve `event_id`.
pub(crate) async fn lock_post_for_event(
    conn: &mut PgConnection,
    posko_id: Option<PostId>,
    event_id: EventId,
) -> Result<(), DbError> {
    let Some(post_id) = posko_id else {
        return Ok(());
    };
    let owner: Option<Uuid> =
        sqlx::query_scalar(r"SELECT event_id FROM relief_posts WHERE id = $1 FOR SHARE")
            .bind(post_id.into_inner())
            .fetch_optional(&mut *conn)
            .await?;

    match owner {
        None => Err(DbError::not_found("post", post_id)),
        Some(owner) if owner == event_id.into_inner() => Ok(()),
        Some(_) => Err(DbError::PostNotInEvent { post_id, event_id }),
    }
}
