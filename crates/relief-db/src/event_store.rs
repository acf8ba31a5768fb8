//! Persistence for disaster events.
//!
//! The single-active-event rule is enforced by the partial unique index
//! `disaster_events_single_active`; a second active insert surfaces as
//! [`DbError::ActiveEventExists`] rather than being pre-checked.

use chrono::{DateTime, Utc};
use relief_types::{Actor, DisasterEvent, EventId, EventStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::codec::{event_status_from_db, event_status_to_db};
use crate::error::{DbError, is_unique_violation};

/// Name of the partial unique index guarding the active slot.
const ACTIVE_SLOT_INDEX: &str = "disaster_events_single_active";

const EVENT_COLUMNS: &str = "id, title, description, status, location, start_date, end_date, declared_by, resolved_by";

/// Operations on the `disaster_events` table.
pub struct EventStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventStore<'a> {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a newly declared event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ActiveEventExists`] if another event is active,
    /// or [`DbError::Postgres`] if the insert fails otherwise.
    pub async fn insert(&self, event: &DisasterEvent) -> Result<(), DbError> {
        let result = sqlx::query(
            r"INSERT INTO disaster_events (id, title, description, status, location, start_date, end_date, declared_by, resolved_by)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(event.id.into_inner())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event_status_to_db(event.status))
        .bind(&event.location)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.declared_by.as_str())
        .bind(event.resolved_by.as_ref().map(Actor::as_str))
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err, ACTIVE_SLOT_INDEX) => {
                Err(DbError::ActiveEventExists)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve an active event in a single conditional update.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown event and
    /// [`DbError::EventNotActive`] if it is already resolved.
    pub async fn resolve(
        &self,
        event_id: EventId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<DisasterEvent, DbError> {
        let sql = format!(
            "UPDATE disaster_events SET status = $2, end_date = $3, resolved_by = $4 \
             WHERE id = $1 AND status = $5 RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event_id.into_inner())
            .bind(event_status_to_db(EventStatus::Resolved))
            .bind(at)
            .bind(actor.as_str())
            .bind(event_status_to_db(EventStatus::Active))
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => row.into_domain(),
            None if self.get(event_id).await?.is_some() => {
                Err(DbError::EventNotActive { event_id })
            }
            None => Err(DbError::not_found("event", event_id)),
        }
    }

    /// The currently active event, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn active(&self) -> Result<Option<DisasterEvent>, DbError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM disaster_events WHERE status = $1");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(event_status_to_db(EventStatus::Active))
            .fetch_optional(self.pool)
            .await?
            .map(EventRow::into_domain)
            .transpose()
    }

    /// Look up an event by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, event_id: EventId) -> Result<Option<DisasterEvent>, DbError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM disaster_events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(event_id.into_inner())
            .fetch_optional(self.pool)
            .await?
            .map(EventRow::into_domain)
            .transpose()
    }

    /// All events, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<DisasterEvent>, DbError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM disaster_events ORDER BY start_date DESC, id DESC"
        );
        sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(EventRow::into_domain)
            .collect()
    }
}

/// A row from the `disaster_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: String,
    status: String,
    location: String,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    declared_by: String,
    resolved_by: Option<String>,
}

impl EventRow {
    fn into_domain(self) -> Result<DisasterEvent, DbError> {
        Ok(DisasterEvent {
            id: EventId::from(self.id),
            title: self.title,
            description: self.description,
            status: event_status_from_db(&self.status)?,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            declared_by: Actor(self.declared_by),
            resolved_by: self.resolved_by.map(Actor),
        })
    }
}
