//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] and ledger errors and carries the typed outcomes the stores
//! detect atomically (a second active event, a resolved parent event,
//! a missing row).

use relief_ledger::LedgerError;
use relief_types::{EventId, PostId, ResidentId};
use uuid::Uuid;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stock movement was refused by the ledger.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (`"event"`, `"post"`, ...).
        entity: &'static str,
        /// The missing identifier.
        id: Uuid,
    },

    /// Another event already occupies the active slot.
    #[error("an active event already exists")]
    ActiveEventExists,

    /// The operation requires an active event but the event is resolved.
    #[error("event {event_id} is not active")]
    EventNotActive {
        /// The resolved event.
        event_id: EventId,
    },

    /// The resident's location is mirrored from a post and cannot be
    /// edited directly.
    #[error("resident {resident_id} is linked to a post")]
    ResidentLinked {
        /// The linked resident.
        resident_id: ResidentId,
    },

    /// A resident was pointed at a post serving another event.
    #[error("post {post_id} does not serve event {event_id}")]
    PostNotInEvent {
        /// The referenced post.
        post_id: PostId,
        /// The resident's event.
        event_id: EventId,
    },

    /// A stored value could not be mapped back to a domain type.
    #[error("decode error: {0}")]
    Decode(String),

    /// A domain value does not fit its column.
    #[error("{column} out of range: {detail}")]
    OutOfRange {
        /// Column being written.
        column: &'static str,
        /// The rejected value and the conversion failure.
        detail: String,
    },

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Shorthand for [`DbError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Whether a `sqlx` error is a unique violation on the named constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    err.as_database_error().is_some_and(|db| {
        db.is_unique_violation() && db.constraint() == Some(constraint)
    })
}

/// Whether a `sqlx` error is a foreign-key violation.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}
