//! Error taxonomy for the relief services.
//!
//! Every operation returns a typed [`ReliefError`]. Data-layer outcomes
//! that carry domain meaning (a second active event, a resolved parent,
//! a refused stock movement) are translated into their domain kind; only
//! genuine storage failures stay wrapped as [`ReliefError::Storage`].

use relief_db::DbError;
use relief_ledger::LedgerError;
use relief_types::ItemId;

use crate::registry::RegistryError;

/// Errors returned by the relief services.
#[derive(Debug, thiserror::Error)]
pub enum ReliefError {
    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation conflicts with existing state (e.g. an active event).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// An OUT movement exceeded the available stock.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// The item.
        item_id: ItemId,
        /// Balance when the movement was refused.
        available: i64,
        /// Quantity requested out.
        requested: i64,
    },

    /// The record is in a state that does not allow the operation.
    #[error("invalid state: {0}")]
    State(String),

    /// The civil registry could not be reached or answered badly.
    #[error("civil registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The data layer failed.
    #[error("storage error: {0}")]
    Storage(DbError),
}

impl ReliefError {
    /// Shorthand for [`ReliefError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable kind, used on the wire.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::State(_) => "STATE",
            Self::Registry(_) => "REGISTRY",
            Self::Storage(_) => "STORAGE",
        }
    }
}

impl From<LedgerError> for ReliefError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                item_id,
                available,
                requested,
            } => Self::InsufficientStock {
                item_id,
                available,
                requested,
            },
            LedgerError::NonPositiveQuantity { .. }
            | LedgerError::NegativeOpeningStock { .. }
            | LedgerError::MissingField(_)
            | LedgerError::Overflow { .. } => Self::Validation(err.to_string()),
            LedgerError::ItemMismatch { .. } => Self::State(err.to_string()),
        }
    }
}

impl From<DbError> for ReliefError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Ledger(ledger) => Self::from(ledger),
            DbError::NotFound { entity, id } => Self::not_found(entity, id),
            DbError::ActiveEventExists => {
                Self::Conflict(String::from("an active event already exists"))
            }
            DbError::EventNotActive { .. } | DbError::ResidentLinked { .. } => {
                Self::State(err.to_string())
            }
            DbError::PostNotInEvent { .. } => Self::Validation(err.to_string()),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_types::EventId;

    #[test]
    fn ledger_refusal_maps_to_insufficient_stock() {
        let item_id = ItemId::new();
        let err = ReliefError::from(DbError::Ledger(LedgerError::InsufficientStock {
            item_id,
            available: 70,
            requested: 90,
        }));
        assert!(matches!(
            err,
            ReliefError::InsufficientStock {
                available: 70,
                requested: 90,
                ..
            }
        ));
        assert_eq!(err.kind(), "INSUFFICIENT_STOCK");
    }

    #[test]
    fn store_outcomes_map_to_domain_kinds() {
        assert_eq!(ReliefError::from(DbError::ActiveEventExists).kind(), "CONFLICT");
        let inactive = DbError::EventNotActive {
            event_id: EventId::new(),
        };
        assert_eq!(ReliefError::from(inactive).kind(), "STATE");
        assert_eq!(
            ReliefError::from(DbError::Decode(String::from("bad"))).kind(),
            "STORAGE"
        );
    }
}
