//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every record in the relief core has a strongly-typed ID so that an
//! event ID can never be passed where a post ID is expected. All IDs use
//! UUID v7 (time-ordered) so that sorting by ID follows creation order,
//! which the transaction log relies on for stable pagination.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a declared disaster event.
    EventId
}

define_id! {
    /// Unique identifier for a relief post (posko / shelter).
    PostId
}

define_id! {
    /// Unique identifier for an affected resident record.
    ResidentId
}

define_id! {
    /// Unique identifier for a damage report.
    ReportId
}

define_id! {
    /// Unique identifier for a post-scoped logistics item.
    ItemId
}

define_id! {
    /// Unique identifier for a stock transaction in the logistics ledger.
    TransactionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_time_ordered() {
        let first = TransactionId::new();
        let second = TransactionId::new();
        assert!(first <= second);
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = PostId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = EventId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", id.into_inner()));
    }
}
