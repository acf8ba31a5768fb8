//! Append-only stock ledger for post-scoped logistics items.
//!
//! Every unit of relief stock at a post is accounted for through this
//! ledger. Stock is never created from nothing and never disappears: each
//! change is a [`LogisticsTransaction`] appended to the item's log, and the
//! item's materialized balance moves in the same step.
//!
//! # Architecture
//!
//! - [`transaction`] -- The [`TransactionBuilder`] for validated entry construction.
//! - [`ledger`] -- The [`ItemLedger`]: one item's log plus its balance, and
//!   [`next_balance`], the single balance-transition rule shared with the
//!   `PostgreSQL` store.
//! - [`conservation`] -- Replay of a log and comparison with a
//!   materialized balance.
//!
//! # Balance Law
//!
//! For every item I at every instant:
//!
//! ```text
//! current_stock(I) == sum(IN quantities for I) - sum(OUT quantities for I)
//! current_stock(I) >= 0
//! ```
//!
//! An OUT movement larger than the balance is rejected with
//! [`LedgerError::InsufficientStock`] and leaves the balance untouched.
//! The ledger never panics; it returns errors.
//!
//! # Usage
//!
//! ```
//! use relief_ledger::{ItemLedger, TransactionBuilder, opening_transaction};
//! use relief_types::{Actor, Direction, ItemId};
//!
//! let item = ItemId::new();
//! let operator = Actor::new("op-7");
//! let mut ledger = opening_transaction(item, 50, &operator)
//!     .and_then(|opening| ItemLedger::with_opening(item, opening))
//!     .ok();
//!
//! if let Some(ledger) = ledger.as_mut() {
//!     let restock = TransactionBuilder::new(item, Direction::In)
//!         .quantity(20)
//!         .recorded_by(operator.clone())
//!         .build();
//!     if let Ok(tx) = restock {
//!         ledger.record(tx).ok();
//!     }
//!     assert_eq!(ledger.current_stock(), 70);
//! }
//! ```
//!
//! [`LogisticsTransaction`]: relief_types::LogisticsTransaction

pub mod conservation;
pub mod ledger;
pub mod transaction;

// Re-export primary types at crate root.
pub use conservation::verify_balance;
pub use ledger::{ItemLedger, next_balance, opening_transaction};
pub use transaction::TransactionBuilder;

use relief_types::{ItemId, TransactionId};

/// Note attached to the opening IN transaction of an item created with
/// a non-zero stock.
pub const OPENING_STOCK_NOTE: &str = "opening stock";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording stock movements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Quantity must be strictly positive.
    #[error("transaction quantity must be positive, got {quantity}")]
    NonPositiveQuantity {
        /// The invalid quantity.
        quantity: i64,
    },

    /// Opening stock must not be negative.
    #[error("opening stock must not be negative, got {stock}")]
    NegativeOpeningStock {
        /// The invalid opening stock.
        stock: i64,
    },

    /// An OUT movement exceeded the available balance.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// The item.
        item_id: ItemId,
        /// Balance at the time of the request.
        available: i64,
        /// Quantity requested out.
        requested: i64,
    },

    /// A transaction was offered to the ledger of a different item.
    #[error("transaction {transaction_id} belongs to item {actual}, not {expected}")]
    ItemMismatch {
        /// The offending transaction.
        transaction_id: TransactionId,
        /// The ledger's item.
        expected: ItemId,
        /// The transaction's item.
        actual: ItemId,
    },

    /// The balance would leave the representable range.
    #[error("stock balance overflow for item {item_id}")]
    Overflow {
        /// The item.
        item_id: ItemId,
    },

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
