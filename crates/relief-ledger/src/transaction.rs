//! Transaction builder and validation for the stock ledger.
//!
//! Provides a [`TransactionBuilder`] that checks a movement before it can
//! reach any ledger: the quantity is strictly positive and the recording
//! operator is known. Balance checks happen later, against the live
//! balance, in [`next_balance`](crate::next_balance).

use chrono::Utc;

use relief_types::{Actor, Direction, ItemId, LogisticsTransaction, TransactionId};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Transaction builder
// ---------------------------------------------------------------------------

/// Builder for constructing validated [`LogisticsTransaction`] values.
///
/// # Examples
///
/// ```
/// use relief_ledger::TransactionBuilder;
/// use relief_types::{Actor, Direction, ItemId};
///
/// let tx = TransactionBuilder::new(ItemId::new(), Direction::Out)
///     .quantity(12)
///     .note("family kits, RT 04")
///     .recorded_by(Actor::new("op-2"))
///     .build();
///
/// assert!(tx.is_ok());
/// ```
#[derive(Debug)]
pub struct TransactionBuilder {
    item_id: ItemId,
    direction: Direction,
    quantity: Option<i64>,
    note: Option<String>,
    recorded_by: Option<Actor>,
}

impl TransactionBuilder {
    /// Start building a movement of the given item in the given direction.
    pub const fn new(item_id: ItemId, direction: Direction) -> Self {
        Self {
            item_id,
            direction,
            quantity: None,
            note: None,
            recorded_by: None,
        }
    }

    /// Set the number of units moved.
    #[must_use]
    pub const fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Attach a free-text note. Blank notes are dropped.
    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = (!note.trim().is_empty()).then_some(note);
        self
    }

    /// Attach an optional note.
    #[must_use]
    pub fn maybe_note(self, note: Option<String>) -> Self {
        match note {
            Some(note) => self.note(note),
            None => self,
        }
    }

    /// Set the operator recording the movement.
    #[must_use]
    pub fn recorded_by(mut self, actor: Actor) -> Self {
        self.recorded_by = Some(actor);
        self
    }

    /// Validate inputs and produce a [`LogisticsTransaction`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] if quantity or operator is unset.
    /// Returns [`LedgerError::NonPositiveQuantity`] if the quantity is zero
    /// or negative.
    pub fn build(self) -> Result<LogisticsTransaction, LedgerError> {
        let quantity = self.quantity.ok_or(LedgerError::MissingField("quantity"))?;
        let recorded_by = self
            .recorded_by
            .ok_or(LedgerError::MissingField("recorded_by"))?;

        if quantity <= 0 {
            return Err(LedgerError::NonPositiveQuantity { quantity });
        }

        Ok(LogisticsTransaction {
            id: TransactionId::new(),
            item_id: self.item_id,
            direction: self.direction,
            quantity,
            timestamp: Utc::now(),
            note: self.note,
            recorded_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(quantity: i64) -> TransactionBuilder {
        TransactionBuilder::new(ItemId::new(), Direction::In)
            .quantity(quantity)
            .recorded_by(Actor::new("op-1"))
    }

    #[test]
    fn valid_transaction_builds() {
        let tx = builder(5).note("donation").build();
        assert!(tx.is_ok());
        let tx = tx.ok();
        assert_eq!(tx.as_ref().map(|t| t.quantity), Some(5));
        assert_eq!(
            tx.as_ref().and_then(|t| t.note.clone()),
            Some(String::from("donation"))
        );
    }

    #[test]
    fn zero_quantity_rejected() {
        assert_eq!(
            builder(0).build().err(),
            Some(LedgerError::NonPositiveQuantity { quantity: 0 })
        );
    }

    #[test]
    fn negative_quantity_rejected() {
        assert_eq!(
            builder(-3).build().err(),
            Some(LedgerError::NonPositiveQuantity { quantity: -3 })
        );
    }

    #[test]
    fn missing_operator_rejected() {
        let result = TransactionBuilder::new(ItemId::new(), Direction::Out)
            .quantity(1)
            .build();
        assert_eq!(result.err(), Some(LedgerError::MissingField("recorded_by")));
    }

    #[test]
    fn blank_note_is_dropped() {
        let tx = builder(1).note("   ").build().ok();
        assert_eq!(tx.and_then(|t| t.note), None);
    }
}
