//! Per-item stock ledger: an append-only log plus its materialized balance.
//!
//! The [`ItemLedger`] struct is the in-memory representation of one item's
//! stock history. It holds every [`LogisticsTransaction`] recorded for the
//! item and the running balance derived from them.
//!
//! # Design
//!
//! - **Append-only**: entries are never modified or deleted individually.
//! - **Atomic**: an entry is appended only when its balance transition
//!   succeeds, and the balance moves only when an entry is appended.
//! - **Non-negative**: an OUT movement larger than the balance is refused.
//! - **Integer**: all quantities are whole units; arithmetic is checked.

use relief_types::{
    Actor, BalanceCheck, Direction, ItemId, LogisticsTransaction, Page, SortOrder,
    TransactionPage,
};

use crate::conservation::verify_balance;
use crate::{LedgerError, OPENING_STOCK_NOTE, TransactionBuilder};

// ---------------------------------------------------------------------------
// Balance transition
// ---------------------------------------------------------------------------

/// Compute the balance after moving `quantity` units in `direction`.
///
/// This is the only balance-transition rule in the system. The in-memory
/// ledger and the `PostgreSQL` store both call it while holding the item's
/// lock, so both backends refuse exactly the same movements.
///
/// # Errors
///
/// Returns [`LedgerError::NonPositiveQuantity`] if `quantity <= 0`.
/// Returns [`LedgerError::InsufficientStock`] if an OUT movement exceeds
/// `current`.
/// Returns [`LedgerError::Overflow`] if an IN movement overflows.
pub fn next_balance(
    item_id: ItemId,
    current: i64,
    direction: Direction,
    quantity: i64,
) -> Result<i64, LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::NonPositiveQuantity { quantity });
    }

    match direction {
        Direction::In => current
            .checked_add(quantity)
            .ok_or(LedgerError::Overflow { item_id }),
        Direction::Out => {
            if quantity > current {
                return Err(LedgerError::InsufficientStock {
                    item_id,
                    available: current,
                    requested: quantity,
                });
            }
            current
                .checked_sub(quantity)
                .ok_or(LedgerError::Overflow { item_id })
        }
    }
}

/// Build the opening IN transaction for an item created with stock.
///
/// Returns `None` for a zero opening stock so that empty items start with
/// an empty log.
///
/// # Errors
///
/// Returns [`LedgerError::NegativeOpeningStock`] if `initial_stock < 0`.
pub fn opening_transaction(
    item_id: ItemId,
    initial_stock: i64,
    actor: &Actor,
) -> Result<Option<LogisticsTransaction>, LedgerError> {
    if initial_stock < 0 {
        return Err(LedgerError::NegativeOpeningStock {
            stock: initial_stock,
        });
    }
    if initial_stock == 0 {
        return Ok(None);
    }

    TransactionBuilder::new(item_id, Direction::In)
        .quantity(initial_stock)
        .note(OPENING_STOCK_NOTE)
        .recorded_by(actor.clone())
        .build()
        .map(Some)
}

// ---------------------------------------------------------------------------
// ItemLedger
// ---------------------------------------------------------------------------

/// Stock history and balance of a single logistics item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLedger {
    item_id: ItemId,
    current_stock: i64,
    /// All entries, in append order.
    entries: Vec<LogisticsTransaction>,
}

impl ItemLedger {
    /// Create an empty ledger with a zero balance.
    pub const fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            current_stock: 0,
            entries: Vec::new(),
        }
    }

    /// Create a ledger whose first entry, if any, is the opening stock
    /// built by [`opening_transaction`].
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::record`] for the opening entry.
    pub fn with_opening(
        item_id: ItemId,
        opening: Option<LogisticsTransaction>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(item_id);
        if let Some(tx) = opening {
            ledger.record(tx)?;
        }
        Ok(ledger)
    }

    /// The materialized balance.
    pub const fn current_stock(&self) -> i64 {
        self.current_stock
    }

    /// Number of recorded entries.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[LogisticsTransaction] {
        &self.entries
    }

    /// Append a movement and update the balance as one step.
    ///
    /// On error nothing changes: the entry is not appended and the balance
    /// is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ItemMismatch`] if the transaction belongs to
    /// another item, or any error from [`next_balance`].
    pub fn record(
        &mut self,
        tx: LogisticsTransaction,
    ) -> Result<&LogisticsTransaction, LedgerError> {
        if tx.item_id != self.item_id {
            return Err(LedgerError::ItemMismatch {
                transaction_id: tx.id,
                expected: self.item_id,
                actual: tx.item_id,
            });
        }

        let balance = next_balance(self.item_id, self.current_stock, tx.direction, tx.quantity)?;
        self.entries.push(tx);
        self.current_stock = balance;

        tracing::trace!(item_id = %self.item_id, balance, "Stock movement recorded");

        self.entries
            .last()
            .ok_or(LedgerError::MissingField("appended transaction"))
    }

    /// Return one page of the log in the requested order.
    pub fn page(&self, page: &Page) -> TransactionPage {
        let total = u64::try_from(self.entries.len()).unwrap_or(u64::MAX);
        let skip = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(page.limit).unwrap_or(usize::MAX);

        let transactions: Vec<LogisticsTransaction> = match page.order {
            SortOrder::OldestFirst => self.entries.iter().skip(skip).take(take).cloned().collect(),
            SortOrder::NewestFirst => self
                .entries
                .iter()
                .rev()
                .skip(skip)
                .take(take)
                .cloned()
                .collect(),
        };

        TransactionPage {
            transactions,
            total,
            next_offset: page.next_offset(total),
        }
    }

    /// Replay the log and compare the result with the balance.
    pub fn verify(&self) -> BalanceCheck {
        verify_balance(self.current_stock, &self.entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn operator() -> Actor {
        Actor::new("op-1")
    }

    fn movement(item: ItemId, direction: Direction, quantity: i64) -> LogisticsTransaction {
        TransactionBuilder::new(item, direction)
            .quantity(quantity)
            .recorded_by(operator())
            .build()
            .unwrap()
    }

    #[test]
    fn new_ledger_is_empty() {
        let ledger = ItemLedger::new(ItemId::new());
        assert!(ledger.is_empty());
        assert_eq!(ledger.current_stock(), 0);
    }

    #[test]
    fn opening_stock_is_logged() {
        let item = ItemId::new();
        let opening = opening_transaction(item, 50, &operator()).unwrap();
        let ledger = ItemLedger::with_opening(item, opening).unwrap();
        assert_eq!(ledger.current_stock(), 50);
        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.entries().first().and_then(|t| t.note.as_deref()),
            Some(OPENING_STOCK_NOTE)
        );
    }

    #[test]
    fn zero_opening_stock_leaves_log_empty() {
        let item = ItemId::new();
        let opening = opening_transaction(item, 0, &operator()).unwrap();
        let ledger = ItemLedger::with_opening(item, opening).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn negative_opening_stock_rejected() {
        let result = opening_transaction(ItemId::new(), -1, &operator());
        assert_eq!(result.err(), Some(LedgerError::NegativeOpeningStock { stock: -1 }));
    }

    #[test]
    fn rice_scenario() {
        let item = ItemId::new();
        let opening = opening_transaction(item, 50, &operator()).unwrap();
        let mut ledger = ItemLedger::with_opening(item, opening).unwrap();

        assert!(ledger.record(movement(item, Direction::In, 20)).is_ok());
        assert_eq!(ledger.current_stock(), 70);

        let overdraw = ledger.record(movement(item, Direction::Out, 90));
        assert_eq!(
            overdraw.err(),
            Some(LedgerError::InsufficientStock {
                item_id: item,
                available: 70,
                requested: 90,
            })
        );
        assert_eq!(ledger.current_stock(), 70);
        assert_eq!(ledger.len(), 2);

        assert!(ledger.record(movement(item, Direction::Out, 70)).is_ok());
        assert_eq!(ledger.current_stock(), 0);
        assert_eq!(ledger.verify(), BalanceCheck::Balanced { balance: 0 });
    }

    #[test]
    fn foreign_transaction_rejected() {
        let item = ItemId::new();
        let mut ledger = ItemLedger::new(item);
        let result = ledger.record(movement(ItemId::new(), Direction::In, 5));
        assert!(matches!(result, Err(LedgerError::ItemMismatch { .. })));
        assert!(ledger.is_empty());
    }

    #[test]
    fn in_overflow_rejected() {
        let item = ItemId::new();
        assert_eq!(
            next_balance(item, i64::MAX, Direction::In, 1),
            Err(LedgerError::Overflow { item_id: item })
        );
    }

    #[test]
    fn pages_are_restartable_in_both_orders() {
        let item = ItemId::new();
        let mut ledger = ItemLedger::new(item);
        for quantity in 1..=5 {
            assert!(ledger.record(movement(item, Direction::In, quantity)).is_ok());
        }

        let first = ledger.page(&Page::first(2));
        assert_eq!(first.total, 5);
        assert_eq!(first.next_offset, Some(2));
        let quantities: Vec<i64> = first.transactions.iter().map(|t| t.quantity).collect();
        assert_eq!(quantities, vec![1, 2]);

        let again = ledger.page(&Page::first(2));
        assert_eq!(again, first);

        let newest = ledger.page(&Page::first(2).ordered(SortOrder::NewestFirst));
        let quantities: Vec<i64> = newest.transactions.iter().map(|t| t.quantity).collect();
        assert_eq!(quantities, vec![5, 4]);

        let last = ledger.page(&Page {
            offset: 4,
            limit: 2,
            order: SortOrder::OldestFirst,
        });
        assert_eq!(last.transactions.len(), 1);
        assert_eq!(last.next_offset, None);
    }
}
