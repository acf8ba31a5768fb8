//! Balance verification for the stock ledger.
//!
//! The transaction log is the source of truth; the materialized balance
//! on an item is a cache of it. For every item the check is:
//!
//! ```text
//! current_stock == sum(IN quantities) - sum(OUT quantities)
//! ```
//!
//! Because every movement goes through [`next_balance`](crate::next_balance)
//! together with its balance update, this holds by construction. The
//! replay exists to detect data corrupted outside the ledger (manual SQL,
//! partial restores).

use relief_types::{BalanceCheck, Direction, LogisticsTransaction};

use crate::LedgerError;

/// Replay a log in order with the live recording rule; a log that ever
/// goes negative fails at the offending entry.
fn replay(entries: &[LogisticsTransaction]) -> Result<i64, LedgerError> {
    entries.iter().try_fold(0_i64, |balance, tx| {
        crate::next_balance(tx.item_id, balance, tx.direction, tx.quantity)
    })
}

/// Compare a materialized balance with the sum of its log.
///
/// The verdict uses plain signed summation, so a drifted balance is
/// reported with the number the log implies. The log is also replayed in
/// order; an entry that would have overdrawn is logged as a warning even
/// when the totals agree.
pub fn verify_balance(recorded: i64, entries: &[LogisticsTransaction]) -> BalanceCheck {
    if let Err(err) = replay(entries) {
        tracing::warn!(recorded, error = %err, "Stock log overdraws when replayed in order");
    }

    let expected = entries.iter().try_fold(0_i64, |sum, tx| match tx.direction {
        Direction::In => sum.checked_add(tx.quantity),
        Direction::Out => sum.checked_sub(tx.quantity),
    });

    match expected {
        Some(expected) if expected == recorded => BalanceCheck::Balanced { balance: recorded },
        Some(expected) => {
            tracing::warn!(expected, recorded, "Stock balance drift detected");
            BalanceCheck::Drift { expected, recorded }
        }
        None => {
            tracing::warn!(recorded, "Stock log sum overflowed during verification");
            BalanceCheck::Drift {
                expected: i64::MAX,
                recorded,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::TransactionBuilder;
    use relief_types::{Actor, ItemId};

    fn movement(item: ItemId, direction: Direction, quantity: i64) -> LogisticsTransaction {
        TransactionBuilder::new(item, direction)
            .quantity(quantity)
            .recorded_by(Actor::new("op-1"))
            .build()
            .unwrap()
    }

    #[test]
    fn empty_log_balances_at_zero() {
        assert_eq!(verify_balance(0, &[]), BalanceCheck::Balanced { balance: 0 });
        assert_eq!(replay(&[]), Ok(0));
    }

    #[test]
    fn matching_balance_is_balanced() {
        let item = ItemId::new();
        let log = vec![
            movement(item, Direction::In, 50),
            movement(item, Direction::Out, 15),
            movement(item, Direction::In, 5),
        ];
        assert_eq!(replay(&log), Ok(40));
        assert_eq!(verify_balance(40, &log), BalanceCheck::Balanced { balance: 40 });
    }

    #[test]
    fn tampered_balance_is_drift() {
        let item = ItemId::new();
        let log = vec![movement(item, Direction::In, 10)];
        assert_eq!(
            verify_balance(12, &log),
            BalanceCheck::Drift {
                expected: 10,
                recorded: 12,
            }
        );
    }

    #[test]
    fn out_of_order_log_still_balances_on_totals() {
        let item = ItemId::new();
        let log = vec![
            movement(item, Direction::Out, 4),
            movement(item, Direction::In, 10),
        ];
        assert!(replay(&log).is_err());
        assert_eq!(verify_balance(6, &log), BalanceCheck::Balanced { balance: 6 });
    }

    #[test]
    fn replay_refuses_log_that_overdraws() {
        let item = ItemId::new();
        let log = vec![
            movement(item, Direction::In, 5),
            movement(item, Direction::Out, 8),
        ];
        assert!(matches!(
            replay(&log),
            Err(LedgerError::InsufficientStock { available: 5, requested: 8, .. })
        ));
    }
}
