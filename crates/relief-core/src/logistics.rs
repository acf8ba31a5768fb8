//! Per-post logistics stock.
//!
//! Every stock change goes through [`LogisticsLedger::record`], which
//! appends a transaction and moves the item's balance in one atomic step.
//! Creating an item with stock records that stock as an opening IN
//! movement, so the balance always equals the replayed log.

use chrono::Utc;
use relief_db::Store;
use relief_ledger::{TransactionBuilder, opening_transaction};
use relief_types::{
    Actor, BalanceCheck, Direction, ItemId, ItemType, LogisticsItem, LogisticsTransaction, Page,
    PostId, SortOrder, TransactionPage,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LogisticsConfig;
use crate::error::ReliefError;
use crate::validate;

/// Input for adding an item to a post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewItem {
    /// Item name, e.g. "Rice".
    pub item_name: String,
    /// Counting unit, e.g. "sack".
    pub unit: String,
    /// Category.
    pub item_type: ItemType,
    /// Stock on hand at creation.
    #[serde(default)]
    pub initial_stock: i64,
}

/// A stock movement to record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockMovement {
    /// IN or OUT.
    pub direction: Direction,
    /// Units moved.
    pub quantity: i64,
    /// Donor, recipient or reason.
    #[serde(default)]
    pub note: Option<String>,
}

/// A recorded movement and the balance it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedMovement {
    /// The appended transaction.
    pub transaction: LogisticsTransaction,
    /// Item balance after the movement.
    pub current_stock: i64,
}

/// Stock items and their append-only transaction logs.
#[derive(Debug, Clone)]
pub struct LogisticsLedger {
    store: Store,
    limits: LogisticsConfig,
}

impl LogisticsLedger {
    /// Ledger over the given store with the given page limits.
    pub const fn new(store: Store, limits: LogisticsConfig) -> Self {
        Self { store, limits }
    }

    /// Add an item to a post.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Validation`] for a blank name or unit or a negative
    /// initial stock, [`ReliefError::NotFound`] for an unknown post.
    pub async fn create_item(
        &self,
        post_id: PostId,
        input: NewItem,
        actor: &Actor,
    ) -> Result<LogisticsItem, ReliefError> {
        validate::actor(actor)?;
        validate::non_blank("item_name", &input.item_name)?;
        validate::non_blank("unit", &input.unit)?;

        let item_id = ItemId::new();
        let opening = opening_transaction(item_id, input.initial_stock, actor)?;
        let item = LogisticsItem {
            id: item_id,
            posko_id: post_id,
            item_name: input.item_name,
            unit: input.unit,
            item_type: input.item_type,
            current_stock: 0,
            created_at: Utc::now(),
        };

        let stored = self.store.insert_item(&item, opening).await.map_err(|err| {
            let err = ReliefError::from(err);
            warn!(post_id = %post_id, error = %err, "Item creation rejected");
            err
        })?;

        info!(
            item_id = %stored.id,
            post_id = %post_id,
            item_name = %stored.item_name,
            current_stock = stored.current_stock,
            actor = %actor,
            "Logistics item created"
        );
        Ok(stored)
    }

    /// Record a stock movement. An OUT larger than the balance is refused
    /// and leaves the balance untouched.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Validation`] for a non-positive quantity,
    /// [`ReliefError::NotFound`] for an unknown item,
    /// [`ReliefError::InsufficientStock`] for an overdraw.
    pub async fn record(
        &self,
        item_id: ItemId,
        movement: StockMovement,
        actor: &Actor,
    ) -> Result<RecordedMovement, ReliefError> {
        validate::actor(actor)?;
        let transaction = TransactionBuilder::new(item_id, movement.direction)
            .quantity(movement.quantity)
            .maybe_note(movement.note)
            .recorded_by(actor.clone())
            .build()?;

        match self.store.record_transaction(transaction).await {
            Ok((transaction, current_stock)) => {
                info!(
                    item_id = %item_id,
                    direction = ?transaction.direction,
                    quantity = transaction.quantity,
                    current_stock,
                    actor = %actor,
                    "Stock movement recorded"
                );
                Ok(RecordedMovement {
                    transaction,
                    current_stock,
                })
            }
            Err(err) => {
                let err = ReliefError::from(err);
                warn!(
                    item_id = %item_id,
                    direction = ?movement.direction,
                    quantity = movement.quantity,
                    error = %err,
                    "Stock movement refused"
                );
                Err(err)
            }
        }
    }

    /// The page window for a listing request. A missing limit takes the
    /// configured default; any limit is clamped to `1..=max_page_size`.
    pub fn page(&self, offset: u64, limit: Option<u32>, order: SortOrder) -> Page {
        let limit = limit
            .unwrap_or(self.limits.default_page_size)
            .clamp(1, self.limits.max_page_size.max(1));
        Page {
            offset,
            limit,
            order,
        }
    }

    /// One page of an item's transaction log.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown item.
    pub async fn list_transactions(
        &self,
        item_id: ItemId,
        page: &Page,
    ) -> Result<TransactionPage, ReliefError> {
        let page = self.page(page.offset, Some(page.limit), page.order);
        let result = self.store.page_transactions(item_id, &page).await?;
        debug!(
            item_id = %item_id,
            offset = page.offset,
            returned = result.transactions.len(),
            total = result.total,
            "Transaction page served"
        );
        Ok(result)
    }

    /// Delete an item with its transaction log. Returns the number of
    /// transactions removed.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown item.
    pub async fn delete_item(&self, item_id: ItemId, actor: &Actor) -> Result<u64, ReliefError> {
        validate::actor(actor)?;
        let deleted_transactions = self.store.delete_item(item_id).await?;
        info!(item_id = %item_id, deleted_transactions, actor = %actor, "Logistics item deleted");
        Ok(deleted_transactions)
    }

    /// Look up an item.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown item.
    pub async fn get_item(&self, item_id: ItemId) -> Result<LogisticsItem, ReliefError> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or_else(|| ReliefError::not_found("item", item_id))
    }

    /// Items held at a post.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown post.
    pub async fn list_items(&self, post_id: PostId) -> Result<Vec<LogisticsItem>, ReliefError> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(ReliefError::not_found("post", post_id));
        }
        Ok(self.store.list_items(post_id).await?)
    }

    /// Replay an item's log and compare it with the stored balance.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown item.
    pub async fn verify_item(&self, item_id: ItemId) -> Result<BalanceCheck, ReliefError> {
        let check = self.store.verify_item(item_id).await?;
        if let BalanceCheck::Drift { expected, recorded } = check {
            warn!(item_id = %item_id, expected, recorded, "Stock balance drift detected");
        }
        Ok(check)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::{EventLifecycleManager, NewEvent};
    use crate::posts::{NewPost, ReliefPostRegistry};

    fn operator() -> Actor {
        Actor::new("op-3")
    }

    async fn setup() -> (LogisticsLedger, PostId) {
        let store = Store::memory();
        let event = EventLifecycleManager::new(store.clone())
            .create(
                NewEvent {
                    title: String::from("Flood A"),
                    location: String::from("Riverside"),
                    description: String::new(),
                },
                &operator(),
            )
            .await
            .unwrap();
        let post = ReliefPostRegistry::new(store.clone())
            .create(
                event.id,
                NewPost {
                    name: String::from("Shelter 1"),
                    location: String::from("Village hall"),
                    capacity: 10,
                    pic_name: String::from("Budi"),
                    pic_phone: String::from("0812"),
                    photo: None,
                    map_link: None,
                },
                &operator(),
            )
            .await
            .unwrap();
        (LogisticsLedger::new(store, LogisticsConfig::default()), post.id)
    }

    fn rice(initial_stock: i64) -> NewItem {
        NewItem {
            item_name: String::from("Rice"),
            unit: String::from("sack"),
            item_type: ItemType::Food,
            initial_stock,
        }
    }

    fn movement(direction: Direction, quantity: i64) -> StockMovement {
        StockMovement {
            direction,
            quantity,
            note: None,
        }
    }

    #[tokio::test]
    async fn rice_stock_follows_the_ledger() {
        let (ledger, post_id) = setup().await;
        let item = ledger.create_item(post_id, rice(50), &operator()).await.unwrap();
        assert_eq!(item.current_stock, 50);

        let after_in = ledger
            .record(item.id, movement(Direction::In, 20), &operator())
            .await
            .unwrap();
        assert_eq!(after_in.current_stock, 70);

        let overdraw = ledger
            .record(item.id, movement(Direction::Out, 90), &operator())
            .await;
        assert!(matches!(
            overdraw,
            Err(ReliefError::InsufficientStock {
                available: 70,
                requested: 90,
                ..
            })
        ));
        assert_eq!(ledger.get_item(item.id).await.unwrap().current_stock, 70);

        let drained = ledger
            .record(item.id, movement(Direction::Out, 70), &operator())
            .await
            .unwrap();
        assert_eq!(drained.current_stock, 0);
        assert_eq!(
            ledger.verify_item(item.id).await.unwrap(),
            BalanceCheck::Balanced { balance: 0 }
        );
    }

    #[tokio::test]
    async fn invalid_quantities_are_validation_errors() {
        let (ledger, post_id) = setup().await;
        let negative = ledger.create_item(post_id, rice(-1), &operator()).await;
        assert!(matches!(negative, Err(ReliefError::Validation(_))));

        let item = ledger.create_item(post_id, rice(0), &operator()).await.unwrap();
        let zero = ledger
            .record(item.id, movement(Direction::In, 0), &operator())
            .await;
        assert!(matches!(zero, Err(ReliefError::Validation(_))));
    }

    #[tokio::test]
    async fn pages_are_clamped_and_restartable() {
        let (ledger, post_id) = setup().await;
        let item = ledger.create_item(post_id, rice(5), &operator()).await.unwrap();
        for quantity in 1..=4 {
            ledger
                .record(item.id, movement(Direction::In, quantity), &operator())
                .await
                .unwrap();
        }

        let first = ledger
            .list_transactions(item.id, &ledger.page(0, Some(2), SortOrder::OldestFirst))
            .await
            .unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.next_offset, Some(2));
        assert_eq!(first.transactions.first().map(|t| t.quantity), Some(5));

        let newest = ledger
            .list_transactions(item.id, &ledger.page(0, Some(1), SortOrder::NewestFirst))
            .await
            .unwrap();
        assert_eq!(newest.transactions.first().map(|t| t.quantity), Some(4));

        assert_eq!(ledger.page(0, Some(0), SortOrder::OldestFirst).limit, 1);
        assert_eq!(ledger.page(0, Some(10_000), SortOrder::OldestFirst).limit, 500);
        assert_eq!(ledger.page(0, None, SortOrder::OldestFirst).limit, 50);
    }

    #[tokio::test]
    async fn deleting_an_item_drops_its_log() {
        let (ledger, post_id) = setup().await;
        let item = ledger.create_item(post_id, rice(5), &operator()).await.unwrap();
        ledger
            .record(item.id, movement(Direction::Out, 2), &operator())
            .await
            .unwrap();
        assert_eq!(ledger.delete_item(item.id, &operator()).await.unwrap(), 2);
        assert!(matches!(
            ledger.get_item(item.id).await,
            Err(ReliefError::NotFound { entity: "item", .. })
        ));
        assert!(ledger.list_items(post_id).await.unwrap().is_empty());
    }
}
