//! Backend-agnostic storage handle.
//!
//! [`Store`] dispatches each operation to either the in-memory tables or
//! the per-table `PostgreSQL` stores. Enum dispatch keeps the services
//! free of trait objects and async-trait boxing; both arms uphold the
//! same atomicity for every method.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use relief_types::{
    Actor, AffectedResident, BalanceCheck, ConditionCounts, DamageReport, DisasterEvent, EventId,
    ItemId, LogisticsItem, LogisticsTransaction, Page, PostDeletion, PostId, PostUpdate,
    ReliefPost, ReportId, ReportStatus, ResidentFilter, ResidentId, SeverityCounts,
    TransactionPage,
};

use crate::damage_store::DamageStore;
use crate::error::DbError;
use crate::event_store::EventStore;
use crate::logistics_store::LogisticsStore;
use crate::memory::MemoryStore;
use crate::params::{ConditionChange, RegistryRegistration};
use crate::post_store::PostStore;
use crate::postgres::PostgresPool;
use crate::resident_store::ResidentStore;

/// Storage backend selected at startup.
#[derive(Debug, Clone)]
pub enum Store {
    /// Process-local tables.
    Memory(MemoryStore),
    /// `PostgreSQL` via a shared pool.
    Postgres(PostgresPool),
}

impl Store {
    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Short backend name for logs.
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Release backend resources at shutdown. A no-op for the memory store.
    pub async fn close(&self) {
        if let Self::Postgres(pg) = self {
            pg.close().await;
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Insert a newly declared event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ActiveEventExists`] if another event is active.
    pub async fn insert_event(&self, event: &DisasterEvent) -> Result<(), DbError> {
        match self {
            Self::Memory(mem) => mem.insert_event(event).await,
            Self::Postgres(pg) => EventStore::new(pg.pool()).insert(event).await,
        }
    }

    /// Resolve an active event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::EventNotActive`].
    pub async fn resolve_event(
        &self,
        event_id: EventId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<DisasterEvent, DbError> {
        match self {
            Self::Memory(mem) => mem.resolve_event(event_id, actor, at).await,
            Self::Postgres(pg) => EventStore::new(pg.pool()).resolve(event_id, actor, at).await,
        }
    }

    /// The active event, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn active_event(&self) -> Result<Option<DisasterEvent>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.active_event().await),
            Self::Postgres(pg) => EventStore::new(pg.pool()).active().await,
        }
    }

    /// Look up an event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn get_event(&self, event_id: EventId) -> Result<Option<DisasterEvent>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.get_event(event_id).await),
            Self::Postgres(pg) => EventStore::new(pg.pool()).get(event_id).await,
        }
    }

    /// All events, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_events(&self) -> Result<Vec<DisasterEvent>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_events().await),
            Self::Postgres(pg) => EventStore::new(pg.pool()).list().await,
        }
    }

    // -----------------------------------------------------------------------
    // Posts
    // -----------------------------------------------------------------------

    /// Insert a post under an active event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::EventNotActive`].
    pub async fn insert_post(&self, post: &ReliefPost) -> Result<(), DbError> {
        match self {
            Self::Memory(mem) => mem.insert_post(post).await,
            Self::Postgres(pg) => PostStore::new(pg.pool()).insert(post).await,
        }
    }

    /// Look up a post.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn get_post(&self, post_id: PostId) -> Result<Option<ReliefPost>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.get_post(post_id).await),
            Self::Postgres(pg) => PostStore::new(pg.pool()).get(post_id).await,
        }
    }

    /// Posts serving an event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_posts(&self, event_id: EventId) -> Result<Vec<ReliefPost>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_posts(event_id).await),
            Self::Postgres(pg) => PostStore::new(pg.pool()).list(event_id).await,
        }
    }

    /// Partially update a post.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::EventNotActive`].
    pub async fn update_post(
        &self,
        post_id: PostId,
        update: &PostUpdate,
        at: DateTime<Utc>,
    ) -> Result<ReliefPost, DbError> {
        match self {
            Self::Memory(mem) => mem.update_post(post_id, update, at).await,
            Self::Postgres(pg) => PostStore::new(pg.pool()).update(post_id, update, at).await,
        }
    }

    /// Delete a post with its cascade.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the post does not exist.
    pub async fn delete_post(
        &self,
        post_id: PostId,
        at: DateTime<Utc>,
    ) -> Result<PostDeletion, DbError> {
        match self {
            Self::Memory(mem) => mem.delete_post(post_id, at).await,
            Self::Postgres(pg) => PostStore::new(pg.pool()).delete_cascade(post_id, at).await,
        }
    }

    /// Residents sheltered at a post.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn occupancy(&self, post_id: PostId) -> Result<u32, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.occupancy(post_id).await),
            Self::Postgres(pg) => PostStore::new(pg.pool()).occupancy(post_id).await,
        }
    }

    /// Occupancy of every post serving an event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn occupancy_by_post(
        &self,
        event_id: EventId,
    ) -> Result<BTreeMap<PostId, u32>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.occupancy_by_post(event_id).await),
            Self::Postgres(pg) => PostStore::new(pg.pool()).occupancy_by_post(event_id).await,
        }
    }

    // -----------------------------------------------------------------------
    // Residents
    // -----------------------------------------------------------------------

    /// Insert or update a registry-linked resident by natural key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`], [`DbError::EventNotActive`] or
    /// [`DbError::PostNotInEvent`].
    pub async fn upsert_registry_resident(
        &self,
        reg: &RegistryRegistration,
    ) -> Result<(AffectedResident, bool), DbError> {
        match self {
            Self::Memory(mem) => mem.upsert_registry_resident(reg).await,
            Self::Postgres(pg) => ResidentStore::new(pg.pool()).upsert_registry(reg).await,
        }
    }

    /// Insert a manually identified resident.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`], [`DbError::EventNotActive`] or
    /// [`DbError::PostNotInEvent`].
    pub async fn insert_manual_resident(
        &self,
        resident: &AffectedResident,
    ) -> Result<AffectedResident, DbError> {
        match self {
            Self::Memory(mem) => mem.insert_manual_resident(resident).await,
            Self::Postgres(pg) => ResidentStore::new(pg.pool()).insert_manual(resident).await,
        }
    }

    /// Look up a resident.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn get_resident(
        &self,
        resident_id: ResidentId,
    ) -> Result<Option<AffectedResident>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.get_resident(resident_id).await),
            Self::Postgres(pg) => ResidentStore::new(pg.pool()).get(resident_id).await,
        }
    }

    /// Residents of an event matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_residents(
        &self,
        event_id: EventId,
        filter: &ResidentFilter,
    ) -> Result<Vec<AffectedResident>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_residents(event_id, filter).await),
            Self::Postgres(pg) => ResidentStore::new(pg.pool()).list(event_id, filter).await,
        }
    }

    /// Change a resident's condition and post link.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::PostNotInEvent`].
    pub async fn update_condition(
        &self,
        change: &ConditionChange,
    ) -> Result<AffectedResident, DbError> {
        match self {
            Self::Memory(mem) => mem.update_condition(change).await,
            Self::Postgres(pg) => ResidentStore::new(pg.pool()).update_condition(change).await,
        }
    }

    /// Set the location text of an unlinked resident.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::ResidentLinked`].
    pub async fn update_location(
        &self,
        resident_id: ResidentId,
        location: &str,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<AffectedResident, DbError> {
        match self {
            Self::Memory(mem) => mem.update_location(resident_id, location, actor, at).await,
            Self::Postgres(pg) => {
                ResidentStore::new(pg.pool())
                    .update_location(resident_id, location, actor, at)
                    .await
            }
        }
    }

    /// Hard-delete a resident.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the resident does not exist.
    pub async fn delete_resident(&self, resident_id: ResidentId) -> Result<(), DbError> {
        match self {
            Self::Memory(mem) => mem.delete_resident(resident_id).await,
            Self::Postgres(pg) => ResidentStore::new(pg.pool()).delete(resident_id).await,
        }
    }

    /// Resident counts per condition (zero-filled).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn counts_by_condition(&self, event_id: EventId) -> Result<ConditionCounts, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.counts_by_condition(event_id).await),
            Self::Postgres(pg) => ResidentStore::new(pg.pool()).counts_by_condition(event_id).await,
        }
    }

    // -----------------------------------------------------------------------
    // Damage reports
    // -----------------------------------------------------------------------

    /// Insert a damage report.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the event does not exist.
    pub async fn insert_report(&self, report: &DamageReport) -> Result<(), DbError> {
        match self {
            Self::Memory(mem) => mem.insert_report(report).await,
            Self::Postgres(pg) => DamageStore::new(pg.pool()).insert(report).await,
        }
    }

    /// Look up a damage report.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn get_report(&self, report_id: ReportId) -> Result<Option<DamageReport>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.get_report(report_id).await),
            Self::Postgres(pg) => DamageStore::new(pg.pool()).get(report_id).await,
        }
    }

    /// Damage reports of an event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_reports(&self, event_id: EventId) -> Result<Vec<DamageReport>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_reports(event_id).await),
            Self::Postgres(pg) => DamageStore::new(pg.pool()).list(event_id).await,
        }
    }

    /// Overwrite a report's status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the report does not exist.
    pub async fn update_report_status(
        &self,
        report_id: ReportId,
        status: ReportStatus,
        at: DateTime<Utc>,
    ) -> Result<DamageReport, DbError> {
        match self {
            Self::Memory(mem) => mem.update_report_status(report_id, status, at).await,
            Self::Postgres(pg) => {
                DamageStore::new(pg.pool())
                    .update_status(report_id, status, at)
                    .await
            }
        }
    }

    /// Damage counts per severity (zero-filled).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn counts_by_severity(&self, event_id: EventId) -> Result<SeverityCounts, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.counts_by_severity(event_id).await),
            Self::Postgres(pg) => DamageStore::new(pg.pool()).counts_by_severity(event_id).await,
        }
    }

    // -----------------------------------------------------------------------
    // Logistics
    // -----------------------------------------------------------------------

    /// Insert an item with its optional opening transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown post or
    /// [`DbError::Ledger`] if the opening is refused.
    pub async fn insert_item(
        &self,
        item: &LogisticsItem,
        opening: Option<LogisticsTransaction>,
    ) -> Result<LogisticsItem, DbError> {
        match self {
            Self::Memory(mem) => mem.insert_item(item, opening).await,
            Self::Postgres(pg) => LogisticsStore::new(pg.pool()).insert_item(item, opening).await,
        }
    }

    /// Look up an item.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn get_item(&self, item_id: ItemId) -> Result<Option<LogisticsItem>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.get_item(item_id).await),
            Self::Postgres(pg) => LogisticsStore::new(pg.pool()).get_item(item_id).await,
        }
    }

    /// Items held at a post.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_items(&self, post_id: PostId) -> Result<Vec<LogisticsItem>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_items(post_id).await),
            Self::Postgres(pg) => LogisticsStore::new(pg.pool()).list_items(post_id).await,
        }
    }

    /// Append a movement and move the balance atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::Ledger`].
    pub async fn record_transaction(
        &self,
        movement: LogisticsTransaction,
    ) -> Result<(LogisticsTransaction, i64), DbError> {
        match self {
            Self::Memory(mem) => mem.record_transaction(movement).await,
            Self::Postgres(pg) => LogisticsStore::new(pg.pool()).record(movement).await,
        }
    }

    /// One page of an item's log.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item.
    pub async fn page_transactions(
        &self,
        item_id: ItemId,
        page: &Page,
    ) -> Result<TransactionPage, DbError> {
        match self {
            Self::Memory(mem) => mem.page_transactions(item_id, page).await,
            Self::Postgres(pg) => {
                LogisticsStore::new(pg.pool())
                    .page_transactions(item_id, page)
                    .await
            }
        }
    }

    /// Replay an item's log against its balance.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item.
    pub async fn verify_item(&self, item_id: ItemId) -> Result<BalanceCheck, DbError> {
        match self {
            Self::Memory(mem) => mem.verify_item(item_id).await,
            Self::Postgres(pg) => LogisticsStore::new(pg.pool()).verify_item(item_id).await,
        }
    }

    /// Delete an item and its log.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item.
    pub async fn delete_item(&self, item_id: ItemId) -> Result<u64, DbError> {
        match self {
            Self::Memory(mem) => mem.delete_item(item_id).await,
            Self::Postgres(pg) => LogisticsStore::new(pg.pool()).delete_item(item_id).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closing_memory_store_keeps_it_usable() {
        let store = Store::memory();
        store.close().await;
        assert_eq!(store.backend_name(), "memory");
        assert!(store.active_event().await.unwrap().is_none());
    }
}
