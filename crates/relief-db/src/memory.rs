//! In-memory storage backend.
//!
//! Used for tests and single-instance deployments without `PostgreSQL`.
//! Every mutation holds the table write lock for its whole duration, so
//! each check-then-write sequence is as atomic as the `PostgreSQL`
//! transaction it mirrors. The active-event slot plays the role of the
//! partial unique index, and `registry_keys` that of the
//! `(event_id, external_id)` natural key.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use relief_ledger::{ItemLedger, verify_balance};
use relief_types::{
    Actor, AffectedResident, BalanceCheck, ConditionCounts, DamageReport, DamageSeverity,
    DisasterEvent, EventId, EventStatus, ItemId, LogisticsItem, LogisticsTransaction, Page,
    PostDeletion, PostId, PostUpdate, ReliefPost, ReportId, ReportStatus, ResidentCondition,
    ResidentFilter, ResidentId, ResidentIdentity, SeverityCounts, TransactionPage,
};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::params::{ConditionChange, RegistryRegistration};

#[derive(Debug, Default)]
struct Tables {
    events: BTreeMap<EventId, DisasterEvent>,
    active_event: Option<EventId>,
    posts: BTreeMap<PostId, ReliefPost>,
    residents: BTreeMap<ResidentId, AffectedResident>,
    registry_keys: BTreeMap<(EventId, String), ResidentId>,
    reports: BTreeMap<ReportId, DamageReport>,
    items: BTreeMap<ItemId, LogisticsItem>,
    ledgers: BTreeMap<ItemId, ItemLedger>,
}

impl Tables {
    fn require_active(&self, event_id: EventId) -> Result<(), DbError> {
        let event = self
            .events
            .get(&event_id)
            .ok_or_else(|| DbError::not_found("event", event_id))?;
        if event.is_active() {
            Ok(())
        } else {
            Err(DbError::EventNotActive { event_id })
        }
    }

    /// Resolve an optional post reference to the post's name, checking it
    /// serves `event_id`.
    fn post_in_event(
        &self,
        posko_id: Option<PostId>,
        event_id: EventId,
    ) -> Result<Option<String>, DbError> {
        let Some(post_id) = posko_id else {
            return Ok(None);
        };
        let post = self
            .posts
            .get(&post_id)
            .ok_or_else(|| DbError::not_found("post", post_id))?;
        if post.event_id != event_id {
            return Err(DbError::PostNotInEvent { post_id, event_id });
        }
        Ok(Some(post.name.clone()))
    }

    fn occupancy(&self, post_id: PostId) -> u32 {
        let count = self
            .residents
            .values()
            .filter(|r| r.posko_id == Some(post_id) && r.condition.occupies_shelter())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

fn count_len(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Process-local store with the same atomicity as the `PostgreSQL` one.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Insert a newly declared event, claiming the active slot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ActiveEventExists`] if the slot is taken.
    pub async fn insert_event(&self, event: &DisasterEvent) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if event.is_active() {
            if tables.active_event.is_some() {
                return Err(DbError::ActiveEventExists);
            }
            tables.active_event = Some(event.id);
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    /// Move an active event to resolved and free the active slot.
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
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let event = tables
            .events
            .get_mut(&event_id)
            .ok_or_else(|| DbError::not_found("event", event_id))?;
        if !event.is_active() {
            return Err(DbError::EventNotActive { event_id });
        }
        event.status = EventStatus::Resolved;
        event.end_date = Some(at);
        event.resolved_by = Some(actor.clone());
        let resolved = event.clone();
        if tables.active_event == Some(event_id) {
            tables.active_event = None;
        }
        Ok(resolved)
    }

    /// The event holding the active slot, if any.
    pub async fn active_event(&self) -> Option<DisasterEvent> {
        let tables = self.tables.read().await;
        tables
            .active_event
            .and_then(|id| tables.events.get(&id).cloned())
    }

    /// Look up an event.
    pub async fn get_event(&self, event_id: EventId) -> Option<DisasterEvent> {
        self.tables.read().await.events.get(&event_id).cloned()
    }

    /// All events, newest first.
    pub async fn list_events(&self) -> Vec<DisasterEvent> {
        let tables = self.tables.read().await;
        let mut events: Vec<DisasterEvent> = tables.events.values().cloned().collect();
        events.sort_by(|a, b| (b.start_date, b.id).cmp(&(a.start_date, a.id)));
        events
    }

    // -----------------------------------------------------------------------
    // Posts
    // -----------------------------------------------------------------------

    /// Insert a post under an active event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::EventNotActive`] for the
    /// parent event.
    pub async fn insert_post(&self, post: &ReliefPost) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.require_active(post.event_id)?;
        tables.posts.insert(post.id, post.clone());
        Ok(())
    }

    /// Look up a post.
    pub async fn get_post(&self, post_id: PostId) -> Option<ReliefPost> {
        self.tables.read().await.posts.get(&post_id).cloned()
    }

    /// Posts serving an event, in creation order.
    pub async fn list_posts(&self, event_id: EventId) -> Vec<ReliefPost> {
        let tables = self.tables.read().await;
        let mut posts: Vec<ReliefPost> = tables
            .posts
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        posts
    }

    /// Apply a partial update; a rename is mirrored into linked residents.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for the post or [`DbError::EventNotActive`].
    pub async fn update_post(
        &self,
        post_id: PostId,
        update: &PostUpdate,
        at: DateTime<Utc>,
    ) -> Result<ReliefPost, DbError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let event_id = tables
            .posts
            .get(&post_id)
            .map(|p| p.event_id)
            .ok_or_else(|| DbError::not_found("post", post_id))?;
        tables.require_active(event_id)?;

        let post = tables
            .posts
            .get_mut(&post_id)
            .ok_or_else(|| DbError::not_found("post", post_id))?;
        let renamed = update.name.as_ref().is_some_and(|name| *name != post.name);
        update.apply_to(post);
        post.updated_at = at;
        let updated = post.clone();

        if renamed {
            for resident in tables
                .residents
                .values_mut()
                .filter(|r| r.posko_id == Some(post_id))
            {
                resident.current_location.clone_from(&updated.name);
                resident.updated_at = at;
            }
        }
        Ok(updated)
    }

    /// Delete a post with its explicit cascade.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the post does not exist.
    pub async fn delete_post(
        &self,
        post_id: PostId,
        at: DateTime<Utc>,
    ) -> Result<PostDeletion, DbError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let post = tables
            .posts
            .remove(&post_id)
            .ok_or_else(|| DbError::not_found("post", post_id))?;

        let mut deletion = PostDeletion {
            post_id,
            ..PostDeletion::default()
        };
        for resident in tables
            .residents
            .values_mut()
            .filter(|r| r.posko_id == Some(post_id))
        {
            resident.posko_id = None;
            resident.current_location.clone_from(&post.name);
            resident.updated_at = at;
            deletion.detached_residents = deletion.detached_residents.saturating_add(1);
        }

        let item_ids: Vec<ItemId> = tables
            .items
            .values()
            .filter(|i| i.posko_id == post_id)
            .map(|i| i.id)
            .collect();
        for item_id in item_ids {
            tables.items.remove(&item_id);
            deletion.deleted_items = deletion.deleted_items.saturating_add(1);
            if let Some(ledger) = tables.ledgers.remove(&item_id) {
                deletion.deleted_transactions = deletion
                    .deleted_transactions
                    .saturating_add(count_len(ledger.len()));
            }
        }
        Ok(deletion)
    }

    /// Residents currently sheltered at a post.
    pub async fn occupancy(&self, post_id: PostId) -> u32 {
        self.tables.read().await.occupancy(post_id)
    }

    /// Occupancy of every post serving an event (zero-filled).
    pub async fn occupancy_by_post(&self, event_id: EventId) -> BTreeMap<PostId, u32> {
        let tables = self.tables.read().await;
        tables
            .posts
            .values()
            .filter(|p| p.event_id == event_id)
            .map(|p| (p.id, tables.occupancy(p.id)))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Residents
    // -----------------------------------------------------------------------

    /// Insert or update a registry-linked resident by natural key.
    ///
    /// Returns the stored record and whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`], [`DbError::EventNotActive`] or
    /// [`DbError::PostNotInEvent`] when a precondition fails.
    pub async fn upsert_registry_resident(
        &self,
        reg: &RegistryRegistration,
    ) -> Result<(AffectedResident, bool), DbError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        tables.require_active(reg.event_id)?;
        let post_name = tables.post_in_event(reg.posko_id, reg.event_id)?;

        let key = (reg.event_id, reg.external_id.clone());
        if let Some(existing) = tables.registry_keys.get(&key).copied() {
            let resident = tables
                .residents
                .get_mut(&existing)
                .ok_or_else(|| DbError::not_found("resident", existing))?;
            resident.condition = reg.condition;
            resident.posko_id = reg.posko_id;
            if reg.special_needs.is_some() {
                resident.special_needs = reg.special_needs;
            }
            if let Some(notes) = &reg.notes {
                resident.notes.clone_from(notes);
            }
            if let Some(name) = post_name {
                resident.current_location = name;
            }
            resident.updated_by = reg.actor.clone();
            resident.updated_at = reg.at;
            return Ok((resident.clone(), false));
        }

        let resident = AffectedResident {
            id: reg.id,
            event_id: reg.event_id,
            identity: ResidentIdentity::RegistryLinked {
                external_id: reg.external_id.clone(),
            },
            condition: reg.condition,
            special_needs: reg.special_needs,
            posko_id: reg.posko_id,
            current_location: post_name.unwrap_or_else(|| reg.home_location.clone()),
            notes: reg.notes.clone().unwrap_or_default(),
            registered_by: reg.actor.clone(),
            updated_by: reg.actor.clone(),
            created_at: reg.at,
            updated_at: reg.at,
        };
        tables.registry_keys.insert(key, reg.id);
        tables.residents.insert(reg.id, resident.clone());
        Ok((resident, true))
    }

    /// Insert a manually identified resident. No deduplication.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`Self::upsert_registry_resident`].
    pub async fn insert_manual_resident(
        &self,
        resident: &AffectedResident,
    ) -> Result<AffectedResident, DbError> {
        let mut tables = self.tables.write().await;
        tables.require_active(resident.event_id)?;
        let post_name = tables.post_in_event(resident.posko_id, resident.event_id)?;

        let mut stored = resident.clone();
        if let Some(name) = post_name {
            stored.current_location = name;
        }
        tables.residents.insert(stored.id, stored.clone());
        Ok(stored)
    }

    /// Look up a resident.
    pub async fn get_resident(&self, resident_id: ResidentId) -> Option<AffectedResident> {
        self.tables.read().await.residents.get(&resident_id).cloned()
    }

    /// Residents of an event matching `filter`, least recently updated first.
    pub async fn list_residents(
        &self,
        event_id: EventId,
        filter: &ResidentFilter,
    ) -> Vec<AffectedResident> {
        let tables = self.tables.read().await;
        let mut residents: Vec<AffectedResident> = tables
            .residents
            .values()
            .filter(|r| r.event_id == event_id)
            .filter(|r| filter.condition.is_none_or(|c| r.condition == c))
            .filter(|r| filter.posko_id.is_none_or(|p| r.posko_id == Some(p)))
            .filter(|r| filter.updated_since.is_none_or(|since| r.updated_at >= since))
            .cloned()
            .collect();
        residents.sort_by(|a, b| (a.updated_at, a.id).cmp(&(b.updated_at, b.id)));
        residents
    }

    /// Change a resident's condition and shelter link.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for the resident or post, or
    /// [`DbError::PostNotInEvent`].
    pub async fn update_condition(
        &self,
        change: &ConditionChange,
    ) -> Result<AffectedResident, DbError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let event_id = tables
            .residents
            .get(&change.resident_id)
            .map(|r| r.event_id)
            .ok_or_else(|| DbError::not_found("resident", change.resident_id))?;
        let post_name = tables.post_in_event(change.posko_id, event_id)?;

        let resident = tables
            .residents
            .get_mut(&change.resident_id)
            .ok_or_else(|| DbError::not_found("resident", change.resident_id))?;
        resident.condition = change.condition;
        resident.posko_id = change.posko_id;
        if let Some(name) = post_name {
            resident.current_location = name;
        }
        resident.updated_by = change.actor.clone();
        resident.updated_at = change.at;
        Ok(resident.clone())
    }

    /// Set the free-text location of a resident not linked to a post.
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
        let mut tables = self.tables.write().await;
        let resident = tables
            .residents
            .get_mut(&resident_id)
            .ok_or_else(|| DbError::not_found("resident", resident_id))?;
        if resident.posko_id.is_some() {
            return Err(DbError::ResidentLinked { resident_id });
        }
        location.clone_into(&mut resident.current_location);
        resident.updated_by = actor.clone();
        resident.updated_at = at;
        Ok(resident.clone())
    }

    /// Hard-delete a resident and release its natural key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the resident does not exist.
    pub async fn delete_resident(&self, resident_id: ResidentId) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let resident = tables
            .residents
            .remove(&resident_id)
            .ok_or_else(|| DbError::not_found("resident", resident_id))?;
        if let Some(external_id) = resident.identity.external_id() {
            tables
                .registry_keys
                .remove(&(resident.event_id, external_id.to_owned()));
        }
        Ok(())
    }

    /// Resident counts per condition for an event (zero-filled).
    pub async fn counts_by_condition(&self, event_id: EventId) -> ConditionCounts {
        let tables = self.tables.read().await;
        let mut counts: ConditionCounts =
            ResidentCondition::ALL.into_iter().map(|c| (c, 0)).collect();
        for resident in tables.residents.values().filter(|r| r.event_id == event_id) {
            if let Some(count) = counts.get_mut(&resident.condition) {
                *count = count.saturating_add(1);
            }
        }
        counts
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
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&report.event_id) {
            return Err(DbError::not_found("event", report.event_id));
        }
        tables.reports.insert(report.id, report.clone());
        Ok(())
    }

    /// Look up a damage report.
    pub async fn get_report(&self, report_id: ReportId) -> Option<DamageReport> {
        self.tables.read().await.reports.get(&report_id).cloned()
    }

    /// Damage reports of an event, oldest first.
    pub async fn list_reports(&self, event_id: EventId) -> Vec<DamageReport> {
        let tables = self.tables.read().await;
        let mut reports: Vec<DamageReport> = tables
            .reports
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        reports.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        reports
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
        let mut tables = self.tables.write().await;
        let report = tables
            .reports
            .get_mut(&report_id)
            .ok_or_else(|| DbError::not_found("damage report", report_id))?;
        report.status = status;
        report.updated_at = at;
        Ok(report.clone())
    }

    /// Damage counts per severity for an event (zero-filled).
    pub async fn counts_by_severity(&self, event_id: EventId) -> SeverityCounts {
        let tables = self.tables.read().await;
        let mut counts: SeverityCounts = DamageSeverity::ALL.into_iter().map(|s| (s, 0)).collect();
        for report in tables.reports.values().filter(|r| r.event_id == event_id) {
            if let Some(count) = counts.get_mut(&report.severity) {
                *count = count.saturating_add(1);
            }
        }
        counts
    }

    // -----------------------------------------------------------------------
    // Logistics
    // -----------------------------------------------------------------------

    /// Insert an item together with its optional opening transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the post does not exist, or
    /// [`DbError::Ledger`] if the opening transaction is refused.
    pub async fn insert_item(
        &self,
        item: &LogisticsItem,
        opening: Option<LogisticsTransaction>,
    ) -> Result<LogisticsItem, DbError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&item.posko_id) {
            return Err(DbError::not_found("post", item.posko_id));
        }
        let ledger = ItemLedger::with_opening(item.id, opening)?;
        let mut stored = item.clone();
        stored.current_stock = ledger.current_stock();
        tables.items.insert(stored.id, stored.clone());
        tables.ledgers.insert(stored.id, ledger);
        Ok(stored)
    }

    /// Look up an item.
    pub async fn get_item(&self, item_id: ItemId) -> Option<LogisticsItem> {
        self.tables.read().await.items.get(&item_id).cloned()
    }

    /// Items held at a post, in creation order.
    pub async fn list_items(&self, post_id: PostId) -> Vec<LogisticsItem> {
        let tables = self.tables.read().await;
        let mut items: Vec<LogisticsItem> = tables
            .items
            .values()
            .filter(|i| i.posko_id == post_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        items
    }

    /// Append a movement and move the balance as one step.
    ///
    /// Returns the stored transaction and the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item, or
    /// [`DbError::Ledger`] when the movement is refused.
    pub async fn record_transaction(
        &self,
        tx: LogisticsTransaction,
    ) -> Result<(LogisticsTransaction, i64), DbError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let item_id = tx.item_id;
        let item = tables
            .items
            .get_mut(&item_id)
            .ok_or_else(|| DbError::not_found("item", item_id))?;
        let ledger = tables
            .ledgers
            .get_mut(&item_id)
            .ok_or_else(|| DbError::not_found("item", item_id))?;
        let recorded = ledger.record(tx)?.clone();
        item.current_stock = ledger.current_stock();
        Ok((recorded, item.current_stock))
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
        let tables = self.tables.read().await;
        tables
            .ledgers
            .get(&item_id)
            .map(|ledger| ledger.page(page))
            .ok_or_else(|| DbError::not_found("item", item_id))
    }

    /// Compare an item's balance with its log under one read lock.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item.
    pub async fn verify_item(&self, item_id: ItemId) -> Result<BalanceCheck, DbError> {
        let tables = self.tables.read().await;
        let item = tables
            .items
            .get(&item_id)
            .ok_or_else(|| DbError::not_found("item", item_id))?;
        let ledger = tables
            .ledgers
            .get(&item_id)
            .ok_or_else(|| DbError::not_found("item", item_id))?;
        Ok(verify_balance(item.current_stock, ledger.entries()))
    }

    /// Delete an item and its log; returns the number of log entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item.
    pub async fn delete_item(&self, item_id: ItemId) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        tables
            .items
            .remove(&item_id)
            .ok_or_else(|| DbError::not_found("item", item_id))?;
        Ok(tables
            .ledgers
            .remove(&item_id)
            .map_or(0, |ledger| count_len(ledger.len())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use relief_types::{Direction, Gender, ItemType};

    fn operator() -> Actor {
        Actor::new("op-1")
    }

    fn event(title: &str) -> DisasterEvent {
        DisasterEvent {
            id: EventId::new(),
            title: title.to_owned(),
            description: String::new(),
            status: EventStatus::Active,
            location: String::from("Riverside"),
            start_date: Utc::now(),
            end_date: None,
            declared_by: operator(),
            resolved_by: None,
        }
    }

    fn post(event_id: EventId, name: &str) -> ReliefPost {
        let now = Utc::now();
        ReliefPost {
            id: PostId::new(),
            event_id,
            name: name.to_owned(),
            location: String::from("Village hall"),
            capacity: 10,
            pic_name: String::from("Budi"),
            pic_phone: String::from("0812"),
            photo: None,
            map_link: None,
            created_by: operator(),
            created_at: now,
            updated_at: now,
        }
    }

    fn registration(
        event_id: EventId,
        external_id: &str,
        posko_id: Option<PostId>,
    ) -> RegistryRegistration {
        RegistryRegistration {
            id: ResidentId::new(),
            event_id,
            external_id: external_id.to_owned(),
            condition: ResidentCondition::Displaced,
            special_needs: None,
            posko_id,
            notes: None,
            home_location: String::from("Jl. Merdeka 1"),
            actor: operator(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn active_slot_admits_one_event() {
        let store = MemoryStore::new();
        let first = event("Flood A");
        store.insert_event(&first).await.unwrap();
        assert!(matches!(
            store.insert_event(&event("Flood B")).await,
            Err(DbError::ActiveEventExists)
        ));

        store.resolve_event(first.id, &operator(), Utc::now()).await.unwrap();
        assert!(store.active_event().await.is_none());
        assert!(store.insert_event(&event("Flood B")).await.is_ok());
    }

    #[tokio::test]
    async fn resolved_event_refuses_posts() {
        let store = MemoryStore::new();
        let flood = event("Flood A");
        store.insert_event(&flood).await.unwrap();
        store.resolve_event(flood.id, &operator(), Utc::now()).await.unwrap();

        let result = store.insert_post(&post(flood.id, "Shelter 1")).await;
        assert!(matches!(result, Err(DbError::EventNotActive { .. })));
    }

    #[tokio::test]
    async fn natural_key_upsert_keeps_one_record() {
        let store = MemoryStore::new();
        let flood = event("Flood A");
        store.insert_event(&flood).await.unwrap();

        let (first, inserted) = store
            .upsert_registry_resident(&registration(flood.id, "3201", None))
            .await
            .unwrap();
        assert!(inserted);

        let mut again = registration(flood.id, "3201", None);
        again.condition = ResidentCondition::Injured;
        let (second, inserted) = store.upsert_registry_resident(&again).await.unwrap();
        assert!(!inserted);
        assert_eq!(second.id, first.id);
        assert_eq!(second.condition, ResidentCondition::Injured);
        assert_eq!(store.list_residents(flood.id, &ResidentFilter::default()).await.len(), 1);
    }

    #[tokio::test]
    async fn post_from_other_event_rejected() {
        let store = MemoryStore::new();
        let old = event("Flood A");
        store.insert_event(&old).await.unwrap();
        let old_post = post(old.id, "Old shelter");
        store.insert_post(&old_post).await.unwrap();
        store.resolve_event(old.id, &operator(), Utc::now()).await.unwrap();

        let current = event("Flood B");
        store.insert_event(&current).await.unwrap();
        let result = store
            .upsert_registry_resident(&registration(current.id, "3201", Some(old_post.id)))
            .await;
        assert!(matches!(result, Err(DbError::PostNotInEvent { .. })));
    }

    #[tokio::test]
    async fn post_deletion_cascades_explicitly() {
        let store = MemoryStore::new();
        let flood = event("Flood A");
        store.insert_event(&flood).await.unwrap();
        let shelter = post(flood.id, "Shelter 1");
        store.insert_post(&shelter).await.unwrap();

        let (resident, _) = store
            .upsert_registry_resident(&registration(flood.id, "3201", Some(shelter.id)))
            .await
            .unwrap();
        assert_eq!(resident.current_location, "Shelter 1");
        assert_eq!(store.occupancy(shelter.id).await, 1);

        let item = LogisticsItem {
            id: ItemId::new(),
            posko_id: shelter.id,
            item_name: String::from("Rice"),
            unit: String::from("sack"),
            item_type: ItemType::Food,
            current_stock: 0,
            created_at: Utc::now(),
        };
        let opening = relief_ledger::opening_transaction(item.id, 5, &operator()).unwrap();
        store.insert_item(&item, opening).await.unwrap();

        let deletion = store.delete_post(shelter.id, Utc::now()).await.unwrap();
        assert_eq!(deletion.detached_residents, 1);
        assert_eq!(deletion.deleted_items, 1);
        assert_eq!(deletion.deleted_transactions, 1);

        let kept = store.get_resident(resident.id).await.unwrap();
        assert_eq!(kept.posko_id, None);
        assert_eq!(kept.current_location, "Shelter 1");
        assert!(store.get_item(item.id).await.is_none());
    }

    #[tokio::test]
    async fn refused_movement_leaves_balance() {
        let store = MemoryStore::new();
        let flood = event("Flood A");
        store.insert_event(&flood).await.unwrap();
        let shelter = post(flood.id, "Shelter 1");
        store.insert_post(&shelter).await.unwrap();
        let item = LogisticsItem {
            id: ItemId::new(),
            posko_id: shelter.id,
            item_name: String::from("Water"),
            unit: String::from("box"),
            item_type: ItemType::Food,
            current_stock: 0,
            created_at: Utc::now(),
        };
        store.insert_item(&item, None).await.unwrap();

        let out = relief_ledger::TransactionBuilder::new(item.id, Direction::Out)
            .quantity(1)
            .recorded_by(operator())
            .build()
            .unwrap();
        assert!(matches!(
            store.record_transaction(out).await,
            Err(DbError::Ledger(_))
        ));
        assert_eq!(store.get_item(item.id).await.unwrap().current_stock, 0);
        assert_eq!(
            store.verify_item(item.id).await.unwrap(),
            BalanceCheck::Balanced { balance: 0 }
        );
    }

    #[tokio::test]
    async fn deleting_resident_frees_natural_key() {
        let store = MemoryStore::new();
        let flood = event("Flood A");
        store.insert_event(&flood).await.unwrap();
        let (resident, _) = store
            .upsert_registry_resident(&registration(flood.id, "3201", None))
            .await
            .unwrap();
        store.delete_resident(resident.id).await.unwrap();

        let (again, inserted) = store
            .upsert_registry_resident(&registration(flood.id, "3201", None))
            .await
            .unwrap();
        assert!(inserted);
        assert_ne!(again.id, resident.id);

        let manual = AffectedResident {
            id: ResidentId::new(),
            event_id: flood.id,
            identity: ResidentIdentity::Manual {
                name: String::from("Siti"),
                age: 34,
                gender: Gender::Female,
                address: String::from("Jl. Kenanga 4"),
            },
            condition: ResidentCondition::Safe,
            special_needs: None,
            posko_id: None,
            current_location: String::from("Jl. Kenanga 4"),
            notes: String::new(),
            registered_by: operator(),
            updated_by: operator(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.insert_manual_resident(&manual).await.unwrap();
        let twin = AffectedResident {
            id: ResidentId::new(),
            ..manual
        };
        store.insert_manual_resident(&twin).await.unwrap();
        assert_eq!(store.list_residents(flood.id, &ResidentFilter::default()).await.len(), 3);
    }
}
