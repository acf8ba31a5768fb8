//! Affected residents: registration, condition tracking, shelter links.
//!
//! Registry-linked residents are keyed by `(event, national ID)`; a second
//! registration of the same person updates the existing record in place.
//! Manually identified residents are always new records.
//!
//! A resident is linked to a post only while displaced or injured. Any
//! other condition clears the link, whatever the caller passed.

use chrono::Utc;
use relief_db::{ConditionChange, RegistryRegistration, Store};
use relief_types::{
    Actor, AffectedResident, ConditionCounts, EventId, Gender, PostId, ResidentCondition,
    ResidentFilter, ResidentId, ResidentIdentity, SpecialNeed,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ReliefError;
use crate::registry::CivilRegistry;
use crate::validate;

/// Registration of one person known to the civil registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryEntry {
    /// National identifier.
    pub external_id: String,
    /// Condition to record.
    pub condition: ResidentCondition,
    /// Shelter post.
    #[serde(default)]
    pub posko_id: Option<PostId>,
    /// Special-needs category.
    #[serde(default)]
    pub special_needs: Option<SpecialNeed>,
    /// Operator notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Registration of many registry-linked people sharing one condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BulkRegistryEntry {
    /// National identifiers, processed in order.
    pub external_ids: Vec<String>,
    /// Condition to record for all of them.
    pub condition: ResidentCondition,
    /// Shelter post for all of them.
    #[serde(default)]
    pub posko_id: Option<PostId>,
    /// Special-needs category for all of them.
    #[serde(default)]
    pub special_needs: Option<SpecialNeed>,
}

/// Registration of a person with no registry link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManualEntry {
    /// Full name.
    pub name: String,
    /// Age in years.
    pub age: u32,
    /// Gender.
    pub gender: Gender,
    /// Home address.
    pub address: String,
    /// Condition to record.
    pub condition: ResidentCondition,
    /// Shelter post.
    #[serde(default)]
    pub posko_id: Option<PostId>,
    /// Special-needs category.
    #[serde(default)]
    pub special_needs: Option<SpecialNeed>,
    /// Operator notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Outcome of a registry-linked registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registered {
    /// The stored record.
    pub resident: AffectedResident,
    /// `true` if the record is new, `false` if an existing one was updated.
    pub created: bool,
}

/// Post link allowed for `condition`.
const fn shelter_link(condition: ResidentCondition, posko_id: Option<PostId>) -> Option<PostId> {
    if condition.occupies_shelter() {
        posko_id
    } else {
        None
    }
}

/// Tracks affected residents of an event.
#[derive(Debug, Clone)]
pub struct ResidentTracker {
    store: Store,
    registry: CivilRegistry,
}

impl ResidentTracker {
    /// Tracker over the given store, resolving identifiers through
    /// `registry`.
    pub const fn new(store: Store, registry: CivilRegistry) -> Self {
        Self { store, registry }
    }

    /// Register (or re-register) a person known to the civil registry.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] if the identifier, event or post is
    /// unknown, [`ReliefError::State`] if the event is resolved,
    /// [`ReliefError::Validation`] if the post serves another event,
    /// [`ReliefError::Registry`] if the registry cannot be reached.
    pub async fn register_from_registry(
        &self,
        event_id: EventId,
        entry: RegistryEntry,
        actor: &Actor,
    ) -> Result<Registered, ReliefError> {
        validate::actor(actor)?;
        validate::non_blank("external_id", &entry.external_id)?;

        // Fail fast before the registry round trip. The store re-checks
        // under its own lock.
        let event = validate::existing_event(&self.store, event_id).await?;
        if !event.is_active() {
            return Err(ReliefError::State(format!("event {event_id} is not active")));
        }

        let Some(person) = self.registry.resolve(&entry.external_id).await? else {
            warn!(
                event_id = %event_id,
                external_id = %entry.external_id,
                registry = self.registry.name(),
                "Identifier unknown to civil registry"
            );
            return Err(ReliefError::not_found("person", &entry.external_id));
        };

        let registration = RegistryRegistration {
            id: ResidentId::new(),
            event_id,
            posko_id: shelter_link(entry.condition, entry.posko_id),
            external_id: entry.external_id,
            condition: entry.condition,
            special_needs: entry.special_needs,
            notes: entry.notes,
            home_location: person.address,
            actor: actor.clone(),
            at: Utc::now(),
        };

        let (resident, created) = self
            .store
            .upsert_registry_resident(&registration)
            .await
            .map_err(|err| {
                let err = ReliefError::from(err);
                warn!(event_id = %event_id, error = %err, "Registry registration rejected");
                err
            })?;

        info!(
            resident_id = %resident.id,
            event_id = %event_id,
            condition = ?resident.condition,
            created,
            actor = %actor,
            "Registry-linked resident registered"
        );
        Ok(Registered { resident, created })
    }

    /// Register many registry-linked people. Each identifier succeeds or
    /// fails on its own; results follow input order.
    pub async fn bulk_register_from_registry(
        &self,
        event_id: EventId,
        entry: BulkRegistryEntry,
        actor: &Actor,
    ) -> Vec<Result<Registered, ReliefError>> {
        let mut results = Vec::with_capacity(entry.external_ids.len());
        for external_id in entry.external_ids {
            let single = RegistryEntry {
                external_id,
                condition: entry.condition,
                posko_id: entry.posko_id,
                special_needs: entry.special_needs,
                notes: None,
            };
            results.push(self.register_from_registry(event_id, single, actor).await);
        }

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            event_id = %event_id,
            total = results.len(),
            failed,
            actor = %actor,
            "Bulk registration finished"
        );
        results
    }

    /// Register a person entered by hand. Never deduplicated.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Validation`] for a blank name or a post serving
    /// another event, [`ReliefError::NotFound`] for an unknown event or
    /// post, [`ReliefError::State`] if the event is resolved.
    pub async fn register_manual(
        &self,
        event_id: EventId,
        entry: ManualEntry,
        actor: &Actor,
    ) -> Result<AffectedResident, ReliefError> {
        validate::actor(actor)?;
        validate::non_blank("name", &entry.name)?;
        validate::age(entry.age)?;

        let now = Utc::now();
        let resident = AffectedResident {
            id: ResidentId::new(),
            event_id,
            current_location: entry.address.clone(),
            identity: ResidentIdentity::Manual {
                name: entry.name,
                age: entry.age,
                gender: entry.gender,
                address: entry.address,
            },
            condition: entry.condition,
            special_needs: entry.special_needs,
            posko_id: shelter_link(entry.condition, entry.posko_id),
            notes: entry.notes.unwrap_or_default(),
            registered_by: actor.clone(),
            updated_by: actor.clone(),
            created_at: now,
            updated_at: now,
        };

        let stored = self
            .store
            .insert_manual_resident(&resident)
            .await
            .map_err(|err| {
                let err = ReliefError::from(err);
                warn!(event_id = %event_id, error = %err, "Manual registration rejected");
                err
            })?;

        info!(
            resident_id = %stored.id,
            event_id = %event_id,
            condition = ?stored.condition,
            actor = %actor,
            "Manual resident registered"
        );
        Ok(stored)
    }

    /// Change a resident's condition and post link. The link is cleared
    /// for conditions that do not occupy a shelter; otherwise `posko_id`
    /// replaces the current link and the location follows the post name.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown resident or post,
    /// [`ReliefError::Validation`] if the post serves another event.
    pub async fn update_condition(
        &self,
        resident_id: ResidentId,
        condition: ResidentCondition,
        posko_id: Option<PostId>,
        actor: &Actor,
    ) -> Result<AffectedResident, ReliefError> {
        validate::actor(actor)?;
        let change = ConditionChange {
            resident_id,
            condition,
            posko_id: shelter_link(condition, posko_id),
            actor: actor.clone(),
            at: Utc::now(),
        };
        if posko_id.is_some() && change.posko_id.is_none() {
            debug!(resident_id = %resident_id, condition = ?condition, "Post link cleared");
        }

        let resident = self.store.update_condition(&change).await.map_err(|err| {
            let err = ReliefError::from(err);
            warn!(resident_id = %resident_id, error = %err, "Condition change rejected");
            err
        })?;

        info!(
            resident_id = %resident_id,
            condition = ?condition,
            posko_id = ?resident.posko_id,
            actor = %actor,
            "Resident condition updated"
        );
        Ok(resident)
    }

    /// Set the free-text location of a resident who is not sheltered.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Validation`] for blank text,
    /// [`ReliefError::NotFound`] for an unknown resident,
    /// [`ReliefError::State`] while the resident is linked to a post.
    pub async fn update_location(
        &self,
        resident_id: ResidentId,
        location: &str,
        actor: &Actor,
    ) -> Result<AffectedResident, ReliefError> {
        validate::actor(actor)?;
        validate::non_blank("location", location)?;
        let resident = self
            .store
            .update_location(resident_id, location, actor, Utc::now())
            .await?;
        info!(resident_id = %resident_id, actor = %actor, "Resident location updated");
        Ok(resident)
    }

    /// Hard-delete a resident. No history is kept.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown resident.
    pub async fn delete(&self, resident_id: ResidentId, actor: &Actor) -> Result<(), ReliefError> {
        validate::actor(actor)?;
        self.store.delete_resident(resident_id).await?;
        info!(resident_id = %resident_id, actor = %actor, "Resident deleted");
        Ok(())
    }

    /// Look up a resident.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown resident.
    pub async fn get(&self, resident_id: ResidentId) -> Result<AffectedResident, ReliefError> {
        self.store
            .get_resident(resident_id)
            .await?
            .ok_or_else(|| ReliefError::not_found("resident", resident_id))
    }

    /// Residents of an event matching `filter`, least recently updated
    /// first. Notifiers poll with `updated_since`.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown event.
    pub async fn list(
        &self,
        event_id: EventId,
        filter: &ResidentFilter,
    ) -> Result<Vec<AffectedResident>, ReliefError> {
        validate::existing_event(&self.store, event_id).await?;
        Ok(self.store.list_residents(event_id, filter).await?)
    }

    /// Resident counts per condition, zero-filled.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown event.
    pub async fn counts_by_condition(
        &self,
        event_id: EventId,
    ) -> Result<ConditionCounts, ReliefError> {
        validate::existing_event(&self.store, event_id).await?;
        Ok(self.store.counts_by_condition(event_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::{EventLifecycleManager, NewEvent};
    use crate::posts::{NewPost, ReliefPostRegistry};
    use crate::registry::StaticRegistry;
    use relief_types::PersonRecord;

    const NIK: &str = "3201000000000001";

    fn operator() -> Actor {
        Actor::new("op-1")
    }

    struct Fixture {
        events: EventLifecycleManager,
        posts: ReliefPostRegistry,
        residents: ResidentTracker,
        event_id: EventId,
        shelter: PostId,
    }

    async fn fixture() -> Fixture {
        let store = Store::memory();
        let registry = CivilRegistry::Static(StaticRegistry::default().with_record(
            NIK,
            PersonRecord {
                name: String::from("Ahmad Sulaiman"),
                age: 42,
                gender: Gender::Male,
                address: String::from("Jl. Merdeka 1"),
            },
        ));
        let events = EventLifecycleManager::new(store.clone());
        let posts = ReliefPostRegistry::new(store.clone());
        let residents = ResidentTracker::new(store, registry);

        let event_id = events
            .create(
                NewEvent {
                    title: String::from("Flood A"),
                    location: String::from("Riverside"),
                    description: String::new(),
                },
                &operator(),
            )
            .await
            .unwrap()
            .id;
        let shelter = posts
            .create(
                event_id,
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
            .unwrap()
            .id;

        Fixture {
            events,
            posts,
            residents,
            event_id,
            shelter,
        }
    }

    fn displaced_at(posko_id: Option<PostId>) -> RegistryEntry {
        RegistryEntry {
            external_id: NIK.to_owned(),
            condition: ResidentCondition::Displaced,
            posko_id,
            special_needs: None,
            notes: None,
        }
    }

    fn manual(name: &str) -> ManualEntry {
        ManualEntry {
            name: name.to_owned(),
            age: 7,
            gender: Gender::Female,
            address: String::from("Kampung Baru"),
            condition: ResidentCondition::Missing,
            posko_id: None,
            special_needs: Some(SpecialNeed::Infant),
            notes: None,
        }
    }

    #[tokio::test]
    async fn registry_registration_shelters_resident() {
        let f = fixture().await;
        let registered = f
            .residents
            .register_from_registry(f.event_id, displaced_at(Some(f.shelter)), &operator())
            .await
            .unwrap();
        assert!(registered.created);
        assert_eq!(registered.resident.current_location, "Shelter 1");
        assert_eq!(f.posts.occupancy_of(f.shelter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn registering_twice_keeps_one_record() {
        let f = fixture().await;
        let first = f
            .residents
            .register_from_registry(f.event_id, displaced_at(Some(f.shelter)), &operator())
            .await
            .unwrap();
        let second = f
            .residents
            .register_from_registry(f.event_id, displaced_at(Some(f.shelter)), &operator())
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.resident.id, first.resident.id);

        let all = f
            .residents
            .list(f.event_id, &ResidentFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(f.posts.occupancy_of(f.shelter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_identifier_is_not_found() {
        let f = fixture().await;
        let mut entry = displaced_at(None);
        entry.external_id = String::from("0000");
        let result = f
            .residents
            .register_from_registry(f.event_id, entry, &operator())
            .await;
        assert!(matches!(result, Err(ReliefError::NotFound { entity: "person", .. })));
    }

    #[tokio::test]
    async fn resolved_event_refuses_registration() {
        let f = fixture().await;
        f.events.resolve(f.event_id, &operator()).await.unwrap();
        let result = f
            .residents
            .register_from_registry(f.event_id, displaced_at(None), &operator())
            .await;
        assert!(matches!(result, Err(ReliefError::State(_))));
        let manual = f
            .residents
            .register_manual(f.event_id, manual("Putri"), &operator())
            .await;
        assert!(matches!(manual, Err(ReliefError::State(_))));
    }

    #[tokio::test]
    async fn bulk_results_follow_input_order() {
        let f = fixture().await;
        let outcome = f
            .residents
            .bulk_register_from_registry(
                f.event_id,
                BulkRegistryEntry {
                    external_ids: vec![String::from("0000"), NIK.to_owned(), NIK.to_owned()],
                    condition: ResidentCondition::Injured,
                    posko_id: Some(f.shelter),
                    special_needs: None,
                },
                &operator(),
            )
            .await;
        assert_eq!(outcome.len(), 3);
        assert!(matches!(outcome.first(), Some(Err(ReliefError::NotFound { .. }))));
        assert!(matches!(outcome.get(1), Some(Ok(r)) if r.created));
        assert!(matches!(outcome.get(2), Some(Ok(r)) if !r.created));
    }

    #[tokio::test]
    async fn safe_condition_clears_post_link() {
        let f = fixture().await;
        let resident = f
            .residents
            .register_from_registry(f.event_id, displaced_at(Some(f.shelter)), &operator())
            .await
            .unwrap()
            .resident;

        let safe = f
            .residents
            .update_condition(resident.id, ResidentCondition::Safe, Some(f.shelter), &operator())
            .await
            .unwrap();
        assert_eq!(safe.posko_id, None);
        assert_eq!(f.posts.occupancy_of(f.shelter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn location_is_locked_while_sheltered() {
        let f = fixture().await;
        let resident = f
            .residents
            .register_from_registry(f.event_id, displaced_at(Some(f.shelter)), &operator())
            .await
            .unwrap()
            .resident;
        let locked = f
            .residents
            .update_location(resident.id, "Hospital", &operator())
            .await;
        assert!(matches!(locked, Err(ReliefError::State(_))));

        f.residents
            .update_condition(resident.id, ResidentCondition::Safe, None, &operator())
            .await
            .unwrap();
        let moved = f
            .residents
            .update_location(resident.id, "Relatives in town", &operator())
            .await
            .unwrap();
        assert_eq!(moved.current_location, "Relatives in town");
    }

    #[tokio::test]
    async fn manual_entries_are_never_merged() {
        let f = fixture().await;
        let a = f
            .residents
            .register_manual(f.event_id, manual("Putri"), &operator())
            .await
            .unwrap();
        let b = f
            .residents
            .register_manual(f.event_id, manual("Putri"), &operator())
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.current_location, "Kampung Baru");

        let counts = f.residents.counts_by_condition(f.event_id).await.unwrap();
        assert_eq!(counts.get(&ResidentCondition::Missing), Some(&2));
        assert_eq!(counts.get(&ResidentCondition::Safe), Some(&0));

        f.residents.delete(a.id, &operator()).await.unwrap();
        assert!(matches!(
            f.residents.get(a.id).await,
            Err(ReliefError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn implausible_manual_age_is_rejected() {
        let f = fixture().await;
        let entry = ManualEntry {
            age: 3_000_000_000,
            ..manual("Putri")
        };
        let err = f
            .residents
            .register_manual(f.event_id, entry, &operator())
            .await
            .unwrap_err();
        assert!(matches!(err, ReliefError::Validation(_)));
        let all = f
            .residents
            .list(f.event_id, &ResidentFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn updated_since_filter_supports_polling() {
        let f = fixture().await;
        let before = Utc::now();
        let resident = f
            .residents
            .register_manual(f.event_id, manual("Putri"), &operator())
            .await
            .unwrap();
        let filter = ResidentFilter {
            updated_since: Some(before),
            ..ResidentFilter::default()
        };
        let changed = f.residents.list(f.event_id, &filter).await.unwrap();
        assert_eq!(changed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![resident.id]);
    }
}
