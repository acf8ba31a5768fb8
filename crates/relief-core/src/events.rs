//! Disaster event lifecycle.
//!
//! At most one event is `ACTIVE` at a time. The check is the storage
//! layer's uniqueness constraint, not a flag held in this process, so it
//! holds across instances sharing one database.
//!
//! ```text
//! ACTIVE --resolve--> RESOLVED (terminal)
//! ```

use chrono::Utc;
use relief_db::Store;
use relief_types::{Actor, DisasterEvent, EventDashboard, EventId, EventStatus, PostOccupancy};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ReliefError;
use crate::validate;

/// Input for declaring an event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewEvent {
    /// Short title.
    pub title: String,
    /// Affected area.
    pub location: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
}

/// Declares, resolves and summarizes disaster events.
#[derive(Debug, Clone)]
pub struct EventLifecycleManager {
    store: Store,
}

impl EventLifecycleManager {
    /// Manager over the given store.
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Declare a new event. It starts `ACTIVE`.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Validation`] for a blank title or location,
    /// [`ReliefError::Conflict`] while another event is active.
    pub async fn create(
        &self,
        input: NewEvent,
        actor: &Actor,
    ) -> Result<DisasterEvent, ReliefError> {
        validate::actor(actor)?;
        validate::non_blank("title", &input.title)?;
        validate::non_blank("location", &input.location)?;

        let event = DisasterEvent {
            id: EventId::new(),
            title: input.title,
            description: input.description,
            status: EventStatus::Active,
            location: input.location,
            start_date: Utc::now(),
            end_date: None,
            declared_by: actor.clone(),
            resolved_by: None,
        };

        if let Err(err) = self.store.insert_event(&event).await {
            let err = ReliefError::from(err);
            warn!(title = %event.title, error = %err, "Event declaration rejected");
            return Err(err);
        }

        info!(
            event_id = %event.id,
            title = %event.title,
            location = %event.location,
            actor = %actor,
            "Disaster event declared"
        );
        Ok(event)
    }

    /// Resolve an active event.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown event,
    /// [`ReliefError::State`] if it is already resolved.
    pub async fn resolve(
        &self,
        event_id: EventId,
        actor: &Actor,
    ) -> Result<DisasterEvent, ReliefError> {
        validate::actor(actor)?;
        match self.store.resolve_event(event_id, actor, Utc::now()).await {
            Ok(event) => {
                info!(event_id = %event.id, actor = %actor, "Disaster event resolved");
                Ok(event)
            }
            Err(err) => {
                let err = ReliefError::from(err);
                warn!(event_id = %event_id, error = %err, "Event resolution rejected");
                Err(err)
            }
        }
    }

    /// The currently active event, if any.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Storage`] if the lookup fails.
    pub async fn active(&self) -> Result<Option<DisasterEvent>, ReliefError> {
        Ok(self.store.active_event().await?)
    }

    /// Look up an event.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown event.
    pub async fn get(&self, event_id: EventId) -> Result<DisasterEvent, ReliefError> {
        validate::existing_event(&self.store, event_id).await
    }

    /// All events, newest first.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Storage`] if the listing fails.
    pub async fn list(&self) -> Result<Vec<DisasterEvent>, ReliefError> {
        Ok(self.store.list_events().await?)
    }

    /// Aggregated dashboard for an event: resident counts per condition,
    /// damage counts per severity, and every post's occupancy.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown event.
    pub async fn dashboard(&self, event_id: EventId) -> Result<EventDashboard, ReliefError> {
        let event = validate::existing_event(&self.store, event_id).await?;
        let residents_by_condition = self.store.counts_by_condition(event_id).await?;
        let damage_by_severity = self.store.counts_by_severity(event_id).await?;
        let occupancy = self.store.occupancy_by_post(event_id).await?;
        let posts = self
            .store
            .list_posts(event_id)
            .await?
            .iter()
            .map(|post| PostOccupancy::derive(post, occupancy.get(&post.id).copied().unwrap_or(0)))
            .collect::<Vec<_>>();

        debug!(event_id = %event_id, posts = posts.len(), "Dashboard assembled");
        Ok(EventDashboard {
            event,
            residents_by_condition,
            damage_by_severity,
            posts,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use relief_types::{DamageSeverity, ResidentCondition};

    fn manager() -> EventLifecycleManager {
        EventLifecycleManager::new(Store::memory())
    }

    fn flood(title: &str) -> NewEvent {
        NewEvent {
            title: title.to_owned(),
            location: String::from("Riverside"),
            description: String::new(),
        }
    }

    fn operator() -> Actor {
        Actor::new("op-1")
    }

    #[tokio::test]
    async fn second_active_event_conflicts_until_first_resolves() {
        let events = manager();
        let a = events.create(flood("A"), &operator()).await.unwrap();
        assert!(a.is_active());

        let b = events.create(flood("B"), &operator()).await;
        assert!(matches!(b, Err(ReliefError::Conflict(_))));

        let resolved = events.resolve(a.id, &operator()).await.unwrap();
        assert_eq!(resolved.status, EventStatus::Resolved);
        assert_eq!(resolved.resolved_by, Some(operator()));

        let b = events.create(flood("B"), &operator()).await.unwrap();
        assert_eq!(events.active().await.unwrap().map(|e| e.id), Some(b.id));
    }

    #[tokio::test]
    async fn resolving_twice_is_a_state_error() {
        let events = manager();
        let a = events.create(flood("A"), &operator()).await.unwrap();
        events.resolve(a.id, &operator()).await.unwrap();
        let again = events.resolve(a.id, &operator()).await;
        assert!(matches!(again, Err(ReliefError::State(_))));
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let events = manager();
        let missing = EventId::new();
        assert!(matches!(
            events.resolve(missing, &operator()).await,
            Err(ReliefError::NotFound { entity: "event", .. })
        ));
        assert!(matches!(
            events.get(missing).await,
            Err(ReliefError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let events = manager();
        let result = events.create(flood("   "), &operator()).await;
        assert!(matches!(result, Err(ReliefError::Validation(_))));
        assert!(events.active().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_dashboard_is_zero_filled() {
        let events = manager();
        let a = events.create(flood("A"), &operator()).await.unwrap();
        let dashboard = events.dashboard(a.id).await.unwrap();
        assert_eq!(dashboard.event.id, a.id);
        assert!(dashboard.posts.is_empty());
        assert_eq!(
            dashboard.residents_by_condition.get(&ResidentCondition::Missing),
            Some(&0)
        );
        assert_eq!(dashboard.damage_by_severity.get(&DamageSeverity::Heavy), Some(&0));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let events = manager();
        let a = events.create(flood("A"), &operator()).await.unwrap();
        events.resolve(a.id, &operator()).await.unwrap();
        let b = events.create(flood("B"), &operator()).await.unwrap();
        let ids: Vec<_> = events.list().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
