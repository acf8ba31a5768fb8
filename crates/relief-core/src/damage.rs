//! Damage reports for property and infrastructure.

use chrono::Utc;
use relief_db::Store;
use relief_types::{
    Actor, DamageReport, DamageSeverity, DamageType, EventId, ReportId, ReportStatus,
    SeverityCounts,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ReliefError;
use crate::validate;

/// Input for filing a damage report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewReport {
    /// Short title.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// What was damaged.
    pub damage_type: DamageType,
    /// How badly.
    pub severity: DamageSeverity,
    /// Where.
    pub location: String,
    /// Photo reference.
    #[serde(default)]
    pub photo: Option<String>,
}

/// Files damage reports and tracks their status.
#[derive(Debug, Clone)]
pub struct DamageReportRegistry {
    store: Store,
}

impl DamageReportRegistry {
    /// Registry over the given store.
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// File a report. It starts `REPORTED`.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Validation`] for a blank title or location,
    /// [`ReliefError::NotFound`] for an unknown event.
    pub async fn create(
        &self,
        event_id: EventId,
        input: NewReport,
        actor: &Actor,
    ) -> Result<DamageReport, ReliefError> {
        validate::actor(actor)?;
        validate::non_blank("title", &input.title)?;
        validate::non_blank("location", &input.location)?;

        let now = Utc::now();
        let report = DamageReport {
            id: ReportId::new(),
            event_id,
            title: input.title,
            description: input.description,
            damage_type: input.damage_type,
            severity: input.severity,
            location: input.location,
            status: ReportStatus::Reported,
            photo: input.photo,
            reported_by: actor.clone(),
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.store.insert_report(&report).await {
            let err = ReliefError::from(err);
            warn!(event_id = %event_id, error = %err, "Damage report rejected");
            return Err(err);
        }

        info!(
            report_id = %report.id,
            event_id = %event_id,
            severity = ?report.severity,
            damage_type = ?report.damage_type,
            actor = %actor,
            "Damage reported"
        );
        Ok(report)
    }

    /// Set a report's status. Any transition is accepted.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown report.
    pub async fn update_status(
        &self,
        report_id: ReportId,
        status: ReportStatus,
        actor: &Actor,
    ) -> Result<DamageReport, ReliefError> {
        validate::actor(actor)?;
        let report = self
            .store
            .update_report_status(report_id, status, Utc::now())
            .await?;
        info!(
            report_id = %report_id,
            status = ?status,
            actor = %actor,
            "Damage report status changed"
        );
        Ok(report)
    }

    /// Report counts per severity, zero-filled.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown event.
    pub async fn counts_by_severity(
        &self,
        event_id: EventId,
    ) -> Result<SeverityCounts, ReliefError> {
        validate::existing_event(&self.store, event_id).await?;
        Ok(self.store.counts_by_severity(event_id).await?)
    }

    /// Look up a report.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown report.
    pub async fn get(&self, report_id: ReportId) -> Result<DamageReport, ReliefError> {
        self.store
            .get_report(report_id)
            .await?
            .ok_or_else(|| ReliefError::not_found("damage report", report_id))
    }

    /// Reports of an event, oldest first.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown event.
    pub async fn list(&self, event_id: EventId) -> Result<Vec<DamageReport>, ReliefError> {
        validate::existing_event(&self.store, event_id).await?;
        Ok(self.store.list_reports(event_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::{EventLifecycleManager, NewEvent};

    fn operator() -> Actor {
        Actor::new("op-2")
    }

    fn bridge(severity: DamageSeverity) -> NewReport {
        NewReport {
            title: String::from("Bridge collapse"),
            description: String::new(),
            damage_type: DamageType::Infrastructure,
            severity,
            location: String::from("Km 12"),
            photo: None,
        }
    }

    async fn setup() -> (DamageReportRegistry, EventId) {
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
        (DamageReportRegistry::new(store), event.id)
    }

    #[tokio::test]
    async fn any_status_transition_is_accepted() {
        let (damage, event_id) = setup().await;
        let report = damage
            .create(event_id, bridge(DamageSeverity::Heavy), &operator())
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Reported);

        let resolved = damage
            .update_status(report.id, ReportStatus::Resolved, &operator())
            .await
            .unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);
        let reopened = damage
            .update_status(report.id, ReportStatus::Verified, &operator())
            .await
            .unwrap();
        assert_eq!(reopened.status, ReportStatus::Verified);
    }

    #[tokio::test]
    async fn severity_counts_are_zero_filled() {
        let (damage, event_id) = setup().await;
        for severity in [DamageSeverity::Heavy, DamageSeverity::Heavy, DamageSeverity::Light] {
            damage.create(event_id, bridge(severity), &operator()).await.unwrap();
        }
        let counts = damage.counts_by_severity(event_id).await.unwrap();
        assert_eq!(counts.get(&DamageSeverity::Heavy), Some(&2));
        assert_eq!(counts.get(&DamageSeverity::Light), Some(&1));
        assert_eq!(counts.get(&DamageSeverity::Moderate), Some(&0));
    }

    #[tokio::test]
    async fn unknown_event_and_report_are_not_found() {
        let (damage, _) = setup().await;
        let result = damage
            .create(EventId::new(), bridge(DamageSeverity::Light), &operator())
            .await;
        assert!(matches!(result, Err(ReliefError::NotFound { entity: "event", .. })));
        assert!(matches!(
            damage
                .update_status(ReportId::new(), ReportStatus::Verified, &operator())
                .await,
            Err(ReliefError::NotFound { .. })
        ));
    }
}
