//! Write parameters shared by both storage backends.

use chrono::{DateTime, Utc};
use relief_types::{Actor, EventId, PostId, ResidentCondition, ResidentId, SpecialNeed};

/// A registry-linked registration, applied as an upsert on the
/// `(event_id, external_id)` natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRegistration {
    /// Identifier used if the key is new.
    pub id: ResidentId,
    /// Scoping event.
    pub event_id: EventId,
    /// Civil-registry identifier.
    pub external_id: String,
    /// Condition to record.
    pub condition: ResidentCondition,
    /// Special-needs category. `None` keeps the stored value on update.
    pub special_needs: Option<SpecialNeed>,
    /// Shelter post. Always overwritten.
    pub posko_id: Option<PostId>,
    /// Operator notes. `None` keeps the stored value on update.
    pub notes: Option<String>,
    /// Location for a new record with no post (the registry address).
    pub home_location: String,
    /// Operator performing the registration.
    pub actor: Actor,
    /// Timestamp of the registration.
    pub at: DateTime<Utc>,
}

/// A condition change for an existing resident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionChange {
    /// The resident.
    pub resident_id: ResidentId,
    /// New condition.
    pub condition: ResidentCondition,
    /// New shelter post; already cleared by the caller for conditions
    /// that do not occupy a shelter.
    pub posko_id: Option<PostId>,
    /// Operator performing the change.
    pub actor: Actor,
    /// Timestamp of the change.
    pub at: DateTime<Utc>,
}
