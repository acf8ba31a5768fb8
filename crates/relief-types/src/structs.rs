//! Core entity structs for the relief operations core.
//!
//! Covers the five persisted records (`DisasterEvent`, `ReliefPost`,
//! `AffectedResident`, `DamageReport`, `LogisticsItem` with its
//! `LogisticsTransaction` log) plus the read models served to dashboards.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    DamageSeverity, DamageType, Direction, EventStatus, Gender, ItemType, ReportStatus,
    ResidentCondition, SpecialNeed,
};
use crate::ids::{EventId, ItemId, PostId, ReportId, ResidentId, TransactionId};

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Reference to the operator performing a mutation.
///
/// The caller authenticates operators; this core only records who acted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Actor(pub String);

impl Actor {
    /// Wrap an operator reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Borrow the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// DisasterEvent
// ---------------------------------------------------------------------------

/// A declared disaster that scopes all field operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisasterEvent {
    /// Unique identifier.
    pub id: EventId,
    /// Short title, e.g. "Flood A".
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Affected area.
    pub location: String,
    /// When the event was declared.
    pub start_date: DateTime<Utc>,
    /// When the event was resolved, if it has been.
    pub end_date: Option<DateTime<Utc>>,
    /// Operator who declared the event.
    pub declared_by: Actor,
    /// Operator who resolved the event.
    pub resolved_by: Option<Actor>,
}

impl DisasterEvent {
    /// Whether the event still accepts new field records.
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }
}

// ---------------------------------------------------------------------------
// ReliefPost
// ---------------------------------------------------------------------------

/// A relief post (posko): a shelter where displaced residents and
/// supplies are organized.
///
/// Occupancy is never stored here; it is derived from residents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReliefPost {
    /// Unique identifier.
    pub id: PostId,
    /// Event this post serves.
    pub event_id: EventId,
    /// Display name; mirrored into linked residents' `current_location`.
    pub name: String,
    /// Address or landmark.
    pub location: String,
    /// Planned number of sheltered residents (soft limit).
    pub capacity: u32,
    /// Person in charge.
    pub pic_name: String,
    /// Phone number of the person in charge.
    pub pic_phone: String,
    /// Photo reference.
    pub photo: Option<String>,
    /// Map link.
    pub map_link: Option<String>,
    /// Operator who opened the post.
    pub created_by: Actor,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a post's mutable fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PostUpdate {
    /// New name.
    pub name: Option<String>,
    /// New location.
    pub location: Option<String>,
    /// New capacity.
    pub capacity: Option<u32>,
    /// New person in charge.
    pub pic_name: Option<String>,
    /// New phone number.
    pub pic_phone: Option<String>,
    /// New photo reference.
    pub photo: Option<String>,
    /// New map link.
    pub map_link: Option<String>,
}

impl PostUpdate {
    /// Whether the update touches no field at all.
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.capacity.is_none()
            && self.pic_name.is_none()
            && self.pic_phone.is_none()
            && self.photo.is_none()
            && self.map_link.is_none()
    }

    /// Apply the update to a post in place.
    pub fn apply_to(&self, post: &mut ReliefPost) {
        if let Some(name) = &self.name {
            post.name.clone_from(name);
        }
        if let Some(location) = &self.location {
            post.location.clone_from(location);
        }
        if let Some(capacity) = self.capacity {
            post.capacity = capacity;
        }
        if let Some(pic_name) = &self.pic_name {
            post.pic_name.clone_from(pic_name);
        }
        if let Some(pic_phone) = &self.pic_phone {
            post.pic_phone.clone_from(pic_phone);
        }
        if self.photo.is_some() {
            post.photo.clone_from(&self.photo);
        }
        if self.map_link.is_some() {
            post.map_link.clone_from(&self.map_link);
        }
    }
}

/// Outcome of the post-deletion cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PostDeletion {
    /// The deleted post.
    pub post_id: PostId,
    /// Residents detached from the post (records kept).
    pub detached_residents: u64,
    /// Logistics items deleted with the post.
    pub deleted_items: u64,
    /// Stock transactions deleted with those items.
    pub deleted_transactions: u64,
}

/// Occupancy read model for a single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PostOccupancy {
    /// The post.
    pub post_id: PostId,
    /// Post name.
    pub name: String,
    /// Planned capacity.
    pub capacity: u32,
    /// Residents currently sheltered (displaced or injured and linked).
    pub occupancy: u32,
    /// Remaining places, zero when full or over capacity.
    pub available: u32,
    /// Whether occupancy exceeds capacity. Allowed, but surfaced.
    pub over_capacity: bool,
    /// Occupancy as a whole percentage of capacity. `None` when the
    /// capacity is zero.
    pub utilization_percent: Option<u32>,
}

impl PostOccupancy {
    /// Derive the read model from a post and its current occupancy count.
    pub fn derive(post: &ReliefPost, occupancy: u32) -> Self {
        let utilization_percent = u64::from(occupancy)
            .checked_mul(100)
            .and_then(|scaled| scaled.checked_div(u64::from(post.capacity)))
            .map(|pct| u32::try_from(pct).unwrap_or(u32::MAX));
        Self {
            post_id: post.id,
            name: post.name.clone(),
            capacity: post.capacity,
            occupancy,
            available: post.capacity.saturating_sub(occupancy),
            over_capacity: occupancy > post.capacity,
            utilization_percent,
        }
    }
}

// ---------------------------------------------------------------------------
// AffectedResident
// ---------------------------------------------------------------------------

/// Personal details resolved from the civil registry or typed in by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PersonRecord {
    /// Full name.
    pub name: String,
    /// Age in years.
    pub age: u32,
    /// Gender.
    pub gender: Gender,
    /// Home address.
    pub address: String,
}

/// How a resident is identified.
///
/// Exactly one form applies; the type makes a record that is both (or
/// neither) unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ResidentIdentity {
    /// Linked to a civil-registry entry by national identifier.
    RegistryLinked {
        /// Civil-registry identifier.
        external_id: String,
    },
    /// Entered by hand, with no registry link.
    Manual {
        /// Full name.
        name: String,
        /// Age in years.
        age: u32,
        /// Gender.
        gender: Gender,
        /// Home address.
        address: String,
    },
}

impl ResidentIdentity {
    /// The civil-registry identifier, for registry-linked residents.
    pub fn external_id(&self) -> Option<&str> {
        match self {
            Self::RegistryLinked { external_id } => Some(external_id),
            Self::Manual { .. } => None,
        }
    }
}

/// A person affected by the disaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AffectedResident {
    /// Unique identifier.
    pub id: ResidentId,
    /// Event the record belongs to.
    pub event_id: EventId,
    /// Registry link or manual details.
    pub identity: ResidentIdentity,
    /// Current condition.
    pub condition: ResidentCondition,
    /// Special-needs category.
    pub special_needs: Option<SpecialNeed>,
    /// Shelter post; only set while the condition occupies a shelter.
    pub posko_id: Option<PostId>,
    /// Where the resident is. Mirrors the post name while linked.
    pub current_location: String,
    /// Operator notes.
    pub notes: String,
    /// Operator who first registered the resident.
    pub registered_by: Actor,
    /// Operator who last changed the record.
    pub updated_by: Actor,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last modification time; external notifiers poll on this.
    pub updated_at: DateTime<Utc>,
}

/// Per-condition resident counts for an event.
pub type ConditionCounts = BTreeMap<ResidentCondition, u64>;

// ---------------------------------------------------------------------------
// DamageReport
// ---------------------------------------------------------------------------

/// A damage entry for property or infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DamageReport {
    /// Unique identifier.
    pub id: ReportId,
    /// Event the report belongs to.
    pub event_id: EventId,
    /// Short title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// What was damaged.
    pub damage_type: DamageType,
    /// How badly.
    pub severity: DamageSeverity,
    /// Where.
    pub location: String,
    /// Workflow status.
    pub status: ReportStatus,
    /// Photo reference.
    pub photo: Option<String>,
    /// Operator who filed the report.
    pub reported_by: Actor,
    /// Filing time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// Per-severity damage counts for an event.
pub type SeverityCounts = BTreeMap<DamageSeverity, u64>;

// ---------------------------------------------------------------------------
// Logistics
// ---------------------------------------------------------------------------

/// A stock-keeping item held at a post.
///
/// `current_stock` is a materialized balance. It changes only through a
/// recorded [`LogisticsTransaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogisticsItem {
    /// Unique identifier.
    pub id: ItemId,
    /// Owning post.
    pub posko_id: PostId,
    /// Item name, e.g. "Rice".
    pub item_name: String,
    /// Counting unit, e.g. "sack".
    pub unit: String,
    /// Category.
    pub item_type: ItemType,
    /// Balance: sum of IN quantities minus sum of OUT quantities.
    pub current_stock: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One append-only entry in an item's stock log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogisticsTransaction {
    /// Unique identifier (time-ordered).
    pub id: TransactionId,
    /// Item whose stock moved.
    pub item_id: ItemId,
    /// IN or OUT.
    pub direction: Direction,
    /// Units moved; always positive.
    pub quantity: i64,
    /// When the movement was recorded.
    pub timestamp: DateTime<Utc>,
    /// Optional note (donor, recipient, reason).
    pub note: Option<String>,
    /// Operator who recorded the movement.
    pub recorded_by: Actor,
}

impl LogisticsTransaction {
    /// Signed effect on the balance: `+quantity` for IN, `-quantity` for OUT.
    pub fn signed_quantity(&self) -> Option<i64> {
        match self.direction {
            Direction::In => Some(self.quantity),
            Direction::Out => self.quantity.checked_neg(),
        }
    }
}

/// One page of an item's transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TransactionPage {
    /// Transactions on this page, in the requested order.
    pub transactions: Vec<LogisticsTransaction>,
    /// Total transactions recorded for the item.
    pub total: u64,
    /// Offset of the next page, if any remain.
    pub next_offset: Option<u64>,
}

/// Result of replaying an item's log against its materialized balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum BalanceCheck {
    /// Balance equals the replayed log.
    Balanced {
        /// The agreed balance.
        balance: i64,
    },
    /// Balance and log disagree.
    Drift {
        /// Balance derived from the log.
        expected: i64,
        /// Materialized balance on the item.
        recorded: i64,
    },
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Aggregated read model for an event dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventDashboard {
    /// The event.
    pub event: DisasterEvent,
    /// Resident counts for every condition (zero-filled).
    pub residents_by_condition: ConditionCounts,
    /// Damage counts for every severity (zero-filled).
    pub damage_by_severity: SeverityCounts,
    /// Occupancy of every post serving the event.
    pub posts: Vec<PostOccupancy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(capacity: u32) -> ReliefPost {
        let now = Utc::now();
        ReliefPost {
            id: PostId::new(),
            event_id: EventId::new(),
            name: String::from("Shelter 1"),
            location: String::from("Village hall"),
            capacity,
            pic_name: String::from("Budi"),
            pic_phone: String::from("0812"),
            photo: None,
            map_link: None,
            created_by: Actor::new("op-1"),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn occupancy_over_capacity_is_surfaced() {
        let summary = PostOccupancy::derive(&post(10), 12);
        assert!(summary.over_capacity);
        assert_eq!(summary.available, 0);
        assert_eq!(summary.utilization_percent, Some(120));
    }

    #[test]
    fn zero_capacity_has_no_percentage() {
        let summary = PostOccupancy::derive(&post(0), 3);
        assert!(summary.over_capacity);
        assert_eq!(summary.utilization_percent, None);
    }

    #[test]
    fn post_update_applies_only_set_fields() {
        let mut target = post(10);
        let update = PostUpdate {
            capacity: Some(25),
            photo: Some(String::from("hall.jpg")),
            ..PostUpdate::default()
        };
        update.apply_to(&mut target);
        assert_eq!(target.capacity, 25);
        assert_eq!(target.name, "Shelter 1");
        assert_eq!(target.photo.as_deref(), Some("hall.jpg"));
    }

    #[test]
    fn identity_is_tagged_on_the_wire() {
        let identity = ResidentIdentity::RegistryLinked {
            external_id: String::from("3201000000000001"),
        };
        let json = serde_json::to_value(&identity).unwrap_or_default();
        assert_eq!(
            json.get("kind").and_then(|v| v.as_str()),
            Some("REGISTRY_LINKED")
        );
        assert_eq!(
            json.get("external_id").and_then(|v| v.as_str()),
            Some("3201000000000001")
        );
        assert_eq!(identity.external_id(), Some("3201000000000001"));
    }
}
