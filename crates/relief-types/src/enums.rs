//! Enumeration types for the relief operations core.
//!
//! All enumerations serialize as `SCREAMING_SNAKE_CASE` strings on the
//! wire (`"ACTIVE"`, `"NEEDS_HELP"`, `"IN_REPAIR"`), which is the form
//! dashboards and field clients exchange.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Disaster events
// ---------------------------------------------------------------------------

/// Lifecycle status of a disaster event.
///
/// `Active` transitions to `Resolved` exactly once. `Resolved` is
/// terminal; an event is never reactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum EventStatus {
    /// The emergency is ongoing and scopes all field operations.
    Active,
    /// The emergency has been closed.
    Resolved,
}

// ---------------------------------------------------------------------------
// Residents
// ---------------------------------------------------------------------------

/// Condition of an affected resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ResidentCondition {
    /// Unharmed and not in need of shelter.
    Safe,
    /// Forced from home; may be sheltered at a post.
    Displaced,
    /// Injured; may be sheltered at a post.
    Injured,
    /// Whereabouts unknown.
    Missing,
    /// Confirmed dead.
    Deceased,
    /// Requires assistance but is not sheltered.
    NeedsHelp,
}

impl ResidentCondition {
    /// Every condition, in dashboard display order.
    pub const ALL: [Self; 6] = [
        Self::Safe,
        Self::Displaced,
        Self::Injured,
        Self::Missing,
        Self::Deceased,
        Self::NeedsHelp,
    ];

    /// Whether a resident in this condition may be linked to a post and
    /// counts toward its occupancy.
    pub const fn occupies_shelter(self) -> bool {
        matches!(self, Self::Displaced | Self::Injured)
    }
}

/// Special-needs category of a resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum SpecialNeed {
    /// Elderly person.
    Elderly,
    /// Infant or young child.
    Infant,
    /// Pregnant woman.
    Pregnant,
    /// Person with a disability.
    Disabled,
    /// Chronically or acutely ill.
    Ill,
}

/// Gender recorded for manually entered residents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
}

// ---------------------------------------------------------------------------
// Damage reports
// ---------------------------------------------------------------------------

/// Workflow status of a damage report.
///
/// The usual progression is `Reported -> Verified -> InRepair -> Resolved`
/// but the core accepts any transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ReportStatus {
    /// Submitted from the field, not yet checked.
    Reported,
    /// Confirmed by an operator.
    Verified,
    /// Repair work under way.
    InRepair,
    /// Repaired or otherwise closed.
    Resolved,
}

/// Severity of reported damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum DamageSeverity {
    /// Light damage; still usable.
    Light,
    /// Moderate damage; partially usable.
    Moderate,
    /// Heavy damage; unusable.
    Heavy,
}

impl DamageSeverity {
    /// Every severity, lightest first.
    pub const ALL: [Self; 3] = [Self::Light, Self::Moderate, Self::Heavy];
}

/// Category of damaged property or infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum DamageType {
    /// Private homes.
    Residential,
    /// Schools, clinics, places of worship, offices.
    PublicFacility,
    /// Roads, bridges, water and power networks.
    Infrastructure,
    /// Fields, livestock, irrigation.
    Agriculture,
    /// Anything else.
    Other,
}

// ---------------------------------------------------------------------------
// Logistics
// ---------------------------------------------------------------------------

/// Category of a logistics item held at a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ItemType {
    /// Food and drinking water.
    Food,
    /// Medicine and medical supplies.
    Medicine,
    /// Clothing and blankets.
    Clothing,
    /// Tents, generators, tools.
    Equipment,
    /// Anything else.
    Other,
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Direction {
    /// Stock received at the post.
    In,
    /// Stock distributed from the post.
    Out,
}

/// Display order for paged listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum SortOrder {
    /// Storage (append) order.
    #[default]
    OldestFirst,
    /// Reverse append order, for activity feeds.
    NewestFirst,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_displaced_and_injured_occupy_shelter() {
        let sheltered: Vec<ResidentCondition> = ResidentCondition::ALL
            .into_iter()
            .filter(|c| c.occupies_shelter())
            .collect();
        assert_eq!(
            sheltered,
            vec![ResidentCondition::Displaced, ResidentCondition::Injured]
        );
    }

    #[test]
    fn enums_use_screaming_snake_case() {
        let json = serde_json::to_string(&ResidentCondition::NeedsHelp).unwrap_or_default();
        assert_eq!(json, "\"NEEDS_HELP\"");
        let json = serde_json::to_string(&ReportStatus::InRepair).unwrap_or_default();
        assert_eq!(json, "\"IN_REPAIR\"");
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let parsed: Result<Direction, _> = serde_json::from_str("\"SIDEWAYS\"");
        assert!(parsed.is_err());
    }
}
