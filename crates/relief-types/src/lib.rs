//! Shared type definitions for the relief operations core.
//!
//! This crate is the single source of truth for the records exchanged
//! between the data layer, the services, and the HTTP surface. Types
//! defined here flow downstream to `TypeScript` via `ts-rs` for the
//! operations dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all record identifiers
//! - [`enums`] -- Status, condition, severity, and category enumerations
//! - [`structs`] -- Records (events, posts, residents, reports, stock) and
//!   dashboard read models
//! - [`query`] -- Pagination and filter parameters for listings

pub mod enums;
pub mod ids;
pub mod query;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    DamageSeverity, DamageType, Direction, EventStatus, Gender, ItemType, ReportStatus,
    ResidentCondition, SortOrder, SpecialNeed,
};
pub use ids::{EventId, ItemId, PostId, ReportId, ResidentId, TransactionId};
pub use query::{Page, ResidentFilter};
pub use structs::{
    Actor, AffectedResident, BalanceCheck, ConditionCounts, DamageReport, DisasterEvent,
    EventDashboard, LogisticsItem, LogisticsTransaction, PersonRecord, PostDeletion,
    PostOccupancy, PostUpdate, ReliefPost, ResidentIdentity, SeverityCounts, TransactionPage,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for dashboard consumers.

    #[test]
    fn export_bindings() {
        // ts-rs writes the files to `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::EventId::export_all();
        let _ = crate::ids::PostId::export_all();
        let _ = crate::ids::ResidentId::export_all();
        let _ = crate::ids::ReportId::export_all();
        let _ = crate::ids::ItemId::export_all();
        let _ = crate::ids::TransactionId::export_all();

        // Enums
        let _ = crate::enums::EventStatus::export_all();
        let _ = crate::enums::ResidentCondition::export_all();
        let _ = crate::enums::SpecialNeed::export_all();
        let _ = crate::enums::Gender::export_all();
        let _ = crate::enums::ReportStatus::export_all();
        let _ = crate::enums::DamageSeverity::export_all();
        let _ = crate::enums::DamageType::export_all();
        let _ = crate::enums::ItemType::export_all();
        let _ = crate::enums::Direction::export_all();
        let _ = crate::enums::SortOrder::export_all();

        // Structs
        let _ = crate::structs::Actor::export_all();
        let _ = crate::structs::DisasterEvent::export_all();
        let _ = crate::structs::ReliefPost::export_all();
        let _ = crate::structs::PostUpdate::export_all();
        let _ = crate::structs::PostDeletion::export_all();
        let _ = crate::structs::PostOccupancy::export_all();
        let _ = crate::structs::PersonRecord::export_all();
        let _ = crate::structs::ResidentIdentity::export_all();
        let _ = crate::structs::AffectedResident::export_all();
        let _ = crate::structs::DamageReport::export_all();
        let _ = crate::structs::LogisticsItem::export_all();
        let _ = crate::structs::LogisticsTransaction::export_all();
        let _ = crate::structs::TransactionPage::export_all();
        let _ = crate::structs::BalanceCheck::export_all();
        let _ = crate::structs::EventDashboard::export_all();

        // Queries
        let _ = crate::query::Page::export_all();
        let _ = crate::query::ResidentFilter::export_all();
    }
}
