//! Pagination and filter parameters for listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ResidentCondition, SortOrder};
use crate::ids::PostId;

/// Default number of rows in a page when the caller does not say.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// A window into an ordered listing.
///
/// Listings are ordered by (timestamp, id), so re-requesting the same
/// offset after new appends yields the same rows for oldest-first order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Page {
    /// Number of rows to skip.
    pub offset: u64,
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Ordering of the listing.
    pub order: SortOrder,
}

impl Page {
    /// First page with the given limit, oldest first.
    pub const fn first(limit: u32) -> Self {
        Self {
            offset: 0,
            limit,
            order: SortOrder::OldestFirst,
        }
    }

    /// Same window in the given order.
    #[must_use]
    pub const fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Offset of the page following this one, if `total` rows leave any.
    pub fn next_offset(&self, total: u64) -> Option<u64> {
        let next = self.offset.checked_add(u64::from(self.limit))?;
        (next < total).then_some(next)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_LIMIT)
    }
}

/// Filter for resident listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResidentFilter {
    /// Only residents in this condition.
    pub condition: Option<ResidentCondition>,
    /// Only residents sheltered at this post.
    pub posko_id: Option<PostId>,
    /// Only records modified at or after this instant.
    pub updated_since: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_offset_stops_at_total() {
        let page = Page::first(10);
        assert_eq!(page.next_offset(25), Some(10));
        assert_eq!(page.next_offset(10), None);
        assert_eq!(page.next_offset(0), None);
    }
}
