//! Mapping between domain enumerations and their stored string form.
//!
//! Enumerations are stored as lowercase `TEXT` guarded by `CHECK`
//! constraints (see the migration). The in-memory store never touches
//! these; only the `PostgreSQL` stores do.

use relief_types::{
    DamageSeverity, DamageType, Direction, EventStatus, Gender, ItemType, ReportStatus,
    ResidentCondition, SpecialNeed,
};

use crate::error::DbError;

/// Generates a `to_db` / `from_db` pair for a fieldless enum.
macro_rules! db_codec {
    ($ty:ident, $to:ident, $from:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[doc = concat!("Convert a [`", stringify!($ty), "`] to its stored string.")]
        pub const fn $to(value: $ty) -> &'static str {
            match value {
                $($ty::$variant => $text,)+
            }
        }

        #[doc = concat!("Parse a stored string back into a [`", stringify!($ty), "`].")]
        ///
        /// # Errors
        ///
        /// Returns [`DbError::Decode`] for a value outside the enumeration.
        pub fn $from(text: &str) -> Result<$ty, DbError> {
            match text {
                $($text => Ok($ty::$variant),)+
                other => Err(DbError::Decode(format!(
                    concat!("unknown ", stringify!($ty), " '{}'"),
                    other
                ))),
            }
        }
    };
}

db_codec!(EventStatus, event_status_to_db, event_status_from_db, {
    Active => "active",
    Resolved => "resolved",
});

db_codec!(ResidentCondition, condition_to_db, condition_from_db, {
    Safe => "safe",
    Displaced => "displaced",
    Injured => "injured",
    Missing => "missing",
    Deceased => "deceased",
    NeedsHelp => "needs_help",
});

db_codec!(SpecialNeed, special_need_to_db, special_need_from_db, {
    Elderly => "elderly",
    Infant => "infant",
    Pregnant => "pregnant",
    Disabled => "disabled",
    Ill => "ill",
});

db_codec!(Gender, gender_to_db, gender_from_db, {
    Male => "male",
    Female => "female",
});

db_codec!(ReportStatus, report_status_to_db, report_status_from_db, {
    Reported => "reported",
    Verified => "verified",
    InRepair => "in_repair",
    Resolved => "resolved",
});

db_codec!(DamageSeverity, severity_to_db, severity_from_db, {
    Light => "light",
    Moderate => "moderate",
    Heavy => "heavy",
});

db_codec!(DamageType, damage_type_to_db, damage_type_from_db, {
    Residential => "residential",
    PublicFacility => "public_facility",
    Infrastructure => "infrastructure",
    Agriculture => "agriculture",
    Other => "other",
});

db_codec!(ItemType, item_type_to_db, item_type_from_db, {
    Food => "food",
    Medicine => "medicine",
    Clothing => "clothing",
    Equipment => "equipment",
    Other => "other",
});

db_codec!(Direction, direction_to_db, direction_from_db, {
    In => "in",
    Out => "out",
});

/// Convert a stored `BIGINT` count to `u64`, clamping negatives to zero.
pub(crate) fn count_from_db(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

/// Convert a stored `BIGINT` capacity to `u32`.
pub(crate) fn capacity_from_db(capacity: i64) -> Result<u32, DbError> {
    u32::try_from(capacity)
        .map_err(|e| DbError::Decode(format!("capacity out of range: {capacity} ({e})")))
}

/// Convert an age to the `INTEGER` column without clamping.
pub(crate) fn age_to_db(age: u32) -> Result<i32, DbError> {
    i32::try_from(age).map_err(|e| DbError::OutOfRange {
        column: "age",
        detail: format!("{age} ({e})"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_condition_survives_storage() {
        for condition in ResidentCondition::ALL {
            assert_eq!(condition_from_db(condition_to_db(condition)).unwrap(), condition);
        }
    }

    #[test]
    fn multi_word_variants_use_snake_case() {
        assert_eq!(condition_to_db(ResidentCondition::NeedsHelp), "needs_help");
        assert_eq!(report_status_to_db(ReportStatus::InRepair), "in_repair");
        assert_eq!(damage_type_to_db(DamageType::PublicFacility), "public_facility");
    }

    #[test]
    fn unknown_value_is_a_decode_error() {
        assert!(matches!(direction_from_db("sideways"), Err(DbError::Decode(_))));
        assert!(matches!(event_status_from_db("ACTIVE"), Err(DbError::Decode(_))));
    }

    #[test]
    fn capacity_out_of_range_rejected() {
        assert!(capacity_from_db(-1).is_err());
        assert_eq!(capacity_from_db(40).unwrap(), 40);
    }

    #[test]
    fn age_beyond_integer_column_is_refused() {
        assert_eq!(age_to_db(42).unwrap(), 42);
        assert!(matches!(
            age_to_db(3_000_000_000),
            Err(DbError::OutOfRange { column: "age", .. })
        ));
    }
}
