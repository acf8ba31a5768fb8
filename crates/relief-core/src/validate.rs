//! Input checks shared by the services.

use relief_db::Store;
use relief_types::{Actor, DisasterEvent, EventId};

use crate::error::ReliefError;

/// Reject blank (empty or whitespace-only) text.
pub(crate) fn non_blank(field: &str, value: &str) -> Result<(), ReliefError> {
    if value.trim().is_empty() {
        return Err(ReliefError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

/// Oldest age accepted for a manually entered person.
pub(crate) const MAX_AGE: u32 = 150;

/// Reject ages no living person has.
pub(crate) fn age(value: u32) -> Result<(), ReliefError> {
    if value > MAX_AGE {
        return Err(ReliefError::Validation(format!(
            "age must be at most {MAX_AGE}, got {value}"
        )));
    }
    Ok(())
}

/// Reject an empty operator reference.
pub(crate) fn actor(actor: &Actor) -> Result<(), ReliefError> {
    non_blank("operator", actor.as_str())
}

/// Load an event or fail with `NotFound`.
pub(crate) async fn existing_event(
    store: &Store,
    event_id: EventId,
) -> Result<DisasterEvent, ReliefError> {
    store
        .get_event(event_id)
        .await?
        .ok_or_else(|| ReliefError::not_found("event", event_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_blank() {
        assert!(non_blank("title", "  \t").is_err());
        assert!(non_blank("title", "Flood A").is_ok());
        assert!(actor(&Actor::new("")).is_err());
    }

    #[test]
    fn age_is_bounded() {
        assert!(age(0).is_ok());
        assert!(age(MAX_AGE).is_ok());
        assert!(matches!(age(3_000_000_000), Err(ReliefError::Validation(_))));
    }
}
