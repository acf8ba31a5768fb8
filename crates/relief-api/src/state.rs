//! Shared application state for the operations API.

use relief_core::Relief;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The relief services.
    pub relief: Relief,
}

impl AppState {
    /// State over the given services.
    pub const fn new(relief: Relief) -> Self {
        Self { relief }
    }
}
