//! Relief operations services.
//!
//! Five components coordinate field operations during a declared disaster.
//! Each one holds a [`Store`] handle and enforces its invariants through
//! the data layer's atomic operations.
//!
//! # Architecture
//!
//! ```text
//! EventLifecycleManager   one ACTIVE event scopes everything below
//!     |
//!     +-- ReliefPostRegistry     posts, derived occupancy, deletion cascade
//!     |       +-- LogisticsLedger        per-post stock, append-only log
//!     +-- ResidentTracker        registry-linked or manual residents
//!     |       +-- CivilRegistry          identifier lookups
//!     +-- DamageReportRegistry   damage reports, severity counts
//! ```
//!
//! # Modules
//!
//! - [`events`] -- [`EventLifecycleManager`]
//! - [`posts`] -- [`ReliefPostRegistry`]
//! - [`residents`] -- [`ResidentTracker`]
//! - [`damage`] -- [`DamageReportRegistry`]
//! - [`logistics`] -- [`LogisticsLedger`]
//! - [`registry`] -- Civil registry clients
//! - [`config`] -- YAML configuration
//! - [`error`] -- [`ReliefError`]

pub mod config;
pub mod damage;
pub mod error;
pub mod events;
pub mod logistics;
pub mod posts;
pub mod registry;
pub mod residents;

mod validate;

pub use config::{ConfigError, ReliefConfig};
pub use damage::{DamageReportRegistry, NewReport};
pub use error::ReliefError;
pub use events::{EventLifecycleManager, NewEvent};
pub use logistics::{LogisticsLedger, NewItem, RecordedMovement, StockMovement};
pub use posts::{NewPost, ReliefPostRegistry};
pub use registry::{CivilRegistry, HttpRegistry, RegistryError, StaticRegistry};
pub use residents::{BulkRegistryEntry, ManualEntry, Registered, RegistryEntry, ResidentTracker};

use relief_db::Store;

use crate::config::LogisticsConfig;

/// All five components over one shared store.
#[derive(Debug, Clone)]
pub struct Relief {
    /// Disaster event lifecycle.
    pub events: EventLifecycleManager,
    /// Relief posts.
    pub posts: ReliefPostRegistry,
    /// Affected residents.
    pub residents: ResidentTracker,
    /// Damage reports.
    pub damage: DamageReportRegistry,
    /// Logistics stock.
    pub logistics: LogisticsLedger,
    store: Store,
}

impl Relief {
    /// Wire the components over `store`.
    pub fn new(store: Store, registry: CivilRegistry, limits: LogisticsConfig) -> Self {
        Self {
            events: EventLifecycleManager::new(store.clone()),
            posts: ReliefPostRegistry::new(store.clone()),
            residents: ResidentTracker::new(store.clone(), registry),
            damage: DamageReportRegistry::new(store.clone()),
            logistics: LogisticsLedger::new(store.clone(), limits),
            store,
        }
    }

    /// Components over a fresh in-memory store with default limits.
    pub fn in_memory(registry: CivilRegistry) -> Self {
        Self::new(Store::memory(), registry, LogisticsConfig::default())
    }

    /// The shared store.
    pub const fn store(&self) -> &Store {
        &self.store
    }
}
