//! Data layer for the relief operations core (`PostgreSQL` + in-memory).
//!
//! `PostgreSQL` is the durable, multi-instance store. The in-memory store
//! serves tests and single-instance deployments. Both enforce the same
//! invariants with the same atomicity, and [`Store`] selects between them
//! at startup.
//!
//! # Architecture
//!
//! ```text
//! Services (relief-core)
//!     |
//!     +-- Store::Memory   --> MemoryStore (one RwLock over all tables)
//!     |
//!     +-- Store::Postgres --> PostgresPool
//!         |-- EventStore      (single active slot: partial unique index)
//!         |-- PostStore       (explicit deletion cascade)
//!         |-- ResidentStore   (natural-key upsert, location mirroring)
//!         |-- DamageStore     (reports, severity counts)
//!         +-- LogisticsStore  (row-locked stock ledger)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`memory`] -- In-memory backend
//! - [`store`] -- The [`Store`] dispatch enum
//! - [`event_store`], [`post_store`], [`resident_store`],
//!   [`damage_store`], [`logistics_store`] -- Per-table `PostgreSQL` stores
//! - [`codec`] -- Enum <-> stored string mapping
//! - [`params`] -- Write parameters shared by both backends
//! - [`error`] -- Shared error types

pub mod codec;
pub mod damage_store;
pub mod error;
pub mod event_store;
pub mod logistics_store;
pub mod memory;
pub mod params;
pub mod post_store;
pub mod postgres;
pub mod resident_store;
pub mod store;

mod locks;

// Re-export primary types for convenience.
pub use damage_store::DamageStore;
pub use error::DbError;
pub use event_store::EventStore;
pub use logistics_store::LogisticsStore;
pub use memory::MemoryStore;
pub use params::{ConditionChange, RegistryRegistration};
pub use post_store::PostStore;
pub use postgres::{PoolSettings, PostgresPool};
pub use resident_store::ResidentStore;
pub use store::Store;
