//! Relief operations server.
//!
//! Wires configuration, storage, the civil-registry client and the
//! operations API together, then serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$RELIEF_CONFIG` (default `relief-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Open storage (in-memory, or `PostgreSQL` with migrations)
//! 4. Build the civil-registry client
//! 5. Assemble the relief components and serve the API
//! 6. Close the storage pool once the server has drained

mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use relief_api::AppState;
use relief_core::config::{LogFormat, LoggingConfig, StorageBackend, StorageConfig};
use relief_core::{CivilRegistry, Relief, ReliefConfig};
use relief_db::{PoolSettings, PostgresPool, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Config file used when `RELIEF_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "relief-config.yaml";

/// Application entry point for the relief server.
///
/// # Errors
///
/// Returns an error if any startup step fails or the server stops with a
/// fatal error.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // 1. Load configuration.
    let config_path = std::env::var("RELIEF_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = ReliefConfig::load_or_default(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        path = %config_path.display(),
        host = %config.server.host,
        port = config.server.port,
        storage = ?config.storage.backend,
        registry = ?config.civil_registry.backend,
        "relief-server starting"
    );

    // 3. Open storage.
    let store = open_store(&config.storage).await?;
    info!(backend = store.backend_name(), "Storage ready");

    // 4. Civil registry client.
    let registry = CivilRegistry::from_config(&config.civil_registry)?;
    info!(backend = registry.name(), "Civil registry client ready");

    // 5. Assemble components and serve.
    let relief = Relief::new(store.clone(), registry, config.logistics);
    let state = Arc::new(AppState::new(relief));
    let served = relief_api::start_server(&config.server, state).await;

    // 6. Release storage whether or not serving ended cleanly.
    store.close().await;
    served?;

    info!("relief-server stopped");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(config: &LoggingConfig) -> Result<(), ServerError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| ServerError::Logging {
        message: e.to_string(),
    })
}

/// Pool settings for the `PostgreSQL` backend.
fn pool_settings(config: &StorageConfig) -> PoolSettings {
    PoolSettings::new(config.postgres_url.as_str())
        .with_max_connections(config.max_connections)
        .with_acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .with_migrations(config.run_migrations)
}

/// Open the configured storage backend.
async fn open_store(config: &StorageConfig) -> Result<Store, ServerError> {
    match config.backend {
        StorageBackend::Memory => Ok(Store::memory()),
        StorageBackend::Postgres => {
            let pool = PostgresPool::open(&pool_settings(config)).await?;
            Ok(Store::Postgres(pool))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_config_drives_pool_settings() {
        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            postgres_url: String::from("postgresql://relief@db.local/relief"),
            max_connections: 4,
            connect_timeout_ms: 750,
            run_migrations: false,
        };
        let settings = pool_settings(&config);
        assert_eq!(settings.url, "postgresql://relief@db.local/relief");
        assert_eq!(settings.max_connections, 4);
        assert_eq!(settings.acquire_timeout, Duration::from_millis(750));
        assert!(!settings.run_migrations);
    }
}
