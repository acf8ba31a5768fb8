//! Error types for the relief server binary.

/// Top-level error for the relief server binary.
///
/// Wraps each startup or serving failure so that `main` can propagate
/// with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: relief_core::ConfigError,
    },

    /// Storage connection or migration failed.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying database error.
        #[from]
        source: relief_db::DbError,
    },

    /// The civil-registry client could not be built.
    #[error("civil registry error: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: relief_core::RegistryError,
    },

    /// The operations API failed to bind or serve.
    #[error("api error: {source}")]
    Serve {
        /// The underlying serve error.
        #[from]
        source: relief_api::ServeError,
    },

    /// The log subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
