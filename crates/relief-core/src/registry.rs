//! Civil registry clients.
//!
//! The resident tracker resolves national identifiers to personal details
//! through a [`CivilRegistry`]. Two backends exist: a static directory
//! held in process (configuration and tests) and an HTTP client against
//! the jurisdiction's registry service.
//!
//! An unknown identifier is `Ok(None)`. A registry that cannot be reached
//! or answers badly is a [`RegistryError`], never "not found".

use std::collections::BTreeMap;
use std::time::Duration;

use relief_types::PersonRecord;

use crate::config::{CivilRegistryConfig, RegistryBackend};

/// Errors raised while talking to the civil registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The request failed in transport or the body could not be decoded.
    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The registry answered with an unexpected status.
    #[error("registry returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The registry client is misconfigured.
    #[error("registry config error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Unified registry enum
// ---------------------------------------------------------------------------

/// A civil registry that resolves national identifiers.
///
/// Enum dispatch keeps the async lookup free of trait objects.
#[derive(Debug, Clone)]
pub enum CivilRegistry {
    /// In-process directory.
    Static(StaticRegistry),
    /// Remote registry over HTTP.
    Http(HttpRegistry),
}

impl CivilRegistry {
    /// Build the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if the HTTP base URL is invalid,
    /// or [`RegistryError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &CivilRegistryConfig) -> Result<Self, RegistryError> {
        match config.backend {
            RegistryBackend::Static => Ok(Self::Static(StaticRegistry::new(
                config.records.clone(),
            ))),
            RegistryBackend::Http => Ok(Self::Http(HttpRegistry::new(
                &config.base_url,
                Duration::from_millis(config.timeout_ms),
            )?)),
        }
    }

    /// Resolve an identifier to personal details.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the lookup itself failed.
    pub async fn resolve(&self, external_id: &str) -> Result<Option<PersonRecord>, RegistryError> {
        match self {
            Self::Static(registry) => Ok(registry.resolve(external_id)),
            Self::Http(registry) => registry.resolve(external_id).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Static(_) => "static",
            Self::Http(_) => "http",
        }
    }
}

impl Default for CivilRegistry {
    fn default() -> Self {
        Self::Static(StaticRegistry::default())
    }
}

// ---------------------------------------------------------------------------
// Static directory
// ---------------------------------------------------------------------------

/// Registry backed by a fixed map of identifiers.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    records: BTreeMap<String, PersonRecord>,
}

impl StaticRegistry {
    /// Directory with the given entries.
    pub const fn new(records: BTreeMap<String, PersonRecord>) -> Self {
        Self { records }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_record(mut self, external_id: impl Into<String>, person: PersonRecord) -> Self {
        self.insert(external_id, person);
        self
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, external_id: impl Into<String>, person: PersonRecord) {
        self.records.insert(external_id.into(), person);
    }

    fn resolve(&self, external_id: &str) -> Option<PersonRecord> {
        self.records.get(external_id).cloned()
    }
}

// ---------------------------------------------------------------------------
// HTTP backend
// ---------------------------------------------------------------------------

/// Registry reached at `GET {base_url}/persons/{external_id}`.
///
/// 200 carries a [`PersonRecord`] body; 404 means the identifier is
/// unknown. Any other status is an error.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpRegistry {
    /// Create a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if `base_url` is not an absolute
    /// URL, or [`RegistryError::Transport`] if the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| RegistryError::Config(format!("invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RegistryError::Config(format!(
                "base URL cannot carry a path: {base_url}"
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// URL of one person's record. The identifier is percent-encoded as a
    /// single path segment.
    fn person_url(&self, external_id: &str) -> Result<reqwest::Url, RegistryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RegistryError::Config(format!("base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .push("persons")
            .push(external_id);
        Ok(url)
    }

    async fn resolve(&self, external_id: &str) -> Result<Option<PersonRecord>, RegistryError> {
        let url = self.person_url(external_id)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(external_id, "Identifier unknown to civil registry");
            return Ok(None);
        }
        if !status.is_success() {
            tracing::warn!(external_id, status = status.as_u16(), "Civil registry lookup failed");
            return Err(RegistryError::Status {
                status: status.as_u16(),
            });
        }

        let person: PersonRecord = response.json().await?;
        Ok(Some(person))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use relief_types::Gender;

    fn person(name: &str) -> PersonRecord {
        PersonRecord {
            name: name.to_owned(),
            age: 34,
            gender: Gender::Female,
            address: String::from("Jl. Sudirman 5"),
        }
    }

    #[tokio::test]
    async fn static_registry_resolves_known_ids_only() {
        let registry = CivilRegistry::Static(
            StaticRegistry::default().with_record("3201000000000001", person("Siti Rahma")),
        );
        let found = registry.resolve("3201000000000001").await.unwrap();
        assert_eq!(found.map(|p| p.name), Some(String::from("Siti Rahma")));
        assert!(registry.resolve("9999").await.unwrap().is_none());
        assert_eq!(registry.name(), "static");
    }

    #[test]
    fn person_url_appends_encoded_segment() {
        let registry =
            HttpRegistry::new("http://registry.local/api/", Duration::from_secs(1)).unwrap();
        let url = registry.person_url("32 01/x").unwrap();
        assert_eq!(url.as_str(), "http://registry.local/api/persons/32%2001%2Fx");
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let result = HttpRegistry::new("registry.local", Duration::from_secs(1));
        assert!(matches!(result, Err(RegistryError::Config(_))));
    }

    #[test]
    fn from_config_builds_static_directory() {
        let mut config = CivilRegistryConfig::default();
        config
            .records
            .insert(String::from("3201000000000002"), person("Dewi"));
        let registry = CivilRegistry::from_config(&config).unwrap();
        assert_eq!(registry.name(), "static");
    }
}
