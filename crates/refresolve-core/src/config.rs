//! Centralized configuration for reference resolution.
//!
//! Compile-time defaults live on unit structs as associated constants.
//! `ResolverSettings` is the runtime view, loadable from JSON, with every
//! field defaulting to those constants.

use crate::error::{ResolveError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Network and retry defaults for the resolvers.
pub struct ResolverConfig;

impl ResolverConfig {
    /// Per-attempt timeout when two resolvers race under one outer timeout.
    pub const PARALLEL_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Per-attempt timeout when a resolver runs alone.
    pub const STANDALONE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Outer timeout for one `resolve_reference` call.
    pub const OUTER_TIMEOUT: Duration = Duration::from_secs(10);
    /// Retries after the first attempt.
    pub const MAX_RETRIES: u32 = 2;
    pub const BACKOFF_BASE: Duration = Duration::from_millis(250);
    pub const BACKOFF_MAX: Duration = Duration::from_secs(2);
    /// Share of the outer timeout given to the primary resolver.
    pub const PRIMARY_FIRST_SHARE: f64 = 0.6;
    pub const SEQUENTIAL_SHARE: f64 = 0.75;
    pub const API_BASE_URL: &'static str = "http://localhost:8080/api";
    pub const LISTING_ENDPOINT: &'static str = "/listings/reference/{id}";
    pub const UNIT_ENDPOINT: &'static str = "/developer-units/reference/{id}";
    pub const USER_AGENT: &'static str = "refresolve/0.3";
}

/// Defaults for the dedup/cache layer.
pub struct CacheDefaults;

impl CacheDefaults {
    pub const API_TTL: Duration = Duration::from_secs(600);
    pub const FALLBACK_TTL: Duration = Duration::from_secs(30);
    pub const DEDUPE_WINDOW: Duration = Duration::from_secs(10);
    pub const MAX_ENTRIES: usize = 500;
    /// Fraction of `MAX_ENTRIES` dropped per eviction pass.
    pub const EVICTION_FRACTION: f64 = 0.1;
    pub const SESSION_KEY_PREFIX: &'static str = "refresolve";
}

/// Placeholder segments for fallback URLs.
pub struct SlugConfig;

impl SlugConfig {
    pub const MAX_REFERENCE_LEN: usize = 20;
    pub const PLACEHOLDER_BEDS: &'static str = "multi";
    pub const PLACEHOLDER_TYPE: &'static str = "property";
    pub const PLACEHOLDER_CONTRACT: &'static str = "rent-or-sale";
    pub const PLACEHOLDER_LOCATION: &'static str = "accra-ghana";
    pub const LISTING_ROOT: &'static str = "/listings";
    pub const UNIT_ROOT: &'static str = "/developer-unit";
}

/// Runtime settings for a `ReferenceResolver`.
///
/// Durations are expressed in milliseconds so the JSON form stays flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ResolverSettings {
    pub api_base_url: String,
    pub listing_endpoint: String,
    pub unit_endpoint: String,
    pub parallel_attempt_timeout_ms: u64,
    pub standalone_attempt_timeout_ms: u64,
    pub outer_timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_jitter: bool,
    pub api_ttl_ms: u64,
    pub fallback_ttl_ms: u64,
    pub dedupe_window_ms: u64,
    pub max_entries: usize,
    pub eviction_fraction: f64,
    pub session_key_prefix: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            api_base_url: ResolverConfig::API_BASE_URL.to_string(),
            listing_endpoint: ResolverConfig::LISTING_ENDPOINT.to_string(),
            unit_endpoint: ResolverConfig::UNIT_ENDPOINT.to_string(),
            parallel_attempt_timeout_ms: millis(ResolverConfig::PARALLEL_ATTEMPT_TIMEOUT),
            standalone_attempt_timeout_ms: millis(ResolverConfig::STANDALONE_ATTEMPT_TIMEOUT),
            outer_timeout_ms: millis(ResolverConfig::OUTER_TIMEOUT),
            max_retries: ResolverConfig::MAX_RETRIES,
            backoff_base_ms: millis(ResolverConfig::BACKOFF_BASE),
            backoff_max_ms: millis(ResolverConfig::BACKOFF_MAX),
            backoff_jitter: true,
            api_ttl_ms: millis(CacheDefaults::API_TTL),
            fallback_ttl_ms: millis(CacheDefaults::FALLBACK_TTL),
            dedupe_window_ms: millis(CacheDefaults::DEDUPE_WINDOW),
            max_entries: CacheDefaults::MAX_ENTRIES,
            eviction_fraction: CacheDefaults::EVICTION_FRACTION,
            session_key_prefix: CacheDefaults::SESSION_KEY_PREFIX.to_string(),
        }
    }
}

impl ResolverSettings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ResolveError::Config {
            message: format!("Failed to read settings {}: {}", path.display(), e),
        })?;
        let settings: Self = serde_json::from_str(&contents).map_err(|e| ResolveError::Config {
            message: format!("Failed to parse settings {}: {}", path.display(), e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that would make the cache or retry policy unusable.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(ResolveError::Config {
                message: "max_entries must be at least 1".to_string(),
            });
        }
        if !(self.eviction_fraction > 0.0 && self.eviction_fraction <= 1.0) {
            return Err(ResolveError::Config {
                message: format!(
                    "eviction_fraction must be in (0, 1], got {}",
                    self.eviction_fraction
                ),
            });
        }
        if self.outer_timeout_ms == 0 {
            return Err(ResolveError::Config {
                message: "outer_timeout_ms must be positive".to_string(),
            });
        }
        url::Url::parse(&self.api_base_url).map_err(|e| ResolveError::Config {
            message: format!("Invalid api_base_url '{}': {}", self.api_base_url, e),
        })?;
        Ok(())
    }

    pub fn parallel_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.parallel_attempt_timeout_ms)
    }

    pub fn standalone_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.standalone_attempt_timeout_ms)
    }

    pub fn outer_timeout(&self) -> Duration {
        Duration::from_millis(self.outer_timeout_ms)
    }

    pub fn api_ttl(&self) -> Duration {
        Duration::from_millis(self.api_ttl_ms)
    }

    pub fn fallback_ttl(&self) -> Duration {
        Duration::from_millis(self.fallback_ttl_ms)
    }

    pub fn dedupe_window(&self) -> Duration {
        Duration::from_millis(self.dedupe_window_ms)
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_constants() {
        let settings = ResolverSettings::default();
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.parallel_attempt_timeout(), Duration::from_secs(5));
        assert!(settings.standalone_attempt_timeout() > settings.parallel_attempt_timeout());
        assert_eq!(settings.dedupe_window(), Duration::from_secs(10));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"api_base_url": "https://lookup.example.com/v2", "max_entries": 50}}"#
        )
        .unwrap();

        let settings = ResolverSettings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.api_base_url, "https://lookup.example.com/v2");
        assert_eq!(settings.max_entries, 50);
        assert_eq!(settings.max_retries, ResolverConfig::MAX_RETRIES);
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let settings = ResolverSettings {
            eviction_fraction: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let settings = ResolverSettings {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ResolveError::Config { .. })
        ));
    }
}
