//! Builder for configuring ReferenceResolver initialization.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{DedupCache, DedupConfig, SessionStore, SqliteSessionStore};
use crate::clock::DynClock;
use crate::config::ResolverSettings;
use crate::error::Result;
use crate::network::{HttpLookupService, LookupService};
use crate::resolver::UnifiedResolver;
use crate::ReferenceResolver;

/// Builder for configuring ReferenceResolver initialization.
///
/// # Example
///
/// ```rust,ignore
/// use refresolve_core::{ReferenceResolver, ResolverSettings};
///
/// let resolver = ReferenceResolver::builder()
///     .settings(ResolverSettings::from_json_file("resolver.json")?)
///     .session_db("./session/resolved.sqlite")
///     .build()?;
/// ```
#[derive(Default)]
pub struct ReferenceResolverBuilder {
    settings: ResolverSettings,
    lookup: Option<Arc<dyn LookupService>>,
    clock: Option<DynClock>,
    store: Option<Arc<dyn SessionStore>>,
    session_db: Option<PathBuf>,
}

impl ReferenceResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use a custom lookup service instead of HTTP.
    ///
    /// Default: [`HttpLookupService`] against `settings.api_base_url`.
    pub fn lookup_service(mut self, lookup: Arc<dyn LookupService>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Clock used for TTL and dedupe-window checks.
    pub fn clock(mut self, clock: DynClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Attach an already-open session store.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Open a SQLite session store at `path` during `build`.
    ///
    /// Ignored when [`session_store`](Self::session_store) was given. A store
    /// that fails to open is logged and skipped; the resolver then caches in
    /// memory only.
    pub fn session_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_db = Some(path.into());
        self
    }

    fn dedup_config(settings: &ResolverSettings) -> DedupConfig {
        DedupConfig {
            max_entries: settings.max_entries,
            eviction_fraction: settings.eviction_fraction,
            dedupe_window: settings.dedupe_window(),
            key_prefix: settings.session_key_prefix.clone(),
            ..Default::default()
        }
    }

    /// Build the ReferenceResolver instance.
    pub fn build(self) -> Result<ReferenceResolver> {
        self.settings.validate()?;

        let lookup: Arc<dyn LookupService> = match self.lookup {
            Some(lookup) => lookup,
            None => Arc::new(HttpLookupService::new(&self.settings)?),
        };

        let store = match (self.store, self.session_db) {
            (Some(store), _) => Some(store),
            (None, Some(path)) => match SqliteSessionStore::open(&path) {
                Ok(store) => Some(Arc::new(store) as Arc<dyn SessionStore>),
                Err(e) => {
                    tracing::warn!(
                        "Failed to open session store at {}, caching in memory only: {}",
                        path.display(),
                        e
                    );
                    None
                }
            },
            (None, None) => None,
        };

        let mut cache = DedupCache::new(Self::dedup_config(&self.settings));
        if let Some(clock) = self.clock {
            cache = cache.with_clock(clock);
        }
        if let Some(store) = store {
            cache = cache.with_store(store);
        }
        let cache = Arc::new(cache);

        let resolver = UnifiedResolver::new(lookup, Arc::clone(&cache), self.settings);
        Ok(ReferenceResolver {
            inner: Arc::new(resolver),
            cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_config_from_settings() {
        let settings = ResolverSettings {
            max_entries: 20,
            dedupe_window_ms: 1500,
            session_key_prefix: "app".to_string(),
            ..Default::default()
        };
        let config = ReferenceResolverBuilder::dedup_config(&settings);
        assert_eq!(config.max_entries, 20);
        assert_eq!(config.dedupe_window.as_millis(), 1500);
        assert_eq!(config.key_prefix, "app");
        assert_eq!(config.namespace, "resolved");
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let settings = ResolverSettings {
            max_entries: 0,
            ..Default::default()
        };
        let result = ReferenceResolverBuilder::new().settings(settings).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_unopenable_session_db_degrades_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let resolver = ReferenceResolverBuilder::new()
            .session_db(dir.path())
            .build()
            .unwrap();
        assert_eq!(resolver.cache_stats().entries, 0);
    }
}
