//! Resolver for a single resource kind.

use super::slug;
use crate::cache::{DedupCache, EntrySource, SharedLookup};
use crate::config::ResolverSettings;
use crate::error::{ResolveError, Result};
use crate::models::ResolvedResource;
use crate::network::{retry_with_timeout, LookupService, RetryConfig};
use crate::reference::{Reference, ResourceKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Cache key for a `(kind, reference)` pair.
pub fn cache_key(kind: ResourceKind, id: &str) -> String {
    format!("{}:{}", kind.or_default(), id)
}

/// Looks up one resource kind through the shared cache.
///
/// Every lookup goes through [`DedupCache::get_or_create`], so concurrent
/// resolutions of the same reference share one remote call.
#[derive(Clone)]
pub struct KindResolver {
    kind: ResourceKind,
    lookup: Arc<dyn LookupService>,
    cache: Arc<DedupCache<ResolvedResource>>,
    retry: RetryConfig,
    api_ttl: Duration,
}

impl KindResolver {
    pub fn new(
        kind: ResourceKind,
        lookup: Arc<dyn LookupService>,
        cache: Arc<DedupCache<ResolvedResource>>,
        settings: &ResolverSettings,
    ) -> Self {
        Self {
            kind: kind.or_default(),
            lookup,
            cache,
            retry: RetryConfig::from_settings(settings, settings.standalone_attempt_timeout()),
            api_ttl: settings.api_ttl(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// A live cached resolution, without starting a lookup.
    pub fn cached(&self, reference: &Reference) -> Option<ResolvedResource> {
        self.cache
            .get(&cache_key(self.kind, reference.id()))
            .map(|entry| entry.data)
    }

    /// Resolve, waiting for the result.
    pub async fn resolve(
        &self,
        reference: &Reference,
        attempt_timeout: Duration,
    ) -> Result<ResolvedResource> {
        self.start(reference, attempt_timeout).await
    }

    /// Start (or join) a resolution and return its shared outcome.
    ///
    /// Dropping the returned future does not stop the lookup; it finishes in
    /// the background and populates the cache.
    pub fn start(
        &self,
        reference: &Reference,
        attempt_timeout: Duration,
    ) -> SharedLookup<ResolvedResource> {
        let kind = self.kind;
        let id = reference.id().to_string();
        let key = cache_key(kind, &id);
        let lookup = Arc::clone(&self.lookup);
        let retry = self.retry.clone().with_attempt_timeout(attempt_timeout);

        self.cache.get_or_create(&key, self.api_ttl, move || async move {
            let started = Instant::now();
            let (result, stats) = retry_with_timeout(
                &retry,
                || lookup.lookup(kind, &id),
                ResolveError::is_retryable,
            )
            .await;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!(
                        "{} lookup for {} failed after {} attempt(s): {}",
                        kind, id, stats.attempts, e
                    );
                    return Err(e);
                }
            };

            let canonical_url = slug::canonical_url(&record, &id);
            let response_time_ms = started.elapsed().as_millis() as u64;
            info!(
                "Resolved {} {} -> {} in {}ms ({} attempt(s))",
                kind, id, canonical_url, response_time_ms, stats.attempts
            );

            Ok(ResolvedResource {
                kind,
                reference: id,
                canonical_url,
                raw_record: Some(record),
                source: EntrySource::Api,
                response_time_ms,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DedupConfig;
    use crate::models::{ListingRecord, UnitRecord};
    use crate::reference::normalize;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LookupService for CountingLookup {
        async fn lookup_listing(&self, id: &str) -> Result<ListingRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ResolveError::NotFound {
                kind: ResourceKind::Property,
                reference: id.to_string(),
            })
        }

        async fn lookup_unit(&self, id: &str) -> Result<UnitRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(UnitRecord {
                id: Some(id.to_string()),
                bedrooms: Some("2".into()),
                ..Default::default()
            })
        }
    }

    fn resolver(kind: ResourceKind) -> (KindResolver, Arc<CountingLookup>) {
        let lookup = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(DedupCache::new(DedupConfig::default()));
        let resolver = KindResolver::new(
            kind,
            lookup.clone(),
            cache,
            &ResolverSettings::default(),
        );
        (resolver, lookup)
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key(ResourceKind::Unit, "102"), "unit:102");
        assert_eq!(cache_key(ResourceKind::Unknown, "1"), "property:1");
    }

    #[tokio::test]
    async fn test_resolves_and_caches() {
        let (resolver, lookup) = resolver(ResourceKind::Unit);
        let reference = normalize("UNIT102").unwrap();

        let first = resolver
            .resolve(&reference, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            first.canonical_url,
            "/developer-unit/2-bedroom-property-for-rent-or-sale-in-accra-ghana-unit-102"
        );
        assert_eq!(first.source, EntrySource::Api);

        let second = resolver
            .resolve(&reference, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(second.canonical_url, first.canonical_url);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert!(resolver.cached(&reference).is_some());
    }

    #[tokio::test]
    async fn test_not_found_is_terminal_and_uncached() {
        let (resolver, lookup) = resolver(ResourceKind::Property);
        let reference = normalize("203456").unwrap();

        let err = resolver
            .resolve(&reference, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert!(resolver.cached(&reference).is_none());
    }
}
