//! Cache management methods.

use crate::cache::CacheStats;
use crate::error::Result;
use crate::reference::{normalize, ResourceKind};
use crate::resolver::cache_key;
use crate::ReferenceResolver;
use tracing::info;

impl ReferenceResolver {
    /// Forget every cached resolution of `input`, for both kinds.
    ///
    /// Returns how many keys were dropped. Fails only on invalid input.
    pub fn invalidate_reference(&self, input: &str) -> Result<usize> {
        let reference = normalize(input)?;
        let removed = [ResourceKind::Property, ResourceKind::Unit]
            .into_iter()
            .filter(|kind| self.cache.invalidate(&cache_key(*kind, reference.id())))
            .count();
        info!("Invalidated {} cache key(s) for {}", removed, reference.id());
        Ok(removed)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Cleared resolution cache");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop expired entries from both tiers, returning how many went.
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }
}
