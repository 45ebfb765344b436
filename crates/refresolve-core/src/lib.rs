//! Refresolve Core - Resolve short listing and unit references into URLs.
//!
//! A reference such as `UNIT102` or `203456` is normalized, classified as a
//! listing or a developer unit, and looked up against a remote service. The
//! result is a canonical URL, or a deterministic best-effort URL when the
//! service is slow or unreachable.
//!
//! Concurrent resolutions of the same reference share one remote call, and
//! results are cached in memory with an optional SQLite session tier.
//!
//! # Example
//!
//! ```rust,ignore
//! use refresolve_core::{ReferenceResolver, ResolveOptions};
//!
//! #[tokio::main]
//! async fn main() -> refresolve_core::Result<()> {
//!     let resolver = ReferenceResolver::new()?;
//!
//!     // Instant, fallback-only answer for navigation
//!     let quick = resolver.quick_resolve("UNIT102");
//!     println!("Navigate to {}", quick.url);
//!
//!     // Authoritative answer
//!     let result = resolver
//!         .resolve_reference("UNIT102", &ResolveOptions::default())
//!         .await;
//!     println!("{} (valid: {})", result.url, result.is_valid);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod reference;
pub mod resolver;

mod api;

// Re-export commonly used types
pub use cache::{
    CacheEntry, CacheStats, DedupCache, EntrySource, SessionStore, SqliteSessionStore,
};
pub use cancel::{CancellationToken, CancelledError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheDefaults, ResolverConfig, ResolverSettings, SlugConfig};
pub use error::{ErrorCategory, ResolveError, Result};
pub use models::{
    Alternative, ListingRecord, LookupRecord, ResolveOptions, ResolvedResource, UnifiedResult,
    UnitRecord,
};
pub use network::{HttpLookupService, LookupService};
pub use reference::{
    classify, normalize, ClassificationResult, Reference, ResourceKind, SearchStrategy,
};

// Re-export builder from api module
pub use api::ReferenceResolverBuilder;

use std::sync::Arc;

use resolver::UnifiedResolver;

/// Main entry point for reference resolution.
///
/// Cheap to clone; clones share the cache and in-flight lookups.
#[derive(Clone)]
pub struct ReferenceResolver {
    inner: Arc<UnifiedResolver>,
    cache: Arc<DedupCache<ResolvedResource>>,
}

impl ReferenceResolver {
    /// Create a builder for ReferenceResolver.
    pub fn builder() -> ReferenceResolverBuilder {
        ReferenceResolverBuilder::new()
    }

    /// Create a resolver with default settings and the HTTP lookup service.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a resolver with the given settings.
    pub fn with_settings(settings: ResolverSettings) -> Result<Self> {
        Self::builder().settings(settings).build()
    }

    pub fn settings(&self) -> &ResolverSettings {
        self.inner.settings()
    }
}
