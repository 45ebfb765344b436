//! Caching for resolved references.
//!
//! Two tiers:
//! - an in-memory [`DedupCache`] that also coalesces concurrent lookups
//! - an optional [`SessionStore`] holding serialized entries for the session
//!
//! Session-store failures degrade to memory-only caching; they never fail a
//! lookup.

mod dedup;
mod entry;
mod sqlite;
mod store;

pub use dedup::{CacheStats, DedupCache, DedupConfig, SharedLookup};
pub use entry::{CacheEntry, Cacheable, EntrySource};
pub use sqlite::SqliteSessionStore;
pub use store::SessionStore;
