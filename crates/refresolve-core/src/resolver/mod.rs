//! Resolution: per-kind lookups, strategy execution and URL derivation.

pub mod kind;
pub mod slug;
pub mod unified;

pub use kind::{cache_key, KindResolver};
pub use slug::{canonical_url, fallback_url, slugify};
pub use unified::UnifiedResolver;
