//! Second cache tier scoped to a browsing session.

use crate::error::Result;
use chrono::{DateTime, Utc};

/// Durable key-value storage behind the in-memory cache.
///
/// Values are opaque bytes. Expiry times are supplied by the caller so the
/// cache's clock stays the single source of time. All operations are
/// synchronous to match rusqlite's API.
pub trait SessionStore: Send + Sync {
    /// Get a value that has not expired at `now`.
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite a value.
    fn put(&self, key: &str, value: &[u8], expires_at: DateTime<Utc>) -> Result<()>;

    /// Returns whether a value was removed.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Remove every key starting with `prefix`.
    fn clear_prefix(&self, prefix: &str) -> Result<usize>;

    /// Remove values expired at `now`.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Number of stored values, expired or not.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
