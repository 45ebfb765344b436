//! Cache entry and the trait values must implement to be cached.

use crate::clock::elapsed_between;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a cached value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Confirmed by the lookup service.
    Api,
    /// Constructed locally without authoritative data.
    Fallback,
}

impl EntrySource {
    pub fn is_authoritative(&self) -> bool {
        matches!(self, EntrySource::Api)
    }
}

/// A value that can live in a [`DedupCache`](super::DedupCache).
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// URL stored alongside the value.
    fn url(&self) -> &str;

    fn source(&self) -> EntrySource;
}

/// A cached value with its metadata.
///
/// Entries are replaced wholesale, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    pub source: EntrySource,
}

impl<T: Cacheable> CacheEntry<T> {
    pub fn new(data: T, created_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            url: data.url().to_string(),
            source: data.source(),
            data,
            created_at,
            ttl,
        }
    }
}

impl<T> CacheEntry<T> {
    /// An entry is expired once strictly more than `ttl` has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        elapsed_between(self.created_at, now) > self.ttl
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
