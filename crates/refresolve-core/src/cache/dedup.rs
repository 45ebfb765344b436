//! In-memory TTL cache with in-flight request coalescing.
//!
//! One mutex guards both the entry map and the pending map, so a key can
//! never be registered as pending twice and eviction never races with
//! insertion. Lookups started through [`DedupCache::get_or_create`] run on
//! their own task: a caller that stops waiting does not stop the lookup, and
//! the result still lands in the cache.

use super::entry::{CacheEntry, Cacheable};
use super::store::SessionStore;
use crate::clock::{elapsed_between, DynClock, SystemClock};
use crate::config::CacheDefaults;
use crate::error::{ResolveError, Result};
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// A lookup outcome that any number of callers can await.
pub type SharedLookup<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Configuration for a [`DedupCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Capacity of the in-memory tier.
    pub max_entries: usize,
    /// Fraction of `max_entries` dropped per eviction pass.
    pub eviction_fraction: f64,
    /// How long an in-flight lookup may be joined by later callers.
    pub dedupe_window: Duration,
    /// Namespace segment of session-store keys.
    pub namespace: String,
    pub key_prefix: String,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_entries: CacheDefaults::MAX_ENTRIES,
            eviction_fraction: CacheDefaults::EVICTION_FRACTION,
            dedupe_window: CacheDefaults::DEDUPE_WINDOW,
            namespace: "resolved".to_string(),
            key_prefix: CacheDefaults::SESSION_KEY_PREFIX.to_string(),
        }
    }
}

impl DedupConfig {
    /// Entries removed when the cache is full; never less than one.
    pub fn eviction_batch(&self) -> usize {
        ((self.max_entries as f64 * self.eviction_fraction).ceil() as usize).max(1)
    }

    fn store_prefix(&self) -> String {
        format!("{}:{}:", self.key_prefix, self.namespace)
    }

    fn store_key(&self, key: &str) -> String {
        format!("{}{}", self.store_prefix(), key)
    }
}

/// Counters and sizes for a cache instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub pending: usize,
    pub hits: u64,
    /// Reads that found nothing, including lookups started on a miss.
    pub misses: u64,
    /// Callers that joined an in-flight lookup.
    pub coalesced: u64,
    pub evictions: u64,
    /// Entries recovered from the session store.
    pub store_hits: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
    store_hits: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct Slot<T> {
    entry: CacheEntry<T>,
    /// Insertion order, breaks ties between equal timestamps.
    seq: u64,
}

struct PendingRequest<T> {
    id: u64,
    started_at: DateTime<Utc>,
    lookup: SharedLookup<T>,
}

struct State<T> {
    entries: HashMap<String, Slot<T>>,
    pending: HashMap<String, PendingRequest<T>>,
    next_seq: u64,
    next_pending_id: u64,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            pending: HashMap::new(),
            next_seq: 0,
            next_pending_id: 0,
        }
    }
}

/// Keyed cache with TTL expiry, bounded capacity and request coalescing.
pub struct DedupCache<T: Cacheable> {
    state: Mutex<State<T>>,
    config: DedupConfig,
    clock: DynClock,
    store: Option<Arc<dyn SessionStore>>,
    counters: Counters,
}

impl<T: Cacheable> DedupCache<T> {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            state: Mutex::new(State::default()),
            config,
            clock: Arc::new(SystemClock),
            store: None,
            counters: Counters::default(),
        }
    }

    /// Use a different time source.
    pub fn with_clock(mut self, clock: DynClock) -> Self {
        self.clock = clock;
        self
    }

    /// Back the in-memory tier with a session store.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Get a live entry, consulting the session store on a memory miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        let now = self.clock.now();
        let live = {
            let mut state = self.lock();
            self.live_locked(&mut state, key, now)
        };
        let found = live.or_else(|| self.recover(key, now));
        if found.is_some() {
            Counters::bump(&self.counters.hits);
        } else {
            Counters::bump(&self.counters.misses);
        }
        found
    }

    /// Return the cached value, join an in-flight lookup, or start one.
    ///
    /// `supplier` is only invoked on a miss. The future it returns is
    /// spawned onto the current tokio runtime; on success its value is
    /// cached with `ttl`, unless the key was invalidated or cleared while
    /// the lookup ran. The pending registration is removed when the lookup
    /// finishes, whether it succeeded, failed, or panicked.
    ///
    /// `supplier` runs while the cache lock is held, so it must only build
    /// its future and never touch this cache directly.
    pub fn get_or_create<F, Fut>(
        self: &Arc<Self>,
        key: &str,
        ttl: Duration,
        supplier: F,
    ) -> SharedLookup<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let now = self.clock.now();
        let mut state = self.lock();
        if let Some(lookup) = self.reuse_locked(&mut state, key, now) {
            return lookup;
        }

        // The session store is read without the lock held.
        if self.store.is_some() {
            drop(state);
            if let Some(entry) = self.recover(key, now) {
                Counters::bump(&self.counters.hits);
                return future::ready(Ok(entry.data)).boxed().shared();
            }
            state = self.lock();
            if let Some(lookup) = self.reuse_locked(&mut state, key, now) {
                return lookup;
            }
        }

        Counters::bump(&self.counters.misses);
        let id = state.next_pending_id;
        state.next_pending_id += 1;

        let work = supplier();
        let cache = Arc::clone(self);
        let owned_key = key.to_string();

        // Spawned while the lock is held: the task cannot insert or clear
        // its pending entry before that entry is registered below.
        let handle = tokio::spawn(async move {
            let _guard = PendingGuard {
                cache: Arc::clone(&cache),
                key: owned_key.clone(),
                id,
            };
            let result = work.await;
            if let Ok(value) = &result {
                cache.store_value(&owned_key, value.clone(), ttl, Some(id));
            }
            result
        });

        let lookup: SharedLookup<T> = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(ResolveError::Unknown {
                    message: format!("Lookup task failed: {}", e),
                }),
            }
        }
        .boxed()
        .shared();

        state.pending.insert(
            key.to_string(),
            PendingRequest {
                id,
                started_at: now,
                lookup: lookup.clone(),
            },
        );
        debug!("Started lookup for '{}'", key);

        lookup
    }

    /// Store a value created now.
    ///
    /// A fallback value never replaces a live authoritative one; returns
    /// whether the value was stored.
    pub fn insert(&self, key: &str, data: T, ttl: Duration) -> bool {
        self.store_value(key, data, ttl, None)
    }

    /// Drop a key from both tiers and forget any in-flight lookup for it.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut state = self.lock();
        let removed = state.entries.remove(key).is_some();
        state.pending.remove(key);
        drop(state);

        let removed_from_store = match &self.store {
            Some(store) => store
                .remove(&self.config.store_key(key))
                .unwrap_or_else(|e| {
                    warn!("Failed to remove session entry for '{}': {}", key, e);
                    false
                }),
            None => false,
        };

        if removed || removed_from_store {
            debug!("Invalidated '{}'", key);
        }
        removed || removed_from_store
    }

    /// Drop everything in both tiers.
    pub fn clear(&self) {
        let mut state = self.lock();
        let count = state.entries.len();
        state.entries.clear();
        state.pending.clear();
        drop(state);

        if let Some(store) = &self.store {
            if let Err(e) = store.clear_prefix(&self.config.store_prefix()) {
                warn!("Failed to clear session entries: {}", e);
            }
        }
        debug!("Cleared {} cache entries", count);
    }

    /// Remove expired entries from both tiers.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.lock();
        let purged = Self::purge_locked(&mut state, now);
        drop(state);

        let purged_from_store = match &self.store {
            Some(store) => store.purge_expired(now).unwrap_or_else(|e| {
                warn!("Failed to purge session entries: {}", e);
                0
            }),
            None => 0,
        };
        purged + purged_from_store
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            pending: state.pending.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            store_hits: self.counters.store_hits.load(Ordering::Relaxed),
        }
    }

    /// Entries in the memory tier, expired or not.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Internal methods

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// A live memory entry, dropping it if expired.
    fn live_locked(
        &self,
        state: &mut State<T>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<CacheEntry<T>> {
        let slot = state.entries.get(key)?;
        if !slot.entry.is_expired(now) {
            return Some(slot.entry.clone());
        }
        state.entries.remove(key);
        debug!("Cache entry for '{}' expired", key);
        None
    }

    /// A memory hit or a joinable in-flight lookup for `key`.
    fn reuse_locked(
        &self,
        state: &mut State<T>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<SharedLookup<T>> {
        if let Some(entry) = self.live_locked(state, key, now) {
            Counters::bump(&self.counters.hits);
            debug!("Cache hit for '{}' ({:?})", key, entry.source);
            return Some(future::ready(Ok(entry.data)).boxed().shared());
        }

        let pending = state.pending.get(key)?;
        if elapsed_between(pending.started_at, now) <= self.config.dedupe_window {
            Counters::bump(&self.counters.coalesced);
            debug!("Joining in-flight lookup for '{}'", key);
            return Some(pending.lookup.clone());
        }
        debug!(
            "In-flight lookup for '{}' is older than {:?}, starting a new one",
            key, self.config.dedupe_window
        );
        None
    }

    /// Read `key` from the session store and install it in memory.
    ///
    /// Must be called without the lock held. An entry that reached memory
    /// in the meantime wins over the stored one.
    fn recover(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry<T>> {
        let restored = self.load_from_store(key, now)?;

        let mut state = self.lock();
        if let Some(current) = self.live_locked(&mut state, key, now) {
            return Some(current);
        }
        self.insert_slot(&mut state, key, restored.clone(), now);
        Counters::bump(&self.counters.store_hits);
        debug!("Recovered '{}' from session store", key);
        Some(restored)
    }

    fn load_from_store(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry<T>> {
        let store = self.store.as_ref()?;
        let store_key = self.config.store_key(key);

        let bytes = match store.get(&store_key, now) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("Session store read failed for '{}': {}", store_key, e);
                return None;
            }
        };

        match serde_json::from_slice::<CacheEntry<T>>(&bytes) {
            Ok(entry) if !entry.is_expired(now) => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!("Discarding corrupt session entry '{}': {}", store_key, e);
                let _ = store.remove(&store_key);
                None
            }
        }
    }

    /// Insert under the lock, then write through to the session store.
    ///
    /// With `pending_id`, the value is only kept while that lookup is still
    /// the registered one for `key`.
    fn store_value(&self, key: &str, data: T, ttl: Duration, pending_id: Option<u64>) -> bool {
        let now = self.clock.now();
        let entry = CacheEntry::new(data, now, ttl);
        let mut state = self.lock();

        if let Some(id) = pending_id {
            if !state.pending.get(key).is_some_and(|p| p.id == id) {
                debug!("Discarding result for '{}': key was invalidated", key);
                return false;
            }
        }

        if let Some(existing) = state.entries.get(key) {
            if existing.entry.source.is_authoritative()
                && !entry.source.is_authoritative()
                && !existing.entry.is_expired(now)
            {
                debug!("Keeping authoritative entry for '{}' over fallback", key);
                return false;
            }
        }

        self.insert_slot(&mut state, key, entry.clone(), now);
        drop(state);
        self.persist(key, &entry);
        true
    }

    fn insert_slot(
        &self,
        state: &mut State<T>,
        key: &str,
        entry: CacheEntry<T>,
        now: DateTime<Utc>,
    ) {
        if !state.entries.contains_key(key) && state.entries.len() >= self.config.max_entries {
            self.make_room(state, now);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(key.to_string(), Slot { entry, seq });
    }

    /// Drop expired entries, then the oldest batch if still full.
    fn make_room(&self, state: &mut State<T>, now: DateTime<Utc>) {
        Self::purge_locked(state, now);
        if state.entries.len() < self.config.max_entries {
            return;
        }

        let mut by_age: Vec<(DateTime<Utc>, u64, String)> = state
            .entries
            .iter()
            .map(|(key, slot)| (slot.entry.created_at, slot.seq, key.clone()))
            .collect();
        by_age.sort_unstable();

        let batch = self.config.eviction_batch();
        let mut evicted = 0u64;
        for (_, _, key) in by_age.into_iter().take(batch) {
            state.entries.remove(&key);
            evicted += 1;
        }
        self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
        debug!("Evicted {} oldest cache entries", evicted);
    }

    fn purge_locked(state: &mut State<T>, now: DateTime<Utc>) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, slot| !slot.entry.is_expired(now));
        before - state.entries.len()
    }

    fn persist(&self, key: &str, entry: &CacheEntry<T>) {
        let Some(store) = &self.store else {
            return;
        };
        let store_key = self.config.store_key(key);
        let result = serde_json::to_vec(entry)
            .map_err(ResolveError::from)
            .and_then(|bytes| store.put(&store_key, &bytes, entry.expires_at()));
        if let Err(e) = result {
            warn!("Session store write failed for '{}': {}", store_key, e);
        }
    }
}

/// Removes a pending registration when its lookup task ends.
struct PendingGuard<T: Cacheable> {
    cache: Arc<DedupCache<T>>,
    key: String,
    id: u64,
}

impl<T: Cacheable> Drop for PendingGuard<T> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        // A newer lookup may have replaced ours after the dedupe window.
        if state.pending.get(&self.key).is_some_and(|p| p.id == self.id) {
            state.pending.remove(&self.key);
        }
    }
}
