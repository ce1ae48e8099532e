//! # TTL Cache
//!
//! Small in-memory key/value store with per-entry expiry, used to avoid
//! repeating expensive upstream lookups (forecasts every 30 minutes, tide
//! tables once a day).
//!
//! ## Behaviour
//! - An entry is live while `now <= expires_at`; `get` on an expired entry is
//!   a miss and evicts it on the spot (lazy eviction, no background task)
//! - [`TtlCache::with_cache`] computes on miss, stores, and returns; errors
//!   from the compute closure propagate and are not stored
//! - A full cache degrades to "not stored": the value is still returned to
//!   the caller, it just is not remembered
//!
//! ## Concurrency
//! Entries live behind a `parking_lot::RwLock`, so readers proceed in
//! parallel. `with_cache` does not hold the lock while computing: two
//! concurrent misses on the same key may both compute. Everything cached by
//! this crate is a pure function of its key, so that only costs time.
//!
//! Time comes from a [`Clock`], so tests can drive expiry with
//! [`ManualClock`] instead of sleeping.

use chrono::Utc;
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        ManualClock {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now_ms.fetch_add(secs_to_ms(secs), Ordering::SeqCst);
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000)
}

/// `[cache]` config section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Forecast (wind/current) lifetime
    pub weather_ttl_secs: u64,
    /// Upstream tide-table lifetime
    pub tide_ttl_secs: u64,
    /// Entries per cache before new values stop being stored
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            weather_ttl_secs: 30 * 60,
            tide_ttl_secs: 24 * 60 * 60,
            max_entries: 1024,
        }
    }
}

#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at_ms: i64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }
}

pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.entries.read().len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            entries: RwLock::new(HashMap::new()),
            clock,
            max_entries,
        }
    }

    /// Live value for `key`, evicting it if it has expired.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now_ms();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        // another writer may have refreshed it between the two locks
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` for `ttl_secs`. Returns whether it was stored; a full
    /// cache skips the write.
    pub fn set(&self, key: K, value: V, ttl_secs: u64) -> bool {
        let now = self.clock.now_ms();
        let expires_at_ms = now.saturating_add(secs_to_ms(ttl_secs));
        let mut entries = self.entries.write();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| !entry.is_expired(now));
            if entries.len() >= self.max_entries {
                warn!(
                    "Cache full ({} entries), value not stored",
                    self.max_entries
                );
                return false;
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at_ms,
            },
        );
        true
    }

    pub fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.write().remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Entries currently held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Return the cached value for `key`, or compute, store and return it.
    pub fn with_cache<E, F>(&self, key: K, ttl_secs: u64, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(&key) {
            debug!("Cache hit");
            return Ok(hit);
        }
        let value = compute()?;
        self.set(key, value.clone(), ttl_secs);
        Ok(value)
    }
}
