//! Sharded TTL cache for log clustering results.
//!
//! Clustering a batch of events is expensive, and the same batch is often
//! clustered several times during one investigation (and across concurrent
//! investigations of the same incident). Entries are keyed by a blake3
//! fingerprint of the batch content, optionally salted with a tenant id.
//!
//! The key space is split over a fixed number of shards, each behind its own
//! mutex, so contention is bounded to roughly `1 / shards` of the callers.
//! Capacity is enforced per shard (`ceil(max_size / shards)`), which makes
//! the total bound approximate.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, trace};

use crate::domain::models::{CacheConfig, LogCluster, LogEvent};

/// Stable digest of a batch of events.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Digest the batch content, salted with `tenant` when provided.
    ///
    /// The salt is domain-separated from the unscoped form, so identical
    /// content under different tenants (or no tenant) never shares a key.
    pub fn compute(batch: &[LogEvent], tenant: Option<&str>) -> Self {
        let mut hasher = blake3::Hasher::new();
        match tenant {
            Some(tenant) => {
                hasher.update(b"tenant\x00");
                hasher.update(tenant.as_bytes());
                hasher.update(b"\x00");
            }
            None => {
                hasher.update(b"global\x00");
            }
        }
        for event in batch {
            if let Some(ts) = event.timestamp {
                hasher.update(ts.timestamp_micros().to_le_bytes().as_slice());
            }
            hasher.update(b"\x1f");
            if let Some(severity) = event.severity {
                hasher.update(severity.as_str().as_bytes());
            }
            hasher.update(b"\x1f");
            for part in [&event.service, &event.subsystem, &event.message] {
                if let Some(value) = part {
                    hasher.update(value.as_bytes());
                }
                hasher.update(b"\x1f");
            }
            // serde_json maps are ordered, so this is deterministic.
            hasher.update(serde_json::Value::Object(event.fields.clone()).to_string().as_bytes());
            hasher.update(b"\x1e");
        }
        Self(*hasher.finalize().as_bytes())
    }

    fn shard_index(&self, shards: usize) -> usize {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        (u64::from_le_bytes(head) % shards as u64) as usize
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    clusters: Vec<LogCluster>,
    inserted_at: Instant,
    hits: u64,
    tenant: Option<String>,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.inserted_at) < ttl
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub bypassed: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    bypassed: AtomicU64,
    evictions: AtomicU64,
}

type Shard = HashMap<Fingerprint, CacheEntry>;

/// Concurrency-safe cluster cache. Share it behind an `Arc`.
pub struct ClusterCache {
    shards: Vec<Mutex<Shard>>,
    ttl: Duration,
    shard_capacity: usize,
    min_batch_size: usize,
    tenant_scoped: bool,
    counters: Counters,
}

impl fmt::Debug for ClusterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterCache")
            .field("shards", &self.shards.len())
            .field("ttl", &self.ttl)
            .field("shard_capacity", &self.shard_capacity)
            .field("min_batch_size", &self.min_batch_size)
            .field("tenant_scoped", &self.tenant_scoped)
            .finish()
    }
}

impl Default for ClusterCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl ClusterCache {
    pub fn new(config: &CacheConfig) -> Self {
        let shard_count = config.shards.max(1);
        let shard_capacity = config.max_size.div_ceil(shard_count).max(1);
        Self {
            shards: (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect(),
            ttl: Duration::from_secs(config.ttl_secs),
            shard_capacity,
            min_batch_size: config.min_batch_size,
            tenant_scoped: config.tenant_scoped,
            counters: Counters::default(),
        }
    }

    /// Override the entry lifetime (mainly for tests).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Whether a batch is large enough to be worth fingerprinting.
    pub fn accepts(&self, batch: &[LogEvent]) -> bool {
        batch.len() >= self.min_batch_size
    }

    fn scope<'a>(&self, tenant: Option<&'a str>) -> Option<&'a str> {
        if self.tenant_scoped {
            tenant
        } else {
            None
        }
    }

    fn lock(&self, index: usize) -> MutexGuard<'_, Shard> {
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up clusters for a batch. Returns `(clusters, found)`.
    ///
    /// A hit increments the entry's hit counter. An entry older than the TTL
    /// is a miss and is removed.
    pub fn get(&self, batch: &[LogEvent], tenant: Option<&str>) -> (Vec<LogCluster>, bool) {
        if !self.accepts(batch) {
            self.counters.bypassed.fetch_add(1, Ordering::Relaxed);
            return (Vec::new(), false);
        }

        let tenant = self.scope(tenant);
        let key = Fingerprint::compute(batch, tenant);
        let now = Instant::now();
        let mut shard = self.lock(key.shard_index(self.shards.len()));

        let fresh = match shard.get_mut(&key) {
            Some(entry) if entry.tenant.as_deref() == tenant && entry.is_fresh(self.ttl, now) => {
                entry.hits += 1;
                Some(entry.clusters.clone())
            }
            Some(_) => None,
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = ?key, "cluster cache miss");
                return (Vec::new(), false);
            }
        };

        match fresh {
            Some(clusters) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = ?key, "cluster cache hit");
                (clusters, true)
            }
            None => {
                shard.remove(&key);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                trace!(key = ?key, "cluster cache entry expired");
                (Vec::new(), false)
            }
        }
    }

    /// Insert or overwrite the clusters for a batch.
    pub fn set(&self, batch: &[LogEvent], tenant: Option<&str>, clusters: Vec<LogCluster>) {
        if !self.accepts(batch) {
            self.counters.bypassed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let tenant = self.scope(tenant);
        let key = Fingerprint::compute(batch, tenant);
        let now = Instant::now();
        let mut shard = self.lock(key.shard_index(self.shards.len()));

        if !shard.contains_key(&key) && shard.len() >= self.shard_capacity {
            let evicted = self.evict(&mut shard, now);
            self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
        }

        shard.insert(
            key,
            CacheEntry {
                clusters,
                inserted_at: now,
                hits: 0,
                tenant: tenant.map(str::to_string),
            },
        );
    }

    /// Drop expired entries, then the oldest one if the shard is still full.
    fn evict(&self, shard: &mut Shard, now: Instant) -> u64 {
        let before = shard.len();
        shard.retain(|_, entry| entry.is_fresh(self.ttl, now));

        if shard.len() >= self.shard_capacity {
            if let Some(oldest) = shard
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| *key)
            {
                shard.remove(&oldest);
            }
        }
        (before - shard.len()) as u64
    }

    /// Remove every entry scoped to `tenant`, across all shards.
    pub fn clear_tenant(&self, tenant: &str) -> usize {
        let mut removed = 0;
        for index in 0..self.shards.len() {
            let mut shard = self.lock(index);
            let before = shard.len();
            shard.retain(|_, entry| entry.tenant.as_deref() != Some(tenant));
            removed += before - shard.len();
        }
        debug!(tenant, removed, "cleared tenant cache entries");
        removed
    }

    /// Remove expired entries from every shard.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for index in 0..self.shards.len() {
            let mut shard = self.lock(index);
            let before = shard.len();
            shard.retain(|_, entry| entry.is_fresh(self.ttl, now));
            removed += before - shard.len();
        }
        self.counters
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Hit count of the entry for a batch, if resident.
    pub fn entry_hits(&self, batch: &[LogEvent], tenant: Option<&str>) -> Option<u64> {
        let tenant = self.scope(tenant);
        let key = Fingerprint::compute(batch, tenant);
        let shard = self.lock(key.shard_index(self.shards.len()));
        shard.get(&key).map(|entry| entry.hits)
    }

    /// Resident entries, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        (0..self.shards.len()).map(|i| self.lock(i).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            bypassed: self.counters.bypassed.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
