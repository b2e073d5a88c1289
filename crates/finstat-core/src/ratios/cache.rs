//! Bounded memo cache for ratio results.
//!
//! Keyed by the content hash of the canonical statement set. Once `capacity`
//! entries are stored, further results are computed but not cached. Racing
//! writers on the same key are harmless: the last insert wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::normalize::CanonicalStatementSet;
use crate::types::{round2, RatioResult};

/// Snapshot of cache counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate_percent: Decimal,
    pub entries: usize,
    pub capacity: usize,
}

pub struct RatioCache {
    entries: RwLock<HashMap<String, RatioResult>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RatioCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a result, counting the hit or miss.
    pub fn get(&self, key: &str) -> Option<RatioResult> {
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|cache| cache.get(key).cloned());
        match found {
            Some(result) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "ratio cache hit");
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a result while capacity remains. Returns whether it was stored.
    pub fn insert(&self, key: String, result: RatioResult) -> bool {
        let Ok(mut cache) = self.entries.write() else {
            warn!("ratio cache lock poisoned, skipping insert");
            return false;
        };
        if cache.len() >= self.capacity && !cache.contains_key(&key) {
            debug!(capacity = self.capacity, "ratio cache full, not storing");
            return false;
        }
        cache.insert(key, result);
        true
    }

    /// Return the cached result for `statements`, computing and storing it on
    /// a miss. If the set cannot be hashed the result is computed uncached.
    pub fn get_or_compute<F>(&self, statements: &CanonicalStatementSet, compute: F) -> RatioResult
    where
        F: FnOnce(&CanonicalStatementSet) -> RatioResult,
    {
        let key = match statements.content_hash() {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "could not hash statements, computing uncached");
                return compute(statements);
            }
        };
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let result = compute(statements);
        self.insert(key, result.clone());
        result
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate_percent = if total == 0 {
            Decimal::ZERO
        } else {
            round2(Decimal::from(hits) * Decimal::ONE_HUNDRED / Decimal::from(total))
        };
        CacheStats {
            cache_hits: hits,
            cache_misses: misses,
            hit_rate_percent,
            entries: self.len(),
            capacity: self.capacity,
        }
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.entries.write() {
            cache.clear();
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for RatioCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatioCache")
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
