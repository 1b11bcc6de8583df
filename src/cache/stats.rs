//! Cache Statistics Module
//!
//! Tracks read outcomes and revalidation results.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads served from a live cached entry
    pub hits: u64,
    /// Reads that had to consult the origin for the value
    pub misses: u64,
    /// Entries reaped because their TTL elapsed
    pub expired: u64,
    /// Entries rewritten by revalidation after a fingerprint change
    pub refreshed: u64,
    /// Entries dropped by revalidation because the origin no longer has the key
    pub evicted: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired += count as u64;
    }

    pub fn record_refresh(&mut self) {
        self.refreshed += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evicted += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
