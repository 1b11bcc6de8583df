//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::fingerprint::fingerprint;

// == Cache Entry ==
/// Represents a single cache entry: a value, its fingerprint and an optional expiry.
///
/// Entries are never mutated in place. Any change of value builds a new entry,
/// so `fingerprint` always equals the fingerprint of `value`.
///
/// This is also the persisted form of an entry:
/// `{ "value": ..., "fingerprint": "...", "expireAt": <unix ms | null> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// SHA-256 fingerprint of `value`
    pub fingerprint: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    #[serde(default)]
    pub expire_at: Option<i64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now, if given.
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self::new_at(value, ttl, current_timestamp_ms())
    }

    /// Creates a new cache entry relative to the timestamp `now` (Unix milliseconds).
    pub fn new_at(value: Value, ttl: Option<Duration>, now: i64) -> Self {
        let fingerprint = fingerprint(&value);
        let expire_at = ttl.map(|ttl| now.saturating_add(duration_ms(ttl)));

        Self {
            value,
            fingerprint,
            expire_at,
        }
    }

    /// Recomputes the fingerprint from `value`. Returns true if it had drifted.
    pub fn repair_fingerprint(&mut self) -> bool {
        let actual = fingerprint(&self.value);
        if actual == self.fingerprint {
            return false;
        }
        self.fingerprint = actual;
        true
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Checks expiry against an explicit timestamp (Unix milliseconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expire_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_at(&self, now: i64) -> Option<Duration> {
        self.expire_at
            .map(|expires| Duration::from_millis(expires.saturating_sub(now).max(0) as u64))
    }

    /// Returns remaining TTL relative to the current time.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.ttl_remaining_at(current_timestamp_ms())
    }

    /// True when `other` is the same write as `self` (same content and expiry).
    pub fn same_write(&self, other: &CacheEntry) -> bool {
        self.fingerprint == other.fingerprint && self.expire_at == other.expire_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn duration_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}
