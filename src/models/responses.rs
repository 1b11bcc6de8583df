//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for GET /cache/{key}
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The cached value
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for PUT /cache/{key}
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub key: String,
    pub value: Value,
    /// TTL in seconds as requested
    pub ttl: Option<f64>,
    /// False when the entry is cached but the snapshot write failed
    pub persisted: bool,
}

/// Response body for DELETE /cache/{key}
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    /// Always true: deleting an absent key succeeds
    pub deleted: bool,
    /// False when the removal happened but the snapshot write failed
    pub persisted: bool,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, persisted: bool) -> Self {
        Self {
            key: key.into(),
            deleted: true,
            persisted,
        }
    }
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that consulted the origin
    pub misses: u64,
    /// Entries reaped after their TTL elapsed
    pub expired: u64,
    /// Entries rewritten by revalidation
    pub refreshed: u64,
    /// Entries removed because the origin dropped the key
    pub evicted: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
            refreshed: stats.refreshed,
            evicted: stats.evicted,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
