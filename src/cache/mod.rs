//! Cache Module
//!
//! Provides the read-through cache engine with TTL expiration and
//! fingerprint-based revalidation against an origin.

mod engine;
mod entry;
pub mod fingerprint;
mod stats;


// Re-export public types
pub use engine::{CacheEngine, EngineOptions, Revalidation, RevalidationMode};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use fingerprint::{canonical_json, fingerprint, fingerprint_of};
pub use stats::CacheStats;
