//! Origin Module
//!
//! The authoritative data sources the cache is a view of.

mod json_file;
mod memory;
mod sqlite;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::fingerprint;
use crate::error::Result;

pub use json_file::JsonFileOrigin;
pub use memory::MemoryOrigin;
pub use sqlite::SqliteUserOrigin;

/// A source of canonical values, keyed by string.
///
/// Implementations return `Ok(None)` when the key does not exist and `Err`
/// only when the source itself cannot answer.
#[async_trait]
pub trait OriginStore: Send + Sync {
    /// A name for logs.
    fn name(&self) -> &'static str;

    /// Returns the current value for `key`.
    async fn fetch_value(&self, key: &str) -> Result<Option<Value>>;

    /// Returns the current fingerprint for `key`.
    ///
    /// The default hashes the result of `fetch_value`. Sources that can
    /// compute a fingerprint more cheaply should override it.
    async fn fetch_fingerprint(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .fetch_value(key)
            .await?
            .map(|value| fingerprint(&value)))
    }
}
