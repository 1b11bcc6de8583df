//! Persistence Module
//!
//! Snapshot sinks for the cache map. A snapshot is loaded once when the
//! engine starts and rewritten in full after every mutation.

mod json_file;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::cache::CacheEntry;
use crate::error::Result;

pub use json_file::JsonFilePersistence;
pub use memory::MemoryPersistence;

/// Full cache contents as persisted: key to entry.
pub type Snapshot = HashMap<String, CacheEntry>;

/// Durable storage for cache snapshots.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// A name for logs.
    fn name(&self) -> &'static str;

    /// Loads the last saved snapshot. An absent snapshot is an empty map.
    async fn load(&self) -> Result<Snapshot>;

    /// Replaces the stored snapshot with `snapshot`.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
