//! redsnano - A read-through, self-validating key/value cache
//!
//! Serves values from memory, fills misses from an origin data source and
//! revalidates hits against the origin by content fingerprint.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod origin;
pub mod persistence;
pub mod tasks;

pub use api::{AppState, UsersState};
pub use cache::{CacheEngine, CacheEntry, EngineOptions, Revalidation, RevalidationMode};
pub use config::Config;
pub use error::{CacheError, Result};
pub use origin::{JsonFileOrigin, MemoryOrigin, OriginStore, SqliteUserOrigin};
pub use persistence::{JsonFilePersistence, MemoryPersistence, PersistenceStore, Snapshot};
pub use tasks::spawn_cleanup_task;
