//! Cache Engine Module
//!
//! Read-through cache over an origin. Hits are served immediately and then
//! revalidated against the origin's fingerprint; misses and expired entries
//! are filled from the origin. Every mutation rewrites the full snapshot.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_ms, CacheEntry, CacheStats};
use crate::error::{CacheError, Result};
use crate::origin::OriginStore;
use crate::persistence::{PersistenceStore, Snapshot};

// == Options ==
/// How a cache hit waits on its revalidation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RevalidationMode {
    /// Revalidation runs detached; `get` returns the cached value at once.
    #[default]
    Background,
    /// `get` awaits the revalidation task and returns the re-read entry.
    Inline,
}

/// Construction options for [`CacheEngine`].
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// TTL for entries filled from the origin when the caller gives none
    pub default_ttl: Option<Duration>,
    pub revalidation: RevalidationMode,
}

/// What a revalidation pass did to the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revalidation {
    /// Origin fingerprint matched; nothing written
    Unchanged,
    /// Origin value changed; entry rewritten
    Refreshed,
    /// Origin no longer has the key; entry removed
    Evicted,
}

// == Internal State ==
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

enum Lookup {
    Hit(CacheEntry),
    Expired(CacheEntry),
    Miss,
}

struct EngineInner {
    /// Guards every map access. Never held across origin or persistence I/O.
    state: Mutex<CacheState>,
    /// Serializes snapshot writes so the newest map state is saved last.
    persist_lock: Mutex<()>,
    origin: Arc<dyn OriginStore>,
    persistence: Arc<dyn PersistenceStore>,
    default_ttl: Option<Duration>,
    mode: RevalidationMode,
}

// == Cache Engine ==
/// Shared handle to a cache instance. Clones refer to the same cache.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

impl fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEngine")
            .field("origin", &self.inner.origin.name())
            .field("persistence", &self.inner.persistence.name())
            .field("default_ttl", &self.inner.default_ttl)
            .field("mode", &self.inner.mode)
            .finish()
    }
}

impl CacheEngine {
    // == Constructor ==
    /// Creates an engine, loading its initial contents from `persistence`.
    ///
    /// An unreadable snapshot is logged and the engine starts empty.
    pub async fn open(
        origin: Arc<dyn OriginStore>,
        persistence: Arc<dyn PersistenceStore>,
        options: EngineOptions,
    ) -> Self {
        let mut entries = match persistence.load().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    persistence = persistence.name(),
                    error = %err,
                    "Discarding unreadable cache snapshot"
                );
                Snapshot::new()
            }
        };
        for (key, entry) in entries.iter_mut() {
            if entry.repair_fingerprint() {
                warn!(key = %key, "Snapshot fingerprint did not match its value; recomputed");
            }
        }
        info!(
            origin = origin.name(),
            persistence = persistence.name(),
            entries = entries.len(),
            "Cache engine opened"
        );

        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(CacheState {
                    entries,
                    stats: CacheStats::new(),
                }),
                persist_lock: Mutex::new(()),
                origin,
                persistence,
                default_ttl: options.default_ttl,
                mode: options.revalidation,
            }),
        }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.inner.default_ttl
    }

    pub fn revalidation_mode(&self) -> RevalidationMode {
        self.inner.mode
    }

    // == Get ==
    /// Returns the value for `key`, consulting the origin on a miss.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.get_with_ttl(key, None).await
    }

    /// Like [`get`](Self::get), with `ttl` overriding the default TTL for a miss fill.
    ///
    /// A hit returns the cached value and schedules revalidation. In
    /// [`RevalidationMode::Background`] the returned value is the one cached
    /// before revalidation ran.
    ///
    /// # Errors
    /// `OriginUnavailable` when the origin fails on the miss path.
    pub async fn get_with_ttl(&self, key: &str, ttl: Option<Duration>) -> Result<Option<Value>> {
        let lookup = {
            let mut state = self.inner.state.lock().await;
            match state.entries.get(key).cloned() {
                Some(entry) if entry.is_expired() => Lookup::Expired(entry),
                Some(entry) => {
                    if self.inner.mode == RevalidationMode::Background {
                        state.stats.record_hit();
                    }
                    Lookup::Hit(entry)
                }
                None => Lookup::Miss,
            }
        };

        let entry = match lookup {
            Lookup::Hit(entry) => entry,
            Lookup::Expired(entry) => {
                debug!(key, "Cached entry expired");
                self.reap_expired(key, &entry).await;
                return self.fill_from_origin(key, ttl).await;
            }
            Lookup::Miss => return self.fill_from_origin(key, ttl).await,
        };

        let task = self.spawn_revalidation(key, entry.clone());
        match self.inner.mode {
            RevalidationMode::Background => Ok(Some(entry.value)),
            RevalidationMode::Inline => {
                if let Err(err) = task.await {
                    warn!(key, error = %err, "Revalidation task did not complete");
                }
                let current = {
                    let mut state = self.inner.state.lock().await;
                    let current = state.entries.get(key).map(|entry| entry.value.clone());
                    if current.is_some() {
                        state.stats.record_hit();
                    }
                    current
                };
                match current {
                    Some(value) => Ok(Some(value)),
                    None => self.fill_from_origin(key, ttl).await,
                }
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`, expiring `ttl` from now if given.
    ///
    /// # Errors
    /// `Persistence` when the snapshot write fails. The in-memory entry is
    /// already in place at that point.
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.write(key.into(), CacheEntry::new(value, ttl)).await
    }

    /// Replaces the entry under `key` and persists the snapshot.
    async fn write(&self, key: String, entry: CacheEntry) -> Result<()> {
        debug!(
            key = %key,
            fingerprint = %entry.fingerprint,
            expire_at = ?entry.expire_at,
            "Write"
        );

        self.inner.state.lock().await.entries.insert(key, entry);
        self.persist().await
    }

    // == Delete ==
    /// Removes `key`. Returns whether an entry was present; absent keys are a no-op.
    ///
    /// # Errors
    /// `Persistence` when the snapshot write fails after the removal.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.inner.state.lock().await.entries.remove(key).is_some();
        if removed {
            debug!(key, "Deleted");
            self.persist().await?;
        }
        Ok(removed)
    }

    // == Keys ==
    /// Keys currently held, including entries whose TTL elapsed but were not yet reaped.
    pub async fn keys(&self) -> Vec<String> {
        self.inner.state.lock().await.entries.keys().cloned().collect()
    }

    /// The stored entry for `key`, without expiry checks or revalidation.
    pub async fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.inner.state.lock().await.entries.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.lock().await.entries.is_empty()
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock().await;
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    // == Purge Expired ==
    /// Removes all expired entries, persisting once if any were removed.
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let removed = {
            let mut state = self.inner.state.lock().await;
            let now = current_timestamp_ms();
            let before = state.entries.len();
            state.entries.retain(|_, entry| !entry.is_expired_at(now));
            let removed = before - state.entries.len();
            state.stats.record_expired(removed);
            removed
        };

        if removed > 0 {
            self.persist().await?;
        }
        Ok(removed)
    }

    // == Revalidation ==
    /// Checks `entry` (as cached under `key`) against the origin and repairs it.
    ///
    /// When the origin no longer has the key, the entry is evicted, however
    /// it was written.
    ///
    /// A changed value is written back with the entry's remaining TTL, or the
    /// default TTL when the entry had none. The write replaces whatever is
    /// cached at that moment; a `set` racing with revalidation may be
    /// overwritten.
    pub async fn revalidate(&self, key: &str, entry: &CacheEntry) -> Result<Revalidation> {
        let origin = &self.inner.origin;

        let Some(current) = origin.fetch_fingerprint(key).await? else {
            self.evict(key).await?;
            return Ok(Revalidation::Evicted);
        };
        if current == entry.fingerprint {
            return Ok(Revalidation::Unchanged);
        }

        let Some(value) = origin.fetch_value(key).await? else {
            self.evict(key).await?;
            return Ok(Revalidation::Evicted);
        };

        let ttl = entry.ttl_remaining().or(self.inner.default_ttl);
        let written = self
            .write(key.to_string(), CacheEntry::new(value, ttl))
            .await;
        self.inner.state.lock().await.stats.record_refresh();
        written?;
        Ok(Revalidation::Refreshed)
    }

    fn spawn_revalidation(&self, key: &str, entry: CacheEntry) -> JoinHandle<()> {
        let engine = self.clone();
        let key = key.to_string();

        tokio::spawn(async move {
            match engine.revalidate(&key, &entry).await {
                Ok(outcome) => debug!(key = %key, ?outcome, "Revalidated"),
                Err(err) => warn!(key = %key, error = %err, "Revalidation failed"),
            }
        })
    }

    async fn evict(&self, key: &str) -> Result<()> {
        let removed = {
            let mut state = self.inner.state.lock().await;
            let removed = state.entries.remove(key).is_some();
            if removed {
                state.stats.record_eviction();
            }
            removed
        };

        if removed {
            debug!(key, "Evicted: key gone from origin");
            self.persist().await?;
        }
        Ok(())
    }

    // == Miss Path ==
    async fn fill_from_origin(&self, key: &str, ttl: Option<Duration>) -> Result<Option<Value>> {
        self.inner.state.lock().await.stats.record_miss();

        let fetched = self
            .inner
            .origin
            .fetch_value(key)
            .await
            .map_err(|err| match err {
                CacheError::OriginUnavailable { .. } => err,
                other => CacheError::origin(key, other),
            })?;
        let Some(value) = fetched else {
            debug!(key, origin = self.inner.origin.name(), "Key absent from origin");
            return Ok(None);
        };

        let entry = CacheEntry::new(value.clone(), ttl.or(self.inner.default_ttl));
        if let Err(err) = self.write(key.to_string(), entry).await {
            warn!(key, error = %err, "Filled entry was not persisted");
        }
        Ok(Some(value))
    }

    /// Removes an expired entry unless it was replaced since it was observed.
    async fn reap_expired(&self, key: &str, observed: &CacheEntry) {
        let removed = {
            let mut state = self.inner.state.lock().await;
            let unchanged = state
                .entries
                .get(key)
                .is_some_and(|current| current.same_write(observed));
            if unchanged {
                state.entries.remove(key);
                state.stats.record_expired(1);
            }
            unchanged
        };

        if removed {
            if let Err(err) = self.persist().await {
                warn!(key, error = %err, "Expiry removal was not persisted");
            }
        }
    }

    // == Persistence ==
    async fn persist(&self) -> Result<()> {
        let _guard = self.inner.persist_lock.lock().await;
        let snapshot = self.inner.state.lock().await.entries.clone();

        self.inner
            .persistence
            .save(&snapshot)
            .await
            .map_err(|err| match err {
                CacheError::Persistence(_) => err,
                other => CacheError::Persistence(other.to_string()),
            })
    }
}
