//! Integration Tests for the Cache Engine
//!
//! Read-through, expiry, revalidation and persistence behaviour against
//! in-memory and file-backed collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redsnano::cache::fingerprint;
use redsnano::{
    CacheEngine, CacheError, EngineOptions, JsonFilePersistence, MemoryOrigin, MemoryPersistence,
    OriginStore, PersistenceStore, RevalidationMode, Snapshot,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Notify;

// == Test Collaborators ==

/// Memory origin that counts calls and can be switched offline.
#[derive(Default)]
struct TestOrigin {
    inner: MemoryOrigin,
    value_fetches: AtomicUsize,
    fingerprint_fetches: AtomicUsize,
    offline: AtomicBool,
}

impl TestOrigin {
    fn seeded(key: &str, value: Value) -> Self {
        Self {
            inner: MemoryOrigin::with_seed([(key, value)]),
            ..Self::default()
        }
    }

    fn value_fetches(&self) -> usize {
        self.value_fetches.load(Ordering::SeqCst)
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self, key: &str) -> redsnano::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CacheError::origin(key, "origin offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OriginStore for TestOrigin {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn fetch_value(&self, key: &str) -> redsnano::Result<Option<Value>> {
        self.value_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online(key)?;
        self.inner.fetch_value(key).await
    }

    async fn fetch_fingerprint(&self, key: &str) -> redsnano::Result<Option<String>> {
        self.fingerprint_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online(key)?;
        self.inner.fetch_fingerprint(key).await
    }
}

/// Origin whose `fetch_value` blocks until released.
struct GatedOrigin {
    value: Value,
    fetch_started: Notify,
    release: Notify,
}

#[async_trait]
impl OriginStore for GatedOrigin {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn fetch_value(&self, _key: &str) -> redsnano::Result<Option<Value>> {
        self.fetch_started.notify_one();
        self.release.notified().await;
        Ok(Some(self.value.clone()))
    }

    async fn fetch_fingerprint(&self, _key: &str) -> redsnano::Result<Option<String>> {
        Ok(Some(fingerprint(&self.value)))
    }
}

/// Persistence that always fails to save.
struct BrokenPersistence;

#[async_trait]
impl PersistenceStore for BrokenPersistence {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn load(&self) -> redsnano::Result<Snapshot> {
        Ok(Snapshot::new())
    }

    async fn save(&self, _snapshot: &Snapshot) -> redsnano::Result<()> {
        Err(CacheError::Persistence("disk unavailable".to_string()))
    }
}

// == Helper Functions ==

fn options(mode: RevalidationMode) -> EngineOptions {
    EngineOptions {
        default_ttl: None,
        revalidation: mode,
    }
}

async fn inline_engine(
    origin: Arc<dyn OriginStore>,
    persistence: Arc<dyn PersistenceStore>,
) -> CacheEngine {
    CacheEngine::open(origin, persistence, options(RevalidationMode::Inline)).await
}

/// Polls the stored entry until it holds `expected`, for up to two seconds.
async fn wait_for_value(engine: &CacheEngine, key: &str, expected: &Value) -> bool {
    for _ in 0..200 {
        if engine.peek(key).await.map(|entry| entry.value).as_ref() == Some(expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// == Read-Through ==

#[tokio::test]
async fn test_get_set_keys_scenario() {
    let origin = Arc::new(MemoryOrigin::with_seed([("user:1", json!({"name": "Alice"}))]));
    let engine = CacheEngine::open(
        origin,
        Arc::new(MemoryPersistence::new()),
        options(RevalidationMode::Background),
    )
    .await;

    assert_eq!(
        engine.get("user:1").await.unwrap(),
        Some(json!({"name": "Alice"}))
    );

    engine
        .set("user:2", json!({"name": "Bob"}), Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(
        engine.get("user:2").await.unwrap(),
        Some(json!({"name": "Bob"}))
    );

    let mut keys = engine.keys().await;
    keys.sort();
    assert_eq!(keys, vec!["user:1".to_string(), "user:2".to_string()]);

    // The origin never held user:2, so its revalidation evicts it.
    for _ in 0..200 {
        if engine.peek("user:2").await.is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(engine.keys().await, vec!["user:1".to_string()]);
}

#[tokio::test]
async fn test_primed_entry_follows_origin_deletion() {
    let record = json!({"email": "a@x.io"});
    let origin = Arc::new(MemoryOrigin::with_seed([("alice", record.clone())]));
    let engine = inline_engine(origin.clone(), Arc::new(MemoryPersistence::new())).await;

    engine.set("alice", record.clone(), None).await.unwrap();
    assert_eq!(engine.get("alice").await.unwrap(), Some(record));

    origin.remove("alice").await;
    assert_eq!(engine.get("alice").await.unwrap(), None);
    assert!(engine.keys().await.is_empty());
}

#[tokio::test]
async fn test_miss_path_origin_failure_propagates() {
    let origin = Arc::new(TestOrigin::default());
    origin.set_offline(true);
    let engine = inline_engine(origin, Arc::new(MemoryPersistence::new())).await;

    let result = engine.get("anything").await;
    assert!(matches!(result, Err(CacheError::OriginUnavailable { .. })));
}

// == TTL ==

#[tokio::test]
async fn test_ttl_expiration_refetches_changed_value() {
    let origin = Arc::new(MemoryOrigin::with_seed([("session", json!({"token": "abc"}))]));
    let engine = inline_engine(origin.clone(), Arc::new(MemoryPersistence::new())).await;

    engine
        .set("session", json!({"token": "abc"}), Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert_eq!(
        engine.get("session").await.unwrap(),
        Some(json!({"token": "abc"}))
    );

    tokio::time::sleep(Duration::from_millis(80)).await;
    origin.update("session", json!({"token": "refetched"})).await;

    assert_eq!(
        engine.get("session").await.unwrap(),
        Some(json!({"token": "refetched"}))
    );
}

#[tokio::test]
async fn test_expired_entry_is_refetched_not_served() {
    let origin = Arc::new(TestOrigin::seeded("k", json!("v")));
    let engine = inline_engine(origin.clone(), Arc::new(MemoryPersistence::new())).await;

    engine
        .set("k", json!("v"), Some(Duration::from_millis(30)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let before = origin.value_fetches();
    assert_eq!(engine.get("k").await.unwrap(), Some(json!("v")));
    assert_eq!(origin.value_fetches(), before + 1);

    let stats = engine.stats().await;
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_expired_entry_absent_at_origin_reads_absent() {
    let engine = inline_engine(
        Arc::new(MemoryOrigin::new()),
        Arc::new(MemoryPersistence::new()),
    )
    .await;

    engine
        .set("temp", json!(1), Some(Duration::from_millis(20)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert_eq!(engine.get("temp").await.unwrap(), None);
    assert!(engine.keys().await.is_empty());
}

#[tokio::test]
async fn test_keys_include_unreaped_expired_entries() {
    let engine = inline_engine(
        Arc::new(MemoryOrigin::new()),
        Arc::new(MemoryPersistence::new()),
    )
    .await;

    engine
        .set("stale", json!(1), Some(Duration::from_millis(10)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(engine.keys().await, vec!["stale".to_string()]);
}

// == Revalidation ==

#[tokio::test]
async fn test_inline_revalidation_converges() {
    let origin = Arc::new(MemoryOrigin::with_seed([("user:1", json!({"name": "Alice"}))]));
    let engine = inline_engine(origin.clone(), Arc::new(MemoryPersistence::new())).await;

    assert_eq!(
        engine.get("user:1").await.unwrap(),
        Some(json!({"name": "Alice"}))
    );

    origin.update("user:1", json!({"name": "Bob"})).await;
    assert_eq!(
        engine.get("user:1").await.unwrap(),
        Some(json!({"name": "Bob"}))
    );
    assert_eq!(
        engine.get("user:1").await.unwrap(),
        Some(json!({"name": "Bob"}))
    );
    assert_eq!(engine.stats().await.refreshed, 1);
}

#[tokio::test]
async fn test_background_revalidation_returns_previous_value() {
    let origin = Arc::new(MemoryOrigin::with_seed([("k", json!("A"))]));
    let engine = CacheEngine::open(
        origin.clone(),
        Arc::new(MemoryPersistence::new()),
        options(RevalidationMode::Background),
    )
    .await;

    assert_eq!(engine.get("k").await.unwrap(), Some(json!("A")));
    origin.update("k", json!("B")).await;

    assert_eq!(engine.get("k").await.unwrap(), Some(json!("A")));
    assert!(wait_for_value(&engine, "k", &json!("B")).await);
    assert_eq!(engine.get("k").await.unwrap(), Some(json!("B")));
}

#[tokio::test]
async fn test_unchanged_origin_causes_no_rewrite() {
    let origin = Arc::new(TestOrigin::seeded("k", json!({"a": 1})));
    let persistence = Arc::new(MemoryPersistence::new());
    let engine = inline_engine(origin.clone(), persistence.clone()).await;

    engine
        .get_with_ttl("k", Some(Duration::from_secs(60)))
        .await
        .unwrap();
    let saves = persistence.saves();
    let snapshot = persistence.snapshot().await;
    let entry = engine.peek("k").await.unwrap();

    for _ in 0..3 {
        assert_eq!(engine.get("k").await.unwrap(), Some(json!({"a": 1})));
    }

    assert_eq!(persistence.saves(), saves);
    assert_eq!(persistence.snapshot().await, snapshot);
    assert_eq!(engine.peek("k").await.unwrap(), entry);
    assert_eq!(origin.value_fetches(), 1);
    assert_eq!(origin.fingerprint_fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_origin_deletion_evicts_entry() {
    let origin = Arc::new(MemoryOrigin::with_seed([("k", json!(1))]));
    let persistence = Arc::new(MemoryPersistence::new());
    let engine = inline_engine(origin.clone(), persistence.clone()).await;

    assert_eq!(engine.get("k").await.unwrap(), Some(json!(1)));
    origin.remove("k").await;

    assert_eq!(engine.get("k").await.unwrap(), None);
    assert!(engine.keys().await.is_empty());
    assert!(persistence.snapshot().await.is_empty());
    assert_eq!(engine.stats().await.evicted, 1);
}

#[tokio::test]
async fn test_revalidation_failure_is_swallowed() {
    let origin = Arc::new(TestOrigin::seeded("k", json!("cached")));
    let engine = inline_engine(origin.clone(), Arc::new(MemoryPersistence::new())).await;

    assert_eq!(engine.get("k").await.unwrap(), Some(json!("cached")));
    origin.set_offline(true);

    assert_eq!(engine.get("k").await.unwrap(), Some(json!("cached")));
    assert!(engine.peek("k").await.is_some());
}

#[tokio::test]
async fn test_revalidation_and_set_race_last_writer_wins() {
    let origin = Arc::new(GatedOrigin {
        value: json!("from-origin"),
        fetch_started: Notify::new(),
        release: Notify::new(),
    });
    let engine = CacheEngine::open(
        origin.clone(),
        Arc::new(MemoryPersistence::new()),
        options(RevalidationMode::Background),
    )
    .await;

    engine.set("k", json!("first"), None).await.unwrap();
    assert_eq!(engine.get("k").await.unwrap(), Some(json!("first")));

    // Revalidation is now blocked fetching the changed value.
    origin.fetch_started.notified().await;
    engine.set("k", json!("concurrent"), None).await.unwrap();
    origin.release.notify_one();

    // The revalidation write lands after the concurrent set and replaces it.
    assert!(wait_for_value(&engine, "k", &json!("from-origin")).await);
}

// == Persistence ==

#[tokio::test]
async fn test_persistence_failure_keeps_memory_state() {
    let origin = Arc::new(MemoryOrigin::with_seed([("k", json!("v"))]));
    let engine = inline_engine(origin, Arc::new(BrokenPersistence)).await;

    let result = engine.set("k", json!("v"), None).await;
    assert!(matches!(result, Err(CacheError::Persistence(_))));
    assert_eq!(engine.get("k").await.unwrap(), Some(json!("v")));

    let result = engine.delete("k").await;
    assert!(matches!(result, Err(CacheError::Persistence(_))));
    assert!(engine.keys().await.is_empty());
}

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");

    {
        let engine = inline_engine(
            Arc::new(MemoryOrigin::new()),
            Arc::new(JsonFilePersistence::new(&path)),
        )
        .await;
        engine
            .set("user:2", json!({"name": "Bob"}), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        engine.set("gone", json!(0), None).await.unwrap();
        engine.delete("gone").await.unwrap();
    }

    let reopened = inline_engine(
        Arc::new(MemoryOrigin::new()),
        Arc::new(JsonFilePersistence::new(&path)),
    )
    .await;
    assert_eq!(reopened.keys().await, vec!["user:2".to_string()]);
    assert_eq!(
        reopened.peek("user:2").await.map(|entry| entry.value),
        Some(json!({"name": "Bob"}))
    );
}

#[tokio::test]
async fn test_corrupt_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "{ definitely not json").unwrap();

    let engine = inline_engine(
        Arc::new(MemoryOrigin::new()),
        Arc::new(JsonFilePersistence::new(&path)),
    )
    .await;
    assert!(engine.is_empty().await);

    engine.set("k", json!(1), None).await.unwrap();
    let reloaded = JsonFilePersistence::new(&path).load().await.unwrap();
    assert_eq!(reloaded.len(), 1);
}

// == Concurrency ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_operations_leave_consistent_snapshot() {
    let persistence = Arc::new(MemoryPersistence::new());
    let engine = inline_engine(Arc::new(MemoryOrigin::new()), persistence.clone()).await;

    let mut handles = Vec::new();
    for i in 0..64 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("key{}", i % 5);
            match i % 3 {
                0 => engine.set(key, json!(i), None).await.map(|_| ()),
                1 => engine.get(&key).await.map(|_| ()),
                _ => engine.delete(&key).await.map(|_| ()),
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let snapshot = persistence.snapshot().await;
    let mut keys = engine.keys().await;
    keys.sort();
    let mut persisted: Vec<String> = snapshot.keys().cloned().collect();
    persisted.sort();
    assert_eq!(keys, persisted);
    for key in keys {
        assert_eq!(engine.peek(&key).await.as_ref(), snapshot.get(&key));
    }
}

#[tokio::test]
async fn test_engine_handles_share_state() {
    let engine = inline_engine(
        Arc::new(MemoryOrigin::new()),
        Arc::new(MemoryPersistence::new()),
    )
    .await;
    let other = engine.clone();

    engine.set("shared", json!(true), None).await.unwrap();
    assert_eq!(
        other.peek("shared").await.map(|entry| entry.value),
        Some(json!(true))
    );
}
