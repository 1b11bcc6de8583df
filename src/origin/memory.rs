use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::origin::OriginStore;

/// In-memory origin, seeded up front and mutable for demos and tests.
#[derive(Debug, Default)]
pub struct MemoryOrigin {
    data: RwLock<HashMap<String, Value>>,
}

impl MemoryOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an origin holding `seed`.
    pub fn with_seed<K, I>(seed: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self {
            data: RwLock::new(seed.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Inserts or replaces the canonical value for `key`.
    pub async fn update(&self, key: impl Into<String>, value: Value) {
        self.data.write().await.insert(key.into(), value);
    }

    /// Removes `key` from the origin.
    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.data.write().await.remove(key)
    }
}

#[async_trait]
impl OriginStore for MemoryOrigin {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self
            .data
            .read()
            .await
            .get(key)
            .filter(|value| !value.is_null())
            .cloned())
    }
}
