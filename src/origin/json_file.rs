use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{CacheError, Result};
use crate::origin::OriginStore;

/// Origin backed by a JSON object file.
///
/// The file is re-read on every fetch so edits made by other processes are
/// picked up. Writes through `upsert` are serialized by an internal lock.
#[derive(Debug)]
pub struct JsonFileOrigin {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileOrigin {
    /// Opens the origin at `path`, creating it as `{}` if missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CacheError::origin(path.display().to_string(), e))?
        {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| CacheError::origin(path.display().to_string(), e))?;
            }
            tokio::fs::write(&path, b"{}")
                .await
                .map_err(|e| CacheError::origin(path.display().to_string(), e))?;
            info!(path = %path.display(), "Created empty origin file");
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `value` under `key`, replacing any previous value.
    pub async fn upsert(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read_all(key).await?;
        data.insert(key.to_string(), value);

        let bytes = serde_json::to_vec_pretty(&Value::Object(data))
            .map_err(|e| CacheError::origin(key, e))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| CacheError::origin(key, e))
    }

    async fn read_all(&self, key: &str) -> Result<Map<String, Value>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CacheError::origin(key, e))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(CacheError::origin(key, "origin file is not a JSON object")),
            Err(e) => Err(CacheError::origin(key, e)),
        }
    }
}

#[async_trait]
impl OriginStore for JsonFileOrigin {
    fn name(&self) -> &'static str {
        "json_file"
    }

    async fn fetch_value(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        let mut data = self.read_all(key).await?;
        Ok(data.remove(key).filter(|value| !value.is_null()))
    }
}
