use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::persistence::{PersistenceStore, Snapshot};

/// Writes the snapshot as a pretty-printed JSON object.
///
/// Each save goes to a sibling temp file which is then renamed over the
/// target, so readers never observe a half-written snapshot.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PersistenceStore for JsonFilePersistence {
    fn name(&self) -> &'static str {
        "json_file"
    }

    async fn load(&self) -> Result<Snapshot> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::new()),
            Err(e) => return Err(CacheError::MalformedSnapshot(e.to_string())),
        };
        if content.trim().is_empty() {
            return Ok(Snapshot::new());
        }

        serde_json::from_str(&content).map_err(|e| CacheError::MalformedSnapshot(e.to_string()))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CacheError::Persistence(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::Persistence(e.to_string()))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| CacheError::Persistence(e.to_string()))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| CacheError::Persistence(e.to_string()))?;

        debug!(path = %self.path.display(), entries = snapshot.len(), "Snapshot saved");
        Ok(())
    }
}
