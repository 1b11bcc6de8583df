use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::persistence::{PersistenceStore, Snapshot};

/// Keeps the snapshot in process memory and counts writes.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    snapshot: Mutex<Snapshot>,
    saves: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a previously saved snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the last saved snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().await.clone()
    }
}

#[async_trait]
impl PersistenceStore for MemoryPersistence {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.lock().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.snapshot.lock().await = snapshot.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
