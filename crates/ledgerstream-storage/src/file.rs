//! File-backed pointer store.
//!
//! All checkpoints live in one JSON object keyed by ingestor id. Every save
//! rewrites a temporary sibling file and renames it over the original, so a
//! crash never leaves a half-written checkpoint behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ledgerstream_core::checkpoint::{Checkpoint, PointerStore};
use ledgerstream_core::error::IngestError;
use tokio::sync::Mutex;

pub struct FilePointerStore {
    path: PathBuf,
    /// Serialises read-modify-write cycles.
    lock: Mutex<()>,
}

impl FilePointerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<BTreeMap<String, Checkpoint>, IngestError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                IngestError::Storage(format!("corrupt checkpoint file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(IngestError::Storage(format!("read {}: {e}", self.path.display()))),
        }
    }

    async fn replace(&self, all: &BTreeMap<String, Checkpoint>) -> Result<(), IngestError> {
        let json = serde_json::to_vec_pretty(all).map_err(|e| IngestError::Storage(e.to_string()))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| IngestError::Storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| IngestError::Storage(format!("rename {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl PointerStore for FilePointerStore {
    async fn load(&self, ingestor_id: &str) -> Result<Option<Checkpoint>, IngestError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.remove(ingestor_id))
    }

    async fn save(&self, checkpoint: Checkpoint) -> Result<(), IngestError> {
        let _guard = self.lock.lock().await;
        let mut all = self.read().await?;
        tracing::debug!(
            ingestor = %checkpoint.ingestor_id,
            pointer = %checkpoint.pointer,
            path = %self.path.display(),
            "writing checkpoint"
        );
        all.insert(checkpoint.ingestor_id.clone(), checkpoint);
        self.replace(&all).await
    }

    async fn delete(&self, ingestor_id: &str) -> Result<(), IngestError> {
        let _guard = self.lock.lock().await;
        let mut all = self.read().await?;
        if all.remove(ingestor_id).is_some() {
            self.replace(&all).await?;
        }
        Ok(())
    }
}
