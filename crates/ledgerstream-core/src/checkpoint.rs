//! Checkpoint manager: persists the ingestor's position for crash recovery.
//!
//! A checkpoint stores the pointer of the last ledger the consumer accepted
//! from the ordered feed, together with that ledger's block fingerprint. On
//! restart the pointer is handed back to `Ingestor::ingest`, which resumes
//! with the following ledger.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::pointer::LedgerPointer;
use crate::types::BlockId;

/// A persisted checkpoint for one ingestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique ingestor identifier.
    pub ingestor_id: String,
    /// Last ledger fully consumed.
    pub pointer: LedgerPointer,
    /// Block fingerprint of that ledger, used to re-seed chain verification.
    pub block: Option<BlockId>,
    /// Unix timestamp of when this checkpoint was saved.
    pub updated_at: i64,
}

/// Trait for storing and loading checkpoints.
///
/// Implementations include `MemoryPointerStore` and the file-backed store in
/// `ledgerstream-storage`.
#[async_trait]
pub trait PointerStore: Send + Sync {
    /// Load the latest checkpoint for an ingestor.
    async fn load(&self, ingestor_id: &str) -> Result<Option<Checkpoint>, IngestError>;

    /// Save (upsert) a checkpoint.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), IngestError>;

    /// Delete a checkpoint (e.g. when resetting an ingestor).
    async fn delete(&self, ingestor_id: &str) -> Result<(), IngestError>;
}

/// Manages checkpoint reads/writes for an ingestor.
pub struct CheckpointManager {
    store: Box<dyn PointerStore>,
    ingestor_id: String,
    /// How often to save (every N ledgers).
    save_interval: u64,
    /// Ledgers consumed since the last save.
    counter: u64,
}

impl CheckpointManager {
    pub fn new(
        store: Box<dyn PointerStore>,
        ingestor_id: impl Into<String>,
        save_interval: u64,
    ) -> Self {
        Self {
            store,
            ingestor_id: ingestor_id.into(),
            save_interval: save_interval.max(1),
            counter: 0,
        }
    }

    /// Load the saved checkpoint (returns `None` if none exists).
    pub async fn load(&self) -> Result<Option<Checkpoint>, IngestError> {
        self.store.load(&self.ingestor_id).await
    }

    /// The pointer to resume from; `None` means start of chain.
    pub async fn resume_pointer(&self) -> Result<Option<LedgerPointer>, IngestError> {
        Ok(self.load().await?.map(|cp| cp.pointer))
    }

    /// Conditionally save a checkpoint every `save_interval` ledgers.
    ///
    /// Call this after each ledger result is accepted.
    pub async fn maybe_save(
        &mut self,
        pointer: LedgerPointer,
        block: Option<BlockId>,
    ) -> Result<bool, IngestError> {
        self.counter += 1;
        if self.counter >= self.save_interval {
            self.force_save(pointer, block).await?;
            self.counter = 0;
            return Ok(true);
        }
        Ok(false)
    }

    /// Immediately save a checkpoint (used on shutdown).
    pub async fn force_save(
        &self,
        pointer: LedgerPointer,
        block: Option<BlockId>,
    ) -> Result<(), IngestError> {
        let cp = Checkpoint {
            ingestor_id: self.ingestor_id.clone(),
            pointer,
            block,
            updated_at: chrono::Utc::now().timestamp(),
        };
        tracing::debug!(ingestor = %self.ingestor_id, pointer = %pointer, "saving checkpoint");
        self.store.save(cp).await
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory pointer store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryPointerStore {
    data: Mutex<HashMap<String, Checkpoint>>,
}

impl MemoryPointerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PointerStore for MemoryPointerStore {
    async fn load(&self, ingestor_id: &str) -> Result<Option<Checkpoint>, IngestError> {
        Ok(self.data.lock().get(ingestor_id).cloned())
    }

    async fn save(&self, checkpoint: Checkpoint) -> Result<(), IngestError> {
        self.data
            .lock()
            .insert(checkpoint.ingestor_id.clone(), checkpoint);
        Ok(())
    }

    async fn delete(&self, ingestor_id: &str) -> Result<(), IngestError> {
        self.data.lock().remove(ingestor_id);
        Ok(())
    }
}
