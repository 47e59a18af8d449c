//! Transaction events and the observer seam between ingestion and notification.

use crate::model::{TransactionEnvelope, TransactionMeta};

/// One observed transaction, shared read-only by every stream it is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    pub envelope: TransactionEnvelope,
    /// Raw result bytes, when the source provided them.
    pub result: Option<Vec<u8>>,
    pub meta: TransactionMeta,
}

impl TransactionEvent {
    pub fn new(envelope: TransactionEnvelope, meta: TransactionMeta) -> Self {
        Self {
            envelope,
            result: None,
            meta,
        }
    }

    pub fn with_result(mut self, result: Vec<u8>) -> Self {
        self.result = Some(result);
        self
    }
}

/// A transaction the ingestor has just written, in raw form.
#[derive(Debug, Clone, Copy)]
pub struct ObservedTransaction<'a> {
    pub ledger: u32,
    pub envelope: &'a [u8],
    pub result: &'a [u8],
    pub meta: &'a [u8],
}

/// Receives every transaction the ingestor commits.
///
/// Called from ingestion tasks, so implementations must not block.
pub trait TransactionObserver: Send + Sync {
    fn observe(&self, tx: &ObservedTransaction<'_>);
}
