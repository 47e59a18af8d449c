//! In-memory writer.
//!
//! Records every batch it accepts. Useful for tests and dry runs; all data is
//! lost when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use ledgerstream_core::error::IngestError;
use ledgerstream_core::types::Entry;
use ledgerstream_core::writer::Writer;
use parking_lot::Mutex;

#[derive(Default)]
pub struct MemoryWriter {
    batches: Mutex<Vec<Vec<Entry>>>,
    failures: Mutex<HashMap<u32, String>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any batch containing an entry for `ledger`.
    pub fn fail_ledger(&self, ledger: u32, reason: impl Into<String>) {
        self.failures.lock().insert(ledger, reason.into());
    }

    /// Every accepted entry, batch by batch.
    pub fn writes(&self) -> Vec<Entry> {
        self.batches.lock().iter().flatten().cloned().collect()
    }

    pub fn batches(&self) -> Vec<Vec<Entry>> {
        self.batches.lock().clone()
    }

    /// Accepted entries of one ledger, in write order.
    pub fn entries_for(&self, ledger: u32) -> Vec<Entry> {
        self.batches
            .lock()
            .iter()
            .flatten()
            .filter(|e| e.ledger == ledger)
            .cloned()
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl Writer for MemoryWriter {
    async fn write(&self, entries: Vec<Entry>) -> Result<(), IngestError> {
        {
            let failures = self.failures.lock();
            if let Some((ledger, reason)) = entries
                .iter()
                .find_map(|e| failures.get(&e.ledger).map(|r| (e.ledger, r)))
            {
                return Err(IngestError::Write {
                    sequence: ledger,
                    reason: reason.clone(),
                });
            }
        }
        self.batches.lock().push(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerstream_core::types::ChainVersion;

    fn entry(ledger: u32, tag: u8) -> Entry {
        Entry {
            version: ChainVersion::V3,
            ledger,
            envelope: vec![tag],
            result: vec![tag, tag],
        }
    }

    #[tokio::test]
    async fn records_batches() {
        let w = MemoryWriter::new();
        w.write(vec![entry(1, 1), entry(1, 2)]).await.unwrap();
        w.write(vec![]).await.unwrap();
        w.write(vec![entry(2, 3)]).await.unwrap();
        assert_eq!(w.entry_count(), 3);
        assert_eq!(w.batches().len(), 3);
        assert_eq!(w.entries_for(1).len(), 2);
        assert_eq!(w.writes()[2].envelope, vec![3]);
    }

    #[tokio::test]
    async fn injected_failure_rejects_whole_batch() {
        let w = MemoryWriter::new();
        w.fail_ledger(5, "disk full");
        let err = w.write(vec![entry(5, 1)]).await.unwrap_err();
        assert!(matches!(err, IngestError::Write { sequence: 5, .. }));
        assert_eq!(w.entry_count(), 0);
        w.write(vec![entry(6, 1)]).await.unwrap();
        assert_eq!(w.entry_count(), 1);
    }
}
