//! The `Writer` seam: durable append of ingested entries.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::IngestError;
use crate::types::Entry;

/// Appends batches of entries to the history store.
///
/// A batch either succeeds or fails as a whole. Batches for one ledger arrive
/// in transaction order; batches for different ledgers may be written
/// concurrently.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(&self, entries: Vec<Entry>) -> Result<(), IngestError>;
}

#[async_trait]
impl<W: Writer + ?Sized> Writer for Arc<W> {
    async fn write(&self, entries: Vec<Entry>) -> Result<(), IngestError> {
        (**self).write(entries).await
    }
}
