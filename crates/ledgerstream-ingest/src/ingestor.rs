//! `LedgerIngestor`: the ordered ingestion driver.
//!
//! # Lifecycle
//! 1. Resolve the cursor from the start pointer and open the ledger
//!    subscription (failures here are returned from `ingest`).
//! 2. The driver task reads headers until cancellation or end of stream,
//!    spawning one task per ledger and pushing that ledger's result slot onto
//!    the feed in arrival order. Headers before the expected sequence are
//!    dropped; a header past it gets a `ChainBreak` slot instead of a task.
//! 3. On shutdown the subscription is dropped, in-flight tasks are joined and
//!    the feed is closed.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use ledgerstream_core::client::{LedgerClient, LedgerRequest, LedgerStream, Order};
use ledgerstream_core::codec::decode_base64;
use ledgerstream_core::config::IngestConfig;
use ledgerstream_core::error::IngestError;
use ledgerstream_core::event::{ObservedTransaction, TransactionObserver};
use ledgerstream_core::pointer::LedgerPointer;
use ledgerstream_core::types::{BlockId, ChainVersion, Entry, IngestResult, LedgerHeader, TransactionRecord};
use ledgerstream_core::writer::Writer;
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::block::block_id;

/// Ordered feed of per-ledger result slots.
///
/// Slots arrive in ledger order; each resolves once its ledger is done. The
/// feed closes after cancellation (or the end of the subscription) once every
/// in-flight ledger has finished.
pub type ResultFeed = mpsc::Receiver<oneshot::Receiver<IngestResult>>;

/// Block hand-off between consecutive ledger tasks.
type BlockLink = oneshot::Receiver<Option<BlockId>>;

/// Drives ingestion of a ledger chain into a `Writer`.
#[async_trait]
pub trait Ingestor: Send + Sync {
    /// Chain version this ingestor reads and tags entries with.
    fn version(&self) -> ChainVersion;

    /// Start ingesting after `start` (or from the beginning of the chain).
    ///
    /// Returns an error only if ingestion cannot start; per-ledger failures
    /// are reported on the feed.
    async fn ingest(
        &self,
        cancel: CancellationToken,
        writer: Arc<dyn Writer>,
        start: Option<LedgerPointer>,
    ) -> Result<ResultFeed, IngestError>;
}

/// `Ingestor` backed by a `LedgerClient`.
pub struct LedgerIngestor<C: LedgerClient> {
    client: Arc<C>,
    config: IngestConfig,
    observer: Option<Arc<dyn TransactionObserver>>,
}

/// State shared by the driver and ledger tasks of one `ingest` call.
struct Run<C: LedgerClient> {
    client: Arc<C>,
    config: IngestConfig,
    observer: Option<Arc<dyn TransactionObserver>>,
}

impl<C: LedgerClient> LedgerIngestor<C> {
    /// `version` takes precedence over `config.chain_version`.
    pub fn new(version: ChainVersion, client: C, config: IngestConfig) -> Self {
        Self::from_shared(version, Arc::new(client), config)
    }

    pub fn from_shared(version: ChainVersion, client: Arc<C>, mut config: IngestConfig) -> Self {
        config.chain_version = version;
        Self {
            client,
            config,
            observer: None,
        }
    }

    /// Hand every successfully written transaction to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn TransactionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }
}

#[async_trait]
impl<C: LedgerClient> Ingestor for LedgerIngestor<C> {
    fn version(&self) -> ChainVersion {
        self.config.chain_version
    }

    async fn ingest(
        &self,
        cancel: CancellationToken,
        writer: Arc<dyn Writer>,
        start: Option<LedgerPointer>,
    ) -> Result<ResultFeed, IngestError> {
        let version = self.version();
        if let Some(pointer) = &start {
            if pointer.version != version {
                return Err(IngestError::VersionMismatch {
                    expected: version.as_u8(),
                    actual: pointer.version.as_u8(),
                });
            }
        }

        let cursor = LedgerPointer::cursor_for(start.as_ref());
        let first = LedgerPointer::next_sequence(start.as_ref());
        let ledgers = self
            .client
            .stream_ledgers(LedgerRequest {
                cursor: cursor.clone(),
                order: Order::Asc,
            })
            .await
            .map_err(|e| match e {
                IngestError::Subscribe(_) => e,
                other => IngestError::Subscribe(other.to_string()),
            })?;

        tracing::info!(
            %version,
            cursor = %cursor,
            first_sequence = first,
            max_in_flight = self.config.max_in_flight,
            "starting ledger ingestion"
        );

        let run = Arc::new(Run {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
            observer: self.observer.clone(),
        });
        let (feed_tx, feed_rx) = mpsc::channel(self.config.feed_capacity.max(1));
        tokio::spawn(run.drive(cancel, writer, ledgers, feed_tx, first));
        Ok(feed_rx)
    }
}

// ─── Driver ───────────────────────────────────────────────────────────────────

impl<C: LedgerClient> Run<C> {
    async fn drive(
        self: Arc<Self>,
        cancel: CancellationToken,
        writer: Arc<dyn Writer>,
        mut ledgers: LedgerStream,
        feed: mpsc::Sender<oneshot::Receiver<IngestResult>>,
        mut expected: u32,
    ) {
        let version = self.config.chain_version;
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let mut tasks = JoinSet::new();
        let mut prev_link: Option<BlockLink> = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = ledgers.next() => next,
            };

            let header = match next {
                Some(Ok(header)) => header,
                Some(Err(err)) => {
                    tracing::error!(sequence = expected, error = %err, "ledger subscription failed");
                    let reason = match err {
                        IngestError::Subscribe(reason) => reason,
                        other => other.to_string(),
                    };
                    let (slot_tx, slot_rx) = oneshot::channel();
                    let pointer = LedgerPointer::new(version, expected);
                    let _ = slot_tx.send(IngestResult::failure(pointer, None, IngestError::Subscribe(reason)));
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {}
                        _ = feed.send(slot_rx) => {}
                    }
                    break;
                }
                None => {
                    tracing::info!(next_sequence = expected, "ledger subscription ended");
                    break;
                }
            };

            // Pointer 0 and genesis share cursor "0"; anything before the
            // resume point was already ingested.
            if header.sequence < expected {
                tracing::debug!(expected, sequence = header.sequence, "dropping already ingested ledger");
                continue;
            }

            if header.sequence > expected {
                tracing::warn!(expected, sequence = header.sequence, "ledger subscription skipped ahead");
                let (slot_tx, slot_rx) = oneshot::channel();
                let pointer = LedgerPointer::new(version, header.sequence);
                let err = IngestError::ChainBreak {
                    sequence: header.sequence,
                    expected: format!("sequence {expected}"),
                    actual: format!("sequence {}", header.sequence),
                };
                let _ = slot_tx.send(IngestResult::failure(pointer, None, err));
                let queued = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    sent = feed.send(slot_rx) => sent.is_ok(),
                };
                if !queued {
                    break;
                }
                // The ledger after the gap starts a new chain segment.
                prev_link = None;
                expected = header.sequence.saturating_add(1);
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (slot_tx, slot_rx) = oneshot::channel();
            let queued = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                sent = feed.send(slot_rx) => sent.is_ok(),
            };
            if !queued {
                break;
            }

            let (link_tx, link_rx) = oneshot::channel();
            let parent_link = prev_link.replace(link_rx);
            expected = header.sequence.saturating_add(1);

            tasks.spawn(Arc::clone(&self).run_ledger(
                cancel.clone(),
                Arc::clone(&writer),
                header,
                LedgerSlot {
                    parent_link,
                    block_link: link_tx,
                    result: slot_tx,
                    _permit: permit,
                },
            ));

            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }
        }

        drop(ledgers);
        if cancel.is_cancelled() {
            tracing::info!(in_flight = tasks.len(), "ingestion cancelled, draining in-flight ledgers");
        }
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }
        tracing::info!(next_sequence = expected, "ledger ingestion stopped");
    }

    async fn run_ledger(
        self: Arc<Self>,
        cancel: CancellationToken,
        writer: Arc<dyn Writer>,
        header: LedgerHeader,
        slot: LedgerSlot,
    ) {
        let pointer = LedgerPointer::new(self.config.chain_version, header.sequence);
        let outcome = self.ingest_ledger(&cancel, writer.as_ref(), &header).await;

        let _ = slot.block_link.send(outcome.as_ref().ok().copied());
        let parent = match slot.parent_link {
            Some(link) => link.await.ok().flatten(),
            None => None,
        };

        let result = match outcome {
            Ok(block) => IngestResult::success(pointer, block, parent),
            Err(err) => {
                if !err.is_cancelled() {
                    tracing::warn!(sequence = header.sequence, error = %err, "ledger ingestion failed");
                }
                IngestResult::failure(pointer, parent, err)
            }
        };
        if slot.result.send(result).is_err() {
            tracing::debug!(sequence = header.sequence, "result feed consumer went away");
        }
    }

    async fn ingest_ledger(
        &self,
        cancel: &CancellationToken,
        writer: &dyn Writer,
        header: &LedgerHeader,
    ) -> Result<BlockId, IngestError> {
        let sequence = header.sequence;
        let records = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IngestError::Cancelled),
            records = self.client.ledger_transactions(sequence, self.config.page_limit) => records?,
        };

        let entries = records
            .iter()
            .map(|record| self.entry(sequence, record))
            .collect::<Result<Vec<_>, _>>()?;
        let block = block_id(self.config.chain_version, sequence, &entries);

        // Nothing new is written once cancelled; writes already started finish.
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        let count = entries.len();
        match &self.observer {
            None => write_batch(writer, sequence, entries).await?,
            Some(observer) => {
                write_batch(writer, sequence, entries.clone()).await?;
                observe(observer.as_ref(), &entries, &records);
            }
        }

        tracing::debug!(sequence, entries = count, block = %block, "ledger ingested");
        Ok(block)
    }

    fn entry(&self, sequence: u32, record: &TransactionRecord) -> Result<Entry, IngestError> {
        Ok(Entry {
            version: self.config.chain_version,
            ledger: sequence,
            envelope: decode_base64(&record.envelope_xdr)?,
            result: decode_base64(&record.result_xdr)?,
        })
    }
}

struct LedgerSlot {
    parent_link: Option<BlockLink>,
    block_link: oneshot::Sender<Option<BlockId>>,
    result: oneshot::Sender<IngestResult>,
    /// Held until the result is published.
    _permit: OwnedSemaphorePermit,
}

async fn write_batch(writer: &dyn Writer, sequence: u32, entries: Vec<Entry>) -> Result<(), IngestError> {
    writer.write(entries).await.map_err(|e| match e {
        IngestError::Write { .. } => e,
        other => IngestError::Write {
            sequence,
            reason: other.to_string(),
        },
    })
}

fn observe(observer: &dyn TransactionObserver, entries: &[Entry], records: &[TransactionRecord]) {
    for (entry, record) in entries.iter().zip(records) {
        let meta = match decode_base64(&record.result_meta_xdr) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(sequence = entry.ledger, tx = %record.hash, error = %e, "skipping transaction with bad meta");
                continue;
            }
        };
        observer.observe(&ObservedTransaction {
            ledger: entry.ledger,
            envelope: &entry.envelope,
            result: &entry.result,
            meta: &meta,
        });
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "ledger task panicked");
    }
}
