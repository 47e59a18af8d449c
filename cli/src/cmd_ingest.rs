//! `ledgerstream ingest`: follow the ledger chain from Horizon into a JSON-lines file.
//!
//! Results are drained from the feed in ledger order, checked with a
//! `ChainVerifier` and checkpointed. The first failed ledger halts the run:
//! nothing after it is checkpointed, so the next run retries it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ledgerstream_core::checkpoint::CheckpointManager;
use ledgerstream_core::pointer::LedgerPointer;
use ledgerstream_core::types::BlockId;
use ledgerstream_core::writer::Writer;
use ledgerstream_horizon::HorizonClient;
use ledgerstream_ingest::{ChainVerifier, Ingestor, LedgerIngestor};
use ledgerstream_storage::{FilePointerStore, JsonLinesWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;

pub struct IngestArgs {
    pub horizon: Option<String>,
    pub from: Option<String>,
    pub checkpoint: Option<PathBuf>,
    pub out: PathBuf,
    pub max_ledgers: Option<u64>,
}

/// What a finished run committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub committed: u64,
    /// Pointer to resume from next time.
    pub last: Option<LedgerPointer>,
    pub head: Option<BlockId>,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

pub async fn run(args: IngestArgs, config: &AppConfig) -> Result<()> {
    let horizon = config.horizon_config(args.horizon.as_deref())?;
    info!(url = %horizon.url, out = %args.out.display(), "starting ingestion");

    let client = HorizonClient::new(horizon).context("building Horizon client")?;
    let ingestor = LedgerIngestor::new(config.ingest.chain_version, client, config.ingest.clone());
    let writer = JsonLinesWriter::open(&args.out)
        .await
        .with_context(|| format!("opening {}", args.out.display()))?;

    let mut checkpoints = args.checkpoint.map(|path| {
        CheckpointManager::new(
            Box::new(FilePointerStore::new(path)),
            config.ingestor_id.clone(),
            config.checkpoint_interval,
        )
    });
    let start = resolve_start(args.from.as_deref(), checkpoints.as_ref()).await?;
    match &start {
        Some(pointer) => info!(pointer = %pointer, "resuming after pointer"),
        None => info!("starting from the beginning of the chain"),
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            on_signal.cancel();
        }
    });

    let summary = follow(
        &ingestor,
        Arc::new(writer),
        start,
        checkpoints.as_mut(),
        cancel,
        args.max_ledgers,
    )
    .await?;

    println!("Committed ledgers: {}", summary.committed);
    if let Some(last) = summary.last {
        println!("Resume pointer:    {}  ({})", last.to_hex(), last);
    }
    if let Some(head) = summary.head {
        println!("Head block:        {head}");
    }
    Ok(())
}

/// `--from` wins over a stored checkpoint.
pub async fn resolve_start(
    from: Option<&str>,
    checkpoints: Option<&CheckpointManager>,
) -> Result<Option<LedgerPointer>> {
    if let Some(hex) = from {
        let pointer = LedgerPointer::from_hex(hex).context("invalid --from pointer")?;
        return Ok(Some(pointer));
    }
    match checkpoints {
        Some(cp) => cp.resume_pointer().await.context("loading checkpoint"),
        None => Ok(None),
    }
}

/// Drain one ingestion run until the feed closes.
///
/// `max_ledgers` cancels the run once that many ledgers are committed; ledgers
/// already in flight at that point are still committed if they succeed.
pub async fn follow<I>(
    ingestor: &I,
    writer: Arc<dyn Writer>,
    start: Option<LedgerPointer>,
    mut checkpoints: Option<&mut CheckpointManager>,
    cancel: CancellationToken,
    max_ledgers: Option<u64>,
) -> Result<Summary>
where
    I: Ingestor + ?Sized,
{
    let mut feed = ingestor
        .ingest(cancel.clone(), writer, start)
        .await
        .context("starting ingestion")?;

    let mut verifier = start
        .as_ref()
        .map(ChainVerifier::resume_from)
        .unwrap_or_default();
    let mut summary = Summary {
        committed: 0,
        last: start,
        head: None,
    };
    let mut failure: Option<anyhow::Error> = None;
    let mut halted = false;

    while let Some(slot) = feed.recv().await {
        let Ok(result) = slot.await else {
            warn!("ledger task ended without a result");
            halted = true;
            cancel.cancel();
            continue;
        };
        if halted {
            continue;
        }

        if let Some(err) = &result.err {
            halted = true;
            cancel.cancel();
            if !err.is_cancelled() {
                error!(sequence = result.sequence, error = %err, "ledger failed, stopping");
                failure = Some(anyhow!("ledger {} failed: {err}", result.sequence));
            }
            continue;
        }
        if let Err(err) = verifier.push(&result) {
            error!(sequence = result.sequence, error = %err, "chain verification failed");
            halted = true;
            cancel.cancel();
            failure = Some(anyhow::Error::new(err).context("chain verification failed"));
            continue;
        }

        summary.committed += 1;
        summary.last = Some(result.pointer);
        summary.head = result.block;
        debug!(sequence = result.sequence, block = ?result.block, "ledger committed");

        if let Some(cp) = checkpoints.as_mut() {
            cp.maybe_save(result.pointer, result.block).await?;
        }
        if max_ledgers.is_some_and(|max| summary.committed >= max) && !cancel.is_cancelled() {
            info!(committed = summary.committed, "ledger limit reached");
            cancel.cancel();
        }
    }

    if let (Some(cp), Some(last), true) = (&checkpoints, summary.last, summary.committed > 0) {
        cp.force_save(last, summary.head).await?;
    }
    info!(committed = summary.committed, verified = verifier.verified(), "ingestion finished");

    match failure {
        Some(err) => Err(err),
        None => Ok(summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerstream_core::checkpoint::MemoryPointerStore;
    use ledgerstream_core::config::IngestConfig;
    use ledgerstream_core::types::ChainVersion;
    use ledgerstream_ingest::MemoryLedgerClient;
    use ledgerstream_storage::MemoryWriter;

    fn chain(len: u32) -> LedgerIngestor<MemoryLedgerClient> {
        let client = MemoryLedgerClient::new();
        for seq in 0..len {
            client.push_ledger(seq, vec![]);
        }
        LedgerIngestor::new(ChainVersion::V3, client, IngestConfig::default())
    }

    #[tokio::test]
    async fn stops_after_limit_and_checkpoints() {
        let ingestor = chain(20);
        let mut checkpoints = CheckpointManager::new(Box::new(MemoryPointerStore::new()), "test", 100);

        let summary = follow(
            &ingestor,
            Arc::new(MemoryWriter::new()),
            None,
            Some(&mut checkpoints),
            CancellationToken::new(),
            Some(3),
        )
        .await
        .unwrap();

        assert!(summary.committed >= 3);
        let last = summary.last.unwrap();
        assert_eq!(u64::from(last.sequence) + 1, summary.committed);
        assert_eq!(checkpoints.resume_pointer().await.unwrap(), Some(last));
    }

    #[tokio::test]
    async fn failed_ledger_halts_before_checkpointing_it() {
        let ingestor = chain(6);
        ingestor.client().fail_ledger(2, "boom");
        let mut checkpoints = CheckpointManager::new(Box::new(MemoryPointerStore::new()), "test", 1);

        let err = follow(
            &ingestor,
            Arc::new(MemoryWriter::new()),
            None,
            Some(&mut checkpoints),
            CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("ledger 2"), "{err}");
        let resume = checkpoints.resume_pointer().await.unwrap().unwrap();
        assert_eq!(resume.sequence, 1);
    }

    #[tokio::test]
    async fn resumes_after_start_pointer() {
        let ingestor = chain(10);
        let start = LedgerPointer::new(ChainVersion::V3, 6);
        let summary = follow(
            &ingestor,
            Arc::new(MemoryWriter::new()),
            Some(start),
            None,
            CancellationToken::new(),
            Some(2),
        )
        .await
        .unwrap();

        assert!(summary.committed >= 2);
        assert!(summary.last.unwrap().sequence >= 8);
    }

    #[tokio::test]
    async fn explicit_pointer_wins_over_checkpoint() {
        let checkpoints = CheckpointManager::new(Box::new(MemoryPointerStore::new()), "test", 1);
        checkpoints
            .force_save(LedgerPointer::new(ChainVersion::V3, 50), None)
            .await
            .unwrap();

        let from = LedgerPointer::new(ChainVersion::V4, 7).to_hex();
        let start = resolve_start(Some(&from), Some(&checkpoints)).await.unwrap();
        assert_eq!(start, Some(LedgerPointer::new(ChainVersion::V4, 7)));

        let start = resolve_start(None, Some(&checkpoints)).await.unwrap();
        assert_eq!(start.map(|p| p.sequence), Some(50));

        assert_eq!(resolve_start(None, None).await.unwrap(), None);
        assert!(resolve_start(Some("zz"), None).await.is_err());
    }
}
