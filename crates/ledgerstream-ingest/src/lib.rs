//! ledgerstream-ingest: resumable, ordered ledger ingestion.
//!
//! # Pipeline
//!
//! ```text
//! LedgerClient::stream_ledgers ──▶ driver task
//!                                    │ per header (≤ max_in_flight at once)
//!                                    ├─ spawn: fetch pages → Entry batch → Writer → BlockId
//!                                    └─ push oneshot slot onto ResultFeed (arrival order)
//! ```
//!
//! Ledger tasks finish in any order, but the consumer drains the feed slot by
//! slot, so results always surface in ledger order. Each task hands its block
//! to its successor through a one-shot link, which is how `parent` is filled.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ledgerstream_core::{ChainVersion, IngestConfig};
//! use ledgerstream_ingest::{Ingestor, LedgerIngestor, MemoryLedgerClient};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(writer: Arc<dyn ledgerstream_core::Writer>) -> Result<(), ledgerstream_core::IngestError> {
//! let ingestor = LedgerIngestor::new(ChainVersion::V3, MemoryLedgerClient::new(), IngestConfig::default());
//! let mut feed = ingestor.ingest(CancellationToken::new(), writer, None).await?;
//! while let Some(slot) = feed.recv().await {
//!     if let Ok(result) = slot.await {
//!         println!("ledger {} ok={}", result.sequence, result.is_ok());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod ingestor;
pub mod memory;
pub mod verify;

pub use block::block_id;
pub use ingestor::{Ingestor, LedgerIngestor, ResultFeed};
pub use memory::MemoryLedgerClient;
pub use verify::ChainVerifier;
