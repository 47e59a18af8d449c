//! ledgerstream-core: shared vocabulary for the ledger event pipeline.
//!
//! # Architecture
//!
//! ```text
//! LedgerClient ──headers──▶ Ingestor ──Entry batches──▶ Writer
//!                              │
//!                              ├── ResultFeed (ordered, hash-chained)
//!                              └── TransactionObserver ──▶ AccountNotifier ──▶ EventStreams
//! ```
//!
//! This crate holds the types and traits every stage agrees on; the stages
//! themselves live in `ledgerstream-ingest` and `ledgerstream-notify`.

pub mod checkpoint;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod pointer;
pub mod strkey;
pub mod types;
pub mod writer;

pub use checkpoint::{Checkpoint, CheckpointManager, MemoryPointerStore, PointerStore};
pub use client::{LedgerClient, LedgerRequest, LedgerStream, Order, TransactionRequest, TransactionsPage};
pub use codec::{TransactionCodec, TransactionDecoder};
pub use config::{IngestConfig, NotifierConfig};
pub use error::IngestError;
pub use event::{ObservedTransaction, TransactionEvent, TransactionObserver};
pub use model::{AccountId, LedgerEntryChange, Operation, OperationBody, TransactionEnvelope, TransactionMeta};
pub use pointer::LedgerPointer;
pub use types::{BlockId, ChainVersion, Entry, IngestResult, LedgerHeader, TransactionRecord};
pub use writer::Writer;
