//! In-memory `LedgerClient` for tests and local runs.
//!
//! Serves a fixed set of ledgers, records every request it receives and can
//! be told to fail or stall. The ledger subscription stays open after the last
//! canned ledger, like a live network with no new ledgers, until it is dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::stream::{self, StreamExt};
use ledgerstream_core::client::{LedgerClient, LedgerRequest, LedgerStream, Order, TransactionRequest, TransactionsPage};
use ledgerstream_core::error::IngestError;
use ledgerstream_core::types::{LedgerHeader, TransactionRecord};
use parking_lot::Mutex;

#[derive(Default)]
struct State {
    ledgers: BTreeMap<u32, (LedgerHeader, Vec<TransactionRecord>)>,
    ledger_requests: Vec<LedgerRequest>,
    transaction_requests: Vec<TransactionRequest>,
    setup_error: Option<String>,
    stream_error: Option<(u32, String)>,
    ledger_failures: HashMap<u32, String>,
    ledger_latency: HashMap<u32, Duration>,
}

/// Cloneable handle; clones share the same ledgers and request log.
#[derive(Clone, Default)]
pub struct MemoryLedgerClient {
    state: Arc<Mutex<State>>,
}

impl MemoryLedgerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ledger with a synthetic header.
    pub fn push_ledger(&self, sequence: u32, transactions: Vec<TransactionRecord>) {
        let header = Self::header(sequence, transactions.len() as u32);
        self.push_ledger_with_header(header, transactions);
    }

    pub fn push_ledger_with_header(&self, header: LedgerHeader, transactions: Vec<TransactionRecord>) {
        self.state
            .lock()
            .ledgers
            .insert(header.sequence, (header, transactions));
    }

    /// Make `stream_ledgers` itself fail.
    pub fn fail_setup(&self, reason: impl Into<String>) {
        self.state.lock().setup_error = Some(reason.into());
    }

    /// Make the subscription yield an error right after ledger `after`.
    pub fn fail_stream_after(&self, after: u32, reason: impl Into<String>) {
        self.state.lock().stream_error = Some((after, reason.into()));
    }

    /// Make transaction fetches for `sequence` fail.
    pub fn fail_ledger(&self, sequence: u32, reason: impl Into<String>) {
        self.state.lock().ledger_failures.insert(sequence, reason.into());
    }

    /// Delay every transaction fetch for `sequence`.
    pub fn delay_ledger(&self, sequence: u32, latency: Duration) {
        self.state.lock().ledger_latency.insert(sequence, latency);
    }

    pub fn ledger_requests(&self) -> Vec<LedgerRequest> {
        self.state.lock().ledger_requests.clone()
    }

    pub fn transaction_requests(&self) -> Vec<TransactionRequest> {
        self.state.lock().transaction_requests.clone()
    }

    /// A deterministic header for `sequence`.
    pub fn header(sequence: u32, transaction_count: u32) -> LedgerHeader {
        let paging_token = u64::from(sequence) << 32;
        LedgerHeader {
            sequence,
            hash: format!("{:064x}", u64::from(sequence) + 1),
            prev_hash: format!("{:064x}", sequence),
            paging_token: paging_token.to_string(),
            transaction_count,
            closed_at: Utc
                .timestamp_opt(1_600_000_000 + i64::from(sequence) * 5, 0)
                .single()
                .unwrap_or_default(),
        }
    }
}

fn parse_token(cursor: &str) -> Result<u64, IngestError> {
    cursor
        .parse()
        .map_err(|_| IngestError::Client(format!("invalid cursor {cursor:?}")))
}

#[async_trait]
impl LedgerClient for MemoryLedgerClient {
    async fn stream_ledgers(&self, request: LedgerRequest) -> Result<LedgerStream, IngestError> {
        let mut state = self.state.lock();
        state.ledger_requests.push(request.clone());
        if let Some(reason) = &state.setup_error {
            return Err(IngestError::Subscribe(reason.clone()));
        }

        // "0" is the start of the chain, anything else starts after the
        // ledger the token points into.
        let token = parse_token(&request.cursor)?;
        let first = if token == 0 { 0 } else { ((token >> 32) as u32).saturating_add(1) };

        let mut items: Vec<Result<LedgerHeader, IngestError>> = Vec::new();
        for (sequence, (header, _)) in state.ledgers.range(first..) {
            items.push(Ok(header.clone()));
            if let Some((after, reason)) = &state.stream_error {
                if after == sequence {
                    items.push(Err(IngestError::Subscribe(reason.clone())));
                    break;
                }
            }
        }
        if request.order == Order::Desc {
            items.reverse();
        }

        Ok(stream::iter(items).chain(stream::pending()).boxed())
    }

    async fn transactions(&self, request: TransactionRequest) -> Result<TransactionsPage, IngestError> {
        let latency = {
            let mut state = self.state.lock();
            state.transaction_requests.push(request.clone());
            state.ledger_latency.get(&request.for_ledger).copied()
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.lock();
        if let Some(reason) = state.ledger_failures.get(&request.for_ledger) {
            return Err(IngestError::Client(reason.clone()));
        }
        let (_, records) = state
            .ledgers
            .get(&request.for_ledger)
            .ok_or_else(|| IngestError::Client(format!("ledger {} not found", request.for_ledger)))?;

        let after = match &request.cursor {
            Some(cursor) => Some(parse_token(cursor)?),
            None => None,
        };
        let mut page = Vec::new();
        for record in records {
            if page.len() >= request.limit.max(1) as usize {
                break;
            }
            let token = parse_token(&record.paging_token)?;
            if after.map_or(true, |after| token > after) {
                page.push(record.clone());
            }
        }
        let next_cursor = page.last().map(|r| r.paging_token.clone());
        Ok(TransactionsPage {
            records: page,
            next_cursor,
        })
    }
}
