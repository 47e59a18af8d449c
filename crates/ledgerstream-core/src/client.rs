//! `LedgerClient` trait: abstraction over the remote ledger API.
//!
//! Two capabilities are needed: a push subscription of ledger headers starting
//! at a cursor, and a paged fetch of the transactions in one ledger.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::types::{LedgerHeader, TransactionRecord};

/// A stream of ledger headers, in ascending sequence order for `Order::Asc`.
///
/// Dropping the stream tears down the subscription.
pub type LedgerStream = Pin<Box<dyn Stream<Item = Result<LedgerHeader, IngestError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Parameters of a ledger header subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRequest {
    /// Paging token to start after.
    pub cursor: String,
    pub order: Order,
}

/// Parameters of a transaction page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub for_ledger: u32,
    /// Paging token of the last record already seen.
    pub cursor: Option<String>,
    pub limit: u32,
}

/// One page of transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionsPage {
    pub records: Vec<TransactionRecord>,
    /// Cursor for the following page, if the API reported one.
    pub next_cursor: Option<String>,
}

/// Remote ledger API.
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    /// Open a ledger header subscription.
    ///
    /// Returns an error if the subscription cannot be established; errors that
    /// happen later are yielded by the stream.
    async fn stream_ledgers(&self, request: LedgerRequest) -> Result<LedgerStream, IngestError>;

    /// Fetch one page of the transactions in a ledger.
    async fn transactions(&self, request: TransactionRequest) -> Result<TransactionsPage, IngestError>;

    /// Fetch every transaction in a ledger, following page cursors until a
    /// short or empty page, or a cursor that does not advance.
    async fn ledger_transactions(
        &self,
        sequence: u32,
        page_limit: u32,
    ) -> Result<Vec<TransactionRecord>, IngestError> {
        let limit = page_limit.max(1);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .transactions(TransactionRequest {
                    for_ledger: sequence,
                    cursor: cursor.clone(),
                    limit,
                })
                .await?;
            let count = page.records.len();
            records.extend(page.records);
            if count < limit as usize {
                break;
            }
            match page.next_cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(sequence, cursor = %next, "transaction cursor did not advance");
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(records)
    }
}
