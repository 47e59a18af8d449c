//! Horizon HAL response shapes.
//!
//! Collections come back as `{"_embedded": {"records": [...]}, "_links": {...}}`.
//! Only the fields the pipeline reads are modelled; everything else is ignored.

use chrono::{DateTime, Utc};
use ledgerstream_core::types::LedgerHeader;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "_embedded")]
    pub embedded: Embedded<T>,
}

#[derive(Debug, Deserialize)]
pub struct Embedded<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

impl<T> Page<T> {
    pub fn into_records(self) -> Vec<T> {
        self.embedded.records
    }
}

/// A ledger resource.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerRecord {
    pub sequence: u32,
    pub hash: String,
    #[serde(default)]
    pub prev_hash: String,
    pub paging_token: String,
    #[serde(default)]
    pub successful_transaction_count: u32,
    #[serde(default)]
    pub failed_transaction_count: Option<u32>,
    pub closed_at: DateTime<Utc>,
}

impl From<LedgerRecord> for LedgerHeader {
    fn from(r: LedgerRecord) -> Self {
        Self {
            sequence: r.sequence,
            hash: r.hash,
            prev_hash: r.prev_hash,
            paging_token: r.paging_token,
            transaction_count: r.successful_transaction_count + r.failed_transaction_count.unwrap_or(0),
            closed_at: r.closed_at,
        }
    }
}
