//! Shared types for the ingestion pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IngestError;
use crate::pointer::LedgerPointer;

// ─── ChainVersion ─────────────────────────────────────────────────────────────

/// Version tag of the chain a ledger was read from.
///
/// Stored alongside every `Entry` and `LedgerPointer` so that history written
/// by different chain generations never mixes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ChainVersion {
    V2,
    #[default]
    V3,
    V4,
}

impl ChainVersion {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
            Self::V4 => 4,
        }
    }
}

impl TryFrom<u8> for ChainVersion {
    type Error = IngestError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            other => Err(IngestError::InvalidPointer(format!(
                "unknown chain version {other}"
            ))),
        }
    }
}

impl From<ChainVersion> for u8 {
    fn from(v: ChainVersion) -> Self {
        v.as_u8()
    }
}

impl fmt::Display for ChainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u8())
    }
}

// ─── LedgerHeader ─────────────────────────────────────────────────────────────

/// A ledger header as pushed by the ledger API subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    /// Ledger sequence number.
    pub sequence: u32,
    /// Ledger hash (hex).
    pub hash: String,
    /// Hash of the previous ledger (hex).
    pub prev_hash: String,
    /// The API's paging token for this ledger.
    pub paging_token: String,
    /// Number of transactions the API reports for this ledger.
    pub transaction_count: u32,
    /// Close time of the ledger.
    pub closed_at: DateTime<Utc>,
}

// ─── TransactionRecord ───────────────────────────────────────────────────────

/// A transaction as served by the ledger API. Blobs are base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub ledger: u32,
    pub paging_token: String,
    pub envelope_xdr: String,
    pub result_xdr: String,
    #[serde(default)]
    pub result_meta_xdr: String,
}

// ─── Entry ────────────────────────────────────────────────────────────────────

/// One persisted transaction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Chain version the transaction was ingested from.
    pub version: ChainVersion,
    /// Ledger sequence that contains the transaction.
    pub ledger: u32,
    /// Raw transaction envelope bytes.
    pub envelope: Vec<u8>,
    /// Raw transaction result bytes.
    pub result: Vec<u8>,
}

// ─── BlockId ──────────────────────────────────────────────────────────────────

/// Content fingerprint of one ingested ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub [u8; 32]);

impl BlockId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a 64 character hex string.
    pub fn from_hex(s: &str) -> Result<Self, IngestError> {
        let bytes = hex::decode(s).map_err(|e| IngestError::Decode(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IngestError::Decode(format!("block id must be 32 bytes: {s}")))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", hex::encode(&self.0[..8]))
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ─── IngestResult ─────────────────────────────────────────────────────────────

/// Outcome of ingesting one ledger, as delivered on the ordered feed.
///
/// For two consecutive successful results `a`, `b`: `b.parent == a.block`.
#[derive(Debug)]
pub struct IngestResult {
    /// Sequence of the ledger this result describes.
    pub sequence: u32,
    /// Pointer that resumes ingestion right after this ledger.
    pub pointer: LedgerPointer,
    /// Fingerprint of the ingested entries; `None` when `err` is set.
    pub block: Option<BlockId>,
    /// The block of the preceding ledger in this run, if known.
    pub parent: Option<BlockId>,
    /// Failure encountered fetching or writing this ledger.
    pub err: Option<IngestError>,
}

impl IngestResult {
    pub fn success(pointer: LedgerPointer, block: BlockId, parent: Option<BlockId>) -> Self {
        Self {
            sequence: pointer.sequence,
            pointer,
            block: Some(block),
            parent,
            err: None,
        }
    }

    pub fn failure(pointer: LedgerPointer, parent: Option<BlockId>, err: IngestError) -> Self {
        Self {
            sequence: pointer.sequence,
            pointer,
            block: None,
            parent,
            err: Some(err),
        }
    }

    /// Returns `true` if the ledger was fetched and written.
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
