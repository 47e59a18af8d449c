//! Ledger pointer: the resumable position of an ingestion run.
//!
//! A pointer encodes a ledger sequence the same way the ledger API builds its
//! paging tokens: the sequence occupies the high 32 bits and the transaction
//! index within the ledger the low 32 bits. Pointers only ever address whole
//! ledgers, so the low half is always zero.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::types::ChainVersion;

/// Serialized length: one version byte followed by the big-endian paging token.
pub const POINTER_LEN: usize = 9;

/// Position in the ledger chain: "the ledger with this sequence has been ingested".
///
/// The absence of a pointer (`Option::None`) means the start of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerPointer {
    /// Chain version the sequence belongs to.
    pub version: ChainVersion,
    /// Last ingested ledger sequence.
    pub sequence: u32,
}

impl LedgerPointer {
    pub fn new(version: ChainVersion, sequence: u32) -> Self {
        Self { version, sequence }
    }

    /// Build a pointer from an API paging token, discarding the transaction index.
    pub fn from_paging_token(version: ChainVersion, token: u64) -> Self {
        Self {
            version,
            sequence: (token >> 32) as u32,
        }
    }

    /// The paging token addressing the end of this ledger.
    pub fn paging_token(&self) -> u64 {
        u64::from(self.sequence) << 32
    }

    /// The cursor string sent to the ledger API.
    pub fn cursor(&self) -> String {
        self.paging_token().to_string()
    }

    /// The cursor for an optional pointer; `None` resolves to the genesis cursor `"0"`.
    pub fn cursor_for(pointer: Option<&LedgerPointer>) -> String {
        pointer.map(|p| p.cursor()).unwrap_or_else(|| "0".to_string())
    }

    /// The first sequence an ingestion run started from `pointer` will deliver.
    pub fn next_sequence(pointer: Option<&LedgerPointer>) -> u32 {
        pointer.map(|p| p.sequence.saturating_add(1)).unwrap_or(0)
    }

    /// Pointer for the ledger immediately after this one.
    pub fn next(&self) -> Self {
        Self::new(self.version, self.sequence.saturating_add(1))
    }

    pub fn to_bytes(&self) -> [u8; POINTER_LEN] {
        let mut out = [0u8; POINTER_LEN];
        out[0] = self.version.as_u8();
        out[1..].copy_from_slice(&self.paging_token().to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IngestError> {
        if bytes.len() != POINTER_LEN {
            return Err(IngestError::InvalidPointer(format!(
                "expected {POINTER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let version = ChainVersion::try_from(bytes[0])?;
        let mut token = [0u8; 8];
        token.copy_from_slice(&bytes[1..]);
        let token = u64::from_be_bytes(token);
        if token & 0xffff_ffff != 0 {
            return Err(IngestError::InvalidPointer(format!(
                "paging token {token} does not address a ledger boundary"
            )));
        }
        Ok(Self::from_paging_token(version, token))
    }

    /// Hex form of `to_bytes`, used on the command line and in checkpoints.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, IngestError> {
        let bytes = hex::decode(s).map_err(|e| IngestError::InvalidPointer(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl Ord for LedgerPointer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.paging_token()
            .cmp(&other.paging_token())
            .then(self.version.cmp(&other.version))
    }
}

impl PartialOrd for LedgerPointer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LedgerPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.sequence, self.version)
    }
}
