//! Per-ledger block fingerprint.

use ledgerstream_core::types::{BlockId, ChainVersion, Entry};
use sha2::{Digest, Sha256};

/// SHA-256 over the chain version, the ledger sequence and every entry's
/// length-prefixed envelope and result bytes, in order.
///
/// An empty ledger still has a well-defined block.
pub fn block_id(version: ChainVersion, sequence: u32, entries: &[Entry]) -> BlockId {
    let mut hasher = Sha256::new();
    hasher.update([version.as_u8()]);
    hasher.update(sequence.to_be_bytes());
    hasher.update((entries.len() as u64).to_be_bytes());
    for entry in entries {
        hasher.update((entry.envelope.len() as u64).to_be_bytes());
        hasher.update(&entry.envelope);
        hasher.update((entry.result.len() as u64).to_be_bytes());
        hasher.update(&entry.result);
    }
    BlockId(hasher.finalize().into())
}
