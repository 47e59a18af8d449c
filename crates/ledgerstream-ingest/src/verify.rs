//! Chain verifier: checks that the results drained from a feed form an
//! unbroken chain.
//!
//! Consecutive results must have consecutive sequences, and when both the
//! previous and the current ledger succeeded, the current `parent` must equal
//! the previous `block`. The first result after `new` or `resume_from` has no
//! parent to check.

use ledgerstream_core::error::IngestError;
use ledgerstream_core::pointer::LedgerPointer;
use ledgerstream_core::types::{BlockId, IngestResult};

#[derive(Debug, Default)]
pub struct ChainVerifier {
    /// Sequence and block of the last result pushed.
    last: Option<(u32, Option<BlockId>)>,
    verified: u64,
}

impl ChainVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect the next result to be the ledger after `pointer`.
    pub fn resume_from(pointer: &LedgerPointer) -> Self {
        Self {
            last: Some((pointer.sequence, None)),
            verified: 0,
        }
    }

    /// Check `result` against the previous one and advance.
    ///
    /// On error the verifier is left unchanged.
    pub fn push(&mut self, result: &IngestResult) -> Result<(), IngestError> {
        if let Some((prev_sequence, prev_block)) = self.last {
            let expected = prev_sequence.saturating_add(1);
            if result.sequence != expected {
                return Err(IngestError::ChainBreak {
                    sequence: result.sequence,
                    expected: format!("sequence {expected}"),
                    actual: format!("sequence {}", result.sequence),
                });
            }
            if let (Some(prev), true) = (prev_block, result.is_ok()) {
                if result.parent != Some(prev) {
                    return Err(IngestError::ChainBreak {
                        sequence: result.sequence,
                        expected: prev.to_string(),
                        actual: result
                            .parent
                            .map(|p| p.to_string())
                            .unwrap_or_else(|| "none".to_string()),
                    });
                }
            }
        }

        self.last = Some((result.sequence, result.block));
        if result.is_ok() {
            self.verified += 1;
        }
        Ok(())
    }

    /// Number of successful results accepted so far.
    pub fn verified(&self) -> u64 {
        self.verified
    }

    /// Block of the last accepted result, if it succeeded.
    pub fn head(&self) -> Option<BlockId> {
        self.last.and_then(|(_, block)| block)
    }
}
