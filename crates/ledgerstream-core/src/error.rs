//! Error types for the ledger pipeline.

use thiserror::Error;

/// Errors that can occur while ingesting ledgers.
///
/// Setup failures (`Subscribe`, `InvalidPointer`, `VersionMismatch`) are
/// returned by `Ingestor::ingest` itself. Everything else is scoped to a single
/// ledger and travels on that ledger's `IngestResult::err`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("ledger API error: {0}")]
    Client(String),

    #[error("ledger subscription failed: {0}")]
    Subscribe(String),

    #[error("write failed for ledger {sequence}: {reason}")]
    Write { sequence: u32, reason: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid ledger pointer: {0}")]
    InvalidPointer(String),

    #[error("pointer version {actual} does not match ingestor version {expected}")]
    VersionMismatch { expected: u8, actual: u8 },

    #[error("chain break at ledger {sequence}: expected parent {expected}, got {actual}")]
    ChainBreak {
        sequence: u32,
        expected: String,
        actual: String,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("ingestion cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl IngestError {
    /// Returns `true` if the error prevents an ingestion run from starting.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::Subscribe(_) | Self::InvalidPointer(_) | Self::VersionMismatch { .. }
        )
    }

    /// Returns `true` if retrying the same ledger may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Client(_) | Self::Write { .. } | Self::Storage(_))
    }

    /// Returns `true` if the error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<bincode::Error> for IngestError {
    fn from(e: bincode::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<base64::DecodeError> for IngestError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(IngestError::Subscribe("refused".into()).is_setup());
        assert!(IngestError::VersionMismatch { expected: 3, actual: 2 }.is_setup());
        assert!(!IngestError::Client("timeout".into()).is_setup());

        assert!(IngestError::Client("timeout".into()).is_retryable());
        assert!(!IngestError::Decode("bad".into()).is_retryable());
        assert!(IngestError::Cancelled.is_cancelled());
    }

    #[test]
    fn display_includes_context() {
        let e = IngestError::Write {
            sequence: 42,
            reason: "disk full".into(),
        };
        assert_eq!(e.to_string(), "write failed for ledger 42: disk full");
    }
}
