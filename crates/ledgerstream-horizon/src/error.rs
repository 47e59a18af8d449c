//! Horizon transport errors.

use ledgerstream_core::error::IngestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HorizonError {
    /// Request could not be sent or the connection broke.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Horizon answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl HorizonError {
    /// Returns `true` for transient failures: connection errors, timeouts,
    /// rate limiting and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Deserialization(_) => false,
        }
    }
}

impl From<HorizonError> for IngestError {
    fn from(e: HorizonError) -> Self {
        IngestError::Client(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(HorizonError::Http("reset".into()).is_retryable());
        assert!(HorizonError::Timeout { ms: 10 }.is_retryable());
        assert!(HorizonError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(HorizonError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!HorizonError::Status { status: 404, body: String::new() }.is_retryable());
        let bad = serde_json::from_str::<u32>("x").unwrap_err();
        assert!(!HorizonError::from(bad).is_retryable());
    }

    #[test]
    fn converts_to_client_error() {
        let err: IngestError = HorizonError::Status { status: 500, body: "oops".into() }.into();
        assert!(matches!(err, IngestError::Client(msg) if msg == "HTTP 500: oops"));
    }
}
