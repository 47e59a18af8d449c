//! Transaction blob codec.
//!
//! The ledger API hands out envelopes, results and metadata as base64 blobs.
//! Decoding those blobs into the [`model`](crate::model) types is done through
//! [`TransactionDecoder`]; [`TransactionCodec`] is the reference implementation
//! (bincode framing) used by the in-memory collaborators and the tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::IngestError;
use crate::model::{TransactionEnvelope, TransactionMeta};

/// Decodes raw transaction blobs.
pub trait TransactionDecoder: Send + Sync {
    fn decode_envelope(&self, bytes: &[u8]) -> Result<TransactionEnvelope, IngestError>;
    fn decode_meta(&self, bytes: &[u8]) -> Result<TransactionMeta, IngestError>;
}

/// Bincode-framed transaction codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionCodec;

impl TransactionCodec {
    pub fn encode_envelope(&self, envelope: &TransactionEnvelope) -> Result<Vec<u8>, IngestError> {
        Ok(bincode::serialize(envelope)?)
    }

    pub fn encode_meta(&self, meta: &TransactionMeta) -> Result<Vec<u8>, IngestError> {
        Ok(bincode::serialize(meta)?)
    }
}

impl TransactionDecoder for TransactionCodec {
    fn decode_envelope(&self, bytes: &[u8]) -> Result<TransactionEnvelope, IngestError> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn decode_meta(&self, bytes: &[u8]) -> Result<TransactionMeta, IngestError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Decode a standard base64 blob. An empty string decodes to no bytes.
pub fn decode_base64(s: &str) -> Result<Vec<u8>, IngestError> {
    Ok(STANDARD.decode(s)?)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
