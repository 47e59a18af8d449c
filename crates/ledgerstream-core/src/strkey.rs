//! Canonical text form of account ids.
//!
//! An account address is the 32 byte ed25519 public key prefixed with a
//! version byte, suffixed with a CRC16-XModem checksum and rendered in
//! unpadded base32. Every address is 56 characters and starts with `G`.
//! Encoding and checksum come from `stellar-strkey`.

use stellar_strkey::ed25519::PublicKey;

use crate::error::IngestError;

/// Length of an encoded account address.
pub const ADDRESS_LEN: usize = 56;

/// Encode a raw public key as an account address.
pub fn encode_account_id(key: &[u8; 32]) -> String {
    PublicKey(*key).to_string()
}

/// Decode an account address back to its raw public key.
pub fn decode_account_id(address: &str) -> Result<[u8; 32], IngestError> {
    if address.len() != ADDRESS_LEN {
        return Err(IngestError::Decode(format!(
            "account address must be {ADDRESS_LEN} characters, got {}",
            address.len()
        )));
    }
    // The base32 alphabet is upper case only.
    if !address.bytes().all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b)) {
        return Err(IngestError::Decode(format!("invalid base32 in address {address}")));
    }
    PublicKey::from_string(address)
        .map(|key| key.0)
        .map_err(|_| IngestError::Decode(format!("invalid account address {address}")))
}
