//! Keccak-256 hashing

use serde::Serialize;
use sha3::{Digest, Keccak256};
use warden_types::MessageHash;

use crate::{RecoveryError, RecoveryResult};

/// Compute the keccak-256 hash of data
pub fn keccak256(data: &[u8]) -> MessageHash {
    let digest = Keccak256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    MessageHash::from_bytes(bytes)
}

/// Hash any serializable object through its JSON encoding
pub fn hash_object<T: Serialize>(obj: &T) -> RecoveryResult<MessageHash> {
    let json =
        serde_json::to_vec(obj).map_err(|e| RecoveryError::SerializationFailed(e.to_string()))?;
    Ok(keccak256(&json))
}
