//! secp256k1 signer recovery
//!
//! Signatures are 65 bytes: `r || s || v`, where `v` is the recovery id,
//! either raw (0/1) or offset by 27 as Ethereum tooling produces it.
//! The recovered identity is the last 20 bytes of the keccak-256 hash of the
//! uncompressed public key without its `0x04` prefix.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint as _;
use warden_types::{Identity, MessageHash};

use crate::{keccak256, RecoveryError, RecoveryResult, SignerRecovery};

pub const SIGNATURE_LENGTH: usize = 65;

/// Derive the identity of a secp256k1 public key.
pub fn identity_from_verifying_key(key: &VerifyingKey) -> Identity {
    let encoded = key.to_encoded_point(false);
    let bytes = encoded.as_bytes();
    // bytes[0] == 0x04 (prefix), skip it
    let hash = keccak256(&bytes[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash.as_bytes()[12..]);
    Identity::from_bytes(addr)
}

/// `SignerRecovery` over recoverable secp256k1 ECDSA signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct Secp256k1Recovery;

impl SignerRecovery for Secp256k1Recovery {
    fn recover_signer(&self, hash: &MessageHash, signature: &[u8]) -> RecoveryResult<Identity> {
        if signature.len() != SIGNATURE_LENGTH {
            return Err(RecoveryError::InvalidLength(signature.len()));
        }

        let sig = Signature::from_slice(&signature[..64])
            .map_err(|e| RecoveryError::MalformedSignature(e.to_string()))?;

        let v = signature[64];
        let raw = if v >= 27 { v - 27 } else { v };
        let recovery_id = RecoveryId::from_byte(raw).ok_or(RecoveryError::InvalidRecoveryId(v))?;

        let key = VerifyingKey::recover_from_prehash(hash.as_bytes(), &sig, recovery_id)
            .map_err(|_| RecoveryError::RecoveryFailed)?;

        Ok(identity_from_verifying_key(&key))
    }
}
