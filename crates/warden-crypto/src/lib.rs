//! Warden Crypto - Cryptographic capabilities consumed by the wallet engine
//!
//! This crate provides:
//! - Keccak-256 hashing of raw bytes and serializable objects
//! - The `SignerRecovery` capability trait
//! - A secp256k1 implementation of that capability (EVM-style identities)
//! - A deterministic local signer for tests and tooling (feature `local-signer`)
//!
//! # Security Invariant
//!
//! **Recovery never panics.** Malformed or forged signatures come back as a
//! `RecoveryError`, which the engine reports as a rejection.

pub mod hash;
pub mod recovery;
#[cfg(any(test, feature = "local-signer"))]
pub mod signer;

pub use hash::*;
pub use recovery::*;
#[cfg(any(test, feature = "local-signer"))]
pub use signer::*;

use thiserror::Error;
use warden_types::{Identity, MessageHash};

/// Cryptographic errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    #[error("Signature must be 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("Public key recovery failed")]
    RecoveryFailed,

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Recovers the identity that produced a signature over a message hash.
///
/// Implementations must return an error, not a wrong identity, when the
/// signature bytes are unusable.
pub trait SignerRecovery: Send + Sync {
    fn recover_signer(&self, hash: &MessageHash, signature: &[u8]) -> RecoveryResult<Identity>;
}
