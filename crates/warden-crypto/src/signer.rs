//! Deterministic local signer
//!
//! Keys are derived from a label so that fixture identities are stable across
//! runs. Production signers live with the wallet owner and guardians, never in
//! the engine.

use k256::ecdsa::SigningKey;
use warden_types::{Identity, MessageHash};

use crate::{identity_from_verifying_key, RecoveryError, RecoveryResult};

/// A secp256k1 signing key together with its identity.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    identity: Identity,
}

impl LocalSigner {
    /// Create a signer from 32 bytes of secret key material.
    pub fn from_seed(seed: &[u8; 32]) -> RecoveryResult<Self> {
        let key = SigningKey::from_slice(seed)
            .map_err(|e| RecoveryError::SigningFailed(e.to_string()))?;
        let identity = identity_from_verifying_key(key.verifying_key());
        Ok(Self { key, identity })
    }

    /// Derive a signer from a human-readable label.
    ///
    /// Derivation retries with a counter on the (negligible) chance that the
    /// derived bytes are not a valid scalar.
    pub fn for_label(label: &str) -> Self {
        let mut counter: u32 = 0;
        loop {
            let material = format!("{label}#{counter}");
            let seed = blake3::derive_key("warden local signer v1", material.as_bytes());
            if let Ok(signer) = Self::from_seed(&seed) {
                return signer;
            }
            counter += 1;
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Sign a message hash. Returns `r || s || v` with `v` in {27, 28}.
    pub fn sign_hash(&self, hash: &MessageHash) -> RecoveryResult<Vec<u8>> {
        let (sig, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash.as_bytes())
            .map_err(|e| RecoveryError::SigningFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&sig.to_bytes());
        out.push(recovery_id.to_byte() + 27);
        Ok(out)
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
