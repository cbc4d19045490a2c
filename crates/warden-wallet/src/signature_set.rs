//! Signature sets and quorum validation

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use warden_crypto::SignerRecovery;
use warden_types::{Identity, MessageHash, Result, WalletError};

use crate::ApprovalMode;

/// One claimed signer and the signature bytes it supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub signer: Identity,
    pub signature: Vec<u8>,
}

/// Ordered list of signatures attached to a submission.
///
/// Signers must be strictly ascending. That ordering is also how duplicates
/// are rejected, so no separate dedup pass exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureSet {
    entries: Vec<SignatureEntry>,
}

impl SignatureSet {
    pub fn new(entries: Vec<SignatureEntry>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }

    pub fn signers(&self) -> impl Iterator<Item = Identity> + '_ {
        self.entries.iter().map(|e| e.signer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.iter().any(|e| &e.signer == identity)
    }

    /// Reject any set whose signers are not strictly ascending.
    pub fn check_order(&self) -> Result<()> {
        for (index, pair) in self.entries.windows(2).enumerate() {
            if pair[0].signer >= pair[1].signer {
                return Err(WalletError::InvalidSignersOrder { index: index + 1 });
            }
        }
        Ok(())
    }
}

/// Signers that authorized an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approved {
    pub signers: Vec<Identity>,
    pub owner_signed: bool,
}

/// Checks a signature set against an approval mode.
///
/// Structural checks run before any signature is recovered, so a malformed
/// set is rejected without touching the crypto backend.
pub struct SignatureValidator<'a> {
    recovery: &'a dyn SignerRecovery,
}

impl<'a> SignatureValidator<'a> {
    pub fn new(recovery: &'a dyn SignerRecovery) -> Self {
        Self { recovery }
    }

    pub fn validate(
        &self,
        hash: &MessageHash,
        set: &SignatureSet,
        mode: ApprovalMode,
        owner: Identity,
        guardians: &BTreeSet<Identity>,
    ) -> Result<Approved> {
        if mode == ApprovalMode::EntryPointOnly {
            return Ok(Approved::default());
        }

        set.check_order()?;

        if mode.is_quorum() && guardians.is_empty() {
            return Err(WalletError::NoGuardians);
        }

        if set.is_empty() {
            return Err(match mode {
                ApprovalMode::OwnerOnly => WalletError::OwnerSignatureRequired,
                _ => WalletError::NotEnoughSigners {
                    signed: 0,
                    required: quorum(guardians.len(), mode.owner_counts()),
                },
            });
        }

        let owner_signed = set.contains(&owner);
        self.check_membership(set, mode, owner, owner_signed, guardians)?;

        for entry in set.entries() {
            self.verify_entry(hash, entry)?;
        }

        if mode.is_quorum() {
            let required = quorum(guardians.len(), mode.owner_counts());
            let signed = set.len();
            if signed < required {
                return Err(WalletError::NotEnoughSigners { signed, required });
            }
        }

        debug!(?mode, signers = set.len(), owner_signed, "signature set accepted");
        Ok(Approved {
            signers: set.signers().collect(),
            owner_signed,
        })
    }

    fn check_membership(
        &self,
        set: &SignatureSet,
        mode: ApprovalMode,
        owner: Identity,
        owner_signed: bool,
        guardians: &BTreeSet<Identity>,
    ) -> Result<()> {
        if mode == ApprovalMode::OwnerOnly {
            if !owner_signed {
                return Err(WalletError::OwnerSignatureRequired);
            }
            if let Some(extra) = set.signers().find(|s| *s != owner) {
                return Err(WalletError::GuardianSignatureNotAllowed { signer: extra });
            }
            return Ok(());
        }

        if owner_signed && mode == ApprovalMode::GuardianMajority {
            return Err(WalletError::OwnerSignatureNotAllowed);
        }
        if !owner_signed && mode == ApprovalMode::MajorityOwnerRequired {
            return Err(WalletError::OwnerSignatureRequired);
        }
        if let Some(stranger) = set.signers().find(|s| *s != owner && !guardians.contains(s)) {
            return Err(WalletError::SignerNotGuardian { signer: stranger });
        }
        if owner_signed && set.len() == 1 {
            return Err(WalletError::NoGuardianSignedBesidesOwner);
        }
        Ok(())
    }

    fn verify_entry(&self, hash: &MessageHash, entry: &SignatureEntry) -> Result<()> {
        let recovered = self
            .recovery
            .recover_signer(hash, &entry.signature)
            .map_err(|e| WalletError::InvalidSignature {
                signer: entry.signer,
                reason: e.to_string(),
            })?;

        if recovered.is_zero() {
            return Err(WalletError::UnexpectedResult {
                context: format!("signature for {} recovered the zero identity", entry.signer),
            });
        }
        if recovered != entry.signer {
            return Err(WalletError::InvalidSignature {
                signer: entry.signer,
                reason: format!("recovered {recovered}"),
            });
        }
        Ok(())
    }
}

/// Strict majority of `guardians`, plus the owner when the owner counts.
pub fn quorum(guardians: usize, owner_counts: bool) -> usize {
    let total = guardians + usize::from(owner_counts);
    total / 2 + 1
}

/// Sign `hash` with every signer and sort the result by identity.
#[cfg(test)]
pub(crate) fn sign_all(hash: &MessageHash, signers: &[&warden_crypto::LocalSigner]) -> SignatureSet {
    let mut entries: Vec<SignatureEntry> = signers
        .iter()
        .map(|s| SignatureEntry {
            signer: s.identity(),
            signature: s.sign_hash(hash).unwrap(),
        })
        .collect();
    entries.sort_by(|a, b| a.signer.cmp(&b.signer));
    SignatureSet::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_crypto::{keccak256, LocalSigner, Secp256k1Recovery};
    use warden_types::ErrorCode;

    struct Fixture {
        owner: LocalSigner,
        guardians: Vec<LocalSigner>,
        hash: MessageHash,
    }

    impl Fixture {
        fn new(guardian_count: usize) -> Self {
            let guardians = (0..guardian_count)
                .map(|i| LocalSigner::for_label(&format!("guardian-{i}")))
                .collect();
            Self {
                owner: LocalSigner::for_label("owner"),
                guardians,
                hash: keccak256(b"operation"),
            }
        }

        fn guardian_set(&self) -> BTreeSet<Identity> {
            self.guardians.iter().map(|g| g.identity()).collect()
        }

        fn check(&self, signers: &[&LocalSigner], mode: ApprovalMode) -> Result<Approved> {
            let set = sign_all(&self.hash, signers);
            let recovery = Secp256k1Recovery;
            SignatureValidator::new(&recovery).validate(
                &self.hash,
                &set,
                mode,
                self.owner.identity(),
                &self.guardian_set(),
            )
        }
    }

    fn code(result: Result<Approved>) -> ErrorCode {
        result.unwrap_err().code()
    }

    #[test]
    fn test_quorum_sizes() {
        assert_eq!(quorum(1, false), 1);
        assert_eq!(quorum(2, false), 2);
        assert_eq!(quorum(3, false), 2);
        assert_eq!(quorum(2, true), 2);
        assert_eq!(quorum(3, true), 3);
    }

    #[test]
    fn test_owner_only() {
        let f = Fixture::new(2);
        let approved = f.check(&[&f.owner], ApprovalMode::OwnerOnly).unwrap();
        assert!(approved.owner_signed);

        assert_eq!(
            code(f.check(&[&f.guardians[0]], ApprovalMode::OwnerOnly)),
            ErrorCode::WalletOwnerSignatureRequired
        );
        assert_eq!(
            code(f.check(&[&f.owner, &f.guardians[0]], ApprovalMode::OwnerOnly)),
            ErrorCode::GuardianSignatureNotAllowed
        );
    }

    #[test]
    fn test_guardian_majority() {
        let f = Fixture::new(3);
        let approved = f
            .check(&[&f.guardians[0], &f.guardians[1]], ApprovalMode::GuardianMajority)
            .unwrap();
        assert_eq!(approved.signers.len(), 2);
        assert!(!approved.owner_signed);

        assert_eq!(
            code(f.check(&[&f.guardians[0]], ApprovalMode::GuardianMajority)),
            ErrorCode::NotEnoughSigners
        );
        assert_eq!(
            code(f.check(&[&f.owner, &f.guardians[0], &f.guardians[1]], ApprovalMode::GuardianMajority)),
            ErrorCode::WalletOwnerSignatureNotAllowed
        );
    }

    #[test]
    fn test_owner_modes() {
        let f = Fixture::new(2);
        assert!(f
            .check(&[&f.owner, &f.guardians[0]], ApprovalMode::MajorityOwnerAllowed)
            .is_ok());
        assert!(f
            .check(&[&f.guardians[0], &f.guardians[1]], ApprovalMode::MajorityOwnerAllowed)
            .is_ok());
        assert_eq!(
            code(f.check(&[&f.guardians[0], &f.guardians[1]], ApprovalMode::MajorityOwnerRequired)),
            ErrorCode::WalletOwnerSignatureRequired
        );
        assert_eq!(
            code(f.check(&[&f.owner], ApprovalMode::MajorityOwnerRequired)),
            ErrorCode::NoGuardianSignedBesidesOwner
        );
    }

    #[test]
    fn test_stranger_and_no_guardians() {
        let f = Fixture::new(2);
        let stranger = LocalSigner::for_label("stranger");
        assert_eq!(
            code(f.check(&[&f.guardians[0], &stranger], ApprovalMode::GuardianMajority)),
            ErrorCode::SignerNotGuardian
        );

        let lonely = Fixture::new(0);
        assert_eq!(
            code(lonely.check(&[&lonely.owner], ApprovalMode::MajorityOwnerAllowed)),
            ErrorCode::NoGuardians
        );
    }

    #[test]
    fn test_order_checked_first() {
        let f = Fixture::new(2);
        let mut set = sign_all(&f.hash, &[&f.guardians[0], &f.guardians[1]]);
        set.entries.reverse();
        let recovery = Secp256k1Recovery;
        let err = SignatureValidator::new(&recovery)
            .validate(&f.hash, &set, ApprovalMode::GuardianMajority, f.owner.identity(), &BTreeSet::new())
            .unwrap_err();
        assert_eq!(err, WalletError::InvalidSignersOrder { index: 1 });
    }

    #[test]
    fn test_duplicate_signer_is_order_violation() {
        let f = Fixture::new(2);
        let sig = f.guardians[0].sign_hash(&f.hash).unwrap();
        let entry = SignatureEntry {
            signer: f.guardians[0].identity(),
            signature: sig,
        };
        let set = SignatureSet::new(vec![entry.clone(), entry]);
        assert_eq!(set.check_order().unwrap_err().code(), ErrorCode::InvalidSignersOrder);
    }

    #[test]
    fn test_signature_over_other_hash_rejected() {
        let f = Fixture::new(1);
        let other = keccak256(b"something else");
        let set = sign_all(&other, &[&f.guardians[0]]);
        let recovery = Secp256k1Recovery;
        let err = SignatureValidator::new(&recovery)
            .validate(&f.hash, &set, ApprovalMode::GuardianMajority, f.owner.identity(), &f.guardian_set())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSignature);
    }

    #[test]
    fn test_entry_point_only_needs_nothing() {
        let f = Fixture::new(0);
        let recovery = Secp256k1Recovery;
        let approved = SignatureValidator::new(&recovery)
            .validate(&f.hash, &SignatureSet::empty(), ApprovalMode::EntryPointOnly, f.owner.identity(), &BTreeSet::new())
            .unwrap();
        assert!(approved.signers.is_empty());
    }
}
