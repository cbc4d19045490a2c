//! Operations, approval modes, and submissions

use serde::{Deserialize, Serialize};
use warden_types::{Amount, Identity, Result, Timestamp, WalletError};

use crate::SignatureSet;

// ── Approval modes ────────────────────────────────────────────────────────────

/// Who must approve an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// The owner alone. Any other signer is rejected.
    OwnerOnly,
    /// A majority of guardians. The owner may not sign.
    GuardianMajority,
    /// A majority of guardians plus owner, where the owner's signature is
    /// optional but counts toward the quorum.
    MajorityOwnerAllowed,
    /// A majority of guardians plus owner, owner signature mandatory.
    MajorityOwnerRequired,
    /// No signatures; the bound entry point's relay is the authority.
    EntryPointOnly,
}

impl ApprovalMode {
    pub fn is_quorum(self) -> bool {
        matches!(
            self,
            Self::GuardianMajority | Self::MajorityOwnerAllowed | Self::MajorityOwnerRequired
        )
    }

    /// Whether the owner counts as an extra member of the quorum.
    pub fn owner_counts(self) -> bool {
        matches!(self, Self::MajorityOwnerAllowed | Self::MajorityOwnerRequired)
    }
}

// ── Operation tags ────────────────────────────────────────────────────────────

/// The finite set of operations the engine dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationTag {
    Execute,
    ExecuteBatch,
    ChangeOwner,
    AddGuardian,
    RemoveGuardian,
    CancelGuardianChange,
    ChangeQuota,
    Lock,
    Unlock,
    SetInheritor,
    ProposeEntryPointMigration,
    CompleteEntryPointMigration,
}

impl OperationTag {
    pub const ALL: [OperationTag; 12] = [
        Self::Execute,
        Self::ExecuteBatch,
        Self::ChangeOwner,
        Self::AddGuardian,
        Self::RemoveGuardian,
        Self::CancelGuardianChange,
        Self::ChangeQuota,
        Self::Lock,
        Self::Unlock,
        Self::SetInheritor,
        Self::ProposeEntryPointMigration,
        Self::CompleteEntryPointMigration,
    ];

    /// Approval mode used when the policy table has no override.
    pub fn default_mode(self) -> ApprovalMode {
        match self {
            Self::ChangeOwner | Self::Lock => ApprovalMode::GuardianMajority,
            Self::Unlock => ApprovalMode::MajorityOwnerAllowed,
            Self::CompleteEntryPointMigration => ApprovalMode::EntryPointOnly,
            _ => ApprovalMode::OwnerOnly,
        }
    }

    /// Operations that spend or reconfigure the quota. A locked wallet
    /// rejects them whatever mode they are approved under.
    pub fn touches_quota(self) -> bool {
        matches!(self, Self::Execute | Self::ExecuteBatch | Self::ChangeQuota)
    }

    /// Whether a locked wallet rejects this operation when approved under
    /// `mode`. Anything the owner can authorize alone is frozen.
    pub fn blocked_when_locked(self, mode: ApprovalMode) -> bool {
        mode == ApprovalMode::OwnerOnly || self.touches_quota()
    }

    /// Operations the inheritor may relay while an entry-point migration is
    /// pending.
    pub fn is_wind_down(self) -> bool {
        matches!(
            self,
            Self::CompleteEntryPointMigration | Self::Lock | Self::Unlock
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::ExecuteBatch => "execute_batch",
            Self::ChangeOwner => "change_owner",
            Self::AddGuardian => "add_guardian",
            Self::RemoveGuardian => "remove_guardian",
            Self::CancelGuardianChange => "cancel_guardian_change",
            Self::ChangeQuota => "change_quota",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::SetInheritor => "set_inheritor",
            Self::ProposeEntryPointMigration => "propose_entry_point_migration",
            Self::CompleteEntryPointMigration => "complete_entry_point_migration",
        }
    }
}

impl std::fmt::Display for OperationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Calls ─────────────────────────────────────────────────────────────────────

/// Asset moved by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Native,
    Erc20(Identity),
}

/// A single outbound call made by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Call {
    Transfer {
        token: Token,
        to: Identity,
        amount: Amount,
    },
    Invoke {
        target: Identity,
        value: Amount,
        data: Vec<u8>,
    },
}

impl Call {
    pub fn target(&self) -> Identity {
        match self {
            Self::Transfer { to, .. } => *to,
            Self::Invoke { target, .. } => *target,
        }
    }

    /// Amount counted against the spending quota.
    pub fn spend(&self) -> Amount {
        match self {
            Self::Transfer { amount, .. } => *amount,
            Self::Invoke { value, .. } => *value,
        }
    }

    /// Input checks that need no wallet state.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Transfer { token, to, .. } => {
                if let Token::Erc20(address) = token {
                    if address.is_zero() {
                        return Err(WalletError::ZeroToken);
                    }
                }
                if to.is_zero() {
                    return Err(WalletError::ZeroAddress { field: "to" });
                }
            }
            Self::Invoke { target, .. } => {
                if target.is_zero() {
                    return Err(WalletError::ZeroAddress { field: "target" });
                }
            }
        }
        Ok(())
    }
}

// ── Operations ────────────────────────────────────────────────────────────────

/// An operation with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Execute { call: Call },
    ExecuteBatch { calls: Vec<Call> },
    ChangeOwner { new_owner: Identity },
    AddGuardian { guardian: Identity },
    RemoveGuardian { guardian: Identity },
    CancelGuardianChange { guardian: Identity },
    ChangeQuota { new_limit: Amount },
    Lock,
    Unlock,
    SetInheritor { inheritor: Option<Identity> },
    ProposeEntryPointMigration { successor: Identity },
    CompleteEntryPointMigration,
}

impl Operation {
    pub fn tag(&self) -> OperationTag {
        match self {
            Self::Execute { .. } => OperationTag::Execute,
            Self::ExecuteBatch { .. } => OperationTag::ExecuteBatch,
            Self::ChangeOwner { .. } => OperationTag::ChangeOwner,
            Self::AddGuardian { .. } => OperationTag::AddGuardian,
            Self::RemoveGuardian { .. } => OperationTag::RemoveGuardian,
            Self::CancelGuardianChange { .. } => OperationTag::CancelGuardianChange,
            Self::ChangeQuota { .. } => OperationTag::ChangeQuota,
            Self::Lock => OperationTag::Lock,
            Self::Unlock => OperationTag::Unlock,
            Self::SetInheritor { .. } => OperationTag::SetInheritor,
            Self::ProposeEntryPointMigration { .. } => OperationTag::ProposeEntryPointMigration,
            Self::CompleteEntryPointMigration => OperationTag::CompleteEntryPointMigration,
        }
    }
}

// ── Submissions ───────────────────────────────────────────────────────────────

/// How a submission reached the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Called directly by `caller`.
    Direct { caller: Identity },
    /// Relayed as a meta-transaction by `relayer`.
    Relayed { relayer: Identity },
}

impl Origin {
    pub fn caller(&self) -> Identity {
        match self {
            Self::Direct { caller } => *caller,
            Self::Relayed { relayer } => *relayer,
        }
    }
}

/// A request for the engine to authorize and commit one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub origin: Origin,
    pub operation: Operation,
    pub signatures: SignatureSet,
    pub valid_since: Timestamp,
    pub valid_until: Timestamp,
    pub nonce: u64,
}

impl Submission {
    /// A submission valid at any time, with no signatures attached yet.
    pub fn new(origin: Origin, operation: Operation, nonce: u64) -> Self {
        Self {
            origin,
            operation,
            signatures: SignatureSet::default(),
            valid_since: 0,
            valid_until: Timestamp::MAX,
            nonce,
        }
    }

    pub fn with_window(mut self, valid_since: Timestamp, valid_until: Timestamp) -> Self {
        self.valid_since = valid_since;
        self.valid_until = valid_until;
        self
    }

    pub fn with_signatures(mut self, signatures: SignatureSet) -> Self {
        self.signatures = signatures;
        self
    }

    /// Reject when `now` is outside `[valid_since, valid_until]`.
    pub fn check_window(&self, now: Timestamp) -> Result<()> {
        if self.valid_until < self.valid_since || now > self.valid_until {
            return Err(WalletError::InvalidValidUntil {
                valid_since: self.valid_since,
                valid_until: self.valid_until,
                now,
            });
        }
        if now < self.valid_since {
            return Err(WalletError::InvalidValidSince {
                valid_since: self.valid_since,
                now,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::ErrorCode;

    #[test]
    fn test_default_table_shape() {
        assert_eq!(OperationTag::Lock.default_mode(), ApprovalMode::GuardianMajority);
        assert_eq!(OperationTag::Execute.default_mode(), ApprovalMode::OwnerOnly);
        assert_eq!(
            OperationTag::CompleteEntryPointMigration.default_mode(),
            ApprovalMode::EntryPointOnly
        );
        for tag in OperationTag::ALL {
            assert_eq!(
                tag.blocked_when_locked(tag.default_mode()),
                tag.default_mode() == ApprovalMode::OwnerOnly,
                "{tag}"
            );
        }
        assert!(OperationTag::AddGuardian.blocked_when_locked(ApprovalMode::OwnerOnly));
        assert!(!OperationTag::AddGuardian.blocked_when_locked(ApprovalMode::GuardianMajority));
        assert!(OperationTag::Execute.blocked_when_locked(ApprovalMode::MajorityOwnerRequired));
        assert!(!OperationTag::Unlock.blocked_when_locked(ApprovalMode::MajorityOwnerAllowed));
    }

    #[test]
    fn test_operation_tags_cover_all() {
        let ops = [
            Operation::Lock,
            Operation::Unlock,
            Operation::CompleteEntryPointMigration,
            Operation::ChangeQuota { new_limit: 5 },
        ];
        for op in &ops {
            assert!(OperationTag::ALL.contains(&op.tag()));
        }
    }

    #[test]
    fn test_call_validation() {
        let zero_token = Call::Transfer {
            token: Token::Erc20(Identity::ZERO),
            to: Identity::from_low_u64(1),
            amount: 1,
        };
        assert_eq!(zero_token.validate().unwrap_err(), WalletError::ZeroToken);

        let zero_target = Call::Invoke {
            target: Identity::ZERO,
            value: 0,
            data: vec![],
        };
        assert_eq!(zero_target.validate().unwrap_err().code(), ErrorCode::ZeroAddress);

        let ok = Call::Transfer {
            token: Token::Native,
            to: Identity::from_low_u64(1),
            amount: 10,
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.spend(), 10);
    }

    #[test]
    fn test_validity_window() {
        let s = Submission::new(Origin::Direct { caller: Identity::from_low_u64(1) }, Operation::Lock, 1)
            .with_window(100, 200);

        assert!(s.check_window(100).is_ok());
        assert!(s.check_window(200).is_ok());
        assert_eq!(s.check_window(99).unwrap_err().code(), ErrorCode::InvalidValidSince);
        assert_eq!(s.check_window(201).unwrap_err().code(), ErrorCode::InvalidValidUntil);

        let inverted = s.clone().with_window(200, 100);
        assert_eq!(inverted.check_window(150).unwrap_err().code(), ErrorCode::InvalidValidUntil);
    }

    #[test]
    fn test_operation_json_shape() {
        let json = serde_json::to_string(&Operation::ChangeQuota { new_limit: 100 }).unwrap();
        assert_eq!(json, r#"{"change_quota":{"new_limit":100}}"#);
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tag(), OperationTag::ChangeQuota);
    }
}
