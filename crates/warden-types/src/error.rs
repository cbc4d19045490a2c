//! Result-code taxonomy and wallet errors
//!
//! All errors fail closed: a rejected operation leaves no trace in wallet
//! state. Every `WalletError` maps to one numeric `ErrorCode`; several
//! variants may share a code when the code names a family of conditions
//! (e.g. `304` covers both a foreign caller and a locked wallet).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Amount, Identity, Timestamp};

/// Category of a result code, given by its hundreds digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 1xx: caller input and initialization identity checks
    Identity,
    /// 3xx: control flow and caller authorization
    ControlFlow,
    /// 4xx: guardian, quota and signature checks
    GuardianQuotaSignature,
}

/// Numeric result codes returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum ErrorCode {
    ZeroAddress = 104,
    InvalidValidSince = 105,
    ZeroToken = 106,
    MasterCopyZeroAddress = 107,

    BatchedCallFailed = 300,
    DisallowedOnImplementationContract = 301,
    NotAllowedToSetOwner = 302,
    OnlyFromEntrypoint = 303,
    NotOwnerSelfOrEntrypointOrLocked = 304,
    InvalidOwner = 305,
    InitializedAlready = 306,
    InvalidSameEntrypoint = 307,
    NotEntrypointOrInheritor = 308,
    /// Reserved for the automation executor collaborator.
    NotExecutor = 309,
    /// Reserved for the official-guardian service collaborator.
    OfficialguardianCallFailed = 310,
    /// Reserved for the flash-loan vault collaborator.
    NotFromBalancerVault = 311,
    InvalidSameMasterCopy = 312,
    MemoryNotMaster = 313,
    NoPendingMigration = 314,
    ClockWentBackwards = 315,

    NoGuardians = 400,
    InvalidSignersOrder = 401,
    SignerNotGuardian = 402,
    WalletOwnerSignatureNotAllowed = 403,
    WalletOwnerSignatureRequired = 404,
    InvalidOrdering = 405,
    NoGuardianSignedBesidesOwner = 406,
    InvalidGuardianAddress = 407,
    NotFromWalletOrOwnerOrGuardian = 408,
    QuotaExceeded = 409,
    InvalidQuota = 410,
    IsSameOwner = 411,
    InvalidNewWalletOwner = 412,
    InvalidNewWalletGuardian = 413,
    UnexpectedResult = 414,
    InvalidValidUntil = 415,
    GuardianNotExists = 416,
    TooManyGuardians = 417,
    GuardianCanNotBeOwner = 418,
    InvalidMasterCopy = 419,
    NotEnoughSigners = 420,
    InvalidSignature = 421,
    GuardianSignatureNotAllowed = 422,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn category(self) -> ErrorCategory {
        match self.as_u16() / 100 {
            1 => ErrorCategory::Identity,
            3 => ErrorCategory::ControlFlow,
            _ => ErrorCategory::GuardianQuotaSignature,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Every rejection the authorization engine can produce
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    // ── 1xx identity ──────────────────────────────────────────────────────────
    #[error("Zero address supplied for {field}")]
    ZeroAddress { field: &'static str },

    #[error("Operation not valid before {valid_since} (now {now})")]
    InvalidValidSince { valid_since: Timestamp, now: Timestamp },

    #[error("Zero token address")]
    ZeroToken,

    #[error("Master copy is the zero address")]
    MasterCopyZeroAddress,

    // ── 3xx control flow ──────────────────────────────────────────────────────
    #[error("Batched call {index} failed: {reason}")]
    BatchedCallFailed { index: usize, reason: String },

    #[error("Batch contains no calls")]
    EmptyBatch,

    #[error("Operation disallowed on the shared implementation")]
    DisallowedOnImplementation,

    #[error("Caller {caller} is not allowed to set the owner")]
    NotAllowedToSetOwner { caller: Identity },

    #[error("Operation only accepted from the entry point (caller {caller})")]
    OnlyFromEntryPoint { caller: Identity },

    #[error("Caller {caller} is not the owner, the wallet, or the entry point")]
    NotOwnerSelfOrEntryPoint { caller: Identity },

    #[error("Wallet is locked")]
    WalletLocked,

    #[error("Invalid owner")]
    InvalidOwner,

    #[error("Wallet is not initialized")]
    NotInitialized,

    #[error("Wallet initialized already")]
    InitializedAlready,

    #[error("Entry point {entry_point} is already bound")]
    InvalidSameEntryPoint { entry_point: Identity },

    #[error("Caller {caller} is neither the entry point nor the inheritor")]
    NotEntryPointOrInheritor { caller: Identity },

    #[error("Master copy equals the wallet instance")]
    InvalidSameMasterCopy,

    #[error("Initialization attempted on the shared implementation")]
    MemoryNotMaster,

    #[error("No entry-point migration is pending")]
    NoPendingMigration,

    #[error("Clock went backwards: now {now} < last seen {last_seen}")]
    ClockWentBackwards { now: Timestamp, last_seen: Timestamp },

    // ── 4xx guardian / quota / signature ──────────────────────────────────────
    #[error("Wallet has no guardians")]
    NoGuardians,

    #[error("Signers not in strictly ascending order at position {index}")]
    InvalidSignersOrder { index: usize },

    #[error("Signer {signer} is not a guardian")]
    SignerNotGuardian { signer: Identity },

    #[error("Wallet owner signature not allowed")]
    OwnerSignatureNotAllowed,

    #[error("Wallet owner signature required")]
    OwnerSignatureRequired,

    #[error("Nonce {nonce} does not follow last nonce {last_nonce}")]
    InvalidOrdering { nonce: u64, last_nonce: u64 },

    #[error("No guardian signed besides the owner")]
    NoGuardianSignedBesidesOwner,

    #[error("Invalid guardian address")]
    InvalidGuardianAddress,

    #[error("Caller {caller} is not the wallet, the owner, or a guardian")]
    NotFromWalletOrOwnerOrGuardian { caller: Identity },

    #[error("Quota exceeded: requested {requested}, available {available}")]
    QuotaExceeded { requested: Amount, available: Amount },

    #[error("Invalid quota {requested}")]
    InvalidQuota { requested: Amount },

    #[error("New owner is the current owner")]
    IsSameOwner,

    #[error("Invalid new wallet owner {candidate}")]
    InvalidNewWalletOwner { candidate: Identity },

    #[error("Invalid new wallet guardian {candidate}")]
    InvalidNewWalletGuardian { candidate: Identity },

    #[error("Unexpected result: {context}")]
    UnexpectedResult { context: String },

    #[error("Invalid valid-until {valid_until} (valid since {valid_since}, now {now})")]
    InvalidValidUntil {
        valid_since: Timestamp,
        valid_until: Timestamp,
        now: Timestamp,
    },

    #[error("Guardian {guardian} does not exist")]
    GuardianNotExists { guardian: Identity },

    #[error("Too many guardians (max {max})")]
    TooManyGuardians { max: usize },

    #[error("Guardian can not be the owner")]
    GuardianCanNotBeOwner,

    #[error("Invalid master copy {master_copy}")]
    InvalidMasterCopy { master_copy: Identity },

    #[error("Not enough signers: {signed} of {required}")]
    NotEnoughSigners { signed: usize, required: usize },

    #[error("Invalid signature from {signer}: {reason}")]
    InvalidSignature { signer: Identity, reason: String },

    #[error("Guardian signature from {signer} not allowed")]
    GuardianSignatureNotAllowed { signer: Identity },
}

impl WalletError {
    /// The taxonomy code reported to callers.
    pub fn code(&self) -> ErrorCode {
        use WalletError::*;
        match self {
            ZeroAddress { .. } => ErrorCode::ZeroAddress,
            InvalidValidSince { .. } => ErrorCode::InvalidValidSince,
            ZeroToken => ErrorCode::ZeroToken,
            MasterCopyZeroAddress => ErrorCode::MasterCopyZeroAddress,

            BatchedCallFailed { .. } | EmptyBatch => ErrorCode::BatchedCallFailed,
            DisallowedOnImplementation => ErrorCode::DisallowedOnImplementationContract,
            NotAllowedToSetOwner { .. } => ErrorCode::NotAllowedToSetOwner,
            OnlyFromEntryPoint { .. } => ErrorCode::OnlyFromEntrypoint,
            NotOwnerSelfOrEntryPoint { .. } | WalletLocked => {
                ErrorCode::NotOwnerSelfOrEntrypointOrLocked
            }
            InvalidOwner | NotInitialized => ErrorCode::InvalidOwner,
            InitializedAlready => ErrorCode::InitializedAlready,
            InvalidSameEntryPoint { .. } => ErrorCode::InvalidSameEntrypoint,
            NotEntryPointOrInheritor { .. } => ErrorCode::NotEntrypointOrInheritor,
            InvalidSameMasterCopy => ErrorCode::InvalidSameMasterCopy,
            MemoryNotMaster => ErrorCode::MemoryNotMaster,
            NoPendingMigration => ErrorCode::NoPendingMigration,
            ClockWentBackwards { .. } => ErrorCode::ClockWentBackwards,

            NoGuardians => ErrorCode::NoGuardians,
            InvalidSignersOrder { .. } => ErrorCode::InvalidSignersOrder,
            SignerNotGuardian { .. } => ErrorCode::SignerNotGuardian,
            OwnerSignatureNotAllowed => ErrorCode::WalletOwnerSignatureNotAllowed,
            OwnerSignatureRequired => ErrorCode::WalletOwnerSignatureRequired,
            InvalidOrdering { .. } => ErrorCode::InvalidOrdering,
            NoGuardianSignedBesidesOwner => ErrorCode::NoGuardianSignedBesidesOwner,
            InvalidGuardianAddress => ErrorCode::InvalidGuardianAddress,
            NotFromWalletOrOwnerOrGuardian { .. } => ErrorCode::NotFromWalletOrOwnerOrGuardian,
            QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
            InvalidQuota { .. } => ErrorCode::InvalidQuota,
            IsSameOwner => ErrorCode::IsSameOwner,
            InvalidNewWalletOwner { .. } => ErrorCode::InvalidNewWalletOwner,
            InvalidNewWalletGuardian { .. } => ErrorCode::InvalidNewWalletGuardian,
            UnexpectedResult { .. } => ErrorCode::UnexpectedResult,
            InvalidValidUntil { .. } => ErrorCode::InvalidValidUntil,
            GuardianNotExists { .. } => ErrorCode::GuardianNotExists,
            TooManyGuardians { .. } => ErrorCode::TooManyGuardians,
            GuardianCanNotBeOwner => ErrorCode::GuardianCanNotBeOwner,
            InvalidMasterCopy { .. } => ErrorCode::InvalidMasterCopy,
            NotEnoughSigners { .. } => ErrorCode::NotEnoughSigners,
            InvalidSignature { .. } => ErrorCode::InvalidSignature,
            GuardianSignatureNotAllowed { .. } => ErrorCode::GuardianSignatureNotAllowed,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
