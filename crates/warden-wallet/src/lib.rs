//! Warden Wallet - Authorization engine for guardian-recoverable wallets
//!
//! This crate decides, for every operation submitted to a wallet, whether it
//! is authorized, by whom, and under what quota and lock constraints:
//! - Signature sets validated against owner-only and guardian-quorum modes
//! - Time-locked guardian and quota changes
//! - Guardian-initiated emergency lock
//! - A single bound entry point (relay) with guarded migration
//! - All-or-nothing batched execution
//!
//! # Architectural Invariants
//!
//! 1. All wallet state is mutated through `AuthorizationEngine` only
//! 2. A rejection leaves no partial state change
//! 3. Signers are strictly ascending; that order is the only dedup mechanism
//! 4. Nonces strictly increase; a signature set is never accepted twice
//! 5. Nothing privileged runs against the shared implementation

pub mod batch;
pub mod config;
pub mod engine;
pub mod entry_point;
pub mod guardian;
pub mod handle;
pub mod lock;
pub mod operation;
pub mod outcome;
pub mod pending;
pub mod quota;
pub mod signature_set;
pub mod wallet;

pub use batch::*;
pub use config::*;
pub use engine::*;
pub use entry_point::*;
pub use guardian::*;
pub use handle::*;
pub use lock::*;
pub use operation::*;
pub use outcome::*;
pub use pending::*;
pub use quota::*;
pub use signature_set::*;
pub use wallet::*;

pub use warden_types::{
    Amount, ErrorCategory, ErrorCode, Identity, MessageHash, Result, Timestamp, WalletError,
};
