//! Warden Types - Foundation types for guardian-recoverable wallets
//!
//! This crate holds the vocabulary shared by every other Warden crate:
//! - `Identity`: 20-byte account identities (owners, guardians, relays)
//! - `MessageHash`: 32-byte digests that signatures are made over
//! - `ErrorCode`: the numeric result-code taxonomy returned to callers
//! - `WalletError`: every rejection the authorization engine can produce
//!
//! # Taxonomy Invariant
//!
//! Each rejection maps to exactly one code, and a code never changes meaning.

pub mod error;
pub mod identity;

pub use error::*;
pub use identity::*;

/// Token or value amount, in the smallest unit of the asset.
pub type Amount = u128;

/// Seconds since the Unix epoch, supplied by the execution environment.
pub type Timestamp = u64;
