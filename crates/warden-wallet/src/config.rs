//! Wallet engine configuration
//!
//! Every field has a default, so a partial JSON document is a valid config.
//! Periods are in seconds of engine time.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_types::{Amount, Identity, Timestamp};

use crate::{ApprovalMode, OperationTag};

const DAY: Timestamp = 24 * 60 * 60;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Approval mode {mode:?} is not permitted for {operation}")]
    UnsafePolicy {
        operation: OperationTag,
        mode: ApprovalMode,
    },

    #[error("Period {0} must be greater than zero")]
    ZeroPeriod(&'static str),

    #[error("max_guardians must be greater than zero")]
    ZeroMaxGuardians,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Delay before a guardian addition or removal takes effect
    pub guardian_pending_period: Timestamp,
    /// Delay before a quota increase takes effect
    pub quota_pending_period: Timestamp,
    /// Length of a spending period
    pub quota_period: Timestamp,
    /// Upper bound on active plus pending guardians
    pub max_guardians: usize,
    /// Largest accepted daily limit
    pub max_quota: Amount,
    /// Master copies a wallet may be initialized against. Empty accepts any.
    pub accepted_master_copies: Vec<Identity>,
    /// Per-operation approval mode overrides
    pub policy: ApprovalPolicy,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            guardian_pending_period: 3 * DAY,
            quota_pending_period: DAY,
            quota_period: DAY,
            max_guardians: 10,
            max_quota: Amount::MAX >> 1,
            accepted_master_copies: Vec::new(),
            policy: ApprovalPolicy::default(),
        }
    }
}

impl WalletConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guardian_pending_period == 0 {
            return Err(ConfigError::ZeroPeriod("guardian_pending_period"));
        }
        if self.quota_pending_period == 0 {
            return Err(ConfigError::ZeroPeriod("quota_pending_period"));
        }
        if self.quota_period == 0 {
            return Err(ConfigError::ZeroPeriod("quota_period"));
        }
        if self.max_guardians == 0 {
            return Err(ConfigError::ZeroMaxGuardians);
        }
        self.policy.validate()
    }

    pub fn accepts_master_copy(&self, master_copy: &Identity) -> bool {
        self.accepted_master_copies.is_empty() || self.accepted_master_copies.contains(master_copy)
    }
}

/// Approval mode overrides keyed by operation.
///
/// Operations without an override use [`OperationTag::default_mode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalPolicy {
    overrides: BTreeMap<OperationTag, ApprovalMode>,
}

impl ApprovalPolicy {
    pub fn with_override(mut self, operation: OperationTag, mode: ApprovalMode) -> Self {
        self.overrides.insert(operation, mode);
        self
    }

    pub fn mode_for(&self, operation: OperationTag) -> ApprovalMode {
        self.overrides
            .get(&operation)
            .copied()
            .unwrap_or_else(|| operation.default_mode())
    }

    /// Reject tables that would let the owner bypass guardians or relay
    /// ordinary operations without signatures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for operation in OperationTag::ALL {
            let mode = self.mode_for(operation);
            let permitted = match operation {
                OperationTag::Lock => mode == ApprovalMode::GuardianMajority,
                OperationTag::ChangeOwner | OperationTag::Unlock => mode.is_quorum(),
                OperationTag::CompleteEntryPointMigration => mode == ApprovalMode::EntryPointOnly,
                _ => mode != ApprovalMode::EntryPointOnly,
            };
            if !permitted {
                return Err(ConfigError::UnsafePolicy { operation, mode });
            }
        }
        Ok(())
    }
}
