//! Emergency lock state machine

use serde::{Deserialize, Serialize};
use tracing::info;
use warden_types::{Result, Timestamp, WalletError};

use crate::{ApprovalMode, OperationTag};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Unlocked,
    Locked,
}

/// Two-state lock. Transitions are idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStateMachine {
    state: LockState,
    locked_at: Option<Timestamp>,
}

impl LockStateMachine {
    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn locked_at(&self) -> Option<Timestamp> {
        self.locked_at
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    /// Returns `true` if the state changed.
    pub fn lock(&mut self, now: Timestamp) -> bool {
        if self.is_locked() {
            return false;
        }
        self.state = LockState::Locked;
        self.locked_at = Some(now);
        info!(locked_at = now, "wallet locked");
        true
    }

    /// Returns `true` if the state changed.
    pub fn unlock(&mut self) -> bool {
        if !self.is_locked() {
            return false;
        }
        self.state = LockState::Unlocked;
        self.locked_at = None;
        info!("wallet unlocked");
        true
    }

    /// Rejects `operation` approved under `mode` while locked.
    pub fn ensure_permits(&self, operation: OperationTag, mode: ApprovalMode) -> Result<()> {
        if self.is_locked() && operation.blocked_when_locked(mode) {
            return Err(WalletError::WalletLocked);
        }
        Ok(())
    }
}
