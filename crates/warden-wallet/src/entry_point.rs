//! Entry-point binding and migration
//!
//! A wallet trusts exactly one relay at a time. Replacing it is a two-step
//! affair: the owner proposes a successor, then the current entry point (or
//! the inheritor, if the current one has gone dark) completes the switch.

use serde::{Deserialize, Serialize};
use tracing::info;
use warden_types::{Identity, Result, WalletError};

use crate::OperationTag;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPointBinding {
    current: Identity,
    successor: Option<Identity>,
    inheritor: Option<Identity>,
}

impl EntryPointBinding {
    pub fn bind(entry_point: Identity, inheritor: Option<Identity>) -> Result<Self> {
        if entry_point.is_zero() {
            return Err(WalletError::ZeroAddress { field: "entry_point" });
        }
        if inheritor.is_some_and(|i| i.is_zero()) {
            return Err(WalletError::ZeroAddress { field: "inheritor" });
        }
        Ok(Self {
            current: entry_point,
            successor: None,
            inheritor,
        })
    }

    pub fn current(&self) -> Identity {
        self.current
    }

    pub fn successor(&self) -> Option<Identity> {
        self.successor
    }

    pub fn inheritor(&self) -> Option<Identity> {
        self.inheritor
    }

    pub fn set_inheritor(&mut self, inheritor: Option<Identity>) -> Result<()> {
        if inheritor.is_some_and(|i| i.is_zero()) {
            return Err(WalletError::ZeroAddress { field: "inheritor" });
        }
        self.inheritor = inheritor;
        Ok(())
    }

    /// Record `successor` as the next entry point. Replaces any earlier
    /// proposal.
    pub fn propose_migration(&mut self, successor: Identity) -> Result<()> {
        if successor.is_zero() {
            return Err(WalletError::ZeroAddress { field: "successor" });
        }
        if successor == self.current {
            return Err(WalletError::InvalidSameEntryPoint { entry_point: successor });
        }
        self.successor = Some(successor);
        Ok(())
    }

    /// Switch to the proposed successor. Returns the new entry point.
    pub fn complete_migration(&mut self, caller: Identity) -> Result<Identity> {
        let successor = self.successor.ok_or(WalletError::NoPendingMigration)?;
        if caller != self.current && Some(caller) != self.inheritor {
            return Err(WalletError::NotEntryPointOrInheritor { caller });
        }
        info!(from = %self.current, to = %successor, "entry point migrated");
        self.current = successor;
        self.successor = None;
        Ok(successor)
    }

    /// Check that `caller` may relay `operation`.
    pub fn check_relay(&self, caller: Identity, operation: OperationTag) -> Result<()> {
        if caller == self.current {
            return Ok(());
        }
        if operation.is_wind_down() {
            if self.successor.is_some() && Some(caller) == self.inheritor {
                return Ok(());
            }
            return Err(WalletError::NotEntryPointOrInheritor { caller });
        }
        Err(WalletError::OnlyFromEntryPoint { caller })
    }

    pub fn authorize_relay(&self, caller: Identity, operation: OperationTag) -> bool {
        self.check_relay(caller, operation).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::ErrorCode;

    fn id(n: u64) -> Identity {
        Identity::from_low_u64(n)
    }

    #[test]
    fn test_bind_rejects_zero() {
        assert_eq!(
            EntryPointBinding::bind(Identity::ZERO, None).unwrap_err().code(),
            ErrorCode::ZeroAddress
        );
        assert_eq!(
            EntryPointBinding::bind(id(1), Some(Identity::ZERO)).unwrap_err().code(),
            ErrorCode::ZeroAddress
        );
    }

    #[test]
    fn test_only_current_relays_ordinary_operations() {
        let binding = EntryPointBinding::bind(id(1), Some(id(2))).unwrap();
        assert!(binding.authorize_relay(id(1), OperationTag::Execute));
        assert_eq!(
            binding.check_relay(id(2), OperationTag::Execute).unwrap_err().code(),
            ErrorCode::OnlyFromEntrypoint
        );
    }

    #[test]
    fn test_inheritor_needs_pending_migration() {
        let mut binding = EntryPointBinding::bind(id(1), Some(id(2))).unwrap();
        assert_eq!(
            binding.check_relay(id(2), OperationTag::Lock).unwrap_err().code(),
            ErrorCode::NotEntrypointOrInheritor
        );

        binding.propose_migration(id(3)).unwrap();
        assert!(binding.authorize_relay(id(2), OperationTag::Lock));
        assert!(binding.authorize_relay(id(2), OperationTag::CompleteEntryPointMigration));
        assert!(!binding.authorize_relay(id(2), OperationTag::Execute));
        assert!(!binding.authorize_relay(id(9), OperationTag::Unlock));
    }

    #[test]
    fn test_migration_flow() {
        let mut binding = EntryPointBinding::bind(id(1), Some(id(2))).unwrap();
        assert_eq!(binding.complete_migration(id(1)).unwrap_err(), WalletError::NoPendingMigration);
        assert_eq!(
            binding.propose_migration(id(1)).unwrap_err().code(),
            ErrorCode::InvalidSameEntrypoint
        );

        binding.propose_migration(id(3)).unwrap();
        binding.propose_migration(id(4)).unwrap();
        assert_eq!(
            binding.complete_migration(id(9)).unwrap_err().code(),
            ErrorCode::NotEntrypointOrInheritor
        );
        assert_eq!(binding.complete_migration(id(2)).unwrap(), id(4));
        assert_eq!(binding.current(), id(4));
        assert_eq!(binding.successor(), None);
        assert!(binding.authorize_relay(id(4), OperationTag::Execute));
        assert!(!binding.authorize_relay(id(1), OperationTag::Execute));
    }
}
