//! Guardian registry with time-locked additions and removals

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;
use warden_types::{Identity, Result, Timestamp, WalletError};

use crate::{PendingChange, PendingOutcome};

/// Direction of a pending guardian change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardianChange {
    Add,
    Remove,
}

/// Active guardians plus at most one pending change per identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianRegistry {
    active: BTreeSet<Identity>,
    pending: BTreeMap<Identity, PendingChange<GuardianChange>>,
}

impl GuardianRegistry {
    /// Registry seeded with guardians that are active immediately.
    pub fn with_active(guardians: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            active: guardians.into_iter().collect(),
            pending: BTreeMap::new(),
        }
    }

    pub fn active(&self) -> &BTreeSet<Identity> {
        &self.active
    }

    pub fn pending(&self) -> &BTreeMap<Identity, PendingChange<GuardianChange>> {
        &self.pending
    }

    pub fn is_guardian(&self, identity: &Identity) -> bool {
        self.active.contains(identity)
    }

    pub fn is_pending_addition(&self, identity: &Identity) -> bool {
        matches!(
            self.pending.get(identity),
            Some(PendingChange { value: GuardianChange::Add, .. })
        )
    }

    pub fn count(&self) -> usize {
        self.active.len()
    }

    fn pending_count(&self, change: GuardianChange) -> usize {
        self.pending.values().filter(|p| p.value == change).count()
    }

    /// Schedule `candidate` to become a guardian after `delay`.
    ///
    /// Proposing an addition for an identity whose removal is pending cancels
    /// that removal instead.
    pub fn propose_add(
        &mut self,
        candidate: Identity,
        owner: Identity,
        now: Timestamp,
        delay: Timestamp,
        max_guardians: usize,
    ) -> Result<PendingOutcome> {
        if candidate.is_zero() {
            return Err(WalletError::InvalidGuardianAddress);
        }
        if candidate == owner {
            return Err(WalletError::GuardianCanNotBeOwner);
        }

        match self.pending.get(&candidate).map(|p| p.value) {
            Some(GuardianChange::Add) => {
                return Err(WalletError::InvalidNewWalletGuardian { candidate });
            }
            Some(GuardianChange::Remove) => {
                self.pending.remove(&candidate);
                debug!(guardian = %candidate, "pending guardian removal cancelled");
                return Ok(PendingOutcome::Superseded);
            }
            None => {}
        }

        if self.active.contains(&candidate) {
            return Err(WalletError::InvalidNewWalletGuardian { candidate });
        }
        if self.active.len() + self.pending_count(GuardianChange::Add) >= max_guardians {
            return Err(WalletError::TooManyGuardians { max: max_guardians });
        }

        let effective_at = now.saturating_add(delay);
        self.pending
            .insert(candidate, PendingChange::new(GuardianChange::Add, effective_at));
        Ok(PendingOutcome::Scheduled { effective_at })
    }

    /// Schedule `guardian` for removal after `delay`.
    ///
    /// Removing an identity whose addition is pending cancels that addition.
    /// The last guardian can never be scheduled for removal.
    pub fn propose_remove(
        &mut self,
        guardian: Identity,
        now: Timestamp,
        delay: Timestamp,
    ) -> Result<PendingOutcome> {
        match self.pending.get(&guardian).map(|p| p.value) {
            Some(GuardianChange::Add) => {
                self.pending.remove(&guardian);
                debug!(%guardian, "pending guardian addition cancelled");
                return Ok(PendingOutcome::Superseded);
            }
            Some(GuardianChange::Remove) => {
                return Err(WalletError::GuardianNotExists { guardian });
            }
            None => {}
        }

        if !self.active.contains(&guardian) {
            return Err(WalletError::GuardianNotExists { guardian });
        }
        if self.active.len() - self.pending_count(GuardianChange::Remove) <= 1 {
            return Err(WalletError::NoGuardians);
        }

        let effective_at = now.saturating_add(delay);
        self.pending
            .insert(guardian, PendingChange::new(GuardianChange::Remove, effective_at));
        Ok(PendingOutcome::Scheduled { effective_at })
    }

    /// Drop whatever change is pending for `guardian`.
    pub fn cancel(&mut self, guardian: Identity) -> Result<GuardianChange> {
        self.pending
            .remove(&guardian)
            .map(|p| p.value)
            .ok_or(WalletError::GuardianNotExists { guardian })
    }

    /// Apply every pending change that is due at `now`.
    pub fn tick(&mut self, now: Timestamp) -> Vec<(Identity, GuardianChange)> {
        let due: Vec<_> = self
            .pending
            .iter()
            .filter(|(_, p)| p.is_due(now))
            .map(|(id, p)| (*id, p.value))
            .collect();

        for (identity, change) in &due {
            self.pending.remove(identity);
            match change {
                GuardianChange::Add => {
                    self.active.insert(*identity);
                }
                GuardianChange::Remove => {
                    self.active.remove(identity);
                }
            }
            debug!(guardian = %identity, ?change, "guardian change applied");
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::ErrorCode;

    const DELAY: Timestamp = 100;

    fn id(n: u64) -> Identity {
        Identity::from_low_u64(n)
    }

    #[test]
    fn test_addition_activates_after_delay() {
        let mut reg = GuardianRegistry::default();
        let outcome = reg.propose_add(id(2), id(1), 10, DELAY, 10).unwrap();
        assert_eq!(outcome, PendingOutcome::Scheduled { effective_at: 110 });
        assert!(reg.is_pending_addition(&id(2)));

        assert!(reg.tick(109).is_empty());
        assert!(!reg.is_guardian(&id(2)));

        assert_eq!(reg.tick(110), vec![(id(2), GuardianChange::Add)]);
        assert!(reg.is_guardian(&id(2)));
        assert!(reg.pending().is_empty());
    }

    #[test]
    fn test_add_rejections() {
        let mut reg = GuardianRegistry::with_active([id(2)]);
        let owner = id(1);

        assert_eq!(
            reg.propose_add(Identity::ZERO, owner, 0, DELAY, 10).unwrap_err().code(),
            ErrorCode::InvalidGuardianAddress
        );
        assert_eq!(
            reg.propose_add(owner, owner, 0, DELAY, 10).unwrap_err().code(),
            ErrorCode::GuardianCanNotBeOwner
        );
        assert_eq!(
            reg.propose_add(id(2), owner, 0, DELAY, 10).unwrap_err().code(),
            ErrorCode::InvalidNewWalletGuardian
        );

        reg.propose_add(id(3), owner, 0, DELAY, 10).unwrap();
        assert_eq!(
            reg.propose_add(id(3), owner, 0, DELAY, 10).unwrap_err().code(),
            ErrorCode::InvalidNewWalletGuardian
        );
        assert_eq!(
            reg.propose_add(id(4), owner, 0, DELAY, 2).unwrap_err().code(),
            ErrorCode::TooManyGuardians
        );
    }

    #[test]
    fn test_remove_and_supersede() {
        let mut reg = GuardianRegistry::with_active([id(2), id(3)]);
        reg.propose_remove(id(2), 0, DELAY).unwrap();
        assert_eq!(
            reg.propose_remove(id(2), 0, DELAY).unwrap_err().code(),
            ErrorCode::GuardianNotExists
        );
        assert_eq!(
            reg.propose_remove(id(3), 0, DELAY).unwrap_err().code(),
            ErrorCode::NoGuardians
        );

        let outcome = reg.propose_add(id(2), id(1), 5, DELAY, 10).unwrap();
        assert_eq!(outcome, PendingOutcome::Superseded);
        reg.tick(1_000);
        assert_eq!(reg.count(), 2);
    }

    #[test]
    fn test_remove_cancels_pending_addition() {
        let mut reg = GuardianRegistry::with_active([id(2)]);
        reg.propose_add(id(3), id(1), 0, DELAY, 10).unwrap();
        assert_eq!(reg.propose_remove(id(3), 0, DELAY).unwrap(), PendingOutcome::Superseded);
        reg.tick(1_000);
        assert!(!reg.is_guardian(&id(3)));
    }

    #[test]
    fn test_last_guardian_kept() {
        let mut reg = GuardianRegistry::with_active([id(2)]);
        assert_eq!(reg.propose_remove(id(2), 0, DELAY).unwrap_err(), WalletError::NoGuardians);
        assert_eq!(
            reg.propose_remove(id(9), 0, DELAY).unwrap_err().code(),
            ErrorCode::GuardianNotExists
        );
    }

    #[test]
    fn test_cancel() {
        let mut reg = GuardianRegistry::with_active([id(2)]);
        assert_eq!(reg.cancel(id(3)).unwrap_err().code(), ErrorCode::GuardianNotExists);
        reg.propose_add(id(3), id(1), 0, DELAY, 10).unwrap();
        assert_eq!(reg.cancel(id(3)).unwrap(), GuardianChange::Add);
        assert!(reg.pending().is_empty());
    }
}
