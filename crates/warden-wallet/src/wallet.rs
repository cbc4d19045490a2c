//! Wallet aggregate and initialization

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use warden_types::{Amount, Identity, Result, Timestamp, WalletError};

use crate::{EntryPointBinding, GuardianChange, GuardianRegistry, LockStateMachine, QuotaManager, WalletConfig};

/// Where the engine is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
    /// A wallet instance that delegates to the master copy.
    Proxy(Identity),
    /// The master copy itself. Nothing privileged runs here.
    SharedImplementation,
}

impl ExecutionContext {
    pub fn detect(executing: Identity, master_copy: Identity) -> Self {
        if executing == master_copy {
            Self::SharedImplementation
        } else {
            Self::Proxy(executing)
        }
    }
}

/// Parameters for the one-time initialization of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitParams {
    pub owner: Identity,
    pub guardians: Vec<Identity>,
    /// Daily limit; zero means unlimited.
    pub quota: Amount,
    pub entry_point: Identity,
    pub inheritor: Option<Identity>,
}

/// All state owned by one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub(crate) instance: Identity,
    pub(crate) master_copy: Identity,
    pub(crate) owner: Identity,
    pub(crate) guardians: GuardianRegistry,
    pub(crate) quota: QuotaManager,
    pub(crate) lock: LockStateMachine,
    pub(crate) entry_point: EntryPointBinding,
    pub(crate) last_nonce: u64,
    pub(crate) last_seen: Timestamp,
}

impl Wallet {
    /// Build the initial state of wallet `instance`.
    pub fn initialize(
        instance: Identity,
        master_copy: Identity,
        params: InitParams,
        config: &WalletConfig,
        now: Timestamp,
    ) -> Result<Self> {
        if master_copy.is_zero() {
            return Err(WalletError::MasterCopyZeroAddress);
        }
        if params.owner.is_zero() {
            return Err(WalletError::InvalidOwner);
        }
        let entry_point = EntryPointBinding::bind(params.entry_point, params.inheritor)?;

        let mut guardians = BTreeSet::new();
        for guardian in &params.guardians {
            if guardian.is_zero() {
                return Err(WalletError::InvalidGuardianAddress);
            }
            if *guardian == params.owner {
                return Err(WalletError::GuardianCanNotBeOwner);
            }
            if !guardians.insert(*guardian) {
                return Err(WalletError::InvalidNewWalletGuardian { candidate: *guardian });
            }
        }
        if guardians.len() > config.max_guardians {
            return Err(WalletError::TooManyGuardians {
                max: config.max_guardians,
            });
        }
        if params.quota > config.max_quota {
            return Err(WalletError::InvalidQuota {
                requested: params.quota,
            });
        }
        if instance == master_copy {
            return Err(WalletError::InvalidSameMasterCopy);
        }
        if !config.accepts_master_copy(&master_copy) {
            return Err(WalletError::InvalidMasterCopy { master_copy });
        }

        Ok(Self {
            instance,
            master_copy,
            owner: params.owner,
            guardians: GuardianRegistry::with_active(guardians),
            quota: QuotaManager::new(params.quota, config.quota_period, now),
            lock: LockStateMachine::default(),
            entry_point,
            last_nonce: 0,
            last_seen: now,
        })
    }

    pub fn instance(&self) -> Identity {
        self.instance
    }

    pub fn master_copy(&self) -> Identity {
        self.master_copy
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn guardians(&self) -> &GuardianRegistry {
        &self.guardians
    }

    pub fn quota(&self) -> &QuotaManager {
        &self.quota
    }

    pub fn lock(&self) -> &LockStateMachine {
        &self.lock
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn entry_point(&self) -> &EntryPointBinding {
        &self.entry_point
    }

    pub fn last_nonce(&self) -> u64 {
        self.last_nonce
    }

    pub fn last_seen(&self) -> Timestamp {
        self.last_seen
    }

    /// Apply due guardian and quota changes.
    pub(crate) fn tick(&mut self, now: Timestamp) -> Vec<(Identity, GuardianChange)> {
        self.quota.tick(now);
        self.guardians.tick(now)
    }

    /// Replace the owner and lift any lock. Returns the previous owner.
    pub(crate) fn change_owner(&mut self, new_owner: Identity) -> Result<Identity> {
        if new_owner.is_zero() {
            return Err(WalletError::ZeroAddress { field: "new_owner" });
        }
        if new_owner == self.owner {
            return Err(WalletError::IsSameOwner);
        }
        if self.guardians.is_guardian(&new_owner) || self.guardians.is_pending_addition(&new_owner) {
            return Err(WalletError::InvalidNewWalletOwner { candidate: new_owner });
        }
        let previous = std::mem::replace(&mut self.owner, new_owner);
        self.lock.unlock();
        Ok(previous)
    }
}
