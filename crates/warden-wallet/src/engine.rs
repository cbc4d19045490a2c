//! Authorization engine
//!
//! The engine owns one wallet and is the only path through which its state
//! changes. Each `submit` is a single transition: checks run against a
//! staged copy of the wallet, and the copy replaces the live state only if
//! every check and the operation itself succeed.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;
use warden_crypto::{hash_object, Secp256k1Recovery, SignerRecovery};
use warden_types::{Identity, MessageHash, Result, Timestamp, WalletError};

use crate::{
    ApprovalMode, Approved, AuthorizationOutcome, BatchExecutor, CallExecutor, CommitReceipt,
    ConfigError, Effect, ExecutionContext, GuardianChange, InMemoryExecutor, InitParams,
    Operation, OperationTag, Origin, OutcomeRecord, OutcomeSink, SignatureValidator, Submission,
    TracingSink, Wallet, WalletConfig,
};

/// Domain separator mixed into every signed message.
pub const SIGNING_DOMAIN: &str = "warden-wallet/v1";

/// Collaborators the engine is built from.
pub struct EngineParts {
    pub config: WalletConfig,
    pub recovery: Box<dyn SignerRecovery>,
    pub executor: Box<dyn CallExecutor>,
    pub sink: Box<dyn OutcomeSink>,
}

impl EngineParts {
    /// secp256k1 recovery, an in-memory executor and a tracing sink.
    pub fn with_config(config: WalletConfig) -> Self {
        Self {
            config,
            recovery: Box::new(Secp256k1Recovery),
            executor: Box::new(InMemoryExecutor::new()),
            sink: Box::new(TracingSink),
        }
    }

    pub fn executor(mut self, executor: impl CallExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    pub fn sink(mut self, sink: impl OutcomeSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn recovery(mut self, recovery: impl SignerRecovery + 'static) -> Self {
        self.recovery = Box::new(recovery);
        self
    }
}

impl Default for EngineParts {
    fn default() -> Self {
        Self::with_config(WalletConfig::default())
    }
}

#[derive(Serialize)]
struct SignedPayload<'a> {
    domain: &'static str,
    wallet: Identity,
    master_copy: Identity,
    nonce: u64,
    valid_since: Timestamp,
    valid_until: Timestamp,
    operation: &'a Operation,
}

pub struct AuthorizationEngine {
    context: ExecutionContext,
    master_copy: Identity,
    config: WalletConfig,
    recovery: Box<dyn SignerRecovery>,
    executor: Box<dyn CallExecutor>,
    sink: Box<dyn OutcomeSink>,
    wallet: Option<Wallet>,
}

impl AuthorizationEngine {
    pub fn new(
        context: ExecutionContext,
        master_copy: Identity,
        parts: EngineParts,
    ) -> std::result::Result<Self, ConfigError> {
        parts.config.validate()?;
        Ok(Self {
            context,
            master_copy,
            config: parts.config,
            recovery: parts.recovery,
            executor: parts.executor,
            sink: parts.sink,
            wallet: None,
        })
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn wallet(&self) -> Option<&Wallet> {
        self.wallet.as_ref()
    }

    /// One-time initialization of the wallet this engine serves.
    pub fn initialize(&mut self, params: InitParams, now: Timestamp) -> Result<()> {
        let instance = match self.context {
            ExecutionContext::SharedImplementation => return Err(WalletError::MemoryNotMaster),
            ExecutionContext::Proxy(instance) => instance,
        };
        if self.wallet.is_some() {
            return Err(WalletError::InitializedAlready);
        }

        let wallet = Wallet::initialize(instance, self.master_copy, params, &self.config, now)?;
        info!(
            wallet = %instance,
            owner = %wallet.owner(),
            guardians = wallet.guardians().count(),
            "wallet initialized"
        );
        self.wallet = Some(wallet);
        Ok(())
    }

    /// Apply due guardian and quota changes without submitting an operation.
    pub fn tick(&mut self, now: Timestamp) -> Result<Vec<(Identity, GuardianChange)>> {
        if self.context == ExecutionContext::SharedImplementation {
            return Err(WalletError::DisallowedOnImplementation);
        }
        let wallet = self.wallet.as_mut().ok_or(WalletError::NotInitialized)?;
        if now < wallet.last_seen {
            return Err(WalletError::ClockWentBackwards {
                now,
                last_seen: wallet.last_seen,
            });
        }
        let applied = wallet.tick(now);
        wallet.last_seen = now;
        Ok(applied)
    }

    /// Hash that signers sign for `submission`.
    pub fn signing_hash(&self, submission: &Submission) -> Result<MessageHash> {
        let wallet = match self.context {
            ExecutionContext::Proxy(instance) => instance,
            ExecutionContext::SharedImplementation => self.master_copy,
        };
        let payload = SignedPayload {
            domain: SIGNING_DOMAIN,
            wallet,
            master_copy: self.master_copy,
            nonce: submission.nonce,
            valid_since: submission.valid_since,
            valid_until: submission.valid_until,
            operation: &submission.operation,
        };
        hash_object(&payload).map_err(|e| WalletError::UnexpectedResult {
            context: format!("signing payload: {e}"),
        })
    }

    /// Authorize and commit one operation. The outcome is also reported to
    /// the sink.
    pub fn submit(&mut self, submission: Submission, now: Timestamp) -> AuthorizationOutcome {
        let operation = submission.operation.tag();
        let outcome = self.process(&submission, now);

        let record = match &outcome {
            Ok(receipt) => OutcomeRecord::committed(receipt),
            Err(e) => {
                let claimed = submission.signatures.signers().collect();
                OutcomeRecord::rejected(operation, claimed, e, now)
            }
        };
        self.sink.record(&record);
        outcome
    }

    fn process(&mut self, submission: &Submission, now: Timestamp) -> AuthorizationOutcome {
        if self.context == ExecutionContext::SharedImplementation {
            return Err(WalletError::DisallowedOnImplementation);
        }
        let live = self.wallet.as_ref().ok_or(WalletError::NotInitialized)?;
        if now < live.last_seen {
            return Err(WalletError::ClockWentBackwards {
                now,
                last_seen: live.last_seen,
            });
        }

        submission.check_window(now)?;
        if submission.nonce <= live.last_nonce {
            return Err(WalletError::InvalidOrdering {
                nonce: submission.nonce,
                last_nonce: live.last_nonce,
            });
        }

        let tag = submission.operation.tag();
        let mode = self.config.policy.mode_for(tag);

        let mut staged = live.clone();
        staged.tick(now);

        let approved = self.authenticate(&staged, submission, tag, mode)?;
        staged.lock.ensure_permits(tag, mode)?;

        let effect = self.apply(&mut staged, submission, now)?;
        staged.last_nonce = submission.nonce;
        staged.last_seen = now;
        self.wallet = Some(staged);

        debug!(operation = %tag, nonce = submission.nonce, "staged state committed");
        Ok(CommitReceipt {
            id: Uuid::new_v4(),
            operation: tag,
            signers: approved.signers,
            nonce: submission.nonce,
            committed_at: now,
            effect,
        })
    }

    /// Origin checks followed by signature validation.
    fn authenticate(
        &self,
        wallet: &Wallet,
        submission: &Submission,
        tag: OperationTag,
        mode: ApprovalMode,
    ) -> Result<Approved> {
        match submission.origin {
            Origin::Relayed { relayer } => wallet.entry_point.check_relay(relayer, tag)?,
            Origin::Direct { caller } => {
                let owner_authority = caller == wallet.owner || caller == wallet.instance;
                match mode {
                    ApprovalMode::EntryPointOnly => {
                        return Err(WalletError::OnlyFromEntryPoint { caller });
                    }
                    ApprovalMode::OwnerOnly if owner_authority => {
                        return Ok(Approved {
                            signers: vec![wallet.owner],
                            owner_signed: true,
                        });
                    }
                    ApprovalMode::OwnerOnly => {
                        return Err(WalletError::NotOwnerSelfOrEntryPoint { caller });
                    }
                    _ => {
                        let is_guardian = wallet.guardians.is_guardian(&caller);
                        if tag == OperationTag::ChangeOwner && !is_guardian {
                            return Err(WalletError::NotAllowedToSetOwner { caller });
                        }
                        if !owner_authority && !is_guardian {
                            return Err(WalletError::NotFromWalletOrOwnerOrGuardian { caller });
                        }
                    }
                }
            }
        }

        let hash = self.signing_hash(submission)?;
        SignatureValidator::new(&*self.recovery).validate(
            &hash,
            &submission.signatures,
            mode,
            wallet.owner,
            wallet.guardians.active(),
        )
    }

    fn apply(&mut self, wallet: &mut Wallet, submission: &Submission, now: Timestamp) -> Result<Effect> {
        let config = &self.config;
        let effect = match &submission.operation {
            Operation::Execute { call } => {
                let receipt = BatchExecutor::new(&mut *self.executor, &mut wallet.quota, wallet.instance, now)
                    .run_single(call)?;
                Effect::Executed {
                    receipts: vec![receipt],
                }
            }
            Operation::ExecuteBatch { calls } => {
                let receipts = BatchExecutor::new(&mut *self.executor, &mut wallet.quota, wallet.instance, now)
                    .run(calls)?;
                Effect::Executed { receipts }
            }
            Operation::ChangeOwner { new_owner } => {
                let previous = wallet.change_owner(*new_owner)?;
                info!(wallet = %wallet.instance, %previous, owner = %new_owner, "owner changed");
                Effect::OwnerChanged {
                    previous,
                    owner: *new_owner,
                }
            }
            Operation::AddGuardian { guardian } => {
                let outcome = wallet.guardians.propose_add(
                    *guardian,
                    wallet.owner,
                    now,
                    config.guardian_pending_period,
                    config.max_guardians,
                )?;
                Effect::GuardianChangeProposed {
                    guardian: *guardian,
                    change: GuardianChange::Add,
                    outcome,
                }
            }
            Operation::RemoveGuardian { guardian } => {
                let outcome = wallet
                    .guardians
                    .propose_remove(*guardian, now, config.guardian_pending_period)?;
                Effect::GuardianChangeProposed {
                    guardian: *guardian,
                    change: GuardianChange::Remove,
                    outcome,
                }
            }
            Operation::CancelGuardianChange { guardian } => {
                let change = wallet.guardians.cancel(*guardian)?;
                Effect::GuardianChangeCancelled {
                    guardian: *guardian,
                    change,
                }
            }
            Operation::ChangeQuota { new_limit } => {
                let outcome = wallet.quota.propose_limit(
                    *new_limit,
                    now,
                    config.quota_pending_period,
                    config.max_quota,
                )?;
                Effect::QuotaChangeProposed { outcome }
            }
            Operation::Lock => Effect::Locked {
                changed: wallet.lock.lock(now),
            },
            Operation::Unlock => Effect::Unlocked {
                changed: wallet.lock.unlock(),
            },
            Operation::SetInheritor { inheritor } => {
                wallet.entry_point.set_inheritor(*inheritor)?;
                Effect::InheritorSet {
                    inheritor: *inheritor,
                }
            }
            Operation::ProposeEntryPointMigration { successor } => {
                wallet.entry_point.propose_migration(*successor)?;
                Effect::MigrationProposed {
                    successor: *successor,
                }
            }
            Operation::CompleteEntryPointMigration => {
                let entry_point = wallet
                    .entry_point
                    .complete_migration(submission.origin.caller())?;
                Effect::MigrationCompleted { entry_point }
            }
        };
        Ok(effect)
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("context", &self.context)
            .field("master_copy", &self.master_copy)
            .field("wallet", &self.wallet)
            .finish_non_exhaustive()
    }
}
