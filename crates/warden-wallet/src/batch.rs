//! Call execution and all-or-nothing batches
//!
//! Outbound calls go through a `CallExecutor`. A batch either commits every
//! call or rolls back the ones already made, in reverse order, and restores
//! the quota to where it was before the batch started.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;
use warden_types::{Identity, Result, Timestamp, WalletError};

use crate::{Call, QuotaManager};

/// Proof that a call went out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReceipt {
    pub id: Uuid,
    pub output: Vec<u8>,
}

impl CallReceipt {
    pub fn new(output: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            output,
        }
    }
}

/// Why an outbound call did not complete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallFailure {
    #[error("Call reverted: {0}")]
    Reverted(String),

    #[error("Executor unavailable: {0}")]
    Unavailable(String),
}

/// Performs calls on behalf of a wallet.
pub trait CallExecutor: Send {
    fn execute(&mut self, wallet: Identity, call: &Call) -> std::result::Result<CallReceipt, CallFailure>;

    /// Undo a call that was executed earlier in the same batch.
    fn rollback(&mut self, receipt: &CallReceipt);
}

/// Runs calls against an executor while charging a quota.
pub struct BatchExecutor<'a> {
    executor: &'a mut dyn CallExecutor,
    quota: &'a mut QuotaManager,
    wallet: Identity,
    now: Timestamp,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(
        executor: &'a mut dyn CallExecutor,
        quota: &'a mut QuotaManager,
        wallet: Identity,
        now: Timestamp,
    ) -> Self {
        Self {
            executor,
            quota,
            wallet,
            now,
        }
    }

    /// Execute a single call. Quota exhaustion is reported as such rather
    /// than as a batch failure.
    pub fn run_single(&mut self, call: &Call) -> Result<CallReceipt> {
        call.validate()?;
        let spend = call.spend();
        self.quota.reserve(spend, self.now)?;

        match self.executor.execute(self.wallet, call) {
            Ok(receipt) => Ok(receipt),
            Err(failure) => {
                self.quota.refund(spend);
                warn!(wallet = %self.wallet, error = %failure, "call failed");
                Err(WalletError::BatchedCallFailed {
                    index: 0,
                    reason: failure.to_string(),
                })
            }
        }
    }

    /// Execute `calls` in order. The first failure unwinds the batch.
    pub fn run(&mut self, calls: &[Call]) -> Result<Vec<CallReceipt>> {
        if calls.is_empty() {
            return Err(WalletError::EmptyBatch);
        }

        let checkpoint = self.quota.clone();
        let mut receipts = Vec::with_capacity(calls.len());

        for (index, call) in calls.iter().enumerate() {
            match self.step(call) {
                Ok(receipt) => receipts.push(receipt),
                Err(reason) => {
                    for receipt in receipts.iter().rev() {
                        self.executor.rollback(receipt);
                    }
                    *self.quota = checkpoint;
                    warn!(wallet = %self.wallet, index, %reason, "batch aborted");
                    return Err(WalletError::BatchedCallFailed { index, reason });
                }
            }
        }

        debug!(wallet = %self.wallet, calls = receipts.len(), "batch committed");
        Ok(receipts)
    }

    fn step(&mut self, call: &Call) -> std::result::Result<CallReceipt, String> {
        call.validate().map_err(|e| e.to_string())?;
        self.quota
            .reserve(call.spend(), self.now)
            .map_err(|e| e.to_string())?;
        self.executor
            .execute(self.wallet, call)
            .map_err(|e| e.to_string())
    }
}

// ── In-memory executor ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Ledger {
    executed: Vec<(Uuid, Call)>,
    reverting: HashSet<Identity>,
    rollbacks: usize,
}

/// Executor that records calls in memory.
///
/// Clones share one ledger, so a test can keep a handle after boxing one
/// into the engine.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExecutor {
    ledger: Arc<Mutex<Ledger>>,
}

impl InMemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `target` revert.
    pub fn revert_calls_to(&self, target: Identity) {
        self.ledger.lock().reverting.insert(target);
    }

    /// Calls that executed and were not rolled back.
    pub fn executed(&self) -> Vec<Call> {
        self.ledger
            .lock()
            .executed
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn rollbacks(&self) -> usize {
        self.ledger.lock().rollbacks
    }
}

impl CallExecutor for InMemoryExecutor {
    fn execute(&mut self, _wallet: Identity, call: &Call) -> std::result::Result<CallReceipt, CallFailure> {
        let mut ledger = self.ledger.lock();
        let target = call.target();
        if ledger.reverting.contains(&target) {
            return Err(CallFailure::Reverted(format!("target {target} reverted")));
        }

        let receipt = CallReceipt::new(Vec::new());
        ledger.executed.push((receipt.id, call.clone()));
        Ok(receipt)
    }

    fn rollback(&mut self, receipt: &CallReceipt) {
        let mut ledger = self.ledger.lock();
        ledger.executed.retain(|(id, _)| *id != receipt.id);
        ledger.rollbacks += 1;
    }
}
