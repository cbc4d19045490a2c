//! Commit receipts and outcome records
//!
//! Every submission, accepted or not, produces one `OutcomeRecord` delivered
//! to the engine's `OutcomeSink`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use warden_types::{ErrorCode, Identity, Timestamp, WalletError};

use crate::{CallReceipt, GuardianChange, OperationTag, PendingOutcome};

/// State change made by a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Executed { receipts: Vec<CallReceipt> },
    OwnerChanged { previous: Identity, owner: Identity },
    GuardianChangeProposed {
        guardian: Identity,
        change: GuardianChange,
        outcome: PendingOutcome,
    },
    GuardianChangeCancelled { guardian: Identity, change: GuardianChange },
    QuotaChangeProposed { outcome: PendingOutcome },
    Locked { changed: bool },
    Unlocked { changed: bool },
    InheritorSet { inheritor: Option<Identity> },
    MigrationProposed { successor: Identity },
    MigrationCompleted { entry_point: Identity },
}

/// Returned to the caller when an operation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub id: Uuid,
    pub operation: OperationTag,
    pub signers: Vec<Identity>,
    pub nonce: u64,
    pub committed_at: Timestamp,
    pub effect: Effect,
}

/// Result of a submission.
pub type AuthorizationOutcome = warden_types::Result<CommitReceipt>;

/// Audit record of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: Uuid,
    pub operation: OperationTag,
    /// Zero on commit, otherwise the taxonomy code.
    pub result_code: u16,
    pub error: Option<ErrorCode>,
    pub acting_signers: Vec<Identity>,
    pub timestamp: Timestamp,
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeRecord {
    pub fn committed(receipt: &CommitReceipt) -> Self {
        Self {
            id: receipt.id,
            operation: receipt.operation,
            result_code: 0,
            error: None,
            acting_signers: receipt.signers.clone(),
            timestamp: receipt.committed_at,
            recorded_at: to_datetime(receipt.committed_at),
        }
    }

    /// `signers` are the identities the submission claimed, verified or not.
    pub fn rejected(
        operation: OperationTag,
        signers: Vec<Identity>,
        error: &WalletError,
        now: Timestamp,
    ) -> Self {
        let code = error.code();
        Self {
            id: Uuid::new_v4(),
            operation,
            result_code: code.as_u16(),
            error: Some(code),
            acting_signers: signers,
            timestamp: now,
            recorded_at: to_datetime(now),
        }
    }

    pub fn is_commit(&self) -> bool {
        self.result_code == 0
    }
}

fn to_datetime(timestamp: Timestamp) -> DateTime<Utc> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_default()
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

/// Receives every outcome record.
pub trait OutcomeSink: Send + Sync {
    fn record(&self, record: &OutcomeRecord);
}

/// Logs outcome records through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutcomeSink for TracingSink {
    fn record(&self, record: &OutcomeRecord) {
        if record.is_commit() {
            info!(
                id = %record.id,
                operation = %record.operation,
                signers = record.acting_signers.len(),
                timestamp = record.timestamp,
                "operation committed"
            );
        } else {
            warn!(
                id = %record.id,
                operation = %record.operation,
                code = record.result_code,
                timestamp = record.timestamp,
                "operation rejected"
            );
        }
    }
}

/// Keeps outcome records in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<OutcomeRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records.lock().clone()
    }

    pub fn last(&self) -> Option<OutcomeRecord> {
        self.records.lock().last().cloned()
    }
}

impl OutcomeSink for MemorySink {
    fn record(&self, record: &OutcomeRecord) {
        self.records.lock().push(record.clone());
    }
}
