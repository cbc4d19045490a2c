//! Time-locked pending changes

use serde::{Deserialize, Serialize};
use warden_types::Timestamp;

/// A change that becomes effective once `effective_at` is reached.
///
/// Pending changes are applied by an explicit `tick(now)`; nothing fires on a
/// timer. They are cancelled only by an explicit superseding call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange<T> {
    pub value: T,
    pub effective_at: Timestamp,
}

impl<T> PendingChange<T> {
    pub fn new(value: T, effective_at: Timestamp) -> Self {
        Self { value, effective_at }
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        now >= self.effective_at
    }
}

/// Result of proposing a time-locked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingOutcome {
    /// A new pending change was recorded.
    Scheduled { effective_at: Timestamp },
    /// The proposal reversed an earlier pending change for the same slot.
    Superseded,
}
