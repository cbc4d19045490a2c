//! Rolling spending quota
//!
//! A limit of zero means "unlimited". Tightening the limit applies at once;
//! loosening it waits out the pending period.

use serde::{Deserialize, Serialize};
use tracing::debug;
use warden_types::{Amount, Result, Timestamp, WalletError};

use crate::{PendingChange, PendingOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaManager {
    limit: Amount,
    pending: Option<PendingChange<Amount>>,
    consumed: Amount,
    period_start: Timestamp,
    period: Timestamp,
}

impl QuotaManager {
    pub fn new(limit: Amount, period: Timestamp, now: Timestamp) -> Self {
        Self {
            limit,
            pending: None,
            consumed: 0,
            period_start: now,
            period,
        }
    }

    pub fn limit(&self) -> Amount {
        self.limit
    }

    pub fn pending(&self) -> Option<&PendingChange<Amount>> {
        self.pending.as_ref()
    }

    pub fn consumed(&self) -> Amount {
        self.consumed
    }

    pub fn period_start(&self) -> Timestamp {
        self.period_start
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == 0
    }

    /// Remaining spend in the current period. `Amount::MAX` when unlimited.
    pub fn available(&self) -> Amount {
        if self.is_unlimited() {
            Amount::MAX
        } else {
            self.limit.saturating_sub(self.consumed)
        }
    }

    fn is_tightening(&self, new_limit: Amount) -> bool {
        new_limit != 0 && (self.limit == 0 || new_limit < self.limit)
    }

    /// Propose a new limit.
    ///
    /// Re-proposing the current limit while a change is pending withdraws
    /// that change.
    pub fn propose_limit(
        &mut self,
        new_limit: Amount,
        now: Timestamp,
        delay: Timestamp,
        max_quota: Amount,
    ) -> Result<PendingOutcome> {
        self.tick(now);

        if new_limit > max_quota {
            return Err(WalletError::InvalidQuota { requested: new_limit });
        }
        if self.pending.map(|p| p.value) == Some(new_limit) {
            return Err(WalletError::InvalidQuota { requested: new_limit });
        }
        if new_limit == self.limit {
            return match self.pending.take() {
                Some(_) => Ok(PendingOutcome::Superseded),
                None => Err(WalletError::InvalidQuota { requested: new_limit }),
            };
        }

        let effective_at = if self.is_tightening(new_limit) {
            now
        } else {
            now.saturating_add(delay)
        };
        self.pending = Some(PendingChange::new(new_limit, effective_at));
        self.tick(now);
        Ok(PendingOutcome::Scheduled { effective_at })
    }

    /// Activate a due limit and roll the spending period forward.
    pub fn tick(&mut self, now: Timestamp) {
        if let Some(pending) = self.pending {
            if pending.is_due(now) {
                self.limit = pending.value;
                self.pending = None;
                if self.limit != 0 {
                    self.consumed = self.consumed.min(self.limit);
                }
                debug!(limit = self.limit, "quota limit activated");
            }
        }

        if self.period > 0 && now >= self.period_start.saturating_add(self.period) {
            let elapsed = now - self.period_start;
            self.period_start = now - elapsed % self.period;
            self.consumed = 0;
        }
    }

    /// Count `amount` against the current period.
    pub fn reserve(&mut self, amount: Amount, now: Timestamp) -> Result<()> {
        self.tick(now);
        if self.is_unlimited() {
            return Ok(());
        }

        let available = self.available();
        match self.consumed.checked_add(amount) {
            Some(total) if total <= self.limit => {
                self.consumed = total;
                Ok(())
            }
            _ => Err(WalletError::QuotaExceeded {
                requested: amount,
                available,
            }),
        }
    }

    /// Return a reservation whose call did not go through.
    pub fn refund(&mut self, amount: Amount) {
        self.consumed = self.consumed.saturating_sub(amount);
    }
}
