//! Shared async handle
//!
//! Callers on different tasks submit through a `WalletHandle`; submissions
//! are executed one at a time in lock-acquisition order.

use std::sync::Arc;

use tokio::sync::Mutex;
use warden_types::{Identity, MessageHash, Result, Timestamp};

use crate::{AuthorizationEngine, AuthorizationOutcome, GuardianChange, InitParams, Submission, Wallet};

#[derive(Clone)]
pub struct WalletHandle {
    inner: Arc<Mutex<AuthorizationEngine>>,
}

impl WalletHandle {
    pub fn new(engine: AuthorizationEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn initialize(&self, params: InitParams, now: Timestamp) -> Result<()> {
        self.inner.lock().await.initialize(params, now)
    }

    pub async fn submit(&self, submission: Submission, now: Timestamp) -> AuthorizationOutcome {
        self.inner.lock().await.submit(submission, now)
    }

    pub async fn tick(&self, now: Timestamp) -> Result<Vec<(Identity, GuardianChange)>> {
        self.inner.lock().await.tick(now)
    }

    pub async fn signing_hash(&self, submission: &Submission) -> Result<MessageHash> {
        self.inner.lock().await.signing_hash(submission)
    }

    /// Copy of the current wallet state, if initialized.
    pub async fn snapshot(&self) -> Option<Wallet> {
        self.inner.lock().await.wallet().cloned()
    }
}

impl std::fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletHandle").finish_non_exhaustive()
    }
}
