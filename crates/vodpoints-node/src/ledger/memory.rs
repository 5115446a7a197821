//! In-memory ledger. Nothing survives a restart.

use super::{Ledger, LedgerState, UserRecord};
use crate::error::{Error, Result};
use std::sync::{Mutex, MutexGuard};

/// Ledger held entirely in memory behind a mutex.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state.
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| Error::Storage("ledger lock poisoned".into()))
    }
}

impl Ledger for MemoryLedger {
    fn load(&self) -> Result<LedgerState> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        *self.lock()? = state.clone();
        Ok(())
    }

    fn has_submitted(&self, user_id: &str, video_id: &str) -> Result<bool> {
        Ok(self.lock()?.has_submitted(user_id, video_id))
    }

    fn commit(&self, user_id: &str, video_id: &str, points: u64) -> Result<u64> {
        Ok(self.lock()?.apply_commit(user_id, video_id, points))
    }

    fn user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.lock()?.users.get(user_id).cloned())
    }
}
