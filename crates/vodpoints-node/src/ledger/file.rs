//! JSON file ledger.
//!
//! The whole state lives in one file. Every mutation is applied to a copy,
//! written to a sibling temp file, synced and renamed over the ledger, and
//! only then published in memory. A failed write leaves file and memory as
//! they were.

use super::{Ledger, LedgerState, UserRecord};
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Ledger stored as a single pretty-printed JSON file.
pub struct JsonFileLedger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl JsonFileLedger {
    /// Open the ledger at `path`, creating an empty one if the file is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let state = read_or_init(&path)?;
        tracing::debug!(path = ?path, users = state.users.len(), "Opened ledger file");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| Error::Storage("ledger lock poisoned".into()))
    }
}

impl Ledger for JsonFileLedger {
    fn load(&self) -> Result<LedgerState> {
        let mut state = self.lock()?;
        *state = read_or_init(&self.path)?;
        Ok(state.clone())
    }

    fn save(&self, new_state: &LedgerState) -> Result<()> {
        let mut state = self.lock()?;
        write_atomic(&self.path, new_state)?;
        *state = new_state.clone();
        Ok(())
    }

    fn has_submitted(&self, user_id: &str, video_id: &str) -> Result<bool> {
        Ok(self.lock()?.has_submitted(user_id, video_id))
    }

    fn commit(&self, user_id: &str, video_id: &str, points: u64) -> Result<u64> {
        let mut state = self.lock()?;
        let mut next = state.clone();
        let total = next.apply_commit(user_id, video_id, points);
        write_atomic(&self.path, &next)?;
        *state = next;
        tracing::debug!(user_id = %user_id, video_id = %video_id, points, total, "Committed to ledger file");
        Ok(total)
    }

    fn user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.lock()?.users.get(user_id).cloned())
    }
}

fn read_or_init(path: &Path) -> Result<LedgerState> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let state = LedgerState::default();
            write_atomic(path, &state)?;
            tracing::info!(path = ?path, "Created empty ledger");
            Ok(state)
        }
        Err(e) => Err(e.into()),
    }
}

fn write_atomic(path: &Path, state: &LedgerState) -> Result<()> {
    let json = serde_json::to_vec_pretty(state)?;

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| Error::Storage(format!("ledger path {:?} has no file name", path)))?;
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    {
        let mut file = File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
