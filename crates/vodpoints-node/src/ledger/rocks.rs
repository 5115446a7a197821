//! RocksDB-backed ledger with one key per user.
//!
//! Keys are `user:<id>`, values the JSON [`UserRecord`]. A commit is a
//! read-modify-write of a single key, serialized by `write_lock`.

use super::{Ledger, LedgerState, UserRecord};
use crate::error::{Error, Result};
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Mutex;

const USER_PREFIX: &str = "user:";

/// Ledger stored in RocksDB.
pub struct RocksLedger {
    db: DB,
    write_lock: Mutex<()>,
}

impl RocksLedger {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn user_key(user_id: &str) -> String {
        format!("{}{}", USER_PREFIX, user_id)
    }

    fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        match self.db.get(Self::user_key(user_id).as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn list_user_ids(&self) -> Result<Vec<String>> {
        let prefix = USER_PREFIX.as_bytes();
        let mut ids = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let key_str = String::from_utf8_lossy(&key);
            if let Some(id) = key_str.strip_prefix(USER_PREFIX) {
                ids.push(id.to_string());
            }
        }

        Ok(ids)
    }
}

impl Ledger for RocksLedger {
    fn load(&self) -> Result<LedgerState> {
        let prefix = USER_PREFIX.as_bytes();
        let mut state = LedgerState::default();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let key_str = String::from_utf8_lossy(&key);
            if let Some(id) = key_str.strip_prefix(USER_PREFIX) {
                state
                    .users
                    .insert(id.to_string(), serde_json::from_slice(&value)?);
            }
        }

        Ok(state)
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Storage("ledger lock poisoned".into()))?;

        let mut batch = WriteBatch::default();
        for id in self.list_user_ids()? {
            if !state.users.contains_key(&id) {
                batch.delete(Self::user_key(&id).as_bytes());
            }
        }
        for (id, user) in &state.users {
            batch.put(Self::user_key(id).as_bytes(), serde_json::to_vec(user)?);
        }
        self.db.write(batch)?;
        Ok(())
    }

    fn has_submitted(&self, user_id: &str, video_id: &str) -> Result<bool> {
        Ok(self
            .get_user(user_id)?
            .is_some_and(|user| user.has_vod(video_id)))
    }

    fn commit(&self, user_id: &str, video_id: &str, points: u64) -> Result<u64> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Storage("ledger lock poisoned".into()))?;

        let mut user = self.get_user(user_id)?.unwrap_or_default();
        user.vods.push(video_id.to_string());
        user.points = user.points.saturating_add(points);
        self.db
            .put(Self::user_key(user_id).as_bytes(), serde_json::to_vec(&user)?)?;
        tracing::debug!(user_id = %user_id, video_id = %video_id, points, total = user.points, "Committed to rocksdb ledger");
        Ok(user.points)
    }

    fn user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        self.get_user(user_id)
    }
}
