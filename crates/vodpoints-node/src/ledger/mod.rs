//! Per-user points ledger.
//!
//! One entry per user: accumulated points plus every video id already
//! counted for them. Persisted layout:
//!
//! ```json
//! { "users": { "<userId>": { "points": 17, "vods": ["2245879631"] } } }
//! ```
//!
//! Backends serialize their own read-modify-write, so commits from
//! different users never overwrite each other. Duplicate rejection is the
//! caller's job: check [`Ledger::has_submitted`] and [`Ledger::commit`]
//! under the same per-user lock (see `workflow`).

mod file;
mod memory;
#[cfg(feature = "rocksdb")]
mod rocks;

pub use file::JsonFileLedger;
pub use memory::MemoryLedger;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksLedger;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Points and counted VODs for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Accumulated points. Only ever increases.
    pub points: u64,

    /// Video ids already counted, in submission order. Never shrinks.
    #[serde(default)]
    pub vods: Vec<String>,
}

impl UserRecord {
    pub fn has_vod(&self, video_id: &str) -> bool {
        self.vods.iter().any(|v| v == video_id)
    }
}

/// Whole ledger contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
}

impl LedgerState {
    /// True iff `video_id` was already counted for `user_id`.
    pub fn has_submitted(&self, user_id: &str, video_id: &str) -> bool {
        self.users
            .get(user_id)
            .is_some_and(|user| user.has_vod(video_id))
    }

    /// Record `video_id` for `user_id` and add `points`. Returns the new total.
    ///
    /// Does not check for duplicates.
    pub fn apply_commit(&mut self, user_id: &str, video_id: &str, points: u64) -> u64 {
        let user = self.users.entry(user_id.to_string()).or_default();
        user.vods.push(video_id.to_string());
        user.points = user.points.saturating_add(points);
        user.points
    }

    /// Users ordered by points (highest first), ties broken by id.
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .users
            .iter()
            .map(|(user_id, user)| LeaderboardEntry {
                user_id: user_id.clone(),
                points: user.points,
                vod_count: user.vods.len(),
            })
            .collect();
        entries.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.user_id.cmp(&b.user_id)));
        entries.truncate(limit);
        entries
    }
}

/// A row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub points: u64,
    pub vod_count: usize,
}

/// Durable store of per-user points.
pub trait Ledger: Send + Sync {
    /// Current persisted state. Materializes an empty ledger if none exists.
    fn load(&self) -> Result<LedgerState>;

    /// Replace the whole persisted state.
    fn save(&self, state: &LedgerState) -> Result<()>;

    /// True iff `video_id` was already counted for `user_id`.
    fn has_submitted(&self, user_id: &str, video_id: &str) -> Result<bool>;

    /// Add `video_id` to the user's counted set, add `points` and persist.
    ///
    /// The caller must have seen `has_submitted` return false while holding
    /// the user's submission lock. Returns the user's new total.
    fn commit(&self, user_id: &str, video_id: &str, points: u64) -> Result<u64>;

    /// A single user's record.
    fn user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.load()?.users.remove(user_id))
    }

    /// Top `limit` users by points.
    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        Ok(self.load()?.leaderboard(limit))
    }
}
