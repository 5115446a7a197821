//! VOD submission workflow.
//!
//! Stages run strictly in order:
//!
//! ```text
//! Validating → CheckingDuplicate → FetchingMetadata → Scoring → Committing → Done
//! ```
//!
//! Any stage may fail, which ends the submission without touching the
//! ledger. The duplicate check runs before the provider call so known
//! duplicates never cost a network round trip.
//!
//! The user's submission lock is held from the duplicate check through the
//! commit. Two submissions of the same VOD by the same user can therefore
//! never both pass the check, while different users proceed in parallel.

use crate::ledger::Ledger;
use crate::provider::{ProviderError, VideoMetadataProvider};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};
use vodpoints_scoring::{parse_reference, total_score, whole_hours, ReferenceError};

/// Stage of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStage {
    Validating,
    CheckingDuplicate,
    FetchingMetadata,
    Scoring,
    Committing,
    Done,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A request to credit a VOD to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub user_id: String,
    pub raw_reference: String,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub video_id: String,
    pub view_count: u64,
    /// Whole hours only; minutes and seconds are dropped.
    pub duration_hours: u64,
    pub hours_points: u64,
    pub views_points: u64,
    pub points_awarded: u64,
    pub total_points_after: u64,
}

/// Failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionErrorKind {
    InvalidLinkFormat,
    DuplicateSubmission,
    VideoNotFound,
    ProviderError,
    Storage,
}

/// Why a submission failed. The ledger is unchanged in every case.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("invalid video link: {0}")]
    InvalidLinkFormat(#[from] ReferenceError),

    #[error("video {video_id} was already counted for this user")]
    DuplicateSubmission { video_id: String },

    #[error("video {video_id} not found")]
    VideoNotFound { video_id: String },

    #[error("video provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("ledger error during {stage}: {source}")]
    Storage {
        stage: SubmissionStage,
        #[source]
        source: crate::error::Error,
    },
}

impl SubmissionError {
    pub fn kind(&self) -> SubmissionErrorKind {
        match self {
            SubmissionError::InvalidLinkFormat(_) => SubmissionErrorKind::InvalidLinkFormat,
            SubmissionError::DuplicateSubmission { .. } => SubmissionErrorKind::DuplicateSubmission,
            SubmissionError::VideoNotFound { .. } => SubmissionErrorKind::VideoNotFound,
            SubmissionError::Provider(_) => SubmissionErrorKind::ProviderError,
            SubmissionError::Storage { .. } => SubmissionErrorKind::Storage,
        }
    }

    /// Stage at which the submission failed.
    pub fn stage(&self) -> SubmissionStage {
        match self {
            SubmissionError::InvalidLinkFormat(_) => SubmissionStage::Validating,
            SubmissionError::DuplicateSubmission { .. } => SubmissionStage::CheckingDuplicate,
            SubmissionError::VideoNotFound { .. } | SubmissionError::Provider(_) => {
                SubmissionStage::FetchingMetadata
            }
            SubmissionError::Storage { stage, .. } => *stage,
        }
    }
}

/// Drives submissions against a ledger and a metadata provider.
pub struct SubmissionWorkflow {
    ledger: Arc<dyn Ledger>,
    provider: Arc<dyn VideoMetadataProvider>,
    user_locks: UserLocks,
}

impl SubmissionWorkflow {
    pub fn new(ledger: Arc<dyn Ledger>, provider: Arc<dyn VideoMetadataProvider>) -> Self {
        Self {
            ledger,
            provider,
            user_locks: UserLocks::default(),
        }
    }

    /// The ledger this workflow commits to.
    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Submit a VOD reference on behalf of `user_id`.
    pub async fn submit(
        &self,
        user_id: &str,
        raw_reference: &str,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let result = self.run(user_id, raw_reference).await;
        match &result {
            Ok(receipt) => info!(
                user_id = %user_id,
                video_id = %receipt.video_id,
                points = receipt.points_awarded,
                total = receipt.total_points_after,
                "VOD counted"
            ),
            Err(e) => warn!(
                user_id = %user_id,
                kind = ?e.kind(),
                stage = %e.stage(),
                "VOD submission rejected: {}",
                e
            ),
        }
        result
    }

    /// Submit a [`SubmissionRequest`].
    pub async fn handle(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.submit(&request.user_id, &request.raw_reference).await
    }

    async fn run(
        &self,
        user_id: &str,
        raw_reference: &str,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        debug!(user_id = %user_id, stage = %SubmissionStage::Validating, "Submission stage");
        let video_id = parse_reference(raw_reference)?;

        let _user_guard = self.user_locks.acquire(user_id).await;

        debug!(user_id = %user_id, video_id = %video_id, stage = %SubmissionStage::CheckingDuplicate, "Submission stage");
        let already = self
            .ledger
            .has_submitted(user_id, video_id.as_str())
            .map_err(|source| SubmissionError::Storage {
                stage: SubmissionStage::CheckingDuplicate,
                source,
            })?;
        if already {
            return Err(SubmissionError::DuplicateSubmission {
                video_id: video_id.into_inner(),
            });
        }

        debug!(user_id = %user_id, video_id = %video_id, stage = %SubmissionStage::FetchingMetadata, "Submission stage");
        let Some(video) = self.provider.lookup(video_id.as_str()).await? else {
            return Err(SubmissionError::VideoNotFound {
                video_id: video_id.into_inner(),
            });
        };

        debug!(user_id = %user_id, video_id = %video_id, stage = %SubmissionStage::Scoring, "Submission stage");
        let duration_hours = whole_hours(&video.duration);
        let score = total_score(duration_hours, video.view_count);
        let points_awarded = score.total();

        debug!(user_id = %user_id, video_id = %video_id, points_awarded, stage = %SubmissionStage::Committing, "Submission stage");
        let total_points_after = self
            .ledger
            .commit(user_id, video_id.as_str(), points_awarded)
            .map_err(|source| SubmissionError::Storage {
                stage: SubmissionStage::Committing,
                source,
            })?;

        debug!(user_id = %user_id, video_id = %video_id, stage = %SubmissionStage::Done, "Submission stage");
        Ok(SubmissionReceipt {
            video_id: video_id.into_inner(),
            view_count: video.view_count,
            duration_hours,
            hours_points: score.hours_points,
            views_points: score.views_points,
            points_awarded,
            total_points_after,
        })
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.user_locks.len()
    }
}

/// One async lock per user id, dropped from the map once nobody holds or
/// waits on it.
#[derive(Default)]
struct UserLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: &str) -> UserGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        UserGuard {
            locks: self,
            user_id: user_id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

struct UserGuard<'a> {
    locks: &'a UserLocks,
    user_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map and this guard still reference the lock.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{JsonFileLedger, LedgerState, MemoryLedger};
    use crate::provider::{StaticProvider, VideoMetadata};
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::tempdir;

    fn video(id: &str, view_count: u64, duration: &str) -> VideoMetadata {
        VideoMetadata {
            id: id.to_string(),
            view_count,
            duration: duration.to_string(),
        }
    }

    fn link(id: &str) -> String {
        format!("https://www.twitch.tv/videos/{}", id)
    }

    fn workflow_with(
        ledger: Arc<dyn Ledger>,
        provider: StaticProvider,
    ) -> (SubmissionWorkflow, Arc<StaticProvider>) {
        let provider = Arc::new(provider);
        let workflow = SubmissionWorkflow::new(ledger, provider.clone());
        (workflow, provider)
    }

    fn scenario_provider() -> StaticProvider {
        StaticProvider::new()
            .with_video(video("100", 1200, "5h20m"))
            .with_video(video("200", 50, "59m"))
            .with_video(video("300", 5000, "25h"))
    }

    #[tokio::test]
    async fn scenario_five_hours_1200_views() {
        let (workflow, _) = workflow_with(Arc::new(MemoryLedger::new()), scenario_provider());

        let receipt = workflow.submit("u", &link("100")).await.unwrap();
        assert_eq!(
            receipt,
            SubmissionReceipt {
                video_id: "100".into(),
                view_count: 1200,
                duration_hours: 5,
                hours_points: 5,
                views_points: 12,
                points_awarded: 17,
                total_points_after: 17,
            }
        );
    }

    #[tokio::test]
    async fn scenario_under_an_hour() {
        let (workflow, _) = workflow_with(Arc::new(MemoryLedger::new()), scenario_provider());

        let receipt = workflow.submit("u", &link("200")).await.unwrap();
        assert_eq!(receipt.duration_hours, 0);
        assert_eq!(receipt.hours_points, 0);
        assert_eq!(receipt.views_points, 2);
        assert_eq!(receipt.points_awarded, 2);
    }

    #[tokio::test]
    async fn scenario_saturated() {
        let (workflow, _) = workflow_with(Arc::new(MemoryLedger::new()), scenario_provider());

        let receipt = workflow.submit("u", &link("300")).await.unwrap();
        assert_eq!(receipt.hours_points, 20);
        assert_eq!(receipt.views_points, 36);
        assert_eq!(receipt.points_awarded, 56);
    }

    #[tokio::test]
    async fn totals_accumulate() {
        let (workflow, _) = workflow_with(Arc::new(MemoryLedger::new()), scenario_provider());

        workflow.submit("u", &link("100")).await.unwrap();
        workflow.submit("u", &link("200")).await.unwrap();
        let receipt = workflow.submit("u", &link("300")).await.unwrap();
        assert_eq!(receipt.total_points_after, 17 + 2 + 56);
    }

    #[tokio::test]
    async fn invalid_link_touches_nothing() {
        let ledger = Arc::new(MemoryLedger::new());
        let (workflow, provider) = workflow_with(ledger.clone(), scenario_provider());

        let err = workflow
            .submit("u", "https://www.twitch.tv/somechannel")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), SubmissionErrorKind::InvalidLinkFormat);
        assert_eq!(err.stage(), SubmissionStage::Validating);
        assert_eq!(provider.lookups(), 0);
        assert_eq!(ledger.load().unwrap(), LedgerState::default());
    }

    #[tokio::test]
    async fn resubmission_is_rejected_before_lookup() {
        let ledger = Arc::new(MemoryLedger::new());
        let (workflow, provider) = workflow_with(ledger.clone(), scenario_provider());

        workflow.submit("u", &link("100")).await.unwrap();
        assert_eq!(provider.lookups(), 1);

        let err = workflow
            .submit("u", "twitch.tv/videos/100?t=5m")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), SubmissionErrorKind::DuplicateSubmission);
        assert_eq!(err.stage(), SubmissionStage::CheckingDuplicate);
        assert_eq!(provider.lookups(), 1);
        assert_eq!(ledger.user("u").unwrap().unwrap().points, 17);
    }

    #[tokio::test]
    async fn same_video_counts_for_each_user() {
        let (workflow, _) = workflow_with(Arc::new(MemoryLedger::new()), scenario_provider());

        workflow.submit("alice", &link("100")).await.unwrap();
        let receipt = workflow.submit("bob", &link("100")).await.unwrap();
        assert_eq!(receipt.total_points_after, 17);
    }

    #[tokio::test]
    async fn missing_video() {
        let ledger = Arc::new(MemoryLedger::new());
        let (workflow, _) = workflow_with(ledger.clone(), scenario_provider());

        let err = workflow.submit("u", &link("404")).await.unwrap_err();
        assert_eq!(err.kind(), SubmissionErrorKind::VideoNotFound);
        assert!(matches!(err, SubmissionError::VideoNotFound { ref video_id } if video_id == "404"));
        assert!(ledger.user("u").unwrap().is_none());
    }

    #[tokio::test]
    async fn provider_failure_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let ledger = Arc::new(JsonFileLedger::open(&path).unwrap());
        ledger.commit("u", "1", 4).unwrap();
        let bytes_before = std::fs::read(&path).unwrap();

        let provider = scenario_provider().with_error(
            "500",
            ProviderError::RateLimited {
                reset_at: Some(1_700_000_000),
            },
        );
        let (workflow, _) = workflow_with(ledger, provider);

        let err = workflow.submit("u", &link("500")).await.unwrap_err();
        assert_eq!(err.kind(), SubmissionErrorKind::ProviderError);
        assert_eq!(err.stage(), SubmissionStage::FetchingMetadata);
        assert!(err.to_string().contains("rate limited"));

        let err = workflow.submit("u", &link("404")).await.unwrap_err();
        assert_eq!(err.kind(), SubmissionErrorKind::VideoNotFound);

        assert_eq!(std::fs::read(&path).unwrap(), bytes_before);
    }

    #[tokio::test]
    async fn failed_submission_can_be_retried() {
        let ledger = Arc::new(MemoryLedger::new());
        let (failing, _) = workflow_with(
            ledger.clone(),
            StaticProvider::new().with_error("100", ProviderError::Network("reset".into())),
        );
        assert!(failing.submit("u", &link("100")).await.is_err());

        let (working, _) = workflow_with(ledger, scenario_provider());
        assert_eq!(
            working.submit("u", &link("100")).await.unwrap().total_points_after,
            17
        );
    }

    /// Provider that yields before answering so submissions interleave.
    struct SlowProvider {
        inner: StaticProvider,
    }

    #[async_trait]
    impl VideoMetadataProvider for SlowProvider {
        async fn lookup(&self, video_id: &str) -> Result<Option<VideoMetadata>, ProviderError> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.inner.lookup(video_id).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_count_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let ledger = Arc::new(JsonFileLedger::open(&path).unwrap());
        let provider = Arc::new(SlowProvider {
            inner: scenario_provider(),
        });
        let workflow = Arc::new(SubmissionWorkflow::new(ledger.clone(), provider));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let workflow = Arc::clone(&workflow);
                tokio::spawn(async move { workflow.submit("u", &link("100")).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert_eq!(e.kind(), SubmissionErrorKind::DuplicateSubmission),
            }
        }

        assert_eq!(successes, 1);
        let user = JsonFileLedger::open(&path).unwrap().user("u").unwrap().unwrap();
        assert_eq!(user.points, 17);
        assert_eq!(user.vods, vec!["100"]);
        assert_eq!(workflow.tracked_users(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_users_all_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let ledger = Arc::new(JsonFileLedger::open(&path).unwrap());
        let provider = Arc::new(SlowProvider {
            inner: scenario_provider(),
        });
        let workflow = Arc::new(SubmissionWorkflow::new(ledger, provider));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let workflow = Arc::clone(&workflow);
                tokio::spawn(async move {
                    workflow
                        .submit(&format!("user{}", i), &link("300"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let state = JsonFileLedger::open(&path).unwrap().load().unwrap();
        assert_eq!(state.users.len(), 10);
        assert!(state.users.values().all(|u| u.points == 56));
    }

    #[tokio::test]
    async fn handle_request() {
        let (workflow, _) = workflow_with(Arc::new(MemoryLedger::new()), scenario_provider());
        let request: SubmissionRequest = serde_json::from_str(
            r#"{ "userId": "u", "rawReference": "https://www.twitch.tv/videos/200" }"#,
        )
        .unwrap();

        let receipt = workflow.handle(&request).await.unwrap();
        assert_eq!(receipt.points_awarded, 2);
    }
}
