//! Video metadata providers.
//!
//! The workflow only needs view count and duration for a video id. A lookup
//! either finds the video, reports it missing (`Ok(None)`), or fails at the
//! provider layer with a [`ProviderError`].

mod twitch;

pub use twitch::{TwitchConfig, TwitchProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Metadata for one video as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub view_count: u64,
    /// Compact duration such as `5h20m3s`.
    pub duration: String,
}

/// Failures of the provider call itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Credentials rejected or token request failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// Provider asked us to back off. `reset_at` is a unix timestamp.
    #[error("rate limited by provider (reset at {reset_at:?})")]
    RateLimited { reset_at: Option<u64> },

    /// Any other non-success status.
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("invalid provider response: {0}")]
    Decode(String),
}

/// Source of video metadata.
#[async_trait]
pub trait VideoMetadataProvider: Send + Sync {
    /// Look up a video. `Ok(None)` means the provider has no such video.
    async fn lookup(&self, video_id: &str) -> Result<Option<VideoMetadata>, ProviderError>;
}

/// Provider answering from a fixed table. Counts lookups.
#[derive(Default)]
pub struct StaticProvider {
    videos: HashMap<String, Result<VideoMetadata, ProviderError>>,
    lookups: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer lookups for `video.id` with `video`.
    pub fn with_video(mut self, video: VideoMetadata) -> Self {
        self.videos.insert(video.id.clone(), Ok(video));
        self
    }

    /// Fail lookups for `video_id` with `error`.
    pub fn with_error(mut self, video_id: &str, error: ProviderError) -> Self {
        self.videos.insert(video_id.to_string(), Err(error));
        self
    }

    /// Number of lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoMetadataProvider for StaticProvider {
    async fn lookup(&self, video_id: &str) -> Result<Option<VideoMetadata>, ProviderError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.videos.get(video_id).cloned().transpose()
    }
}
