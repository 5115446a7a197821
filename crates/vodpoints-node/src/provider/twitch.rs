//! Twitch Helix video lookup.
//!
//! Uses an app access token from the client-credentials grant. The token is
//! cached until shortly before it expires and dropped on any 401.

use super::{ProviderError, VideoMetadata, VideoMetadataProvider};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Refresh the token this long before Twitch says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Configuration for the Twitch provider.
#[derive(Clone)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Helix base URL (default: https://api.twitch.tv)
    pub api_url: String,
    /// OAuth base URL (default: https://id.twitch.tv)
    pub auth_url: String,
    /// Timeout for each HTTP request (default: 10 seconds)
    pub request_timeout: Duration,
}

impl TwitchConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_url: "https://api.twitch.tv".to_string(),
            auth_url: "https://id.twitch.tv".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl fmt::Debug for TwitchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitchConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

struct AppToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct VideosResponse {
    data: Vec<HelixVideo>,
}

#[derive(Deserialize)]
struct HelixVideo {
    id: String,
    view_count: u64,
    duration: String,
}

/// Helix-backed [`VideoMetadataProvider`].
pub struct TwitchProvider {
    config: TwitchConfig,
    http_client: reqwest::Client,
    token: Mutex<Option<AppToken>>,
}

impl TwitchProvider {
    pub fn new(config: TwitchConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("vodpoints-node/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
            token: Mutex::new(None),
        }
    }

    /// Cached app token, fetching a fresh one when missing or near expiry.
    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref() {
            if cached.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *token = Some(fresh);
        Ok(access_token)
    }

    async fn fetch_token(&self) -> Result<AppToken, ProviderError> {
        debug!("Requesting Twitch app access token");
        let response = self
            .http_client
            .post(format!("{}/oauth2/token", self.config.auth_url))
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Auth(format!(
                "token request returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(AppToken {
            access_token: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl VideoMetadataProvider for TwitchProvider {
    async fn lookup(&self, video_id: &str) -> Result<Option<VideoMetadata>, ProviderError> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(format!("{}/helix/videos", self.config.api_url))
            .query(&[("id", video_id)])
            .header("Client-ID", self.config.client_id.as_str())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED => {
                self.invalidate_token().await;
                return Err(ProviderError::Auth("video request unauthorized".into()));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let reset_at = response
                    .headers()
                    .get("Ratelimit-Reset")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                warn!(video_id = %video_id, ?reset_at, "Twitch rate limit hit");
                return Err(ProviderError::RateLimited { reset_at });
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
        }

        let body: VideosResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(body.data.into_iter().next().map(|video| VideoMetadata {
            id: video.id,
            view_count: video.view_count,
            duration: video.duration,
        }))
    }
}
