//! HTTP API for the node.

use crate::ledger::{LeaderboardEntry, UserRecord};
use crate::node::NodeState;
use crate::workflow::{SubmissionError, SubmissionErrorKind, SubmissionReceipt, SubmissionRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

type AppState = Arc<NodeState>;

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health (at root and under /api/v1 for compatibility)
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        .route("/ready", get(ready))
        // Submissions
        .route("/api/v1/submissions", post(submit_vod))
        // Standings
        .route("/api/v1/users/:user_id", get(get_user))
        .route("/api/v1/leaderboard", get(leaderboard))
        .layer(cors)
        .with_state(state)
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "OK"
}

// --- Submission endpoints ---

/// Failure body for a rejected submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionFailure {
    pub kind: SubmissionErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            SubmissionErrorKind::InvalidLinkFormat => StatusCode::BAD_REQUEST,
            SubmissionErrorKind::DuplicateSubmission => StatusCode::CONFLICT,
            SubmissionErrorKind::VideoNotFound => StatusCode::NOT_FOUND,
            SubmissionErrorKind::ProviderError => StatusCode::BAD_GATEWAY,
            SubmissionErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = SubmissionFailure {
            kind: self.kind(),
            detail: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

async fn submit_vod(
    State(state): State<AppState>,
    Json(req): Json<SubmissionRequest>,
) -> Result<Json<SubmissionReceipt>, SubmissionError> {
    let receipt = state.workflow.handle(&req).await?;
    Ok(Json(receipt))
}

// --- Standings endpoints ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserView {
    user_id: String,
    points: u64,
    vods: Vec<String>,
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserView>, StatusCode> {
    match state.ledger().user(&user_id) {
        Ok(Some(UserRecord { points, vods })) => Ok(Json(UserView {
            user_id,
            points,
            vods,
        })),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to read user {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, StatusCode> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .min(MAX_LEADERBOARD_LIMIT);
    let entries = state.ledger().leaderboard(limit).map_err(|e| {
        tracing::error!("Failed to build leaderboard: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::provider::{ProviderError, StaticProvider, VideoMetadata};
    use crate::workflow::SubmissionWorkflow;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        let provider = StaticProvider::new()
            .with_video(VideoMetadata {
                id: "100".into(),
                view_count: 1200,
                duration: "5h20m".into(),
            })
            .with_video(VideoMetadata {
                id: "300".into(),
                view_count: 5000,
                duration: "25h".into(),
            })
            .with_error("500", ProviderError::Auth("bad client secret".into()));
        let workflow = SubmissionWorkflow::new(Arc::new(MemoryLedger::new()), Arc::new(provider));
        build_router(Arc::new(NodeState::new(workflow)))
    }

    fn submission(user_id: &str, reference: &str) -> Request<Body> {
        let body = serde_json::json!({ "userId": user_id, "rawReference": reference });
        Request::post("/api/v1/submissions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health() {
        let app = app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn submit_success() {
        let app = app();
        let (status, body) = send(&app, submission("u", "https://www.twitch.tv/videos/100")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["viewCount"], 1200);
        assert_eq!(body["durationHours"], 5);
        assert_eq!(body["pointsAwarded"], 17);
        assert_eq!(body["totalPointsAfter"], 17);
    }

    #[tokio::test]
    async fn submit_failures_map_to_status() {
        let app = app();
        send(&app, submission("u", "https://www.twitch.tv/videos/100")).await;

        let cases = [
            ("https://www.twitch.tv/somechannel", StatusCode::BAD_REQUEST, "InvalidLinkFormat"),
            ("https://www.twitch.tv/videos/100", StatusCode::CONFLICT, "DuplicateSubmission"),
            ("https://www.twitch.tv/videos/404", StatusCode::NOT_FOUND, "VideoNotFound"),
            ("https://www.twitch.tv/videos/500", StatusCode::BAD_GATEWAY, "ProviderError"),
        ];

        for (reference, expected_status, expected_kind) in cases {
            let (status, body) = send(&app, submission("u", reference)).await;
            assert_eq!(status, expected_status, "status for {}", reference);
            assert_eq!(body["kind"], expected_kind, "kind for {}", reference);
            assert!(body["detail"].is_string());
        }

        let (_, body) = send(&app, submission("u", "https://www.twitch.tv/videos/500")).await;
        assert!(body["detail"].as_str().unwrap().contains("bad client secret"));
    }

    #[tokio::test]
    async fn user_and_leaderboard() {
        let app = app();
        send(&app, submission("alice", "https://www.twitch.tv/videos/100")).await;
        send(&app, submission("bob", "https://www.twitch.tv/videos/300")).await;
        send(&app, submission("bob", "https://www.twitch.tv/videos/100")).await;

        let (status, body) = send(
            &app,
            Request::get("/api/v1/users/bob").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points"], 73);
        assert_eq!(body["vods"], serde_json::json!(["300", "100"]));

        let (status, _) = send(
            &app,
            Request::get("/api/v1/users/nobody").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Request::get("/api/v1/leaderboard?limit=1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!([{ "userId": "bob", "points": 73, "vodCount": 2 }])
        );
    }
}
