//! Relay - small HTTP service behind the mentor web front end
//!
//! - `GET /api/health`: liveness
//! - `POST /api/chat`: one-shot mentor reply (OpenAI when configured, canned otherwise)
//! - `POST /api/feedback`: append user feedback to a JSON file

pub mod feedback;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use providers::OpenAIClient;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::feedback::{append_feedback, FeedbackEntry, FeedbackRequest, FEEDBACK_FILE};

pub const HEALTH_ENDPOINT: &str = "/api/health";
pub const CHAT_ENDPOINT: &str = "/api/chat";
pub const FEEDBACK_ENDPOINT: &str = "/api/feedback";

pub const RELAY_SYSTEM_PROMPT: &str = "You are an AI learning mentor for an educational platform focused on skills-based and inquiry-driven learning. Help students explore concepts deeply, ask probing questions, and connect ideas across disciplines. Encourage critical thinking and real-world applications.";

pub const DEMO_RESPONSES: [&str; 7] = [
    "That's an interesting question! Let me help you think about this differently. What do you think might be the underlying causes or connections here?",
    "I'd love to explore that concept with you. Can you tell me what you already know about this topic, and what aspects intrigue you most?",
    "Great thinking! This reminds me of similar patterns in other fields. How might this principle apply to real-world situations you've encountered?",
    "Let's dig deeper into this. What questions come to mind when you consider the 'why' behind what you're learning?",
    "That's a valuable insight. How might you test or verify this understanding? What evidence would support or challenge this idea?",
    "I notice you're exploring complex ideas. What connections can you draw between this concept and other subjects you've studied?",
    "Excellent curiosity! Instead of just accepting this information, what critical questions might a researcher ask about this topic?",
];

pub const DEMO_NOTE: &str =
    " (Note: This is a demo response. For full AI capabilities, configure your OpenAI API key.)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub data_dir: PathBuf,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            port: 3000,
            openai_api_key: None,
            openai_base_url: None,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl RelaySettings {
    /// `PORT`, `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `RELAY_DATA_DIR`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        let port = match non_blank("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid PORT '{raw}': expected a port number"))?,
            None => defaults.port,
        };
        Ok(Self {
            port,
            openai_api_key: non_blank("OPENAI_API_KEY"),
            openai_base_url: non_blank("OPENAI_BASE_URL"),
            data_dir: non_blank("RELAY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        })
    }
}

pub struct RelayState {
    openai: Option<OpenAIClient>,
    feedback_path: PathBuf,
    /// Serializes read-modify-write of the feedback file
    feedback_lock: Mutex<()>,
}

impl RelayState {
    pub fn from_settings(settings: &RelaySettings) -> Result<Self> {
        let openai = match &settings.openai_api_key {
            Some(key) => Some(
                OpenAIClient::new(key, settings.openai_base_url.as_deref())
                    .context("failed to construct OpenAI client")?,
            ),
            None => None,
        };
        Ok(Self {
            openai,
            feedback_path: settings.data_dir.join(FEEDBACK_FILE),
            feedback_lock: Mutex::new(()),
        })
    }

    pub fn feedback_path(&self) -> &std::path::Path {
        &self.feedback_path
    }
}

pub fn build_router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route(HEALTH_ENDPOINT, get(handle_health))
        .route(CHAT_ENDPOINT, post(handle_chat))
        .route(FEEDBACK_ENDPOINT, post(handle_feedback))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn run(settings: RelaySettings) -> Result<()> {
    let state = Arc::new(RelayState::from_settings(&settings)?);
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind relay on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve relay listen address")?;

    tracing::info!(
        addr = %local_addr,
        openai = state.openai.is_some(),
        feedback = %state.feedback_path.display(),
        "relay listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("relay server exited unexpectedly")?;
    Ok(())
}

async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "OK",
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        })),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
}

async fn handle_chat(State(state): State<Arc<RelayState>>, body: Bytes) -> Response {
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();
    let Some(message) = request
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Message is required" })),
        )
            .into_response();
    };

    let Some(openai) = &state.openai else {
        let canned = DEMO_RESPONSES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(DEMO_RESPONSES[0]);
        return (
            StatusCode::OK,
            Json(json!({
                "response": format!("{canned}{DEMO_NOTE}"),
                "source": "fallback",
            })),
        )
            .into_response();
    };

    match openai.complete(RELAY_SYSTEM_PROMPT, &message).await {
        Ok(reply) => (
            StatusCode::OK,
            Json(json!({ "response": reply, "source": "openai" })),
        )
            .into_response(),
        Err(error) => {
            tracing::warn!(%error, "chat relay request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "message": "Sorry, I encountered an issue. Please try again.",
                })),
            )
                .into_response()
        }
    }
}

async fn handle_feedback(State(state): State<Arc<RelayState>>, body: Bytes) -> Response {
    let request: FeedbackRequest = serde_json::from_slice(&body).unwrap_or_default();
    let entry = FeedbackEntry::from_request(request);

    let result = {
        let _guard = state.feedback_lock.lock().await;
        append_feedback(&state.feedback_path, &entry).await
    };
    match result {
        Ok(()) => {
            tracing::debug!(id = %entry.id, "feedback stored");
            (
                StatusCode::OK,
                Json(json!({ "success": true, "message": "Feedback submitted successfully" })),
            )
                .into_response()
        }
        Err(error) => {
            tracing::warn!(error = %format!("{error:#}"), "failed to store feedback");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to submit feedback" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use httpmock::prelude::*;
    use serde_json::Value;
    use std::collections::HashMap;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn settings(data_dir: PathBuf, key: Option<&str>, base_url: Option<String>) -> RelaySettings {
        RelaySettings {
            port: 0,
            openai_api_key: key.map(String::from),
            openai_base_url: base_url,
            data_dir,
        }
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .expect("request");
        let response = app.oneshot(request).await.expect("relay response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    fn offline_app() -> (Router, tempfile::TempDir) {
        let temp = tempdir().expect("tempdir");
        let state = RelayState::from_settings(&settings(temp.path().join("data"), None, None))
            .expect("state");
        (build_router(Arc::new(state)), temp)
    }

    #[test]
    fn test_settings_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("PORT", "8080"),
            ("OPENAI_API_KEY", "  "),
            ("RELAY_DATA_DIR", "/tmp/relay"),
        ]
        .into_iter()
        .collect();
        let parsed =
            RelaySettings::from_lookup(|name| env.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(parsed.port, 8080);
        assert!(parsed.openai_api_key.is_none());
        assert_eq!(parsed.data_dir, PathBuf::from("/tmp/relay"));

        let defaults = RelaySettings::from_lookup(|_| None).unwrap();
        assert_eq!(defaults, RelaySettings::default());

        let error = RelaySettings::from_lookup(|name| {
            (name == "PORT").then(|| "not-a-port".to_string())
        })
        .unwrap_err();
        assert!(error.to_string().contains("invalid PORT"));
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let (app, _temp) = offline_app();
        let (status, body) = call(app, "GET", HEALTH_ENDPOINT, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_chat_requires_message() {
        let (app, _temp) = offline_app();
        let (status, body) = call(app.clone(), "POST", CHAT_ENDPOINT, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required");

        let (status, _) =
            call(app.clone(), "POST", CHAT_ENDPOINT, Some(json!({"message": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(app, "POST", CHAT_ENDPOINT, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_without_key_uses_demo_responses() {
        let (app, _temp) = offline_app();
        let (status, body) =
            call(app, "POST", CHAT_ENDPOINT, Some(json!({"message": "What is entropy?"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "fallback");
        let response = body["response"].as_str().unwrap();
        assert!(response.ends_with(DEMO_NOTE));
        let canned = response.trim_end_matches(DEMO_NOTE);
        assert!(DEMO_RESPONSES.contains(&canned));
    }

    #[tokio::test]
    async fn test_chat_with_key_relays_to_openai() {
        let upstream = MockServer::start();
        let completion = upstream.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-relay")
                .json_body_includes(
                    json!({
                        "model": "gpt-3.5-turbo",
                        "messages": [
                            {"role": "system", "content": RELAY_SYSTEM_PROMPT},
                            {"role": "user", "content": "Why is the sky blue?"}
                        ]
                    })
                    .to_string(),
                );
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "What happens to sunlight in air?"}}]
            }));
        });

        let temp = tempdir().expect("tempdir");
        let state = RelayState::from_settings(&settings(
            temp.path().to_path_buf(),
            Some("sk-relay"),
            Some(upstream.base_url()),
        ))
        .expect("state");
        let app = build_router(Arc::new(state));

        let (status, body) = call(
            app,
            "POST",
            CHAT_ENDPOINT,
            Some(json!({"message": "Why is the sky blue?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "openai");
        assert_eq!(body["response"], "What happens to sunlight in air?");
        completion.assert_calls(1);
    }

    #[tokio::test]
    async fn test_chat_upstream_failure_is_500() {
        let upstream = MockServer::start();
        upstream.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).body("rate limited");
        });

        let temp = tempdir().expect("tempdir");
        let state = RelayState::from_settings(&settings(
            temp.path().to_path_buf(),
            Some("sk-relay"),
            Some(upstream.base_url()),
        ))
        .expect("state");

        let (status, body) = call(
            build_router(Arc::new(state)),
            "POST",
            CHAT_ENDPOINT,
            Some(json!({"message": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_feedback_appends_entries() {
        let temp = tempdir().expect("tempdir");
        let state = Arc::new(
            RelayState::from_settings(&settings(temp.path().join("data"), None, None))
                .expect("state"),
        );
        let app = build_router(state.clone());

        for rating in [4, 5] {
            let (status, body) = call(
                app.clone(),
                "POST",
                FEEDBACK_ENDPOINT,
                Some(json!({"feedback": "Helpful", "rating": rating, "page": "/index.html"})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["message"], "Feedback submitted successfully");
        }

        let stored: Vec<Value> =
            serde_json::from_slice(&std::fs::read(state.feedback_path()).unwrap()).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["rating"], 4);
        assert_eq!(stored[1]["page"], "/index.html");
        assert!(stored[1]["id"].as_str().unwrap().parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn test_unreadable_feedback_file_restarts_array() {
        let temp = tempdir().expect("tempdir");
        let state = Arc::new(
            RelayState::from_settings(&settings(temp.path().to_path_buf(), None, None))
                .expect("state"),
        );
        std::fs::write(state.feedback_path(), "{broken").unwrap();

        let (status, _) = call(
            build_router(state.clone()),
            "POST",
            FEEDBACK_ENDPOINT,
            Some(json!({"feedback": "ok"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let stored: Vec<Value> =
            serde_json::from_slice(&std::fs::read(state.feedback_path()).unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].get("rating").is_none());
    }

    #[tokio::test]
    async fn test_feedback_write_failure_is_500() {
        let temp = tempdir().expect("tempdir");
        // a file where the data directory should be
        let blocker = temp.path().join("data");
        std::fs::write(&blocker, "not a directory").unwrap();
        let state = RelayState::from_settings(&settings(blocker, None, None)).expect("state");

        let (status, body) = call(
            build_router(Arc::new(state)),
            "POST",
            FEEDBACK_ENDPOINT,
            Some(json!({"feedback": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to submit feedback");
    }
}
