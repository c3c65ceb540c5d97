use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const FEEDBACK_FILE: &str = "feedback.json";

/// Body of `POST /api/feedback`. Fields are stored as sent.
#[derive(Debug, Default, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub feedback: Option<Value>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub page: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Value>,
    pub timestamp: String,
}

impl FeedbackEntry {
    pub fn from_request(request: FeedbackRequest) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: now.timestamp_millis().to_string(),
            feedback: request.feedback,
            rating: request.rating,
            page: request.page,
            timestamp: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// Append `entry` to the JSON array at `path`. A missing or unreadable file
/// starts a new array.
pub async fn append_feedback(path: &Path, entry: &FeedbackEntry) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create feedback directory '{}'", dir.display()))?;
    }

    let mut entries: Vec<Value> = match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(_) => Vec::new(),
    };
    entries.push(serde_json::to_value(entry).context("failed to encode feedback entry")?);

    let payload = serde_json::to_vec_pretty(&entries).context("failed to encode feedback log")?;
    tokio::fs::write(path, payload)
        .await
        .with_context(|| format!("failed to write feedback log '{}'", path.display()))?;
    Ok(())
}
