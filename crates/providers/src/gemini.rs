use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::settings::ProviderSettings;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::{GenerationConfig, ProviderError, TextGenerator};

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    stop_sequences: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GeminiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
    safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Option<Vec<GeminiCandidatePart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// A generateContent reply, decoded once at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiReply {
    Text(String),
    SafetyBlocked,
    Empty,
    Malformed(String),
}

impl GeminiReply {
    /// Only the first candidate is considered.
    pub fn decode(raw: &str) -> Self {
        let body: GeminiResponse = match serde_json::from_str(raw) {
            Ok(body) => body,
            Err(e) => return GeminiReply::Malformed(e.to_string()),
        };
        let Some(candidate) = body.candidates.and_then(|c| c.into_iter().next()) else {
            return GeminiReply::Empty;
        };
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return GeminiReply::SafetyBlocked;
        }
        let text = candidate
            .content
            .and_then(|c| c.parts)
            .and_then(|parts| parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            GeminiReply::Empty
        } else {
            GeminiReply::Text(text)
        }
    }

    pub fn into_result(self) -> Result<String, ProviderError> {
        match self {
            GeminiReply::Text(text) => Ok(text),
            GeminiReply::SafetyBlocked => Err(ProviderError::SafetyBlocked),
            GeminiReply::Empty => Err(ProviderError::EmptyResponse),
            GeminiReply::Malformed(detail) => Err(ProviderError::Malformed(detail)),
        }
    }
}

pub struct GeminiClient {
    http: Client,
    api_key: Option<Zeroizing<String>>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// A missing key is not an error here; every request reports it instead.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(Self {
            http,
            api_key: settings
                .auth
                .usable_key()
                .map(|k| Zeroizing::new(k.to_string())),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(prompt: &str, config: &GenerationConfig) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
                stop_sequences: config.stop_sequences.clone(),
            },
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| GeminiSafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::Configuration("Gemini API key not configured".to_string())
        })?;
        let req = Self::build_request(prompt, config);
        let resp = self
            .http
            .post(self.endpoint())
            .query(&[("key", key.as_str())])
            .json(&req)
            .send()
            .await
            .map_err(|e| ProviderError::from(e.without_url()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::from(e.without_url()))?;
        if !status.is_success() {
            let detail = serde_json::from_str::<GeminiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| body.trim().chars().take(800).collect());
            if detail.is_empty() {
                return Err(ProviderError::Transport(format!("gemini error: {}", status)));
            }
            return Err(ProviderError::Transport(format!(
                "gemini error: {}. {}",
                status, detail
            )));
        }
        GeminiReply::decode(&body).into_result()
    }
}
