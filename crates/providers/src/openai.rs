use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use zeroize::Zeroizing;

use crate::ProviderError;

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client used by the relay server.
pub struct OpenAIClient {
    http: Client,
    auth_token: Zeroizing<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIClient {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "OpenAI API key not configured".to_string(),
            ));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(Self {
            http,
            auth_token: Zeroizing::new(api_key.trim().to_string()),
            base_url: base_url
                .unwrap_or("https://api.openai.com")
                .trim_end_matches('/')
                .to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 500,
            temperature: 0.7,
        })
    }

    /// One system + one user message, single reply.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let req = OpenAIRequest {
            model: &self.model,
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: system,
                },
                OpenAIMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token.as_str()))
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            if detail.trim().is_empty() {
                return Err(ProviderError::Transport(format!("openai error: {}", status)));
            }
            return Err(ProviderError::Transport(format!(
                "openai error: {}\n{}",
                status, detail
            )));
        }
        let body: OpenAIResponse = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_blank_key_is_rejected() {
        assert!(matches!(
            OpenAIClient::new("  ", None),
            Err(ProviderError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_sends_system_and_user_messages() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .json_body_includes(
                        json!({"model": "gpt-3.5-turbo", "max_tokens": 500}).to_string(),
                    )
                    .json_body_includes(
                        json!({"messages": [
                            {"role": "system", "content": "be a mentor"},
                            {"role": "user", "content": "hi"}
                        ]})
                        .to_string(),
                    );
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "What brings you here?"}}]
                }));
            });

        let client = OpenAIClient::new("sk-test", Some(&server.base_url())).unwrap();
        let reply = client.complete("be a mentor", "hi").await.unwrap();

        assert_eq!(reply, "What brings you here?");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn test_complete_maps_error_status() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(500).body("upstream exploded");
            });

        let client = OpenAIClient::new("sk-test", Some(&server.base_url())).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        match err {
            ProviderError::Transport(detail) => assert!(detail.contains("upstream exploded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
