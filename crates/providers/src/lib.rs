//! Providers - model access for the AI mentor
//!
//! - `MentorProvider`: the adapter the chat session talks to (history, single-flight
//!   guard, fallbacks, insight analysis)
//! - `GeminiClient`: generative-text transport used by the adapter
//! - `OpenAIClient`: chat-completions transport used by the relay server

pub mod adapter;
pub mod error;
pub mod fallback;
pub mod gemini;
pub mod openai;
pub mod prompts;

pub use adapter::MentorProvider;
pub use error::ProviderError;
pub use gemini::{GeminiClient, GeminiReply};
pub use openai::OpenAIClient;

use async_trait::async_trait;
use shared::profile::ProviderRequestOptions;

/// Generation parameters sent with every request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub stop_sequences: Vec<String>,
}

impl From<&ProviderRequestOptions> for GenerationConfig {
    fn from(options: &ProviderRequestOptions) -> Self {
        Self {
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            max_output_tokens: options.max_tokens,
            stop_sequences: options.stop_sequences.clone(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::from(&ProviderRequestOptions::default())
    }
}

/// One prompt in, one reply out. The seam between the adapter and the network.
///
/// Note: Uses async_trait for object safety
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider identifier for logs
    fn name(&self) -> &'static str;

    /// Run a single generation request
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError>;
}
