/// Failures inside the provider adapter. None of these reach the chat session:
/// `send` turns them into a fallback reply and `analyze` into `None`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Another request is already being processed. Please wait.")]
    ConcurrentRequest,

    #[error("Provider not configured: {0}")]
    Configuration(String),

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Response was blocked due to safety filters")]
    SafetyBlocked,

    #[error("No content in provider response")]
    EmptyResponse,

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Analysis was not structured data: {0}")]
    AnalysisParse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}
