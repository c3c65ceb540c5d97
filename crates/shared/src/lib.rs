pub mod events;
pub mod insight;
pub mod profile;

pub mod settings {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    fn default_true() -> bool {
        true
    }

    fn default_history_window() -> usize {
        6
    }

    fn default_insight_capacity() -> usize {
        20
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct ProviderAuth {
        pub api_key: Option<String>,
    }

    impl ProviderAuth {
        /// The configured key, ignoring blanks and the shipped placeholder.
        pub fn usable_key(&self) -> Option<&str> {
            self.api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty() && *k != "YOUR_GEMINI_API_KEY_HERE")
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ProviderSettings {
        pub model: String,    // e.g., "gemini-pro"
        pub base_url: String, // e.g., "https://generativelanguage.googleapis.com/v1beta"
        pub auth: ProviderAuth,
        pub request_timeout_secs: u64,
    }

    impl Default for ProviderSettings {
        fn default() -> Self {
            Self {
                model: "gemini-pro".into(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
                auth: ProviderAuth::default(),
                request_timeout_secs: 45,
            }
        }
    }

    /// Pacing of the mentor behaviour, in milliseconds.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct MentorTimings {
        /// Wait before a follow-up question enters the queue
        pub follow_up_delay_ms: u64,
        /// Silence after a student turn before a queued question may be asked
        pub idle_threshold_ms: u64,
        /// Period of the mentor check while the chat is open
        pub tick_period_ms: u64,
        /// Latency before a dequeued question (or topic welcome) is shown
        pub delivery_delay_ms: u64,
        /// Per-character delay of the streaming reveal
        pub stream_char_delay_ms: u64,
    }

    impl MentorTimings {
        pub fn follow_up_delay(&self) -> Duration {
            Duration::from_millis(self.follow_up_delay_ms)
        }

        pub fn idle_threshold(&self) -> Duration {
            Duration::from_millis(self.idle_threshold_ms)
        }

        pub fn tick_period(&self) -> Duration {
            Duration::from_millis(self.tick_period_ms.max(1))
        }

        pub fn delivery_delay(&self) -> Duration {
            Duration::from_millis(self.delivery_delay_ms)
        }

        pub fn stream_char_delay(&self) -> Duration {
            Duration::from_millis(self.stream_char_delay_ms)
        }
    }

    impl Default for MentorTimings {
        fn default() -> Self {
            Self {
                follow_up_delay_ms: 15_000,
                idle_threshold_ms: 20_000,
                tick_period_ms: 30_000,
                delivery_delay_ms: 1_000,
                stream_char_delay_ms: 30,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MentorSettings {
        #[serde(default)]
        pub provider: ProviderSettings,
        #[serde(default)]
        pub timings: MentorTimings,
        #[serde(default = "default_true")]
        pub mentor_mode: bool,
        /// Recent turns included in each prompt
        #[serde(default = "default_history_window")]
        pub history_window: usize,
        /// Maximum stored learning insights
        #[serde(default = "default_insight_capacity")]
        pub insight_capacity: usize,
    }

    impl Default for MentorSettings {
        fn default() -> Self {
            Self {
                provider: ProviderSettings::default(),
                timings: MentorTimings::default(),
                mentor_mode: true,
                history_window: default_history_window(),
                insight_capacity: default_insight_capacity(),
            }
        }
    }
}

pub mod chat {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Sender {
        User,
        Assistant,
    }

    impl Sender {
        /// Speaker label used inside provider prompts.
        pub fn prompt_label(&self) -> &'static str {
            match self {
                Sender::User => "Student",
                Sender::Assistant => "Mentor",
            }
        }

        /// Speaker label used in exported transcripts.
        pub fn display_name(&self) -> &'static str {
            match self {
                Sender::User => "You",
                Sender::Assistant => "AI Mentor",
            }
        }
    }

    /// One transcript entry. Never mutated after creation.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub sender: Sender,
        pub text: String,
        pub created_at: DateTime<Utc>,
    }

    impl ChatMessage {
        pub fn new(sender: Sender, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
            Self {
                sender,
                text: text.into(),
                created_at,
            }
        }

        pub fn user(text: impl Into<String>) -> Self {
            Self::new(Sender::User, text, Utc::now())
        }

        pub fn assistant(text: impl Into<String>) -> Self {
            Self::new(Sender::Assistant, text, Utc::now())
        }

        pub fn is_user(&self) -> bool {
            self.sender == Sender::User
        }
    }
}

#[cfg(test)]
mod tests {
    use super::settings::*;

    #[test]
    fn test_settings_defaults_from_empty_json() {
        let settings: MentorSettings = serde_json::from_str("{}").unwrap();
        assert!(settings.mentor_mode);
        assert_eq!(settings.history_window, 6);
        assert_eq!(settings.insight_capacity, 20);
        assert_eq!(settings.provider.model, "gemini-pro");
        assert_eq!(settings.timings.follow_up_delay_ms, 15_000);
        assert_eq!(settings.timings.stream_char_delay_ms, 30);
    }

    #[test]
    fn test_partial_timings_keep_other_defaults() {
        let settings: MentorSettings =
            serde_json::from_str(r#"{"timings": {"tick_period_ms": 5000}}"#).unwrap();
        assert_eq!(settings.timings.tick_period_ms, 5_000);
        assert_eq!(settings.timings.idle_threshold_ms, 20_000);
    }

    #[test]
    fn test_placeholder_key_is_not_usable() {
        let auth = ProviderAuth {
            api_key: Some("YOUR_GEMINI_API_KEY_HERE".into()),
        };
        assert!(auth.usable_key().is_none());

        let auth = ProviderAuth {
            api_key: Some("  real-key ".into()),
        };
        assert_eq!(auth.usable_key(), Some("real-key"));
    }
}
