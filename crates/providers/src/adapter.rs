//! The provider adapter used by the chat session.
//!
//! `send` always produces a reply: provider failures are logged, parked in the
//! last-error slot and replaced by a keyword-matched fallback.

use parking_lot::Mutex;
use regex::Regex;
use shared::chat::ChatMessage;
use shared::insight::LearningAnalysis;
use shared::profile::{ProviderRequestOptions, StudentProfile};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use crate::fallback::{self, DEFAULT_TOPIC_QUESTIONS, OFFLINE_TOPIC_QUESTIONS};
use crate::prompts;
use crate::{GenerationConfig, ProviderError, TextGenerator};

static LIST_NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.?\s*").expect("valid numbering regex"));

/// Clears the in-flight flag when the request finishes, however it finishes.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ProviderError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| ProviderError::ConcurrentRequest)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MentorProvider {
    generator: Arc<dyn TextGenerator>,
    history: Mutex<Vec<ChatMessage>>,
    history_window: usize,
    in_flight: AtomicBool,
    last_error: Mutex<Option<ProviderError>>,
}

impl MentorProvider {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            history: Mutex::new(Vec::new()),
            history_window: 6,
            in_flight: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    /// Number of recent turns included in each prompt
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Send a student message and get the mentor's reply (or a fallback).
    pub async fn send(&self, user_message: &str, options: &ProviderRequestOptions) -> String {
        match self.try_send(user_message, options).await {
            Ok(reply) => {
                *self.last_error.lock() = None;
                reply
            }
            Err(err) => {
                tracing::warn!(
                    provider = self.generator.name(),
                    error = %err,
                    "mentor request failed, answering with fallback"
                );
                *self.last_error.lock() = Some(err);
                fallback::fallback_response(user_message, &mut rand::thread_rng())
            }
        }
    }

    async fn try_send(
        &self,
        user_message: &str,
        options: &ProviderRequestOptions,
    ) -> Result<String, ProviderError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let prompt = {
            let history = self.history.lock();
            prompts::build_contextual_prompt(
                prompts::recent_window(&history, self.history_window),
                options,
                user_message,
            )
        };
        tracing::debug!(prompt_chars = prompt.len(), "sending mentor prompt");

        let reply = self
            .generator
            .generate(&prompt, &GenerationConfig::from(options))
            .await?;

        let mut history = self.history.lock();
        history.push(ChatMessage::user(user_message));
        history.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }

    async fn generate_guarded(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        self.generator.generate(prompt, config).await
    }

    /// Ask the provider to assess a student's message. `None` means no insight
    /// this turn; the cause is left in `last_error`.
    pub async fn analyze(&self, response_text: &str, context: &str) -> Option<LearningAnalysis> {
        let config = GenerationConfig {
            temperature: 0.3,
            ..GenerationConfig::default()
        };
        let result = match self
            .generate_guarded(&prompts::analysis_prompt(response_text, context), &config)
            .await
        {
            Ok(reply) => {
                serde_json::from_str::<LearningAnalysis>(prompts::extract_json_block(&reply))
                    .map_err(|e| ProviderError::AnalysisParse(e.to_string()))
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(analysis) => Some(analysis),
            Err(err) => {
                tracing::debug!(error = %err, "no learning insight this turn");
                *self.last_error.lock() = Some(err);
                None
            }
        }
    }

    /// Up to three probing questions for `topic`, tuned to the student's profile.
    pub async fn generate_mentor_questions(
        &self,
        profile: &StudentProfile,
        topic: &str,
    ) -> Vec<String> {
        let config = GenerationConfig {
            temperature: 0.8,
            ..GenerationConfig::default()
        };
        match self
            .generate_guarded(&prompts::mentor_questions_prompt(profile, topic), &config)
            .await
        {
            Ok(reply) => {
                let questions = parse_questions(&reply);
                if questions.is_empty() {
                    DEFAULT_TOPIC_QUESTIONS.iter().map(|q| q.to_string()).collect()
                } else {
                    questions
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not generate mentor questions");
                *self.last_error.lock() = Some(err);
                OFFLINE_TOPIC_QUESTIONS.iter().map(|q| q.to_string()).collect()
            }
        }
    }

    /// Round-trip a tiny request to check credentials and connectivity.
    pub async fn test_connection(&self) -> bool {
        let config = GenerationConfig {
            max_output_tokens: 50,
            ..GenerationConfig::default()
        };
        match self
            .generate_guarded("Hello, can you confirm the connection is working?", &config)
            .await
        {
            Ok(reply) => !reply.is_empty(),
            Err(err) => {
                tracing::warn!(error = %err, "connection test failed");
                *self.last_error.lock() = Some(err);
                false
            }
        }
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn last_error(&self) -> Option<ProviderError> {
        self.last_error.lock().clone()
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

fn parse_questions(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && (line.contains('?') || line.starts_with(|c: char| c.is_ascii_digit()))
        })
        .map(|line| LIST_NUMBERING.replace(line, "").trim().to_string())
        .filter(|q| !q.is_empty())
        .take(3)
        .collect()
}
