//! The chat session controller.
//!
//! Owns the transcript and the widget state, drives the typing indicator and the
//! character-by-character reveal, and runs the periodic mentor check while the
//! chat is open. Rendering is left to whoever holds the event receiver.

use parking_lot::Mutex;
use providers::MentorProvider;
use serde::Serialize;
use shared::chat::{ChatMessage, Sender};
use shared::events::ChatEvent;
use shared::insight::InsightLog;
use shared::profile::{ProviderRequestOptions, StudentProfile};
use shared::settings::{MentorSettings, MentorTimings};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::clock::SessionClock;
use crate::insights::InsightRecorder;
use crate::scheduler::MentorScheduler;
use crate::store::{LocalStore, MODE_KEY};

pub const GREETING: &str = "Hello! I'm your AI mentor. I'm here to help you explore topics through questions and critical thinking. What would you like to learn about today?";
pub const CLEARED_GREETING: &str = "Chat cleared. How can I help you learn something new?";
pub const MENTOR_MODE_ON: &str = "Mentor mode activated. I'll guide you with probing questions to deepen your understanding.";
pub const MENTOR_MODE_OFF: &str = "Mentor mode deactivated. I'll respond to your questions directly.";

pub fn topic_welcome(topic: &str) -> String {
    format!("I see you're exploring {topic}. What aspects of this topic interest you most?")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationPhase {
    Idle,
    AwaitingReply,
    StreamingReply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStats {
    pub user_messages: usize,
    pub ai_messages: usize,
    pub total_messages: usize,
    pub mentor_mode: bool,
}

struct SessionState {
    widget: WidgetState,
    phase: ConversationPhase,
    transcript: Vec<ChatMessage>,
    current_topic: Option<String>,
    profile: StudentProfile,
    /// Bumped by `clear`; work started under an older epoch is discarded
    epoch: u64,
    ticker: Option<JoinHandle<()>>,
    deliveries: Vec<JoinHandle<()>>,
}

struct SessionInner {
    provider: Arc<MentorProvider>,
    scheduler: MentorScheduler,
    insights: InsightRecorder,
    store: Arc<LocalStore>,
    clock: SessionClock,
    timings: MentorTimings,
    events: Option<UnboundedSender<ChatEvent>>,
    state: Mutex<SessionState>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        for handle in state.deliveries.drain(..) {
            handle.abort();
        }
    }
}

pub struct ChatSessionBuilder {
    provider: Arc<MentorProvider>,
    store: Arc<LocalStore>,
    settings: MentorSettings,
    profile: Option<StudentProfile>,
    events: Option<UnboundedSender<ChatEvent>>,
}

impl ChatSessionBuilder {
    pub fn new(provider: Arc<MentorProvider>, store: Arc<LocalStore>) -> Self {
        Self {
            provider,
            store,
            settings: MentorSettings::default(),
            profile: None,
            events: None,
        }
    }

    pub fn settings(mut self, settings: MentorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn profile(mut self, profile: StudentProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn events(mut self, events: UnboundedSender<ChatEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// A mentor mode saved by an earlier session wins over the settings default.
    pub fn build(self) -> ChatSession {
        let mentor_mode = self
            .store
            .get::<bool>(MODE_KEY)
            .unwrap_or(self.settings.mentor_mode);
        let clock = SessionClock::new();
        let greeting = ChatMessage::new(Sender::Assistant, GREETING, clock.now());
        let profile = self
            .profile
            .unwrap_or_else(|| StudentProfile::guest(&mut rand::thread_rng()));

        let session = ChatSession {
            inner: Arc::new(SessionInner {
                scheduler: MentorScheduler::new(&self.settings.timings, mentor_mode),
                insights: InsightRecorder::new(
                    self.provider.clone(),
                    self.store.clone(),
                    self.settings.insight_capacity,
                ),
                provider: self.provider,
                store: self.store,
                clock,
                timings: self.settings.timings,
                events: self.events,
                state: Mutex::new(SessionState {
                    widget: WidgetState::Closed,
                    phase: ConversationPhase::Idle,
                    transcript: vec![greeting.clone()],
                    current_topic: None,
                    profile,
                    epoch: 0,
                    ticker: None,
                    deliveries: Vec::new(),
                }),
            }),
        };
        session.emit(ChatEvent::MessageAppended(greeting));
        session
    }
}

/// Cheap to clone; clones share one session. Background tasks hold weak
/// references, so dropping the last clone stops them.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl ChatSession {
    pub fn builder(provider: Arc<MentorProvider>, store: Arc<LocalStore>) -> ChatSessionBuilder {
        ChatSessionBuilder::new(provider, store)
    }

    /// Show the chat and start the periodic mentor check.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(&self) {
        let ticker = self.spawn_ticker();
        {
            let mut state = self.inner.state.lock();
            if state.widget == WidgetState::Open {
                ticker.abort();
                return;
            }
            state.widget = WidgetState::Open;
            state.ticker = Some(ticker);
        }
        tracing::info!("chat opened");
        self.emit(ChatEvent::Opened);

        if self.inner.scheduler.mentor_mode() && self.should_ask() {
            self.deliver_next_question();
        }
    }

    pub fn close(&self) {
        let ticker = {
            let mut state = self.inner.state.lock();
            if state.widget == WidgetState::Closed {
                return;
            }
            state.widget = WidgetState::Closed;
            state.ticker.take()
        };
        if let Some(ticker) = ticker {
            ticker.abort();
        }
        tracing::info!("chat closed");
        self.emit(ChatEvent::Closed);
    }

    pub fn toggle(&self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    /// Send one student message and reveal the mentor's reply.
    ///
    /// Blank input is ignored. Provider failures surface as fallback replies, so
    /// a non-blank message always ends with exactly one assistant message unless
    /// the chat is cleared first.
    pub async fn submit(&self, text: &str) {
        let message = text.trim();
        if message.is_empty() {
            return;
        }

        let (epoch, options) = {
            let mut state = self.inner.state.lock();
            state.phase = ConversationPhase::AwaitingReply;
            let options = ProviderRequestOptions::default()
                .with_profile(state.profile.clone())
                .with_topic(state.current_topic.clone());
            (state.epoch, options)
        };
        self.append(ChatMessage::new(
            Sender::User,
            message,
            self.inner.clock.now(),
        ));

        self.emit(ChatEvent::TypingStarted);
        let reply = self.inner.provider.send(message, &options).await;
        self.emit(ChatEvent::TypingStopped);

        if !self.is_current(epoch) {
            // the provider recorded this turn after clear() dropped its history
            self.inner.provider.clear_history();
            tracing::debug!("chat cleared while waiting; reply discarded");
            return;
        }
        if !self.reveal(epoch, &reply).await {
            tracing::debug!("chat cleared while streaming; reply discarded");
            return;
        }

        self.inner
            .insights
            .spawn_record(message.to_string(), options.current_topic);
        if self.inner.scheduler.mentor_mode() {
            self.inner.scheduler.enqueue_follow_up(message, &reply);
        }
    }

    /// Stream `reply` and append it. False if the epoch moved on meanwhile.
    async fn reveal(&self, epoch: u64, reply: &str) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.epoch != epoch {
                return false;
            }
            state.phase = ConversationPhase::StreamingReply;
        }
        self.emit(ChatEvent::StreamStarted);

        let delay = self.inner.timings.stream_char_delay();
        for ch in reply.chars() {
            self.emit(ChatEvent::StreamDelta(ch));
            tokio::time::sleep(delay).await;
            if !self.is_current(epoch) {
                return false;
            }
        }
        self.emit(ChatEvent::StreamFinished);

        let message = ChatMessage::new(Sender::Assistant, reply, self.inner.clock.now());
        {
            let mut state = self.inner.state.lock();
            if state.epoch != epoch {
                return false;
            }
            state.phase = ConversationPhase::Idle;
            state.transcript.push(message.clone());
        }
        self.emit(ChatEvent::MessageAppended(message));
        true
    }

    /// One mentor check: while open, deliver a queued question if the student
    /// has gone quiet.
    pub fn tick(&self) {
        if !self.is_open() {
            return;
        }
        if self.should_ask() {
            self.deliver_next_question();
        }
    }

    /// Reset to a single greeting. Cancels pending deliveries and follow-ups, and
    /// any reply still in flight is dropped when it arrives.
    pub fn clear(&self) {
        let greeting = ChatMessage::new(
            Sender::Assistant,
            CLEARED_GREETING,
            self.inner.clock.now(),
        );
        let deliveries = {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            state.phase = ConversationPhase::Idle;
            state.transcript = vec![greeting.clone()];
            std::mem::take(&mut state.deliveries)
        };
        for handle in deliveries {
            handle.abort();
        }
        self.inner.scheduler.clear();
        self.inner.provider.clear_history();

        tracing::info!("chat cleared");
        self.emit(ChatEvent::Cleared);
        self.emit(ChatEvent::MessageAppended(greeting));
    }

    /// Topic sent with later requests; a non-empty topic also gets a welcome.
    pub fn set_current_topic(&self, topic: Option<String>) {
        let topic = topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.inner.state.lock().current_topic = topic.clone();
        if let Some(topic) = topic {
            self.post_after_delay(topic_welcome(&topic), false);
        }
    }

    pub fn toggle_mentor_mode(&self, enabled: bool) {
        self.inner.scheduler.set_mentor_mode(enabled);
        if let Err(e) = self.inner.store.set(MODE_KEY, &enabled) {
            tracing::warn!(error = %e, "failed to persist mentor mode");
        }
        let status = if enabled {
            MENTOR_MODE_ON
        } else {
            MENTOR_MODE_OFF
        };
        self.append(ChatMessage::new(
            Sender::Assistant,
            status,
            self.inner.clock.now(),
        ));
    }

    /// "You: ..." / "AI Mentor: ..." blocks separated by blank lines.
    pub fn export_transcript(&self) -> String {
        self.inner
            .state
            .lock()
            .transcript
            .iter()
            .map(|m| format!("{}: {}", m.sender.display_name(), m.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn stats(&self) -> ChatStats {
        let state = self.inner.state.lock();
        let user_messages = state.transcript.iter().filter(|m| m.is_user()).count();
        ChatStats {
            user_messages,
            ai_messages: state.transcript.len() - user_messages,
            total_messages: state.transcript.len(),
            mentor_mode: self.inner.scheduler.mentor_mode(),
        }
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.inner.state.lock().transcript.clone()
    }

    pub fn widget_state(&self) -> WidgetState {
        self.inner.state.lock().widget
    }

    pub fn is_open(&self) -> bool {
        self.widget_state() == WidgetState::Open
    }

    pub fn phase(&self) -> ConversationPhase {
        self.inner.state.lock().phase
    }

    pub fn current_topic(&self) -> Option<String> {
        self.inner.state.lock().current_topic.clone()
    }

    pub fn mentor_mode(&self) -> bool {
        self.inner.scheduler.mentor_mode()
    }

    pub fn profile(&self) -> StudentProfile {
        self.inner.state.lock().profile.clone()
    }

    pub fn set_profile(&self, profile: StudentProfile) {
        self.inner.state.lock().profile = profile;
    }

    pub fn scheduler(&self) -> &MentorScheduler {
        &self.inner.scheduler
    }

    pub fn provider(&self) -> &Arc<MentorProvider> {
        &self.inner.provider
    }

    pub fn insights(&self) -> InsightLog {
        self.inner.insights.insights()
    }

    fn should_ask(&self) -> bool {
        let transcript = self.transcript();
        self.inner
            .scheduler
            .should_ask_question(&transcript, self.inner.clock.now())
    }

    fn deliver_next_question(&self) {
        let Some(question) = self.inner.scheduler.take_next() else {
            return;
        };
        tracing::debug!(%question, "delivering mentor question");
        self.post_after_delay(question, true);
    }

    /// Append an assistant message after the delivery delay, unless the chat is
    /// cleared first.
    fn post_after_delay(&self, text: String, mentor_question: bool) {
        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.timings.delivery_delay();
        let epoch = self.inner.state.lock().epoch;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let session = ChatSession { inner };
            let message =
                ChatMessage::new(Sender::Assistant, text, session.inner.clock.now());
            if session.append_if_current(epoch, message) && mentor_question {
                session.inner.scheduler.finish_delivery();
            }
        });

        let mut state = self.inner.state.lock();
        state.deliveries.retain(|h| !h.is_finished());
        state.deliveries.push(handle);
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.timings.tick_period();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                ChatSession { inner }.tick();
            }
        })
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.state.lock().epoch == epoch
    }

    fn append(&self, message: ChatMessage) {
        self.inner.state.lock().transcript.push(message.clone());
        self.emit(ChatEvent::MessageAppended(message));
    }

    fn append_if_current(&self, epoch: u64, message: ChatMessage) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.epoch != epoch {
                return false;
            }
            state.transcript.push(message.clone());
        }
        self.emit(ChatEvent::MessageAppended(message));
        true
    }

    fn emit(&self, event: ChatEvent) {
        if let Some(events) = &self.inner.events {
            // a closed receiver only means nobody is rendering
            let _ = events.send(event);
        }
    }
}
