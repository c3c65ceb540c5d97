//! Mentor question queue.
//!
//! Follow-up questions are picked from the student's wording and join the queue
//! only after a delay, so the mentor never interrupts a reply it just gave.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::chat::{ChatMessage, Sender};
use shared::settings::MentorTimings;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const FOLLOW_UP_QUESTIONS: [&str; 8] = [
    "What made you think about this topic in that way?",
    "Can you give me an example from your own experience?",
    "What would happen if we changed one key element here?",
    "How does this connect to something else you've learned?",
    "What questions does this raise for you?",
    "If you had to explain this to a friend, how would you do it?",
    "What evidence would support or challenge this idea?",
    "Can you think of an alternative perspective on this?",
];

/// Asked when the student gives reasons
pub const REASONING_FOLLOW_UP: &str = "What other factors might also play a role here?";
/// Asked when the student states a belief
pub const BELIEF_FOLLOW_UP: &str = "What experiences or evidence led you to that conclusion?";

/// Keyword tiers first ("because"/"reason", then "think"/"believe"), otherwise a
/// random question from the bank.
pub fn pick_follow_up<R: Rng + ?Sized>(user_message: &str, rng: &mut R) -> &'static str {
    let lower = user_message.to_lowercase();
    if lower.contains("because") || lower.contains("reason") {
        REASONING_FOLLOW_UP
    } else if lower.contains("think") || lower.contains("believe") {
        BELIEF_FOLLOW_UP
    } else {
        FOLLOW_UP_QUESTIONS
            .choose(rng)
            .copied()
            .unwrap_or(FOLLOW_UP_QUESTIONS[0])
    }
}

#[derive(Default)]
struct SchedulerState {
    queue: VecDeque<String>,
    mentor_mode: bool,
    delivering: bool,
    last_check: Option<DateTime<Utc>>,
    pending: Vec<JoinHandle<()>>,
}

pub struct MentorScheduler {
    state: Arc<Mutex<SchedulerState>>,
    follow_up_delay: Duration,
    idle_threshold: Duration,
}

impl MentorScheduler {
    pub fn new(timings: &MentorTimings, mentor_mode: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                mentor_mode,
                ..SchedulerState::default()
            })),
            follow_up_delay: timings.follow_up_delay(),
            idle_threshold: timings.idle_threshold(),
        }
    }

    /// True when mentor mode is on, the transcript has at least two turns, the
    /// student spoke last and has been quiet for longer than the idle threshold.
    pub fn should_ask_question(&self, transcript: &[ChatMessage], now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        state.last_check = Some(now);
        if !state.mentor_mode || transcript.len() < 2 {
            return false;
        }
        let Some(last) = transcript.last() else {
            return false;
        };
        if last.sender != Sender::User {
            return false;
        }
        let idle = now.signed_duration_since(last.created_at);
        idle.to_std().map(|d| d > self.idle_threshold).unwrap_or(false)
    }

    /// Queue a follow-up for this exchange once the follow-up delay has passed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue_follow_up(&self, user_message: &str, ai_reply: &str) {
        let question = pick_follow_up(user_message, &mut rand::thread_rng()).to_string();
        tracing::debug!(
            %question,
            reply_chars = ai_reply.chars().count(),
            delay_ms = self.follow_up_delay.as_millis() as u64,
            "follow-up scheduled"
        );
        let weak: Weak<Mutex<SchedulerState>> = Arc::downgrade(&self.state);
        let delay = self.follow_up_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(state) = weak.upgrade() {
                state.lock().queue.push_back(question);
            }
        });

        let mut state = self.state.lock();
        state.pending.retain(|h| !h.is_finished());
        state.pending.push(handle);
    }

    /// Dequeue the next question unless one is already being delivered.
    pub fn take_next(&self) -> Option<String> {
        let mut state = self.state.lock();
        if state.delivering {
            return None;
        }
        let question = state.queue.pop_front()?;
        state.delivering = true;
        Some(question)
    }

    pub fn finish_delivery(&self) {
        self.state.lock().delivering = false;
    }

    /// Drop queued questions and cancel follow-ups that have not been queued yet.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        for handle in state.pending.drain(..) {
            handle.abort();
        }
        state.queue.clear();
        state.delivering = false;
    }

    /// Pending follow-up timers keep running; the flag is checked at delivery.
    pub fn set_mentor_mode(&self, enabled: bool) {
        self.state.lock().mentor_mode = enabled;
    }

    pub fn mentor_mode(&self) -> bool {
        self.state.lock().mentor_mode
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_delivering(&self) -> bool {
        self.state.lock().delivering
    }

    pub fn pending_follow_ups(&self) -> usize {
        self.state
            .lock()
            .pending
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_check
    }
}

impl Drop for MentorScheduler {
    fn drop(&mut self) {
        for handle in self.state.lock().pending.drain(..) {
            handle.abort();
        }
    }
}
