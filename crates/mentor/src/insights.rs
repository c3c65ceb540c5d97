use providers::MentorProvider;
use shared::insight::{InsightEntry, InsightLog};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::store::{LocalStore, INSIGHTS_KEY};

const GENERAL_CONTEXT: &str = "general discussion";

/// Turns student messages into stored learning insights.
#[derive(Clone)]
pub struct InsightRecorder {
    provider: Arc<MentorProvider>,
    store: Arc<LocalStore>,
    capacity: usize,
}

impl InsightRecorder {
    pub fn new(provider: Arc<MentorProvider>, store: Arc<LocalStore>, capacity: usize) -> Self {
        Self {
            provider,
            store,
            capacity,
        }
    }

    /// Analyze one student message and append the result to the stored log.
    /// Returns the new entry, or `None` when there was nothing to record.
    pub async fn record_from_response(
        &self,
        user_message: &str,
        topic: Option<&str>,
    ) -> Option<InsightEntry> {
        let analysis = self
            .provider
            .analyze(user_message, topic.unwrap_or(GENERAL_CONTEXT))
            .await?;

        let entry = InsightEntry::new(topic.map(String::from), analysis);
        let mut log = self.insights();
        log.push(entry.clone(), self.capacity);
        if let Err(e) = self.store.set(INSIGHTS_KEY, &log) {
            tracing::warn!(error = %e, "failed to persist learning insight");
        } else {
            tracing::debug!(stored = log.len(), "learning insight recorded");
        }
        Some(entry)
    }

    /// Run `record_from_response` in the background.
    pub fn spawn_record(&self, user_message: String, topic: Option<String>) -> JoinHandle<()> {
        let recorder = self.clone();
        tokio::spawn(async move {
            recorder
                .record_from_response(&user_message, topic.as_deref())
                .await;
        })
    }

    pub fn insights(&self) -> InsightLog {
        self.store.get(INSIGHTS_KEY).unwrap_or_default()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
