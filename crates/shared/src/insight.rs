//! Learning insight types recorded after each student message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;

/// Structured assessment of a student's reasoning, as returned by the provider.
///
/// Providers are loose about key names, so every field is optional and anything
/// unrecognised is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningAnalysis {
    #[serde(default, alias = "reasoningDepth", alias = "depth_of_reasoning")]
    pub reasoning_depth: Option<serde_json::Value>,
    #[serde(default, alias = "criticalThinking", alias = "critical_thinking_level")]
    pub critical_thinking: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        alias = "areas_for_improvement",
        alias = "improvement_areas"
    )]
    pub improvements: Vec<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        alias = "nextSteps",
        alias = "suggested_next_steps"
    )]
    pub next_steps: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// List fields sometimes come back as a bare string or `null`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(item)) if item.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightEntry {
    pub timestamp: DateTime<Utc>,
    pub topic: Option<String>,
    pub insight: LearningAnalysis,
}

impl InsightEntry {
    pub fn new(topic: Option<String>, insight: LearningAnalysis) -> Self {
        Self {
            timestamp: Utc::now(),
            topic,
            insight,
        }
    }
}

/// Rolling log of insights; the oldest entry is evicted once `capacity` is reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsightLog {
    entries: VecDeque<InsightEntry>,
}

impl InsightLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: InsightEntry, capacity: usize) {
        self.entries.push_back(entry);
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &InsightEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&InsightEntry> {
        self.entries.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> InsightEntry {
        InsightEntry::new(
            Some(format!("topic-{n}")),
            LearningAnalysis {
                next_steps: vec![format!("step {n}")],
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_log_evicts_oldest_past_capacity() {
        let mut log = InsightLog::new();
        for n in 0..21 {
            log.push(entry(n), 20);
        }
        assert_eq!(log.len(), 20);
        assert_eq!(log.entries().next().unwrap().topic.as_deref(), Some("topic-1"));
        assert_eq!(log.latest().unwrap().topic.as_deref(), Some("topic-20"));
    }

    #[test]
    fn test_analysis_accepts_camel_case_and_keeps_extras() {
        let analysis: LearningAnalysis = serde_json::from_value(serde_json::json!({
            "reasoningDepth": "moderate",
            "criticalThinking": 3,
            "nextSteps": ["Ask follow-up questions"],
            "confidence": 0.4
        }))
        .unwrap();
        assert_eq!(analysis.reasoning_depth, Some(serde_json::json!("moderate")));
        assert_eq!(analysis.next_steps, vec!["Ask follow-up questions"]);
        assert!(analysis.extra.contains_key("confidence"));
    }

    #[test]
    fn test_analysis_accepts_single_string_lists() {
        let analysis: LearningAnalysis = serde_json::from_str(
            r#"{"reasoning_depth":"moderate","critical_thinking":"developing","improvements":"Use more specific examples","next_steps":"Ask why the tides differ"}"#,
        )
        .unwrap();
        assert_eq!(analysis.improvements, vec!["Use more specific examples"]);
        assert_eq!(analysis.next_steps, vec!["Ask why the tides differ"]);

        let analysis: LearningAnalysis =
            serde_json::from_str(r#"{"improvements":null,"nextSteps":""}"#).unwrap();
        assert!(analysis.improvements.is_empty());
        assert!(analysis.next_steps.is_empty());
    }

    #[test]
    fn test_log_serializes_as_plain_array() {
        let mut log = InsightLog::new();
        log.push(entry(1), 20);
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        let back: InsightLog = serde_json::from_value(json).unwrap();
        assert_eq!(back.len(), 1);
    }
}
