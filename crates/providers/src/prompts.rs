//! Prompt text for the mentor persona, insight analysis and question generation.

use shared::chat::ChatMessage;
use shared::profile::{ProviderRequestOptions, StudentProfile};

pub const MENTOR_SYSTEM_CONTEXT: &str = r#"You are an AI educational mentor for EduReform AI, a platform that transforms learning from rote memorization to active exploration and reasoning. Your role:

1. Ask probing questions to assess understanding
2. Adapt difficulty based on student responses
3. Focus on developing critical thinking and creativity
4. Identify reasoning gaps and guide students to fill them
5. Encourage exploration of cause-effect relationships
6. Suggest alternative scenarios and perspectives
7. Be encouraging but challenge assumptions
8. Provide personalized insights based on learning patterns

Keep responses concise but thought-provoking. Always end with a question to continue the learning dialogue."#;

/// The last `window` entries of `history`, oldest first.
pub fn recent_window(history: &[ChatMessage], window: usize) -> &[ChatMessage] {
    let start = history.len().saturating_sub(window);
    &history[start..]
}

/// Build the single text prompt sent for a student message.
///
/// `recent` is expected to be already windowed (see [`recent_window`]).
pub fn build_contextual_prompt(
    recent: &[ChatMessage],
    options: &ProviderRequestOptions,
    user_message: &str,
) -> String {
    let mut prompt = String::with_capacity(MENTOR_SYSTEM_CONTEXT.len() + 256);
    prompt.push_str(MENTOR_SYSTEM_CONTEXT);
    prompt.push_str("\n\n");

    if let Some(profile) = &options.user_profile {
        if let Ok(json) = serde_json::to_string(profile) {
            prompt.push_str(&format!("Student Profile: {}\n\n", json));
        }
    }

    if !recent.is_empty() {
        prompt.push_str("Recent Conversation:\n");
        for msg in recent {
            prompt.push_str(&format!("{}: {}\n", msg.sender.prompt_label(), msg.text));
        }
        prompt.push('\n');
    }

    if let Some(topic) = &options.current_topic {
        prompt.push_str(&format!("Current Topic: {}\n\n", topic));
    }

    prompt.push_str(&format!("Student: {}\n\nMentor:", user_message));
    prompt
}

pub fn analysis_prompt(response: &str, context: &str) -> String {
    format!(
        r#"Analyze this student response for:
1. Depth of reasoning
2. Critical thinking level
3. Areas for improvement
4. Suggested next steps

Student response: "{}"
Context: {}

Provide a brief analysis in JSON format with the keys reasoning_depth, critical_thinking, improvements and next_steps."#,
        response, context
    )
}

pub fn mentor_questions_prompt(profile: &StudentProfile, topic: &str) -> String {
    let profile_json = serde_json::to_string(profile).unwrap_or_default();
    format!(
        "{}\n\nStudent Profile: {}\n\nCurrent Topic: {}\n\nGenerate 3 probing questions for this topic that match the student's skill level. Questions should encourage critical thinking and reasoning.",
        MENTOR_SYSTEM_CONTEXT, profile_json, topic
    )
}

/// Pull a JSON document out of a model reply, tolerating ```json fences and prose
/// around the object.
pub fn extract_json_block(reply: &str) -> &str {
    let trimmed = reply.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::chat::{ChatMessage, Sender};

    fn history(n: usize) -> Vec<ChatMessage> {
        (1..=n)
            .map(|i| {
                let sender = if i % 2 == 1 { Sender::User } else { Sender::Assistant };
                ChatMessage::new(sender, format!("turn {i}"), chrono::Utc::now())
            })
            .collect()
    }

    #[test]
    fn test_window_keeps_six_most_recent_turns() {
        let history = history(10);
        let recent = recent_window(&history, 6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].text, "turn 5");
        assert_eq!(recent[5].text, "turn 10");

        let prompt =
            build_contextual_prompt(recent, &ProviderRequestOptions::default(), "next one");
        assert!(!prompt.contains("turn 4\n"));
        assert!(prompt.contains("Student: turn 5\n"));
        assert!(prompt.contains("Mentor: turn 10\n"));
    }

    #[test]
    fn test_short_history_is_kept_whole() {
        let history = history(2);
        assert_eq!(recent_window(&history, 6).len(), 2);
        assert!(recent_window(&[], 6).is_empty());
    }

    #[test]
    fn test_prompt_layout() {
        let options = ProviderRequestOptions::default().with_topic(Some("Gravity".into()));
        let prompt = build_contextual_prompt(&[], &options, "why do apples fall?");
        assert!(prompt.starts_with(MENTOR_SYSTEM_CONTEXT));
        assert!(!prompt.contains("Recent Conversation:"));
        assert!(!prompt.contains("Student Profile:"));
        assert!(prompt.contains("Current Topic: Gravity\n\n"));
        assert!(prompt.ends_with("Student: why do apples fall?\n\nMentor:"));
    }

    #[test]
    fn test_profile_is_embedded_as_json() {
        let mut rng = rand::thread_rng();
        let profile = StudentProfile::guest(&mut rng);
        let options = ProviderRequestOptions::default().with_profile(profile);
        let prompt = build_contextual_prompt(&[], &options, "hi");
        assert!(prompt.contains("Student Profile: {\"name\":\"Student\""));
    }

    #[test]
    fn test_extract_json_block() {
        assert_eq!(extract_json_block("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(
            extract_json_block("Here you go: {\"a\":1} hope it helps"),
            "{\"a\":1}"
        );
        assert_eq!(extract_json_block("no json"), "no json");
    }
}
