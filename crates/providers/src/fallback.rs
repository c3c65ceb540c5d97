//! Locally chosen replies used whenever the provider cannot answer.

use rand::seq::SliceRandom;
use rand::Rng;

pub const GENERIC_FALLBACKS: [&str; 5] = [
    "I'm having trouble connecting right now, but let me ask you this: What do you think is the most important aspect of what you just shared?",
    "While I process that, can you tell me what led you to that conclusion? What evidence supports your thinking?",
    "That's interesting! Even though I'm experiencing some technical difficulties, I'd love to hear more about your reasoning process.",
    "Let me think about that while my systems recover. In the meantime, what questions does this topic raise for you?",
    "I'm experiencing some connectivity issues, but your question is thought-provoking. What alternative perspectives might exist on this topic?",
];

pub const HELP_FALLBACK: &str = "I want to help you explore this topic! While I reconnect, think about: What specific aspect challenges you the most?";
pub const WHY_HOW_FALLBACK: &str = "Great question! While my systems restart, consider: What factors might influence the answer to your question?";
pub const WHAT_FALLBACK: &str = "That's a thoughtful inquiry. As I recover from technical issues, reflect on: What do you already know that might relate to this?";

/// Questions offered when generated ones could not be parsed
pub const DEFAULT_TOPIC_QUESTIONS: [&str; 3] = [
    "What patterns do you notice in this topic?",
    "How might this connect to something you already know?",
    "What would happen if we changed one key element here?",
];

/// Questions offered when question generation failed outright
pub const OFFLINE_TOPIC_QUESTIONS: [&str; 3] = [
    "What interests you most about this topic?",
    "What questions does this raise for you?",
    "How would you explain this to someone else?",
];

/// Keyword rules are checked in order: help, why/how, what. Anything else gets a
/// random generic reply.
pub fn fallback_response<R: Rng + ?Sized>(user_message: &str, rng: &mut R) -> String {
    let lower = user_message.to_lowercase();
    if lower.contains("help") {
        HELP_FALLBACK.to_string()
    } else if lower.contains("why") || lower.contains("how") {
        WHY_HOW_FALLBACK.to_string()
    } else if lower.contains("what") {
        WHAT_FALLBACK.to_string()
    } else {
        GENERIC_FALLBACKS
            .choose(rng)
            .copied()
            .unwrap_or(GENERIC_FALLBACKS[0])
            .to_string()
    }
}
