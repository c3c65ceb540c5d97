//! Student profile types attached to every provider request as context.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Interests a demo student can be given
pub const DEMO_INTERESTS: &[&str] = &[
    "History",
    "Science",
    "Mathematics",
    "Literature",
    "Art",
    "Technology",
    "Philosophy",
    "Psychology",
    "Economics",
    "Politics",
];

/// Named skill -> score. Demo data only, never authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillProfile(BTreeMap<String, u32>);

impl SkillProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skill(mut self, name: impl Into<String>, score: u32) -> Self {
        self.0.insert(name.into(), score);
        self
    }

    pub fn score(&self, name: &str) -> Option<u32> {
        self.0.get(name).copied()
    }

    /// Random scores for a demo session: (skill, floor, spread)
    pub fn generate_demo<R: Rng + ?Sized>(rng: &mut R) -> Self {
        const RANGES: &[(&str, u32, u32)] = &[
            ("criticalThinking", 80, 20),
            ("creativity", 60, 30),
            ("analyticalReasoning", 85, 15),
            ("communication", 65, 25),
            ("research", 70, 20),
            ("patternRecognition", 75, 20),
        ];
        RANGES.iter().fold(Self::new(), |profile, (name, floor, spread)| {
            profile.with_skill(*name, floor + rng.gen_range(0..*spread))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Educator,
}

impl UserRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(UserRole::Student),
            "educator" => Some(UserRole::Educator),
            _ => None,
        }
    }
}

/// Profile serialized into the prompt as "Student Profile: {...}"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: UserRole,
    pub skills: SkillProfile,
    pub interests: Vec<String>,
    pub learning_style: String,
}

impl StudentProfile {
    /// Anonymous student with freshly generated demo skills.
    pub fn guest<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            name: "Student".into(),
            kind: UserRole::Student,
            skills: SkillProfile::generate_demo(rng),
            interests: demo_interests(rng),
            learning_style: "visual".into(),
        }
    }
}

/// Three distinct interests picked at random.
pub fn demo_interests<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    DEMO_INTERESTS
        .choose_multiple(rng, 3)
        .map(|s| s.to_string())
        .collect()
}

/// Per-request generation options for the provider adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequestOptions {
    pub user_profile: Option<StudentProfile>,
    pub current_topic: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_tokens: u32,
    pub stop_sequences: Vec<String>,
}

impl Default for ProviderRequestOptions {
    fn default() -> Self {
        Self {
            user_profile: None,
            current_topic: None,
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            max_tokens: 500,
            stop_sequences: Vec::new(),
        }
    }
}

impl ProviderRequestOptions {
    pub fn with_profile(mut self, profile: StudentProfile) -> Self {
        self.user_profile = Some(profile);
        self
    }

    pub fn with_topic(mut self, topic: Option<String>) -> Self {
        self.current_topic = topic;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_demo_skills_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let skills = SkillProfile::generate_demo(&mut rng);
            let scored = serde_json::to_value(&skills).unwrap();
            assert_eq!(scored.as_object().unwrap().len(), 6);
            assert!(skills.score("patternRecognition").is_some());
            let critical = skills.score("criticalThinking").unwrap();
            assert!((80..100).contains(&critical));
            let reasoning = skills.score("analyticalReasoning").unwrap();
            assert!((85..100).contains(&reasoning));
        }
    }

    #[test]
    fn test_guest_profile_serializes_camel_case() {
        let mut rng = StdRng::seed_from_u64(1);
        let profile = StudentProfile::guest(&mut rng);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["type"], "student");
        assert_eq!(json["learningStyle"], "visual");
        assert_eq!(json["interests"].as_array().unwrap().len(), 3);
        assert!(json["skills"]["creativity"].is_u64());
    }

    #[test]
    fn test_request_option_defaults() {
        let options = ProviderRequestOptions::default();
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.max_tokens, 500);
        assert_eq!(options.top_k, 40);
        assert!(options.user_profile.is_none());
    }
}
