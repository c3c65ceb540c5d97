use anyhow::{Context, Result};
use shared::settings::MentorSettings;
use std::fs;
use std::path::{Path, PathBuf};

fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com.local", "AI Mentor", "AIMentor").map(|proj| {
        let dir = proj.config_dir().to_path_buf();
        let _ = fs::create_dir_all(&dir);
        dir
    })
}

pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("settings.json"))
}

/// Where user, auth, insight and mentor-mode state lives between runs
pub fn store_path() -> PathBuf {
    config_dir()
        .map(|d| d.join("state.json"))
        .unwrap_or_else(|| PathBuf::from("./mentor-state.json"))
}

pub fn read_settings(path: &Path) -> Result<MentorSettings> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

/// Settings from disk, or defaults on a fresh install. A `GEMINI_API_KEY`
/// environment variable replaces whatever key is stored.
pub fn load_settings_or_default() -> MentorSettings {
    let mut settings = match settings_path() {
        Some(path) if path.exists() => read_settings(&path).unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{e:#}"), "ignoring unreadable settings");
            MentorSettings::default()
        }),
        _ => MentorSettings::default(),
    };
    apply_key_override(&mut settings, std::env::var("GEMINI_API_KEY").ok());
    settings
}

fn apply_key_override(settings: &mut MentorSettings, key: Option<String>) {
    if let Some(key) = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
        settings.provider.auth.api_key = Some(key);
    }
}
