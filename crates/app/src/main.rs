use anyhow::Result;
use mentor::{ChatSession, DemoAuth, LocalStore};
use providers::{GeminiClient, MentorProvider};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use commands::{Command, HELP};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = config::load_settings_or_default();
    let store = Arc::new(LocalStore::open(config::store_path()));
    let auth = DemoAuth::new(store.clone());

    let gemini = GeminiClient::from_settings(&settings.provider)?;
    if !gemini.has_credentials() {
        tracing::warn!("no Gemini API key configured; the mentor will answer with offline replies");
    }
    let provider = Arc::new(
        MentorProvider::new(Arc::new(gemini)).with_history_window(settings.history_window),
    );

    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let renderer = tokio::spawn(render::run(events_rx));

    let session = ChatSession::builder(provider, store)
        .settings(settings)
        .profile(auth.profile())
        .events(events_tx)
        .build();
    session.open();
    println!("{HELP}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        match command {
            Command::Say(text) => session.submit(&text).await,
            Command::Open => session.open(),
            Command::Close => session.close(),
            Command::Clear => session.clear(),
            Command::Mentor(enabled) => session.toggle_mentor_mode(enabled),
            Command::Topic(topic) => session.set_current_topic(topic),
            Command::Insights => print_insights(&session),
            Command::Export => println!("{}\n", session.export_transcript()),
            Command::Stats => println!("{}\n", serde_json::to_string_pretty(&session.stats())?),
            Command::Login {
                username,
                password,
                role,
            } => match auth.login(&username, &password, role) {
                Ok(user) => {
                    session.set_profile(user.to_profile());
                    println!("Logged in as {} ({:?}).\n", user.username, user.user_type);
                }
                Err(e) => println!("{e}\n"),
            },
            Command::Logout => {
                auth.logout()?;
                session.clear();
                session.set_profile(auth.profile());
                println!("Logged out.\n");
            }
            Command::Help => println!("{HELP}\n"),
            Command::Quit => break,
            Command::Invalid(reason) => println!("{reason}\n"),
        }
    }

    session.close();
    drop(session);
    let _ = renderer.await;
    Ok(())
}

fn print_insights(session: &ChatSession) {
    let log = session.insights();
    if log.is_empty() {
        println!("No learning insights yet.\n");
        return;
    }
    for entry in log.entries() {
        let topic = entry.topic.as_deref().unwrap_or("general discussion");
        println!("{} [{}]", entry.timestamp.to_rfc3339(), topic);
        if let Some(depth) = &entry.insight.reasoning_depth {
            println!("  reasoning depth: {depth}");
        }
        if let Some(critical) = &entry.insight.critical_thinking {
            println!("  critical thinking: {critical}");
        }
        for item in &entry.insight.improvements {
            println!("  improve: {item}");
        }
        for step in &entry.insight.next_steps {
            println!("  next: {step}");
        }
    }
    println!();
}
