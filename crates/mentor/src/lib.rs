//! Mentor - chat orchestration for the AI mentor
//!
//! - `ChatSession`: transcript, typing/streaming reveal, periodic mentor check
//! - `MentorScheduler`: follow-up question queue and idle detection
//! - `InsightRecorder`: per-message learning analysis, capped and persisted
//! - `LocalStore`: small JSON key-value file for user, auth and insight state
//! - `DemoAuth`: fixed demo accounts

pub mod auth;
pub mod clock;
pub mod insights;
pub mod scheduler;
pub mod session;
pub mod store;

pub use auth::{DemoAuth, DemoUser};
pub use clock::SessionClock;
pub use insights::InsightRecorder;
pub use scheduler::MentorScheduler;
pub use session::{ChatSession, ChatSessionBuilder, ChatStats, ConversationPhase, WidgetState};
pub use store::LocalStore;
