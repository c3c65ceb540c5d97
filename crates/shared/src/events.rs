//! Render events emitted by the chat session for whatever front end is attached.

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatEvent {
    /// Chat surface became visible
    Opened,
    /// Chat surface was hidden
    Closed,
    /// A complete message joined the transcript
    MessageAppended(ChatMessage),
    /// "Mentor is typing" indicator shown
    TypingStarted,
    /// Indicator removed (reply arrived, fallback included)
    TypingStopped,
    /// Character-by-character reveal of a reply is starting
    StreamStarted,
    /// Next revealed character
    StreamDelta(char),
    /// Reveal finished; the full reply follows as `MessageAppended`
    StreamFinished,
    /// Transcript was emptied; the new greeting follows as `MessageAppended`
    Cleared,
}
