//! Terminal rendering of session events.

use shared::events::ChatEvent;
use std::io::Write;
use tokio::sync::mpsc::UnboundedReceiver;

const MENTOR_LABEL: &str = "AI Mentor";

#[derive(Debug, Default)]
pub struct Renderer {
    streaming: bool,
    /// The next assistant `MessageAppended` repeats a reply already streamed
    just_streamed: bool,
    /// Assistant messages that arrived mid-reveal, printed once it ends
    held: Vec<String>,
}

impl Renderer {
    /// Text to write for `event`, if any. Student messages are not echoed since
    /// the student just typed them.
    pub fn render(&mut self, event: ChatEvent) -> Option<String> {
        match event {
            ChatEvent::Opened => Some("[chat opened]\n".into()),
            ChatEvent::Closed => Some("[chat closed]\n".into()),
            ChatEvent::TypingStarted => Some(format!("{MENTOR_LABEL} is typing...\n")),
            ChatEvent::TypingStopped => None,
            ChatEvent::StreamStarted => {
                self.streaming = true;
                Some(format!("{MENTOR_LABEL}: "))
            }
            ChatEvent::StreamDelta(ch) => self.streaming.then(|| ch.to_string()),
            ChatEvent::StreamFinished => {
                self.streaming = false;
                self.just_streamed = true;
                Some(format!("\n\n{}", self.held.drain(..).collect::<String>()))
            }
            ChatEvent::MessageAppended(message) => {
                if message.is_user() {
                    return None;
                }
                if std::mem::take(&mut self.just_streamed) {
                    return None;
                }
                let line = format!("{MENTOR_LABEL}: {}\n\n", message.text);
                if self.streaming {
                    self.held.push(line);
                    return None;
                }
                Some(line)
            }
            ChatEvent::Cleared => {
                let cut = if std::mem::take(&mut self.streaming) {
                    "\n"
                } else {
                    ""
                };
                self.just_streamed = false;
                let held: String = self.held.drain(..).collect();
                Some(format!("{cut}{held}--- chat cleared ---\n"))
            }
        }
    }
}

/// Print events until every sender is gone.
pub async fn run(mut events: UnboundedReceiver<ChatEvent>) {
    let mut renderer = Renderer::default();
    while let Some(event) = events.recv().await {
        if let Some(text) = renderer.render(event) {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::chat::ChatMessage;

    fn render_all(events: Vec<ChatEvent>) -> String {
        let mut renderer = Renderer::default();
        events
            .into_iter()
            .filter_map(|e| renderer.render(e))
            .collect()
    }

    #[test]
    fn test_streamed_reply_is_printed_once() {
        let mut events = vec![
            ChatEvent::MessageAppended(ChatMessage::user("hi")),
            ChatEvent::TypingStarted,
            ChatEvent::TypingStopped,
            ChatEvent::StreamStarted,
        ];
        events.extend("Why?".chars().map(ChatEvent::StreamDelta));
        events.push(ChatEvent::StreamFinished);
        events.push(ChatEvent::MessageAppended(ChatMessage::assistant("Why?")));
        events.push(ChatEvent::MessageAppended(ChatMessage::assistant(
            "What else?",
        )));

        assert_eq!(
            render_all(events),
            "AI Mentor is typing...\nAI Mentor: Why?\n\nAI Mentor: What else?\n\n"
        );
    }

    #[test]
    fn test_message_during_reveal_waits_for_the_line_to_end() {
        let mut events = vec![ChatEvent::StreamStarted, ChatEvent::StreamDelta('O')];
        events.push(ChatEvent::MessageAppended(ChatMessage::assistant(
            "What made you curious?",
        )));
        events.push(ChatEvent::StreamDelta('k'));
        events.push(ChatEvent::StreamFinished);
        events.push(ChatEvent::MessageAppended(ChatMessage::assistant("Ok")));

        assert_eq!(
            render_all(events),
            "AI Mentor: Ok\n\nAI Mentor: What made you curious?\n\n"
        );
    }

    #[test]
    fn test_clear_mid_stream_ends_the_line() {
        let out = render_all(vec![
            ChatEvent::StreamStarted,
            ChatEvent::StreamDelta('A'),
            ChatEvent::Cleared,
            ChatEvent::MessageAppended(ChatMessage::assistant("Chat cleared.")),
        ]);
        assert_eq!(
            out,
            "AI Mentor: A\n--- chat cleared ---\nAI Mentor: Chat cleared.\n\n"
        );
    }
}
