use shared::profile::UserRole;

pub const HELP: &str = "\
Type a message to talk to your mentor, or use a command:
  /open /close          show or hide the chat
  /clear                start over
  /mentor on|off        probing follow-up questions
  /topic <topic>        set the current topic (no argument clears it)
  /insights             learning insights recorded so far
  /export               print the transcript
  /stats                message counts
  /login <user> <password> <student|educator>
  /logout
  /quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Open,
    Close,
    Clear,
    Mentor(bool),
    Topic(Option<String>),
    Insights,
    Export,
    Stats,
    Login {
        username: String,
        password: String,
        role: UserRole,
    },
    Logout,
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    /// `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Command::Say(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let command = match name.to_ascii_lowercase().as_str() {
            "open" => Command::Open,
            "close" => Command::Close,
            "clear" => Command::Clear,
            "mentor" => match arg.to_ascii_lowercase().as_str() {
                "on" => Command::Mentor(true),
                "off" => Command::Mentor(false),
                _ => Command::Invalid("usage: /mentor on|off".into()),
            },
            "topic" => Command::Topic((!arg.is_empty()).then(|| arg.to_string())),
            "insights" => Command::Insights,
            "export" => Command::Export,
            "stats" => Command::Stats,
            "login" => parse_login(arg),
            "logout" => Command::Logout,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Invalid(format!("unknown command /{other}, try /help")),
        };
        Some(command)
    }
}

fn parse_login(arg: &str) -> Command {
    let parts: Vec<&str> = arg.split_whitespace().collect();
    match parts.as_slice() {
        [username, password, role] => match UserRole::parse(role) {
            Some(role) => Command::Login {
                username: username.to_string(),
                password: password.to_string(),
                role,
            },
            None => Command::Invalid(format!("unknown role '{role}'")),
        },
        _ => Command::Invalid("usage: /login <user> <password> <student|educator>".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_are_messages() {
        assert_eq!(Command::parse("   "), None);
        assert_eq!(
            Command::parse("  why is the sky blue? "),
            Some(Command::Say("why is the sky blue?".into()))
        );
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(Command::parse("/mentor OFF"), Some(Command::Mentor(false)));
        assert!(matches!(
            Command::parse("/mentor maybe"),
            Some(Command::Invalid(_))
        ));
        assert_eq!(
            Command::parse("/topic  Plate tectonics "),
            Some(Command::Topic(Some("Plate tectonics".into())))
        );
        assert_eq!(Command::parse("/topic"), Some(Command::Topic(None)));
        assert_eq!(
            Command::parse("/login admin demo educator"),
            Some(Command::Login {
                username: "admin".into(),
                password: "demo".into(),
                role: UserRole::Educator,
            })
        );
        assert!(matches!(
            Command::parse("/login admin demo"),
            Some(Command::Invalid(_))
        ));
        assert!(matches!(
            Command::parse("/dance"),
            Some(Command::Invalid(_))
        ));
        assert_eq!(Command::parse("/exit"), Some(Command::Quit));
    }
}
