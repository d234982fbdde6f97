//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the session and is never sent to the
//! API as a message.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Clear the conversation, remotely when connected.
    Clear,

    /// Check the API health endpoint now.
    Check,

    /// Show the backend's history for the current session.
    History,

    /// List the models the API can route to.
    Models,

    /// Show the current session id.
    Session,

    /// Forget the session id so the next message starts a new session.
    Reset,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a message.
///
/// # Examples
///
/// ```
/// # use novachat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert_eq!(parse_command("/check"), Some(ChatCommand::Check));
/// assert!(parse_command("Bonjour NOVA").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "check" | "health" => ChatCommand::Check,
        "history" => ChatCommand::History,
        "models" => ChatCommand::Models,
        "session" => ChatCommand::Session,
        "reset" | "new" => ChatCommand::Reset,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "" => ChatCommand::Invalid("Empty command; try /help".to_string()),
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    if let Some(arg) = argument {
        if !matches!(result, ChatCommand::Invalid(_)) {
            return Some(ChatCommand::Invalid(format!(
                "/{command} takes no argument (got '{arg}')"
            )));
        }
    }

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear the conversation (server history too when connected)
  /check                 Check the NOVA API connection now
  /history               Show the server-side history of this session
  /models                List the available AI models
  /session               Show the current session id
  /reset                 Start a new session on the next message
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
