//! Output rendering for the chat application.
//!
//! [`Renderer`] keeps the REPL loop independent of how output looks.  The
//! default implementation writes plain text with optional ANSI styling.

use std::io::{self, Stdout, Write};

use time::format_description::FormatItem;
use time::macros::format_description;

use crate::chat::session::SessionStats;
use crate::types::{ChatHistory, Message, MessageBody, ModelInfo};

/// ANSI escape code for dim text (used for metadata and the typing line).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for assistant replies).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for user messages).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for success lines).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

const CLOCK: &[FormatItem<'static>] = format_description!("[hour]:[minute]");

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print one message of the log.
    fn print_message(&mut self, message: &Message);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a confirmation.
    fn print_success(&mut self, text: &str) {
        self.print_info(text);
    }

    /// Print a connection change.
    fn print_connection(&mut self, connected: bool) {
        if connected {
            self.print_success("Connected to the NOVA API");
        } else {
            self.print_error("NOVA API unreachable; messages cannot be sent");
        }
    }

    /// Print the backend's history of a session.
    fn print_history(&mut self, history: &ChatHistory);

    /// Print the list of available models.
    fn print_models(&mut self, models: &[ModelInfo]);

    /// Print session statistics.
    fn print_stats(&mut self, stats: &SessionStats);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            out: io::stdout(),
            use_color,
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer writing to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self { out, use_color }
    }

    /// Consumes the renderer and returns its writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    // Output is best effort; a closed stdout must not abort the session.
    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_message(&mut self, message: &Message) {
        let clock = message.timestamp.format(CLOCK).unwrap_or_default();
        let stamp = self.styled(ANSI_DIM, &format!("[{clock}]"));
        match &message.body {
            MessageBody::User { content } => {
                let who = self.styled(ANSI_YELLOW, "you");
                self.line(&format!("{stamp} {who}: {content}"));
            }
            MessageBody::Assistant {
                content,
                processing_time_seconds,
                model_used,
            } => {
                let who = self.styled(ANSI_CYAN, "nova");
                self.line(&format!("{stamp} {who}: {content}"));
                let meta = match (processing_time_seconds, model_used) {
                    (Some(secs), Some(model)) => Some(format!("{secs:.2}s, {model}")),
                    (Some(secs), None) => Some(format!("{secs:.2}s")),
                    (None, Some(model)) => Some(model.clone()),
                    (None, None) => None,
                };
                if let Some(meta) = meta {
                    let meta = self.styled(ANSI_DIM, &format!("        ({meta})"));
                    self.line(&meta);
                }
            }
            MessageBody::Error { content } => {
                let who = self.styled(ANSI_RED, "error");
                self.line(&format!("{stamp} {who}: {content}"));
            }
            MessageBody::Typing => {
                let typing = self.styled(ANSI_DIM, "nova is typing...");
                self.line(&typing);
            }
        }
    }

    fn print_error(&mut self, error: &str) {
        let text = self.styled(ANSI_RED, &format!("Error: {error}"));
        self.line(&text);
    }

    fn print_info(&mut self, info: &str) {
        self.line(info);
    }

    fn print_success(&mut self, text: &str) {
        let text = self.styled(ANSI_GREEN, text);
        self.line(&text);
    }

    fn print_history(&mut self, history: &ChatHistory) {
        let session = history.session_id.as_deref().unwrap_or("unknown");
        let count = history
            .message_count
            .unwrap_or(history.messages.len() as u64);
        self.line(&format!("Session {session}: {count} exchange(s)"));
        if history.messages.is_empty() && history.session_id.is_none() {
            let raw = serde_json::to_string_pretty(&history.raw).unwrap_or_default();
            self.line(&raw);
            return;
        }
        for entry in &history.messages {
            let when = entry.timestamp.as_deref().unwrap_or("");
            let when = self.styled(ANSI_DIM, when);
            let you = self.styled(ANSI_YELLOW, "you");
            let nova = self.styled(ANSI_CYAN, "nova");
            self.line(&when);
            self.line(&format!("  {you}: {}", entry.user_message));
            self.line(&format!("  {nova}: {}", entry.ai_response));
        }
    }

    fn print_models(&mut self, models: &[ModelInfo]) {
        if models.is_empty() {
            self.line("No models available");
            return;
        }
        for model in models {
            let key = if model.api_key_configured {
                "key configured"
            } else {
                "no key"
            };
            let name = self.styled(ANSI_CYAN, &model.model_name);
            self.line(&format!(
                "{name} ({}): max_tokens={}, temperature={}, {key}",
                model.model_type, model.max_tokens, model.temperature
            ));
        }
    }

    fn print_stats(&mut self, stats: &SessionStats) {
        let connection = if stats.connected {
            "connected"
        } else {
            "disconnected"
        };
        self.line(&format!(
            "Messages: {} ({} from you, {} from nova, {} errors)",
            stats.message_count, stats.user_messages, stats.assistant_messages, stats.error_messages
        ));
        self.line(&format!(
            "Session: {}",
            stats.session_id.as_deref().unwrap_or("none")
        ));
        self.line(&format!("Connection: {connection}"));
        self.line(&format!("State: {:?}", stats.state));
    }
}
