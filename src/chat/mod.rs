//! Chat application module for interactive conversations with NOVA.
//!
//! This module provides the REPL-facing pieces built on top of the client
//! library:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: the message log and send state machine
//! - [`commands`]: slash command parsing
//! - [`render`]: terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_USER_ID, DEFAULT_WELCOME};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{
    CANCELLED_NOTICE, ChatSession, ClearOutcome, PendingSend, Rejection, SendOutcome, SessionState,
    SessionStats,
};
