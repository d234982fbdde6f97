//! Client library and chat state for the NOVA chat API.
//!
//! - [`NovaClient`] talks HTTP to the backend and owns the active session id.
//! - [`ConnectionMonitor`] derives an observable [`ConnectionStatus`] from
//!   health checks.
//! - [`chat::ChatSession`] holds the message log and the send state machine.

// Public modules
pub mod backend;
pub mod chat;
pub mod client;
pub mod connection;
pub mod error;
pub mod request_log;
pub mod types;
pub mod utils;

mod observability;

// Re-exports
pub use backend::ChatBackend;
pub use client::{ClientConfig, NovaClient};
pub use connection::{ConnectionMonitor, ConnectionStatus, ConnectionWatcher};
pub use error::{Error, ErrorKind, Result};
pub use observability::register_biometrics;
pub use request_log::{RequestLogger, RequestOutcome, RequestRecord, TracingLogger};
pub use types::*;
