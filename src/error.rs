//! Error types for the NOVA client.
//!
//! Every failure surfaced by [`crate::NovaClient`] has the same shape: a
//! kind, a human-readable message, the HTTP status code (0 when no response
//! was received), and the time the error was constructed.  Callers therefore
//! need a single handling path, and can still branch on the kind when they
//! care.

use std::error;
use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;

/// Status code recorded when no HTTP response was received.
pub const NO_RESPONSE_STATUS: u16 = 0;

/// The category of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response reached the client (connect failure, timeout, reset).
    Transport,
    /// The backend answered 404.
    NotFound,
    /// The backend answered 422.
    Validation,
    /// The backend answered 500.
    InternalServer,
    /// The backend answered with any other non-success status.
    Http,
    /// A history call was made before the backend assigned a session.
    NoActiveSession,
    /// The session refused the call because a send is still in flight.
    Busy,
    /// A success response carried a body that could not be decoded.
    Decode,
    /// The client could not be constructed from its configuration.
    Configuration,
}

impl ErrorKind {
    /// Maps an HTTP status code to its error kind.
    pub fn from_status(status_code: u16) -> Self {
        match status_code {
            NO_RESPONSE_STATUS => ErrorKind::Transport,
            404 => ErrorKind::NotFound,
            422 => ErrorKind::Validation,
            500 => ErrorKind::InternalServer,
            _ => ErrorKind::Http,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::NotFound => "not found",
            ErrorKind::Validation => "validation",
            ErrorKind::InternalServer => "internal server",
            ErrorKind::Http => "http",
            ErrorKind::NoActiveSession => "no active session",
            ErrorKind::Busy => "busy",
            ErrorKind::Decode => "decode",
            ErrorKind::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// The error type for every NOVA API operation.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status_code: u16,
    timestamp: OffsetDateTime,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code,
            timestamp: OffsetDateTime::now_utc(),
            source: None,
        }
    }

    fn with_source(mut self, source: Option<Box<dyn error::Error + Send + Sync>>) -> Self {
        self.source = source.map(Arc::from);
        self
    }

    /// Creates a transport error: the request never produced a response.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Self::new(ErrorKind::Transport, message, NO_RESPONSE_STATUS).with_source(source)
    }

    /// Creates the error for a non-success HTTP status.
    ///
    /// The message is the canonical text for the status, followed by the
    /// backend's `detail` when one was supplied.
    pub fn from_status(status_code: u16, detail: Option<&str>) -> Self {
        let kind = ErrorKind::from_status(status_code);
        let base = match kind {
            ErrorKind::NotFound => "The requested resource was not found on the NOVA API".to_string(),
            ErrorKind::Validation => "The NOVA API rejected the request as invalid".to_string(),
            ErrorKind::InternalServer => {
                "The NOVA API encountered an internal server error".to_string()
            }
            ErrorKind::Transport => return Self::transport(UNREACHABLE_MESSAGE, None),
            _ => format!("The NOVA API answered with HTTP status {status_code}"),
        };
        let message = match detail.map(str::trim).filter(|d| !d.is_empty()) {
            Some(detail) => format!("{base}: {detail}"),
            None => base,
        };
        Self::new(kind, message, status_code)
    }

    /// Creates the local precondition error for history calls.
    pub fn no_active_session() -> Self {
        Self::new(
            ErrorKind::NoActiveSession,
            "No active session: send a message first",
            NO_RESPONSE_STATUS,
        )
    }

    /// Creates the local error for a call refused while a send is pending.
    pub fn busy() -> Self {
        Self::new(
            ErrorKind::Busy,
            "Still waiting for the previous reply",
            NO_RESPONSE_STATUS,
        )
    }

    /// Creates a decode error for an unreadable success body.
    pub fn decode(
        status_code: u16,
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Self::new(ErrorKind::Decode, message, status_code).with_source(source)
    }

    /// Creates a configuration error.
    pub fn configuration(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Self::new(ErrorKind::Configuration, message, NO_RESPONSE_STATUS).with_source(source)
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code, or 0 when no response was received.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns when the error was constructed.
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Returns true if no response reached the client.
    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }

    /// Returns true if this error is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns true if the backend rejected the request as invalid.
    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    /// Returns true if the backend failed internally.
    pub fn is_server_error(&self) -> bool {
        self.kind == ErrorKind::InternalServer
    }

    /// Returns true if the call was refused locally for lack of a session.
    pub fn is_no_active_session(&self) -> bool {
        self.kind == ErrorKind::NoActiveSession
    }

    /// Returns true if the call was refused because a send is pending.
    pub fn is_busy(&self) -> bool {
        self.kind == ErrorKind::Busy
    }

    /// Returns true if this error reached the network.
    ///
    /// Local precondition and configuration failures never touch the
    /// connection state; everything else is evidence of lost connectivity.
    pub fn affects_connection(&self) -> bool {
        !matches!(
            self.kind,
            ErrorKind::NoActiveSession | ErrorKind::Busy | ErrorKind::Configuration
        )
    }
}

pub(crate) const UNREACHABLE_MESSAGE: &str =
    "Unable to reach the NOVA API. Check that the server is running and reachable";

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status_code == NO_RESPONSE_STATUS {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} (HTTP {})", self.message, self.status_code)
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn error::Error + 'static))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::decode(
            NO_RESPONSE_STATUS,
            format!("JSON error: {err}"),
            Some(Box::new(err)),
        )
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::configuration(format!("URL parse error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for NOVA operations.
pub type Result<T> = std::result::Result<T, Error>;
