use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::ChatResponse;

/// Id given to the welcome message.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

/// An entry in a chat session's message log.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Unique id within the log.
    pub id: String,

    /// When the message was produced.
    pub timestamp: OffsetDateTime,

    /// What the message says, and who said it.
    pub body: MessageBody,
}

/// The variants a logged message can take.
///
/// A message is exactly one of these, so a typing indicator can never also
/// be an error, and only assistant replies carry model metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// Text typed by the user.
    User {
        /// The trimmed text that was sent.
        content: String,
    },

    /// A reply from the assistant (or the local welcome greeting).
    Assistant {
        /// Reply text.
        content: String,
        /// Seconds the backend spent on the reply.
        processing_time_seconds: Option<f64>,
        /// Model that produced the reply.
        model_used: Option<String>,
    },

    /// A failed exchange, shown in place of a reply.
    Error {
        /// The failure's message.
        content: String,
    },

    /// Transient placeholder shown while a reply is pending.
    Typing,
}

impl Message {
    /// A message typed by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self::local(MessageBody::User {
            content: content.into(),
        })
    }

    /// An assistant reply built from a backend response.
    pub fn from_response(response: &ChatResponse) -> Self {
        Self {
            id: response.id.clone(),
            timestamp: response.timestamp,
            body: MessageBody::Assistant {
                content: response.content.clone(),
                processing_time_seconds: Some(response.processing_time),
                model_used: Some(response.model_used.clone()),
            },
        }
    }

    /// The greeting seeded into an empty log.
    pub fn welcome(content: impl Into<String>) -> Self {
        Self {
            id: WELCOME_MESSAGE_ID.to_string(),
            timestamp: OffsetDateTime::now_utc(),
            body: MessageBody::Assistant {
                content: content.into(),
                processing_time_seconds: None,
                model_used: None,
            },
        }
    }

    /// An error shown in place of a reply.
    pub fn error(content: impl Into<String>) -> Self {
        Self::local(MessageBody::Error {
            content: content.into(),
        })
    }

    /// The typing placeholder.
    pub fn typing() -> Self {
        Self::local(MessageBody::Typing)
    }

    fn local(body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: OffsetDateTime::now_utc(),
            body,
        }
    }

    /// Returns the text of the message; empty for the typing placeholder.
    pub fn content(&self) -> &str {
        match &self.body {
            MessageBody::User { content }
            | MessageBody::Assistant { content, .. }
            | MessageBody::Error { content } => content,
            MessageBody::Typing => "",
        }
    }

    /// Returns true if the user wrote this message.
    pub fn is_user(&self) -> bool {
        matches!(self.body, MessageBody::User { .. })
    }

    /// Returns true if this is an assistant reply.
    pub fn is_assistant(&self) -> bool {
        matches!(self.body, MessageBody::Assistant { .. })
    }

    /// Returns true if this message reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self.body, MessageBody::Error { .. })
    }

    /// Returns true if this is the typing placeholder.
    pub fn is_typing(&self) -> bool {
        matches!(self.body, MessageBody::Typing)
    }

    /// Returns true if this is the welcome greeting.
    pub fn is_welcome(&self) -> bool {
        self.id == WELCOME_MESSAGE_ID && self.is_assistant()
    }
}
