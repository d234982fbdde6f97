//! The seam between chat state and the transport.
//!
//! [`ChatBackend`] is what the connection monitor and the chat session talk
//! to.  [`crate::NovaClient`] implements it over HTTP; tests substitute an
//! in-memory double.

use crate::error::Result;
use crate::types::{ChatHistory, ChatResponse, ClearAck, HealthStatus, ModelInfo};

/// The remote operations a chat session depends on.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Checks the backend's health endpoint.
    async fn check_health(&self) -> Result<HealthStatus>;

    /// Sends a user message, continuing the active session if there is one.
    async fn send_message(&self, text: &str, user_id: &str) -> Result<ChatResponse>;

    /// Fetches the history of the active session.
    async fn chat_history(&self) -> Result<ChatHistory>;

    /// Deletes the history of the active session.
    async fn clear_history(&self) -> Result<ClearAck>;

    /// Lists the models the backend can route to.
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Returns the active session id, if the backend has assigned one.
    fn session_id(&self) -> Option<String>;

    /// Forgets the active session id.
    fn reset_session(&self);
}
