//! Core chat session state.
//!
//! [`ChatSession`] owns the ordered message log and the `Idle` /
//! `AwaitingResponse` state machine.  User intents (send, clear) and
//! connection changes are fed in; backend calls go through a
//! [`ChatBackend`].
//!
//! Only one send may be in flight.  [`ChatSession::begin_send`] appends the
//! user message and the typing placeholder and hands back a [`PendingSend`];
//! [`ChatSession::complete_send`] resolves it.  Any send attempted in between
//! is rejected, not queued.

use std::fmt;
use std::sync::Arc;

use crate::backend::ChatBackend;
use crate::chat::config::ChatConfig;
use crate::connection::ConnectionStatus;
use crate::error::{Error, Result};
use crate::observability::{
    SESSION_CLEARS, SESSION_SEND_FAILURES, SESSION_SEND_REJECTIONS, SESSION_SENDS,
};
use crate::types::{ChatHistory, ChatResponse, Message, ModelInfo};

/// Text logged in place of a reply the user gave up on.
pub const CANCELLED_NOTICE: &str = "Reply abandoned before it arrived";

/// Where a session is in its send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Ready to send.
    #[default]
    Idle,
    /// A send is in flight.
    AwaitingResponse,
}

/// Why a send was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The text was empty after trimming.
    Empty,
    /// Another send is still in flight.
    Busy,
    /// The backend is not reachable.
    Disconnected,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "message is empty"),
            Rejection::Busy => write!(f, "still waiting for the previous reply"),
            Rejection::Disconnected => write!(f, "the NOVA API is disconnected"),
        }
    }
}

/// A dispatched send awaiting its backend result.
#[derive(Debug)]
#[must_use = "a pending send must be completed or the session stays busy"]
pub struct PendingSend {
    text: String,
}

impl PendingSend {
    /// The trimmed text being sent.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The result of [`ChatSession::send_message`].
#[derive(Debug)]
pub enum SendOutcome {
    /// Nothing was appended and the backend was not called.
    Rejected(Rejection),
    /// The assistant replied; the reply is the last message in the log.
    Replied,
    /// The call failed; an error message is the last message in the log.
    Failed(Error),
    /// The caller gave up waiting; a notice is the last message in the log.
    Cancelled,
}

/// How [`ChatSession::clear_history`] cleared the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The backend deleted the session history too.
    Remote,
    /// Disconnected; only the local log was cleared.
    Local,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of messages in the log.
    pub message_count: usize,
    /// Messages typed by the user.
    pub user_messages: usize,
    /// Assistant replies, including the welcome message.
    pub assistant_messages: usize,
    /// Failed exchanges.
    pub error_messages: usize,
    /// The backend-assigned session id, if any.
    pub session_id: Option<String>,
    /// Whether the backend is reachable.
    pub connected: bool,
    /// Current send state.
    pub state: SessionState,
}

/// A chat session over a [`ChatBackend`].
pub struct ChatSession<B: ChatBackend + ?Sized> {
    backend: Arc<B>,
    connection: ConnectionStatus,
    config: ChatConfig,
    messages: Vec<Message>,
    state: SessionState,
}

impl<B: ChatBackend + ?Sized> ChatSession<B> {
    /// Creates a new, empty, idle session.
    pub fn new(backend: Arc<B>, connection: ConnectionStatus, config: ChatConfig) -> Self {
        Self {
            backend,
            connection,
            config,
            messages: Vec::new(),
            state: SessionState::Idle,
        }
    }

    /// Returns the message log in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages in the log.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the current send state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true while a send is in flight.
    pub fn is_awaiting_response(&self) -> bool {
        self.state == SessionState::AwaitingResponse
    }

    /// Returns whether the backend is reachable.
    pub fn is_connected(&self) -> bool {
        self.connection.get()
    }

    /// Returns the backend this session talks to.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the backend-assigned session id, if any.
    pub fn session_id(&self) -> Option<String> {
        self.backend.session_id()
    }

    /// Forgets the backend session; the next send starts a new one.
    pub fn reset_session(&mut self) {
        self.backend.reset_session();
    }

    /// Reacts to a connection change.
    ///
    /// When connected and the log is empty, the welcome message is seeded.
    /// Returns true if it was.
    pub fn on_connection_changed(&mut self, connected: bool) -> bool {
        connected && self.seed_welcome()
    }

    /// Reads the current connection status and reacts to it.
    ///
    /// Returns the connection status.
    pub fn sync_connection(&mut self) -> bool {
        let connected = self.connection.get();
        self.on_connection_changed(connected);
        connected
    }

    fn seed_welcome(&mut self) -> bool {
        if !self.messages.is_empty() {
            return false;
        }
        self.messages
            .push(Message::welcome(self.config.welcome_message.clone()));
        true
    }

    /// Dispatches a send: appends the user message and the typing
    /// placeholder and enters `AwaitingResponse`.
    ///
    /// # Errors
    ///
    /// Returns the rejection, with no state change, if the trimmed text is
    /// empty, a send is already in flight, or the backend is disconnected.
    pub fn begin_send(&mut self, text: &str) -> std::result::Result<PendingSend, Rejection> {
        let text = text.trim();
        let rejection = if text.is_empty() {
            Some(Rejection::Empty)
        } else if self.is_awaiting_response() {
            Some(Rejection::Busy)
        } else if !self.is_connected() {
            Some(Rejection::Disconnected)
        } else {
            None
        };
        if let Some(rejection) = rejection {
            SESSION_SEND_REJECTIONS.click();
            tracing::debug!(%rejection, "send rejected");
            return Err(rejection);
        }

        SESSION_SENDS.click();
        self.messages.push(Message::user(text));
        self.messages.push(Message::typing());
        self.state = SessionState::AwaitingResponse;
        Ok(PendingSend {
            text: text.to_string(),
        })
    }

    /// Resolves a dispatched send.
    ///
    /// The typing placeholder is removed and either the reply or an error
    /// message is appended.  The session is `Idle` afterwards in both cases.
    pub fn complete_send(
        &mut self,
        pending: PendingSend,
        result: Result<ChatResponse>,
    ) -> SendOutcome {
        let PendingSend { text } = pending;
        self.messages.retain(|message| !message.is_typing());
        self.state = SessionState::Idle;
        match result {
            Ok(response) => {
                tracing::debug!(
                    chars = text.len(),
                    model = %response.model_used,
                    processing_time = response.processing_time,
                    "reply received"
                );
                self.messages.push(Message::from_response(&response));
                SendOutcome::Replied
            }
            Err(err) => {
                SESSION_SEND_FAILURES.click();
                tracing::warn!(error = %err, "send failed");
                self.messages.push(Message::error(err.message()));
                SendOutcome::Failed(err)
            }
        }
    }

    /// Abandons a dispatched send without a backend result.
    ///
    /// The typing placeholder is replaced by a notice and the session returns
    /// to `Idle`; a reply arriving later is never appended.
    pub fn cancel_send(&mut self, pending: PendingSend) -> SendOutcome {
        let PendingSend { text } = pending;
        self.messages.retain(|message| !message.is_typing());
        self.state = SessionState::Idle;
        tracing::debug!(chars = text.len(), "send cancelled");
        self.messages.push(Message::error(CANCELLED_NOTICE));
        SendOutcome::Cancelled
    }

    /// Sends a message and waits for the reply.
    pub async fn send_message(&mut self, text: &str) -> SendOutcome {
        let pending = match self.begin_send(text) {
            Ok(pending) => pending,
            Err(rejection) => return SendOutcome::Rejected(rejection),
        };
        let backend = Arc::clone(&self.backend);
        let result = backend
            .send_message(pending.text(), &self.config.user_id)
            .await;
        self.complete_send(pending, result)
    }

    /// Clears the conversation.
    ///
    /// Connected: the backend history is deleted first; on success the log is
    /// emptied and the welcome message re-seeded, on failure the log is left
    /// untouched and the error returned.  Disconnected: the log is emptied and
    /// re-seeded locally without a network call.
    ///
    /// While a send is in flight the clear is refused with a busy error and
    /// nothing changes.
    pub async fn clear_history(&mut self) -> Result<ClearOutcome> {
        if self.is_awaiting_response() {
            tracing::debug!("clear refused while awaiting a reply");
            return Err(Error::busy());
        }
        let outcome = if self.is_connected() {
            self.backend.clear_history().await?;
            ClearOutcome::Remote
        } else {
            ClearOutcome::Local
        };
        SESSION_CLEARS.click();
        tracing::debug!(?outcome, "history cleared");
        self.messages.clear();
        self.seed_welcome();
        Ok(outcome)
    }

    /// Fetches the backend's record of this session.
    pub async fn fetch_history(&self) -> Result<ChatHistory> {
        self.backend.chat_history().await
    }

    /// Lists the models the backend can route to.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        self.backend.list_models().await
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            message_count: self.message_count(),
            user_messages: self.messages.iter().filter(|m| m.is_user()).count(),
            assistant_messages: self.messages.iter().filter(|m| m.is_assistant()).count(),
            error_messages: self.messages.iter().filter(|m| m.is_error()).count(),
            session_id: self.session_id(),
            connected: self.is_connected(),
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{FakeBackend, reply};
    use crate::types::MessageBody;

    fn session(connected: bool) -> (Arc<FakeBackend>, ConnectionStatus, ChatSession<FakeBackend>) {
        let backend = Arc::new(FakeBackend::default());
        let status = ConnectionStatus::new();
        status.set(connected);
        let mut session = ChatSession::new(backend.clone(), status.clone(), ChatConfig::default());
        session.sync_connection();
        (backend, status, session)
    }

    fn typing_count(session: &ChatSession<FakeBackend>) -> usize {
        session.messages().iter().filter(|m| m.is_typing()).count()
    }

    #[test]
    fn new_session_empty() {
        let backend = Arc::new(FakeBackend::default());
        let session = ChatSession::new(backend, ConnectionStatus::new(), ChatConfig::default());
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn welcome_seeded_once_on_connect() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = ChatSession::new(backend, ConnectionStatus::new(), ChatConfig::default());

        assert!(!session.on_connection_changed(false));
        assert_eq!(session.message_count(), 0);

        assert!(session.on_connection_changed(true));
        assert!(!session.on_connection_changed(true));
        assert!(!session.on_connection_changed(false));
        assert!(!session.on_connection_changed(true));
        assert_eq!(session.message_count(), 1);
        assert!(session.messages()[0].is_welcome());
    }

    #[tokio::test]
    async fn welcome_not_added_to_non_empty_log() {
        let (_backend, status, mut session) = session(true);
        session.send_message("hello").await;
        let before = session.messages().to_vec();

        status.set(false);
        session.sync_connection();
        status.set(true);
        session.sync_connection();
        assert_eq!(session.messages(), &before[..]);
    }

    #[tokio::test]
    async fn send_hello_appends_user_and_reply() {
        let (backend, _status, mut session) = session(true);
        let mut response = reply("Bonjour !");
        response.model_used = "nova-simulator".to_string();
        response.processing_time = 0.75;
        backend.push_chat(Ok(response));

        let outcome = session.send_message("hello").await;
        assert!(matches!(outcome, SendOutcome::Replied));
        assert_eq!(session.state(), SessionState::Idle);

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].is_welcome());
        assert_eq!(
            messages[1].body,
            MessageBody::User {
                content: "hello".to_string()
            }
        );
        assert_eq!(
            messages[2].body,
            MessageBody::Assistant {
                content: "Bonjour !".to_string(),
                processing_time_seconds: Some(0.75),
                model_used: Some("nova-simulator".to_string()),
            }
        );
        assert_eq!(backend.sent.lock().as_slice(), ["hello"]);
        assert_eq!(session.session_id().as_deref(), Some("session-1"));
    }

    #[tokio::test]
    async fn blank_text_is_never_sent() {
        let (backend, _status, mut session) = session(true);
        for text in ["", "   ", "\n\t "] {
            let outcome = session.send_message(text).await;
            assert!(matches!(outcome, SendOutcome::Rejected(Rejection::Empty)));
        }
        assert_eq!(session.message_count(), 1);
        assert_eq!(backend.chat_calls(), 0);
    }

    #[tokio::test]
    async fn disconnected_send_is_rejected() {
        let (backend, _status, mut session) = session(false);
        let outcome = session.send_message("hello").await;
        assert!(matches!(
            outcome,
            SendOutcome::Rejected(Rejection::Disconnected)
        ));
        assert_eq!(session.message_count(), 0);
        assert_eq!(backend.chat_calls(), 0);
    }

    #[tokio::test]
    async fn only_first_send_is_dispatched_while_awaiting() {
        let (backend, _status, mut session) = session(true);

        let pending = session.begin_send("first").unwrap();
        assert!(session.is_awaiting_response());
        assert_eq!(typing_count(&session), 1);

        for text in ["second", "third", "fourth"] {
            let outcome = session.send_message(text).await;
            assert!(matches!(outcome, SendOutcome::Rejected(Rejection::Busy)));
            assert!(matches!(session.begin_send(text), Err(Rejection::Busy)));
        }
        assert_eq!(backend.chat_calls(), 0);
        assert_eq!(typing_count(&session), 1);
        // welcome, user "first", typing
        assert_eq!(session.message_count(), 3);

        let result = backend.send_message(pending.text(), "user").await;
        let outcome = session.complete_send(pending, result);
        assert!(matches!(outcome, SendOutcome::Replied));
        assert_eq!(backend.chat_calls(), 1);
        assert_eq!(backend.sent.lock().as_slice(), ["first"]);

        // Resolution makes room for the next send.
        assert!(matches!(
            session.send_message("second").await,
            SendOutcome::Replied
        ));
        assert_eq!(backend.chat_calls(), 2);
    }

    #[tokio::test]
    async fn failed_send_appends_error_and_returns_to_idle() {
        let (backend, _status, mut session) = session(true);
        backend.push_chat(Err(Error::from_status(500, Some("Erreur IA: boom"))));

        let outcome = session.send_message("hello").await;
        let SendOutcome::Failed(err) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(err.status_code(), 500);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(typing_count(&session), 0);

        let last = session.messages().last().unwrap();
        assert!(last.is_error());
        assert_eq!(last.content(), err.message());
    }

    #[tokio::test]
    async fn resolution_always_removes_placeholder() {
        let (backend, _status, mut session) = session(true);
        backend.push_chat(Ok(reply("one")));
        backend.push_chat(Err(Error::transport("unreachable", None)));
        backend.push_chat(Ok(reply("three")));

        for text in ["a", "b", "c"] {
            let pending = session.begin_send(text).unwrap();
            assert_eq!(typing_count(&session), 1);
            let result = backend.send_message(pending.text(), "user").await;
            session.complete_send(pending, result);
            assert_eq!(typing_count(&session), 0);
            assert_eq!(session.state(), SessionState::Idle);
        }
        let stats = session.stats();
        assert_eq!(stats.user_messages, 3);
        assert_eq!(stats.assistant_messages, 3);
        assert_eq!(stats.error_messages, 1);
    }

    #[tokio::test]
    async fn clear_when_connected_reseeds_welcome() {
        let (backend, _status, mut session) = session(true);
        session.send_message("hello").await;
        assert_eq!(session.message_count(), 3);

        let outcome = session.clear_history().await.unwrap();
        assert_eq!(outcome, ClearOutcome::Remote);
        assert_eq!(backend.clear_calls(), 1);
        assert_eq!(session.message_count(), 1);
        assert!(session.messages()[0].is_welcome());
    }

    #[tokio::test]
    async fn failed_clear_leaves_log_unchanged() {
        let (backend, status, mut session) = session(true);
        session.send_message("hello").await;
        let before = session.messages().to_vec();

        backend.push_clear(Err(Error::from_status(404, Some("Session non trouvée"))));
        let err = session.clear_history().await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(session.messages(), &before[..]);
        assert!(status.get());
    }

    #[tokio::test]
    async fn clear_when_disconnected_is_local() {
        let (backend, status, mut session) = session(true);
        session.send_message("hello").await;
        status.set(false);

        let outcome = session.clear_history().await.unwrap();
        assert_eq!(outcome, ClearOutcome::Local);
        assert_eq!(backend.clear_calls(), 0);
        assert_eq!(session.message_count(), 1);
        assert!(session.messages()[0].is_welcome());
        assert_eq!(session.session_id().as_deref(), Some("session-1"));
    }

    #[tokio::test]
    async fn clear_refused_while_awaiting() {
        let (backend, _status, mut session) = session(true);
        let pending = session.begin_send("first").unwrap();
        let before = session.messages().to_vec();

        let err = session.clear_history().await.unwrap_err();
        assert!(err.is_busy());
        assert_eq!(backend.clear_calls(), 0);
        assert_eq!(session.messages(), &before[..]);
        assert_eq!(session.state(), SessionState::AwaitingResponse);

        let result = backend.send_message(pending.text(), "user").await;
        session.complete_send(pending, result);
        let messages = session.messages();
        assert!(messages[messages.len() - 2].is_user());
        assert!(messages[messages.len() - 1].is_assistant());

        assert_eq!(session.clear_history().await.unwrap(), ClearOutcome::Remote);
        assert_eq!(session.message_count(), 1);
    }

    #[tokio::test]
    async fn cancel_send_logs_notice_and_idles() {
        let (backend, status, mut session) = session(true);
        let pending = session.begin_send("hello").unwrap();

        let outcome = session.cancel_send(pending);
        assert!(matches!(outcome, SendOutcome::Cancelled));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(typing_count(&session), 0);
        let last = session.messages().last().unwrap();
        assert!(last.is_error());
        assert_eq!(last.content(), CANCELLED_NOTICE);
        assert!(status.get());
        assert_eq!(backend.chat_calls(), 0);

        assert!(matches!(
            session.send_message("again").await,
            SendOutcome::Replied
        ));
    }

    #[tokio::test]
    async fn reply_without_session_keeps_previous_id() {
        let (backend, _status, mut session) = session(true);
        session.send_message("hello").await;
        let mut response = reply("no session");
        response.session_id = None;
        backend.push_chat(Ok(response));

        session.send_message("again").await;
        assert_eq!(session.session_id().as_deref(), Some("session-1"));
    }

    #[tokio::test]
    async fn reset_session_forgets_id() {
        let (backend, _status, mut session) = session(true);
        session.send_message("hello").await;
        assert!(session.session_id().is_some());
        session.reset_session();
        assert!(session.session_id().is_none());
        assert!(backend.session_id().is_none());
        assert!(session.fetch_history().await.unwrap_err().is_no_active_session());
    }

    #[tokio::test]
    async fn passthrough_calls() {
        let (_backend, _status, mut session) = session(true);
        let models = session.list_models().await.unwrap();
        assert_eq!(models[0].model_name, "nova-simulator");

        session.send_message("hello").await;
        let history = session.fetch_history().await.unwrap();
        assert_eq!(history.session_id.as_deref(), Some("session-1"));
    }
}
