use serde::{Deserialize, Serialize};

/// Request body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message, trimmed.
    pub message: String,

    /// Identifier of the user sending the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Session to continue; omitted on the first turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// Create a new request, trimming surrounding whitespace from the message.
    pub fn new(message: impl AsRef<str>) -> Self {
        Self {
            message: message.as_ref().trim().to_string(),
            user_id: None,
            session_id: None,
        }
    }

    /// Set the user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session id to continue.
    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn first_turn_omits_session() {
        let request = ChatRequest::new("  hello \n").with_user_id("user");
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "message": "hello",
                "user_id": "user"
            })
        );
    }

    #[test]
    fn follow_up_carries_session() {
        let request = ChatRequest::new("again")
            .with_user_id("agent")
            .with_session_id(Some("abc".to_string()));
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "message": "again",
                "user_id": "agent",
                "session_id": "abc"
            })
        );
    }
}
