use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One exchange recorded by the backend for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// What the user sent.
    pub user_message: String,

    /// What the assistant answered.
    pub ai_response: String,

    /// When the exchange was recorded, as sent.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response body of `GET /chat/history/{session_id}`.
///
/// The known fields are parsed leniently.  The full payload is kept in `raw`
/// so callers can reach fields this client does not model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatHistory {
    /// Session the history belongs to.
    pub session_id: Option<String>,

    /// Number of exchanges, as reported by the backend.
    pub message_count: Option<u64>,

    /// Recorded exchanges in order.
    pub messages: Vec<HistoryEntry>,

    /// The payload as received.
    pub raw: Value,
}

impl ChatHistory {
    /// Build a history view from a raw payload.
    pub fn from_value(raw: Value) -> Self {
        let session_id = raw
            .get("session_id")
            .and_then(Value::as_str)
            .map(String::from);
        let message_count = raw.get("message_count").and_then(Value::as_u64);
        let messages = raw
            .get("messages")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            session_id,
            message_count,
            messages,
            raw,
        }
    }
}

/// Response body of `DELETE /chat/history/{session_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearAck {
    /// Confirmation text from the backend, when supplied.
    #[serde(default)]
    pub message: Option<String>,
}

impl ClearAck {
    /// Build an acknowledgement from whatever the backend sent.  Bodies
    /// without a string `message` (including an empty body) yield `None`.
    pub fn from_value(raw: &Value) -> Self {
        let message = raw.get("message").and_then(Value::as_str).map(String::from);
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn history_known_shape() {
        let history = ChatHistory::from_value(json!({
            "session_id": "s-1",
            "message_count": 1,
            "messages": [{
                "user_message": "bonjour",
                "ai_response": "Bonjour à toi !",
                "timestamp": "2025-03-01T10:20:30.123456"
            }]
        }));

        assert_eq!(history.session_id.as_deref(), Some("s-1"));
        assert_eq!(history.message_count, Some(1));
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].ai_response, "Bonjour à toi !");
    }

    #[test]
    fn history_unknown_shape_is_kept() {
        let raw = json!({"entries": 3});
        let history = ChatHistory::from_value(raw.clone());
        assert!(history.session_id.is_none());
        assert!(history.messages.is_empty());
        assert_eq!(history.raw, raw);
    }

    #[test]
    fn clear_ack_tolerates_empty_body() {
        let ack: ClearAck = serde_json::from_value(json!({})).unwrap();
        assert!(ack.message.is_none());
    }

    #[test]
    fn clear_ack_from_any_shape() {
        assert_eq!(
            ClearAck::from_value(&json!({"message": "Historique supprimé"}))
                .message
                .as_deref(),
            Some("Historique supprimé")
        );
        assert!(ClearAck::from_value(&Value::Null).message.is_none());
        assert!(ClearAck::from_value(&json!("ok")).message.is_none());
        assert!(ClearAck::from_value(&json!({"message": 3})).message.is_none());
    }
}
