use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Response body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Backend-assigned message id.
    pub id: String,

    /// The assistant's reply.
    pub content: String,

    /// When the backend produced the reply.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Name of the model that produced the reply.
    pub model_used: String,

    /// Seconds the backend spent producing the reply.
    pub processing_time: f64,

    /// Session the reply belongs to.
    #[serde(default)]
    pub session_id: Option<String>,
}
