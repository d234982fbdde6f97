use serde::{Deserialize, Serialize};

/// The status string the backend reports when it is ready to serve.
pub const OPERATIONAL_STATUS: &str = "operational";

/// Response body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall backend status; `"operational"` when healthy.
    pub status: String,

    /// Backend clock at the time of the check, as sent.
    pub timestamp: String,

    /// Backend version.
    pub version: String,

    /// Status of the AI model behind the API.
    pub ai_model_status: String,
}

impl HealthStatus {
    /// Returns true if the backend reports itself operational.
    pub fn is_operational(&self) -> bool {
        self.status == OPERATIONAL_STATUS
    }
}
