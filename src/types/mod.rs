// Public modules
pub mod chat_history;
pub mod chat_request;
pub mod chat_response;
pub mod health_status;
pub mod message;
pub mod model_info;

// Re-exports
pub use chat_history::{ChatHistory, ClearAck, HistoryEntry};
pub use chat_request::ChatRequest;
pub use chat_response::ChatResponse;
pub use health_status::{HealthStatus, OPERATIONAL_STATUS};
pub use message::{Message, MessageBody, WELCOME_MESSAGE_ID};
pub use model_info::ModelInfo;
