// Public modules
pub mod chat_completion_chunk;
pub mod chat_completion_request;
pub mod chat_message;
pub mod chat_role;
pub mod error_response;
pub mod execution_settings;

// Re-exports
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use chat_completion_request::ChatCompletionRequest;
pub use chat_message::ChatMessage;
pub use chat_role::ChatRole;
pub use error_response::{ErrorDetail, ErrorResponse};
pub use execution_settings::ExecutionSettings;
