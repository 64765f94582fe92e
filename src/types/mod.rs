// Public modules
pub mod chat_completion_chunk;
pub mod chat_completion_message;
pub mod chat_completion_request;

// Re-exports
pub use chat_completion_chunk::{
    ChatCompletionChunk, ChatCompletionChunkChoice, ChatCompletionDelta,
};
pub use chat_completion_message::{ChatCompletionMessage, ChatMessageRole};
pub use chat_completion_request::ChatCompletionRequest;
