// Public modules
pub mod cli;
pub mod client;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;
pub mod observability;
pub mod render;
pub mod session;
pub mod types;

mod sse;

// Re-exports
pub use cli::{ArgsError, Params, parse_args, usage};
pub use client::{ChunkStream, OpenAI};
pub use completion::{complete, stream_completion, with_deadline};
pub use config::{ApiType, ClientConfig, model_from_env};
pub use conversation::{append_messages, completion_request, new_completion_request};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use session::SessionStore;
pub use types::*;
