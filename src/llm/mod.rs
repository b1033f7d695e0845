//! Completion service access: the OpenAI-compatible HTTP plumbing shared with
//! the embedding client, and the chat completion client itself.

pub mod client;
pub mod http;
pub mod openai;
pub mod types;

pub use client::CompletionClient;
pub use http::{ApiClient, ApiError};
pub use openai::{OpenAiChatClient, MAX_TOOL_ITERATIONS};
pub use types::{CompletionError, CompletionResponse, Generation};
