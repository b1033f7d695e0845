//! The chat pipeline: validation, prompt assembly, orchestration and answer
//! annotation.

pub mod annotate;
pub mod prompt;
pub mod service;
pub mod types;
pub mod validation;

pub use annotate::annotate;
pub use prompt::{document_block, PromptError, PromptTemplates};
pub use service::ChatService;
pub use types::{ChatMessage, Role};
pub use validation::validate_messages;
