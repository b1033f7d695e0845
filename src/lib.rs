//! Acme Assist - retrieval-augmented shopping assistant
//!
//! This library exposes the chat pipeline and its collaborators so the
//! binary, integration tests and alternative front ends share one router.

pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod retrieval;
pub mod state;
pub mod tools;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

// Re-export key types for convenience
pub use chat::{ChatMessage, ChatService, Role};
pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::{chat_handler, health_handler, ready_handler};
pub use state::AppState;

/// Chat and health routes. Middleware and `/metrics` are added by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ai/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}
