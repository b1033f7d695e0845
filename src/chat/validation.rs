use crate::chat::types::{ChatMessage, Role};
use crate::error::{AppError, Result};

/// Reject conversations the orchestrator cannot answer.
///
/// A conversation must be present, non-empty, and both start and end with a
/// user message. Runs before any collaborator is contacted.
pub fn validate_messages(messages: Option<&[ChatMessage]>) -> Result<&[ChatMessage]> {
    let messages = match messages {
        Some(messages) if !messages.is_empty() => messages,
        _ => {
            return Err(AppError::ValidationError(
                "message shouldn't be empty.".to_string(),
            ))
        }
    };

    if messages.first().map(|m| m.role) != Some(Role::User) {
        return Err(AppError::ValidationError(
            "The first message should be in user role.".to_string(),
        ));
    }

    if messages.last().map(|m| m.role) != Some(Role::User) {
        return Err(AppError::ValidationError(
            "The last message should be in user role.".to_string(),
        ));
    }

    Ok(messages)
}
