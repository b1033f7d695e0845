use crate::chat::ChatMessage;
use crate::llm::types::{CompletionError, CompletionResponse};
use crate::tools::ToolSet;
use async_trait::async_trait;

/// The chat completion service.
///
/// One call per chat request. Any tool round trips the model asks for happen
/// inside the implementation, against the request's [`ToolSet`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &ToolSet,
    ) -> Result<CompletionResponse, CompletionError>;
}
