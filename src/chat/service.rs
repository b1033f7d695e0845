//! The chat orchestrator.
//!
//! # Flow
//! 1. Validate the conversation
//! 2. Resolve the optional product id
//! 3. Retrieve related documents for the last user message
//! 4. Render the system prompt (generic or product-aware)
//! 5. Open the request's tool sessions
//! 6. Call the completion service once, then release the tool sessions
//! 7. Annotate product names in the answers

use crate::catalog::{Product, ProductRepository};
use crate::chat::annotate::annotate;
use crate::chat::prompt::PromptTemplates;
use crate::chat::types::ChatMessage;
use crate::chat::validation::validate_messages;
use crate::error::Result;
use crate::llm::{CompletionClient, CompletionResponse};
use crate::retrieval::{SearchRequest, VectorStore};
use crate::tools::{ToolConnector, ToolEndpoint, ToolSet};
use std::sync::Arc;

pub struct ChatService {
    store: Arc<dyn VectorStore>,
    products: Arc<dyn ProductRepository>,
    completion: Arc<dyn CompletionClient>,
    connector: Arc<dyn ToolConnector>,
    endpoints: Vec<ToolEndpoint>,
    prompts: Arc<PromptTemplates>,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn VectorStore>,
        products: Arc<dyn ProductRepository>,
        completion: Arc<dyn CompletionClient>,
        connector: Arc<dyn ToolConnector>,
        endpoints: Vec<ToolEndpoint>,
        prompts: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            store,
            products,
            completion,
            connector,
            endpoints,
            prompts,
        }
    }

    pub fn endpoints(&self) -> &[ToolEndpoint] {
        &self.endpoints
    }

    /// Answer a conversation, optionally about one product.
    pub async fn chat(
        &self,
        messages: Option<&[ChatMessage]>,
        product_id: Option<&str>,
    ) -> Result<Vec<String>> {
        let messages = validate_messages(messages)?;
        let question = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let product = self.resolve_product(product_id).await?;
        let path = if product.is_some() { "product" } else { "generic" };
        metrics::counter!("chat_requests_total", "path" => path).increment(1);

        let documents = self
            .store
            .similarity_search(&SearchRequest::for_question(question))
            .await?;

        tracing::debug!(path, documents = documents.len(), "Retrieved context");

        let system = match &product {
            Some(product) => self.prompts.render_with_product(product, &documents)?,
            None => self.prompts.render_without_product(&documents)?,
        };

        let mut prompt = Vec::with_capacity(messages.len() + 1);
        prompt.push(system);
        prompt.extend_from_slice(messages);

        let response = self.invoke(&prompt).await?;

        let catalog = self.products.list().await?;
        let answers = annotate(&response.generations, &catalog);

        tracing::debug!(
            generations = response.generations.len(),
            answers = answers.len(),
            "Chat completed"
        );

        Ok(answers)
    }

    /// Look up the product a conversation is about. Blank ids skip the lookup.
    pub async fn resolve_product(&self, product_id: Option<&str>) -> Result<Option<Product>> {
        let id = match product_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Ok(None),
        };

        let product = self.products.find_by_id(id).await?;
        if product.is_none() {
            tracing::debug!(product_id = id, "Product not found, answering generically");
        }
        Ok(product)
    }

    /// Open the tool sessions, call the model, and release the sessions
    /// whatever the outcome.
    async fn invoke(&self, prompt: &[ChatMessage]) -> Result<CompletionResponse> {
        let tools = ToolSet::open(self.connector.as_ref(), &self.endpoints).await?;

        let result = self.completion.complete(prompt, &tools).await;
        tools.close().await;

        Ok(result?)
    }
}
