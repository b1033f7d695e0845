use crate::catalog::JsonProductRepository;
use crate::chat::{ChatService, PromptTemplates};
use crate::config::Config;
use crate::llm::{ApiClient, OpenAiChatClient};
use crate::retrieval::{OpenAiEmbeddingClient, SimpleVectorStore};
use crate::tools::{build_http_client, McpConnector};
use anyhow::Context;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all request handlers.
/// Everything behind it is read-only after bootstrap.
pub struct AppState {
    pub chat: ChatService,
    /// Flag indicating the service is ready (all collaborators built)
    pub ready: AtomicBool,
}

impl AppState {
    /// Build every collaborator from configuration.
    ///
    /// Order: prompt templates, product catalog, embedding client and vector
    /// store, the shared tool endpoint HTTP/TLS client, the tool connector,
    /// the completion client, then the orchestrator. Any failure here is
    /// fatal to startup.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let prompts = PromptTemplates::load(
            config.prompt_without_product_path.as_deref(),
            config.prompt_with_product_path.as_deref(),
        )
        .context("failed to load prompt templates")?;

        let products = JsonProductRepository::load(&config.products_path)
            .context("failed to load product catalog")?;

        let api = ApiClient::new(
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            Duration::from_secs(config.completion_timeout_secs),
        )
        .context("failed to build completion API client")?;

        let embedder = OpenAiEmbeddingClient::new(api.clone(), config.embedding_model.clone());
        let store = SimpleVectorStore::load(&config.vector_store_path, Arc::new(embedder))
            .context("failed to load vector store")?;

        let tool_http = build_http_client(&config.tls_policy())
            .context("failed to build tool endpoint HTTP client")?;
        let connector = McpConnector::new(tool_http, config.mcp_transport);

        let completion = OpenAiChatClient::new(api, config.chat_model.clone());

        tracing::info!(
            products = products.len(),
            documents = store.len(),
            tool_endpoints = config.tool_endpoints.len(),
            transport = ?config.mcp_transport,
            chat_model = %config.chat_model,
            "Collaborators initialized"
        );

        let chat = ChatService::new(
            Arc::new(store),
            Arc::new(products),
            Arc::new(completion),
            Arc::new(connector),
            config.tool_endpoints.clone(),
            Arc::new(prompts),
        );

        let state = Self::with_service(chat);

        // Every collaborator above is built; nothing is warmed lazily.
        state.mark_ready();

        Ok(state)
    }

    /// Wrap an already-built orchestrator. Not ready until [`mark_ready`](Self::mark_ready).
    pub fn with_service(chat: ChatService) -> Self {
        Self {
            chat,
            ready: AtomicBool::new(false),
        }
    }

    /// Start reporting ready on `/ready`.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Check if the service is ready to handle requests.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
