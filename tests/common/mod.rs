//! In-memory collaborators for pipeline and router tests.
#![allow(dead_code)]

use acme_assist::catalog::{CatalogError, Product, ProductRepository};
use acme_assist::chat::{ChatMessage, ChatService, PromptTemplates};
use acme_assist::llm::{CompletionClient, CompletionError, CompletionResponse};
use acme_assist::retrieval::{RetrievedDocument, SearchError, SearchRequest, VectorStore};
use acme_assist::tools::{ToolConnector, ToolEndpoint, ToolError, ToolSession, ToolSet, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Product template that exposes every field, one per line.
pub const PRODUCT_TEMPLATE: &str = "PRODUCT\nname={{ name }}\ntags={{ tags }}\nshort={{ shortDescription }}\nfull={{ fullDescription }}\ncontext:\n{{ additionalContext }}";

pub const GENERIC_TEMPLATE: &str = "GENERIC\ncontext:\n{{ context }}";

pub fn product(id: &str, name: &str, tags: &[&str]) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        short_description: format!("{} short", name),
        full_description: format!("{} full", name),
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub documents: Vec<RetrievedDocument>,
    pub fail: bool,
    pub requests: Mutex<Vec<SearchRequest>>,
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<RetrievedDocument>, SearchError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(SearchError::Load("index offline".into()));
        }
        Ok(self.documents.clone())
    }
}

#[derive(Default)]
pub struct FakeRepository {
    pub products: Vec<Product>,
    pub lookups: AtomicUsize,
    pub listings: AtomicUsize,
}

#[async_trait]
impl ProductRepository for FakeRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        Ok(self.products.clone())
    }
}

/// Completion fake that records every prompt and the tools it was offered.
pub struct FakeCompletion {
    pub texts: Vec<Option<String>>,
    pub fail: bool,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
    pub offered_tools: Mutex<Vec<String>>,
    /// Tool invoked through the set before answering, if any.
    pub call_tool: Option<String>,
    pub tool_results: Mutex<Vec<String>>,
    /// Never answer; the caller has to give up on the request.
    pub stall: bool,
    /// Signalled once `complete` has been entered.
    pub entered: Notify,
}

impl FakeCompletion {
    pub fn answering(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| Some(t.to_string())).collect(),
            fail: false,
            calls: Mutex::new(Vec::new()),
            offered_tools: Mutex::new(Vec::new()),
            call_tool: None,
            tool_results: Mutex::new(Vec::new()),
            stall: false,
            entered: Notify::new(),
        }
    }

    pub fn stalling() -> Self {
        Self {
            stall: true,
            ..Self::answering(&[])
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::answering(&[])
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Vec<ChatMessage> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &ToolSet,
    ) -> Result<CompletionResponse, CompletionError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.offered_tools
            .lock()
            .unwrap()
            .extend(tools.specs().iter().map(|s| s.name.clone()));

        if let Some(name) = &self.call_tool {
            let mut args = Map::new();
            args.insert("sku".into(), json!("HP-100"));
            let result = tools
                .call(name, args)
                .await
                .unwrap_or_else(|e| format!("Error: {}", e));
            self.tool_results.lock().unwrap().push(result);
        }

        self.entered.notify_one();
        if self.stall {
            std::future::pending::<()>().await;
        }

        if self.fail {
            return Err(CompletionError::InvalidResponse("choices".into()));
        }

        Ok(CompletionResponse {
            generations: self
                .texts
                .iter()
                .cloned()
                .map(|text| acme_assist::llm::Generation { text })
                .collect(),
        })
    }
}

#[derive(Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct CountingSession {
    endpoint: ToolEndpoint,
    tools: Vec<ToolSpec>,
    counters: Arc<Counters>,
    open: bool,
}

#[async_trait]
impl ToolSession for CountingSession {
    fn endpoint(&self) -> &ToolEndpoint {
        &self.endpoint
    }

    fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ToolError> {
        if !self.open {
            return Err(ToolError::Closed {
                endpoint: self.endpoint.url.clone(),
            });
        }
        Ok(format!("{} -> {}", name, Value::Object(arguments)))
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// Sessions dropped without `close` release themselves, like an rmcp client.
impl Drop for CountingSession {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Tool transport that counts opened and released sessions. Endpoints whose
/// URL contains "broken" fail the handshake.
pub struct CountingConnector {
    pub counters: Arc<Counters>,
}

impl CountingConnector {
    pub fn new() -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                counters: Arc::clone(&counters),
            },
            counters,
        )
    }
}

#[async_trait]
impl ToolConnector for CountingConnector {
    async fn connect(&self, endpoint: &ToolEndpoint) -> Result<Box<dyn ToolSession>, ToolError> {
        if endpoint.url.contains("broken") {
            return Err(ToolError::Initialize {
                endpoint: endpoint.url.clone(),
                message: "handshake refused".into(),
            });
        }

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let tool = endpoint.url.rsplit('/').next().unwrap_or("tool").to_string();
        Ok(Box::new(CountingSession {
            endpoint: endpoint.clone(),
            tools: vec![ToolSpec {
                name: tool,
                description: Some("test tool".into()),
                input_schema: json!({"type": "object"}),
            }],
            counters: Arc::clone(&self.counters),
            open: true,
        }))
    }
}

pub fn templates() -> Arc<PromptTemplates> {
    Arc::new(
        PromptTemplates::from_sources(GENERIC_TEMPLATE.to_string(), PRODUCT_TEMPLATE.to_string())
            .unwrap(),
    )
}

/// Everything a pipeline test may want to inspect after the call.
pub struct Harness {
    pub service: ChatService,
    pub store: Arc<FakeStore>,
    pub repository: Arc<FakeRepository>,
    pub completion: Arc<FakeCompletion>,
    pub counters: Arc<Counters>,
}

pub fn harness(
    store: FakeStore,
    repository: FakeRepository,
    completion: FakeCompletion,
    endpoints: &[&str],
) -> Harness {
    let store = Arc::new(store);
    let repository = Arc::new(repository);
    let completion = Arc::new(completion);
    let (connector, counters) = CountingConnector::new();

    let service = ChatService::new(
        store.clone(),
        repository.clone(),
        completion.clone(),
        Arc::new(connector),
        endpoints.iter().map(|u| ToolEndpoint::new(*u)).collect(),
        templates(),
    );

    Harness {
        service,
        store,
        repository,
        completion,
        counters,
    }
}
