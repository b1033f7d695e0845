//! Per-request tool sessions.
//!
//! A [`ToolSet`] owns one session per configured endpoint for the duration of
//! a single chat request. Sessions are opened in order, the first failure
//! closes everything opened so far, and [`ToolSet::close`] releases every
//! session once the completion call is over.

use crate::tools::types::{ToolEndpoint, ToolError, ToolSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// An initialized client connection to one tool endpoint.
///
/// Implementations must also release the connection when dropped without
/// [`close`](ToolSession::close): a cancelled request drops its [`ToolSet`]
/// mid-flight and no async cleanup runs. `McpSession` gets this from the
/// rmcp client, which cancels its service task on drop.
#[async_trait]
pub trait ToolSession: Send + Sync {
    fn endpoint(&self) -> &ToolEndpoint;

    /// Tools listed during the handshake.
    fn tools(&self) -> &[ToolSpec];

    /// Invoke a tool and return its textual result.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ToolError>;

    /// Release the connection. Must be safe to call more than once.
    async fn close(&mut self);
}

/// Opens sessions. The production connector speaks MCP; tests substitute fakes.
#[async_trait]
pub trait ToolConnector: Send + Sync {
    /// Connect and complete the initialization handshake.
    async fn connect(&self, endpoint: &ToolEndpoint) -> Result<Box<dyn ToolSession>, ToolError>;
}

pub struct ToolSet {
    sessions: Vec<Box<dyn ToolSession>>,
    specs: Vec<ToolSpec>,
    /// Tool name -> index into `sessions`.
    routes: HashMap<String, usize>,
    closed: bool,
}

impl ToolSet {
    pub fn empty() -> Self {
        Self {
            sessions: Vec::new(),
            specs: Vec::new(),
            routes: HashMap::new(),
            closed: false,
        }
    }

    /// Open a session on every endpoint, failing fast.
    pub async fn open(
        connector: &dyn ToolConnector,
        endpoints: &[ToolEndpoint],
    ) -> Result<Self, ToolError> {
        let mut set = Self::empty();

        for endpoint in endpoints {
            match connector.connect(endpoint).await {
                Ok(session) => {
                    metrics::counter!("tool_endpoints_opened_total").increment(1);
                    set.register(session);
                }
                Err(err) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        opened = set.sessions.len(),
                        error = %err,
                        "Tool endpoint failed to initialize, releasing opened sessions"
                    );
                    set.close().await;
                    return Err(err);
                }
            }
        }

        tracing::debug!(
            endpoints = set.sessions.len(),
            tools = set.specs.len(),
            "Tool sessions ready"
        );

        Ok(set)
    }

    fn register(&mut self, session: Box<dyn ToolSession>) {
        let idx = self.sessions.len();

        for spec in session.tools() {
            if self.routes.contains_key(&spec.name) {
                tracing::warn!(
                    tool = %spec.name,
                    endpoint = %session.endpoint(),
                    "Duplicate tool name, keeping the first endpoint's tool"
                );
                continue;
            }
            self.routes.insert(spec.name.clone(), idx);
            self.specs.push(spec.clone());
        }

        self.sessions.push(session);
    }

    /// Every callable tool, in endpoint order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Route a call to the endpoint that advertised `name`.
    pub async fn call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ToolError> {
        let session = self
            .routes
            .get(name)
            .and_then(|&idx| self.sessions.get(idx))
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })?;

        tracing::debug!(tool = name, endpoint = %session.endpoint(), "Calling tool");
        session.call_tool(name, arguments).await
    }

    /// Release every session.
    pub async fn close(mut self) {
        for session in &mut self.sessions {
            session.close().await;
        }
        self.closed = true;
    }
}

impl Drop for ToolSet {
    fn drop(&mut self) {
        if !self.closed && !self.sessions.is_empty() {
            // Reached when the request future is cancelled mid-flight. The
            // sessions are released by their own Drop impls.
            tracing::warn!(
                sessions = self.sessions.len(),
                "Tool sessions dropped without close"
            );
        }
    }
}
