//! MCP-backed tool sessions.
//!
//! Each session is an `rmcp` client over the configured HTTP transport. The
//! client performs the `initialize` handshake when served, then the tool list
//! is fetched once. Every request to the endpoint is bounded by
//! [`REQUEST_TIMEOUT`].

use crate::tools::session::{ToolConnector, ToolSession};
use crate::tools::types::{ToolEndpoint, ToolError, ToolSpec};
use async_trait::async_trait;
use rmcp::{
    model::CallToolRequestParam,
    service::RunningService,
    transport::{
        sse_client::SseClientConfig, streamable_http_client::StreamableHttpClientTransportConfig,
        SseClientTransport, StreamableHttpClientTransport,
    },
    RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

/// Per-request timeout for handshake, tool listing and tool calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type McpClient = RunningService<RoleClient, ()>;

/// Wire transport used to reach MCP services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum McpTransportKind {
    /// HTTP + server-sent events (`GET /sse`, `POST /message`).
    #[default]
    Sse,
    /// Streamable HTTP (single endpoint).
    Streamable,
}

impl McpTransportKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "sse" => Some(Self::Sse),
            "streamable" | "streamable-http" | "http" => Some(Self::Streamable),
            _ => None,
        }
    }
}

/// Opens MCP sessions with the shared HTTP/TLS client.
pub struct McpConnector {
    http: reqwest::Client,
    transport: McpTransportKind,
}

impl McpConnector {
    pub fn new(http: reqwest::Client, transport: McpTransportKind) -> Self {
        Self { http, transport }
    }

    async fn serve(&self, endpoint: &ToolEndpoint) -> Result<McpClient, ToolError> {
        match self.transport {
            McpTransportKind::Sse => {
                let cfg = SseClientConfig {
                    sse_endpoint: endpoint.url.clone().into(),
                    ..Default::default()
                };
                let transport = SseClientTransport::start_with_client(self.http.clone(), cfg)
                    .await
                    .map_err(|e| ToolError::Transport {
                        endpoint: endpoint.url.clone(),
                        message: format!("create SSE transport: {}", e),
                    })?;

                ().serve(transport).await.map_err(|e| ToolError::Initialize {
                    endpoint: endpoint.url.clone(),
                    message: e.to_string(),
                })
            }
            McpTransportKind::Streamable => {
                let cfg = StreamableHttpClientTransportConfig::with_uri(endpoint.url.as_str());
                let transport = StreamableHttpClientTransport::with_client(self.http.clone(), cfg);

                ().serve(transport).await.map_err(|e| ToolError::Initialize {
                    endpoint: endpoint.url.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl ToolConnector for McpConnector {
    async fn connect(&self, endpoint: &ToolEndpoint) -> Result<Box<dyn ToolSession>, ToolError> {
        let client = with_timeout(endpoint, self.serve(endpoint)).await?;

        let tools = match with_timeout(endpoint, async {
            client
                .peer()
                .list_all_tools()
                .await
                .map_err(|e| ToolError::Initialize {
                    endpoint: endpoint.url.clone(),
                    message: format!("list tools: {}", e),
                })
        })
        .await
        {
            Ok(tools) => tools,
            Err(err) => {
                if let Err(e) = client.cancel().await {
                    tracing::warn!(endpoint = %endpoint, error = %e, "Error closing MCP client");
                }
                return Err(err);
            }
        };

        let tools: Vec<ToolSpec> = tools
            .into_iter()
            .map(|t| ToolSpec {
                name: t.name.to_string(),
                description: t.description.as_ref().map(|d| d.to_string()),
                input_schema: Value::Object((*t.input_schema).clone()),
            })
            .collect();

        tracing::info!(endpoint = %endpoint, tools = tools.len(), "Connected to MCP service");

        Ok(Box::new(McpSession {
            endpoint: endpoint.clone(),
            tools,
            client: Some(client),
        }))
    }
}

pub struct McpSession {
    endpoint: ToolEndpoint,
    tools: Vec<ToolSpec>,
    /// `None` once closed. Dropping the client cancels its service task,
    /// which covers sessions dropped without `close`.
    client: Option<McpClient>,
}

#[async_trait]
impl ToolSession for McpSession {
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
        let client = self.client.as_ref().ok_or_else(|| ToolError::Closed {
            endpoint: self.endpoint.url.clone(),
        })?;

        let request = CallToolRequestParam {
            name: Cow::Owned(name.to_string()),
            arguments: Some(arguments),
        };

        let result = with_timeout(&self.endpoint, async {
            client
                .peer()
                .call_tool(request)
                .await
                .map_err(|e| ToolError::Call {
                    tool: name.to_string(),
                    message: e.to_string(),
                })
        })
        .await?;

        let value = serde_json::to_value(&result).map_err(|e| ToolError::Call {
            tool: name.to_string(),
            message: format!("unreadable result: {}", e),
        })?;

        let text = result_text(&value);
        if value.get("isError").and_then(Value::as_bool) == Some(true) {
            return Err(ToolError::Call {
                tool: name.to_string(),
                message: text,
            });
        }

        Ok(text)
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            match client.cancel().await {
                Ok(reason) => {
                    tracing::debug!(endpoint = %self.endpoint, ?reason, "MCP client closed")
                }
                Err(e) => {
                    tracing::warn!(endpoint = %self.endpoint, error = %e, "Error closing MCP client")
                }
            }
        }
    }
}

async fn with_timeout<T>(
    endpoint: &ToolEndpoint,
    fut: impl Future<Output = Result<T, ToolError>>,
) -> Result<T, ToolError> {
    tokio::time::timeout(REQUEST_TIMEOUT, fut)
        .await
        .map_err(|_| ToolError::Timeout {
            endpoint: endpoint.url.clone(),
            secs: REQUEST_TIMEOUT.as_secs(),
        })?
}

/// Flatten an MCP `CallToolResult` into text for the model.
///
/// Text content items are joined with newlines. Results without text content
/// (structured or binary) are passed through as JSON.
fn result_text(result: &Value) -> String {
    let texts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if !texts.is_empty() {
        return texts.join("\n");
    }

    match result.get("structuredContent") {
        Some(structured) if !structured.is_null() => structured.to_string(),
        _ => result.to_string(),
    }
}
