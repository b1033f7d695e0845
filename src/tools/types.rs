//! Type definitions for external tool endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A configured MCP service address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolEndpoint {
    pub url: String,
}

impl ToolEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl std::fmt::Display for ToolEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// A callable tool discovered on an endpoint during the handshake.
///
/// `input_schema` is the JSON schema advertised by the endpoint, forwarded
/// untouched to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool endpoint '{endpoint}' transport error: {message}")]
    Transport { endpoint: String, message: String },
    #[error("tool endpoint '{endpoint}' failed to initialize: {message}")]
    Initialize { endpoint: String, message: String },
    #[error("tool endpoint '{endpoint}' timed out after {secs}s")]
    Timeout { endpoint: String, secs: u64 },
    #[error("no tool named '{name}' is available")]
    UnknownTool { name: String },
    #[error("tool '{tool}' failed: {message}")]
    Call { tool: String, message: String },
    #[error("tool endpoint session for '{endpoint}' is already closed")]
    Closed { endpoint: String },
    #[error("invalid TLS configuration: {0}")]
    Tls(String),
}
