//! External tool endpoints (MCP services) made available to the model for
//! the duration of one chat request.

pub mod mcp;
pub mod session;
pub mod tls;
pub mod types;

pub use mcp::{McpConnector, McpTransportKind, REQUEST_TIMEOUT};
pub use session::{ToolConnector, ToolSession, ToolSet};
pub use tls::{build_http_client, TlsPolicy, CONNECT_TIMEOUT};
pub use types::{ToolEndpoint, ToolError, ToolSpec};
