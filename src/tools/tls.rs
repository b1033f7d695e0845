//! The HTTP/TLS client shared by every tool endpoint connection.

use crate::tools::types::ToolError;
use std::path::PathBuf;
use std::time::Duration;

/// Connect timeout for tool endpoint transports.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How tool endpoint certificates are verified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Verify against the bundled web PKI roots.
    #[default]
    Strict,
    /// Verify against the web PKI roots plus a private CA bundle (PEM).
    CustomCa(PathBuf),
    /// Accept any certificate. Only for endpoints on a trusted network.
    TrustAll,
}

/// Build the process-wide client. Fails at startup on an unreadable CA bundle.
pub fn build_http_client(policy: &TlsPolicy) -> Result<reqwest::Client, ToolError> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .connect_timeout(CONNECT_TIMEOUT);

    match policy {
        TlsPolicy::Strict => {}
        TlsPolicy::CustomCa(path) => {
            let pem = std::fs::read(path).map_err(|e| {
                ToolError::Tls(format!("failed to read CA bundle '{}': {}", path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ToolError::Tls(format!("invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(cert);
            tracing::debug!(path = %path.display(), "Added CA bundle for tool endpoints");
        }
        TlsPolicy::TrustAll => {
            tracing::warn!("Tool endpoint TLS verification is DISABLED (MCP_TLS_INSECURE=true)");
            builder = builder.danger_accept_invalid_certs(true);
        }
    }

    builder
        .build()
        .map_err(|e| ToolError::Tls(format!("failed to build HTTP client: {}", e)))
}
