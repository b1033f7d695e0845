use crate::tools::{McpTransportKind, TlsPolicy, ToolEndpoint};
use anyhow::Context;
use serde_json::Value;
use std::env;
use std::path::PathBuf;

/// Credential key that marks a Cloud Foundry service binding as an MCP service.
const MCP_SERVICE_URL: &str = "mcpServiceURL";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Product catalog JSON file.
    pub products_path: PathBuf,
    /// Pre-embedded documents for similarity search.
    pub vector_store_path: PathBuf,
    /// Overrides for the built-in prompt templates.
    pub prompt_without_product_path: Option<PathBuf>,
    pub prompt_with_product_path: Option<PathBuf>,
    /// Base URL of the OpenAI-compatible API used for chat and embeddings.
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    /// Per-call timeout for completion and embedding requests.
    pub completion_timeout_secs: u64,
    /// Tool endpoints opened for every chat request, in order.
    pub tool_endpoints: Vec<ToolEndpoint>,
    pub mcp_transport: McpTransportKind,
    /// Accept any certificate from tool endpoints.
    pub mcp_tls_insecure: bool,
    /// Extra PEM root certificate for tool endpoints.
    pub mcp_ca_cert_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Tool endpoints come from `MCP_SERVICE_URLS` (comma-separated) followed by
    /// every `VCAP_SERVICES` binding whose credentials carry `mcpServiceURL`.
    pub fn from_env() -> anyhow::Result<Self> {
        let tool_endpoints = endpoint_list(
            &env::var("MCP_SERVICE_URLS").unwrap_or_default(),
            env::var("VCAP_SERVICES").ok().as_deref(),
        )?;

        let transport = env::var("MCP_TRANSPORT").unwrap_or_default();
        let mcp_transport = McpTransportKind::parse(&transport)
            .with_context(|| format!("unknown MCP_TRANSPORT '{}'", transport))?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            products_path: PathBuf::from(
                env::var("PRODUCTS_PATH").unwrap_or_else(|_| "./data/products.json".to_string()),
            ),
            vector_store_path: PathBuf::from(
                env::var("VECTOR_STORE_PATH")
                    .unwrap_or_else(|_| "./data/vector_store.json".to_string()),
            ),
            prompt_without_product_path: env::var("PROMPT_WITHOUT_PRODUCT_PATH")
                .ok()
                .map(PathBuf::from),
            prompt_with_product_path: env::var("PROMPT_WITH_PRODUCT_PATH")
                .ok()
                .map(PathBuf::from),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            completion_timeout_secs: env::var("COMPLETION_TIMEOUT")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,
            tool_endpoints,
            mcp_transport,
            mcp_tls_insecure: parse_flag(&env::var("MCP_TLS_INSECURE").unwrap_or_default())?,
            mcp_ca_cert_path: env::var("MCP_CA_CERT_PATH").ok().map(PathBuf::from),
        })
    }

    /// Certificate policy for tool endpoints. Trust-all wins over a CA bundle.
    pub fn tls_policy(&self) -> TlsPolicy {
        if self.mcp_tls_insecure {
            TlsPolicy::TrustAll
        } else if let Some(path) = &self.mcp_ca_cert_path {
            TlsPolicy::CustomCa(path.clone())
        } else {
            TlsPolicy::Strict
        }
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => anyhow::bail!("invalid boolean '{}'", other),
    }
}

/// Build the ordered endpoint list: explicit URLs first, then service
/// bindings. Blank and repeated URLs are dropped.
pub fn endpoint_list(urls: &str, vcap_services: Option<&str>) -> anyhow::Result<Vec<ToolEndpoint>> {
    let mut candidates: Vec<String> = urls.split(',').map(|u| u.trim().to_string()).collect();

    if let Some(vcap) = vcap_services.filter(|v| !v.trim().is_empty()) {
        candidates.extend(vcap_mcp_urls(vcap)?);
    }

    let mut endpoints: Vec<ToolEndpoint> = Vec::new();
    for url in candidates {
        if url.is_empty() || endpoints.iter().any(|e| e.url == url) {
            continue;
        }
        tracing::info!(url = %url, "Bound to MCP service");
        endpoints.push(ToolEndpoint::new(url));
    }

    Ok(endpoints)
}

/// `mcpServiceURL` credentials of every bound service.
///
/// `VCAP_SERVICES` maps a service label to a list of bindings, each with a
/// `credentials` object.
fn vcap_mcp_urls(vcap: &str) -> anyhow::Result<Vec<String>> {
    let services: Value = serde_json::from_str(vcap).context("VCAP_SERVICES is not valid JSON")?;

    let urls = services
        .as_object()
        .into_iter()
        .flat_map(|labels| labels.values())
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|binding| binding.get("credentials"))
        .filter_map(|credentials| credentials.get(MCP_SERVICE_URL))
        .filter_map(Value::as_str)
        .map(|url| url.trim().to_string())
        .collect();

    Ok(urls)
}
