//! OpenAI-compatible chat completions client.
//!
//! Advertises the request's tools as `function` tools. When the model answers
//! with tool calls, each call is executed through the [`ToolSet`] and the
//! results are sent back, until the model produces a final answer or
//! [`MAX_TOOL_ITERATIONS`] rounds have passed.

use crate::chat::ChatMessage;
use crate::llm::client::CompletionClient;
use crate::llm::http::ApiClient;
use crate::llm::types::{CompletionError, CompletionResponse, Generation};
use crate::tools::{ToolSet, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Upper bound on tool round trips for one completion.
pub const MAX_TOOL_ITERATIONS: usize = 10;

const CHAT_PATH: &str = "/v1/chat/completions";

pub struct OpenAiChatClient {
    api: ApiClient,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiChatClient {
    pub fn new(api: ApiClient, model: impl Into<String>) -> Self {
        Self {
            api,
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    async fn run_tool_call(tools: &ToolSet, call: &ApiToolCall) -> String {
        let arguments = match parse_arguments(&call.function.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                tracing::warn!(tool = %call.function.name, error = %e, "Unparseable tool arguments");
                return format!("Error: invalid arguments: {}", e);
            }
        };

        match tools.call(&call.function.name, arguments).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %call.function.name, error = %e, "Tool call failed");
                format!("Error: {}", e)
            }
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &ToolSet,
    ) -> Result<CompletionResponse, CompletionError> {
        let mut conversation: Vec<ApiMessage> = messages.iter().map(ApiMessage::from).collect();
        let tool_defs: Vec<Value> = tools.specs().iter().map(function_tool).collect();

        for round in 0..MAX_TOOL_ITERATIONS {
            let request = ApiRequest {
                model: &self.model,
                messages: &conversation,
                tools: (!tool_defs.is_empty()).then_some(tool_defs.as_slice()),
                temperature: self.temperature,
            };

            tracing::info!(
                model = %self.model,
                messages = conversation.len(),
                tools = tool_defs.len(),
                round,
                "Sending chat completion request"
            );

            let response: ApiResponse = self.api.post_json(CHAT_PATH, &request).await?;

            if response.choices.is_empty() {
                return Err(CompletionError::InvalidResponse("choices".to_string()));
            }

            let tool_calls = response
                .choices
                .first()
                .and_then(|c| c.message.tool_calls.clone())
                .filter(|calls| !calls.is_empty());

            let calls = match tool_calls {
                Some(calls) if !tools.is_empty() => calls,
                _ => {
                    tracing::debug!(
                        choices = response.choices.len(),
                        finish_reason = ?response.choices.first().and_then(|c| c.finish_reason.as_deref()),
                        "Chat completion finished"
                    );
                    return Ok(CompletionResponse {
                        generations: response
                            .choices
                            .into_iter()
                            .map(|c| Generation {
                                text: c.message.content,
                            })
                            .collect(),
                    });
                }
            };

            let assistant = response
                .choices
                .into_iter()
                .next()
                .map(|c| c.message)
                .ok_or_else(|| CompletionError::InvalidResponse("choices".to_string()))?;
            conversation.push(assistant);

            for call in &calls {
                let result = Self::run_tool_call(tools, call).await;
                conversation.push(ApiMessage::tool_result(&call.id, result));
            }
        }

        Err(CompletionError::TooManyToolIterations(MAX_TOOL_ITERATIONS))
    }
}

fn function_tool(spec: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description.clone().unwrap_or_default(),
            "parameters": spec.input_schema,
        }
    })
}

/// Tool arguments arrive as a JSON-encoded object; an empty string means none.
fn parse_arguments(raw: &str) -> Result<Map<String, Value>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_str(raw)
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn tool_result(call_id: &str, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(call_id.to_string()),
        }
    }
}

impl From<&ChatMessage> for ApiMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_api_str().to_string(),
            content: Some(message.content.clone()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: ApiFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}
