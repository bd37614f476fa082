//! Anthropic Messages API provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::{ContentBlock, Message, Role, StopReason};

use super::{
    CompletionProvider, ConverseRequest, ConverseResponse, FromEnv, ProviderError, TokenUsage,
};

/// Default Anthropic API base URL.
pub const ANTHROPIC_API_BASE_URL: &str = "https://api.anthropic.com";

/// Default Anthropic API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// A [`CompletionProvider`] backed by the Anthropic Messages API.
///
/// # Example
///
/// ```rust,ignore
/// // From the ANTHROPIC_API_KEY environment variable.
/// let provider = AnthropicProvider::from_env();
///
/// // With explicit configuration.
/// let provider = AnthropicProvider::builder()
///     .api_key("sk-ant-...")
///     .model("claude-sonnet-4-5")
///     .build();
/// ```
#[derive(Clone)]
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: Arc<str>,
    base_url: Arc<str>,
    version: Arc<str>,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl AnthropicProvider {
    /// Create a provider with the given API key and default configuration.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    /// Create a new builder.
    #[must_use]
    pub fn builder() -> AnthropicBuilder {
        AnthropicBuilder::default()
    }

    /// Switch the model requests are routed to.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request_body<'a>(&'a self, request: &'a ConverseRequest) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: request.system.as_deref(),
            messages: request.messages.iter().map(wire_message).collect(),
            tools: request
                .tools
                .iter()
                .map(|t| ApiTool {
                    name: &t.name,
                    description: &t.description,
                    input_schema: &t.parameters,
                })
                .collect(),
        }
    }

    fn parse_response(body: ApiResponse) -> Result<ConverseResponse, ProviderError> {
        let stop = body
            .stop_reason
            .ok_or_else(|| ProviderError::Malformed("response is missing stop_reason".into()))?;

        let stop_reason = match stop.as_str() {
            "tool_use" => StopReason::ToolUse,
            "end_turn" | "stop_sequence" | "max_tokens" => StopReason::EndTurn,
            other => {
                return Err(ProviderError::Malformed(format!(
                    "unrecognized stop_reason '{other}'"
                )));
            }
        };

        let content = body
            .content
            .into_iter()
            .map(|block| match block {
                ApiBlock::Text { text } => ContentBlock::text(text),
                ApiBlock::ToolUse { id, name, input } => ContentBlock::tool_use(id, name, input),
                ApiBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => {
                    if is_error {
                        ContentBlock::tool_error(tool_use_id, content)
                    } else {
                        ContentBlock::tool_result(tool_use_id, content)
                    }
                }
            })
            .collect();

        Ok(ConverseResponse {
            message: Message {
                role: Role::Assistant,
                content,
            },
            stop_reason,
            usage: body.usage.map(|u| TokenUsage::new(u.input_tokens, u.output_tokens)),
        })
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", self.api_key.as_ref())
            .header("anthropic-version", self.version.as_ref())
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ProviderError::Auth(body));
            }
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Self::parse_response(body)
    }
}

impl FromEnv for AnthropicProvider {
    /// Create a provider from environment variables.
    ///
    /// Uses `ANTHROPIC_API_KEY` for the API key and optionally
    /// `ANTHROPIC_BASE_URL` for a custom base URL.
    ///
    /// # Panics
    ///
    /// Panics if `ANTHROPIC_API_KEY` is not set.
    fn from_env() -> Self {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .expect("ANTHROPIC_API_KEY environment variable not set");

        let mut builder = Self::builder().api_key(api_key);
        if let Ok(base_url) = std::env::var("ANTHROPIC_BASE_URL") {
            builder = builder.base_url(base_url);
        }
        builder.build()
    }
}

/// Builder for [`AnthropicProvider`].
#[derive(Debug, Default)]
pub struct AnthropicBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    version: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
}

impl AnthropicBuilder {
    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the API version header.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the per-response token cap.
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Build the provider.
    #[must_use]
    pub fn build(self) -> AnthropicProvider {
        AnthropicProvider {
            http: reqwest::Client::new(),
            api_key: self.api_key.unwrap_or_default().into(),
            base_url: self
                .base_url
                .unwrap_or_else(|| ANTHROPIC_API_BASE_URL.to_string())
                .into(),
            version: self
                .version
                .unwrap_or_else(|| ANTHROPIC_VERSION.to_string())
                .into(),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

fn wire_message(message: &Message) -> ApiMessage {
    ApiMessage {
        role: match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        },
        content: message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => ApiBlock::Text { text: text.clone() },
                ContentBlock::ToolUse(tu) => ApiBlock::ToolUse {
                    id: tu.id.clone(),
                    name: tu.name.clone(),
                    input: tu.input.clone(),
                },
                ContentBlock::ToolResult(tr) => ApiBlock::ToolResult {
                    tool_use_id: tr.id.clone(),
                    content: tr.content.clone(),
                    is_error: tr.is_error,
                },
            })
            .collect(),
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
}

#[derive(Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ApiBlock>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ApiBlock>,
    stop_reason: Option<String>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolDefinition;
    use serde_json::json;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::builder()
            .api_key("sk-ant-test")
            .model("claude-sonnet-4-5")
            .build()
    }

    #[test]
    fn request_body_maps_conversation_and_tools() {
        let request = ConverseRequest::new(vec![
            Message::user("weather in London?"),
            Message {
                role: Role::Assistant,
                content: vec![ContentBlock::tool_use(
                    "t1",
                    "get_weather",
                    json!({"city": "London"}),
                )],
            },
            Message::tool_results(vec![ContentBlock::tool_result("t1", r#"{"temp_c":12}"#)]),
        ])
        .system("Be brief.")
        .tools(vec![ToolDefinition {
            name: "get_weather".into(),
            description: "Get current weather for a city.".into(),
            parameters: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        }]);

        let body = serde_json::to_value(provider().request_body(&request)).unwrap();

        assert_eq!(body["model"], "claude-sonnet-4-5");
        assert_eq!(body["system"], "Be brief.");
        assert_eq!(body["messages"][1]["content"][0]["type"], "tool_use");
        assert_eq!(
            body["messages"][2]["content"][0],
            json!({"type": "tool_result", "tool_use_id": "t1", "content": r#"{"temp_c":12}"#})
        );
        assert_eq!(body["tools"][0]["name"], "get_weather");
        assert!(body["tools"][0]["input_schema"].is_object());
    }

    #[test]
    fn request_body_omits_empty_tool_list() {
        let request = ConverseRequest::new(vec![Message::user("hi")]);
        let body = serde_json::to_value(provider().request_body(&request)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("system").is_none());
    }

    #[test]
    fn parses_tool_use_response() {
        let body: ApiResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Checking."},
                {"type": "tool_use", "id": "t1", "name": "get_weather", "input": {"city": "London"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 20, "output_tokens": 9}
        }))
        .unwrap();

        let response = AnthropicProvider::parse_response(body).unwrap();
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.message.text(), "Checking.");
        assert_eq!(response.message.tool_uses().count(), 1);
        assert_eq!(response.usage, Some(TokenUsage::new(20, 9)));
    }

    #[test]
    fn missing_stop_reason_is_malformed() {
        let body: ApiResponse = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "hi"}],
            "stop_reason": null
        }))
        .unwrap();

        let err = AnthropicProvider::parse_response(body).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn unknown_stop_reason_is_malformed() {
        let body: ApiResponse = serde_json::from_value(json!({
            "content": [],
            "stop_reason": "pause_turn"
        }))
        .unwrap();

        assert!(matches!(
            AnthropicProvider::parse_response(body),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", provider());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("sk-ant-test"));
    }
}
