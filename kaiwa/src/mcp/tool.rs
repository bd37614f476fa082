//! Wrapping an MCP server tool as a local [`Tool`].

use std::borrow::Cow;

use async_trait::async_trait;
use rmcp::model::RawContent;
use serde_json::Value;

use crate::tool::{Tool, ToolDefinition, ToolError};

/// A [`Tool`] backed by a tool advertised on an MCP server.
///
/// Calls are forwarded over the connection's server sink; the server's
/// content blocks are flattened into one text payload, and a server-side
/// error flag becomes a [`ToolError::Execution`].
#[derive(Clone)]
pub struct McpTool {
    definition: rmcp::model::Tool,
    sink: rmcp::service::ServerSink,
}

impl McpTool {
    /// Wrap a server tool definition together with the sink to call it on.
    #[must_use]
    pub const fn new(definition: rmcp::model::Tool, sink: rmcp::service::ServerSink) -> Self {
        Self { definition, sink }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.definition.name.to_string(),
            description: self
                .definition
                .description
                .clone()
                .unwrap_or(Cow::from(""))
                .to_string(),
            parameters: serde_json::to_value(&self.definition.input_schema).unwrap_or_default(),
        }
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(ToolError::invalid_args(format!(
                    "expected a JSON object, got {other}"
                )));
            }
        };

        let result = self
            .sink
            .call_tool(rmcp::model::CallToolRequestParams {
                meta: None,
                name: self.definition.name.clone(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| ToolError::execution(format!("MCP tool call failed: {e}")))?;

        let text: String = result
            .content
            .into_iter()
            .map(|c| match c.raw {
                RawContent::Text(raw) => raw.text,
                other => format!("[unsupported content: {other:?}]"),
            })
            .collect();

        if result.is_error == Some(true) {
            let message = if text.is_empty() {
                "MCP server reported a tool error with no message".to_string()
            } else {
                text
            };
            return Err(ToolError::execution(message));
        }

        Ok(text)
    }
}
