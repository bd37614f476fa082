//! Tools and the tool registry.
//!
//! A [`Tool`] pairs a JSON-Schema-like [`ToolDefinition`] with an async
//! callable. Tools are collected into a [`ToolRegistry`], which the agent
//! loop consults by name when the model requests an invocation. The
//! registry is read-only once built and cheap to share across concurrent
//! runs; making individual tools safe for concurrent invocation is the
//! tool implementor's obligation.

mod registry;

pub use registry::ToolRegistry;

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors that can occur during tool execution.
///
/// These never abort an agent run: the loop folds them into the tool's
/// result payload so the model can recover or explain the failure.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// The tool itself failed.
    #[error("execution error: {0}")]
    Execution(String),

    /// The arguments did not match the tool's schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Anything else.
    #[error("tool error: {0}")]
    Other(String),
}

impl ToolError {
    /// Create an execution error.
    #[must_use]
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create an invalid-arguments error.
    #[must_use]
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

/// A tool's declared schema, advertised to the model.
///
/// Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, unique within a registry.
    pub name: String,
    /// Human-readable description the model uses to decide when to call it.
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

/// An executable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's declared schema.
    fn definition(&self) -> ToolDefinition;

    /// Invoke the tool with a JSON arguments object.
    ///
    /// Returns a string payload, conventionally JSON-encoded.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] on failure; the agent loop folds it into an
    /// error-flagged result rather than propagating it.
    async fn call(&self, args: Value) -> Result<String, ToolError>;
}

type ToolCallFn =
    dyn Fn(Value) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync + 'static;

/// A tool backed by a closure.
///
/// Handy for demos and tests where defining a struct per tool is noise:
///
/// ```rust,ignore
/// let echo = FnTool::new(
///     "echo",
///     "Echo the input back.",
///     json!({"type": "object", "properties": {"x": {"type": "string"}}}),
///     |args| async move { Ok(args.to_string()) },
/// );
/// ```
pub struct FnTool {
    definition: ToolDefinition,
    call: Box<ToolCallFn>,
}

impl FnTool {
    /// Create a tool from a name, description, parameter schema, and an
    /// async closure.
    #[must_use]
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        call: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            definition: ToolDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
            call: Box::new(move |args| Box::pin(call(args))),
        }
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.definition.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        (self.call)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fn_tool_calls_through() {
        let tool = FnTool::new(
            "echo",
            "Echo the input back.",
            json!({"type": "object", "properties": {"x": {"type": "string"}}}),
            |args| async move { Ok(args.to_string()) },
        );

        assert_eq!(tool.definition().name, "echo");
        let out = tool.call(json!({"x": "hi"})).await.unwrap();
        assert_eq!(out, r#"{"x":"hi"}"#);
    }

    #[tokio::test]
    async fn fn_tool_propagates_errors() {
        let tool = FnTool::new("broken", "Always fails.", json!({"type": "object"}), |_| {
            async move { Err(ToolError::execution("backend unavailable")) }
        });

        let err = tool.call(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("backend unavailable"));
    }
}
