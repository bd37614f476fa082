//! Connecting to MCP servers and discovering their tools.

use rmcp::{
    ServiceExt,
    model::{ClientCapabilities, Implementation, InitializeRequestParams},
    service::ServerSink,
    transport::{StreamableHttpClientTransport, child_process::TokioChildProcess},
};
use tracing::info;

use crate::tool::ToolRegistry;

use super::McpError;
use super::tool::McpTool;
use super::transport::TransportConfig;

/// A live connection to one MCP server and the tools it advertises.
///
/// Tools are listed once at connect time; call
/// [`registry`](Self::registry) to expose them to an agent.
pub struct McpConnection {
    sink: ServerSink,
    tools: Vec<rmcp::model::Tool>,
}

impl McpConnection {
    /// Connect to a remote MCP server over streamable HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::HttpConnectionFailed`] when the handshake fails
    /// and [`McpError::ListToolsFailed`] when tool discovery does.
    pub async fn http(url: impl Into<String>) -> Result<Self, McpError> {
        Self::connect(TransportConfig::http(url)).await
    }

    /// Spawn a local MCP server process and connect over stdio.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::ProcessSpawnFailed`] when the process cannot be
    /// started or the handshake fails.
    pub async fn stdio(command: impl Into<String>, args: &[&str]) -> Result<Self, McpError> {
        Self::connect(TransportConfig::stdio(command, args)).await
    }

    /// Connect using an explicit transport configuration.
    ///
    /// # Errors
    ///
    /// See [`McpError`] for the per-transport failure modes.
    pub async fn connect(config: TransportConfig) -> Result<Self, McpError> {
        let client_info = InitializeRequestParams {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
        };

        let (sink, tools) = match config {
            TransportConfig::Http { url } => {
                let transport = StreamableHttpClientTransport::from_uri(url.as_str());
                let service = client_info.serve(transport).await.map_err(|e| {
                    McpError::HttpConnectionFailed {
                        url: url.clone(),
                        message: e.to_string(),
                    }
                })?;

                let sink = service.peer().clone();
                let tools = service
                    .peer()
                    .list_tools(Default::default())
                    .await
                    .map_err(|e| McpError::ListToolsFailed(e.to_string()))?
                    .tools;
                (sink, tools)
            }
            TransportConfig::Stdio {
                command,
                args,
                cwd,
                env,
            } => {
                let mut cmd = tokio::process::Command::new(&command);
                cmd.args(&args);
                if let Some(dir) = cwd {
                    cmd.current_dir(dir);
                }
                if let Some(vars) = env {
                    for (key, value) in vars {
                        cmd.env(key, value);
                    }
                }

                let transport =
                    TokioChildProcess::new(cmd).map_err(|e| McpError::ProcessSpawnFailed {
                        command: command.clone(),
                        message: e.to_string(),
                    })?;
                let service = client_info.serve(transport).await.map_err(|e| {
                    McpError::ProcessSpawnFailed {
                        command: command.clone(),
                        message: e.to_string(),
                    }
                })?;

                let sink = service.peer().clone();
                let tools = service
                    .peer()
                    .list_tools(Default::default())
                    .await
                    .map_err(|e| McpError::ListToolsFailed(e.to_string()))?
                    .tools;
                (sink, tools)
            }
        };

        info!(tools = tools.len(), "connected to MCP server");
        Ok(Self { sink, tools })
    }

    /// The advertised tool schemas, as listed at connect time.
    #[must_use]
    pub fn tools(&self) -> &[rmcp::model::Tool] {
        &self.tools
    }

    /// The advertised tool names.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_ref()).collect()
    }

    /// Build a [`ToolRegistry`] exposing every discovered tool.
    #[must_use]
    pub fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for tool in &self.tools {
            registry.register(McpTool::new(tool.clone(), self.sink.clone()));
        }
        registry
    }
}
