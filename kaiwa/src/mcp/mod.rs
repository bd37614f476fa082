//! Model Context Protocol integration.
//!
//! Connects to MCP servers over stdio (spawned child process) or
//! streamable HTTP, discovers the tools they advertise, and wraps each one
//! as a [`Tool`](crate::tool::Tool) so remote tools slot into a
//! [`ToolRegistry`](crate::tool::ToolRegistry) next to local ones:
//!
//! ```rust,ignore
//! let connection = McpConnection::stdio("python", &["server.py"]).await?;
//! let agent = Agent::new("assistant").registry(connection.registry());
//! ```

mod client;
mod tool;
mod transport;

pub use client::McpConnection;
pub use tool::McpTool;
pub use transport::TransportConfig;

use std::io;

/// Errors from MCP connections and tool discovery.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum McpError {
    /// Failed to connect to an HTTP MCP server.
    #[error("failed to connect to MCP server at {url}: {message}")]
    HttpConnectionFailed {
        /// The URL that failed.
        url: String,
        /// Error message.
        message: String,
    },

    /// Failed to spawn a local MCP server process.
    #[error("failed to spawn MCP process '{command}': {message}")]
    ProcessSpawnFailed {
        /// The command that failed.
        command: String,
        /// Error message.
        message: String,
    },

    /// Failed to list tools from the server.
    #[error("failed to list tools: {0}")]
    ListToolsFailed(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
