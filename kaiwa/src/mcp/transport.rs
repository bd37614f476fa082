//! Transport configuration for MCP connections.

/// How to reach an MCP server.
#[derive(Debug, Clone)]
pub enum TransportConfig {
    /// Streamable HTTP transport for remote servers.
    Http {
        /// Server URL (e.g. "http://localhost:8080").
        url: String,
    },

    /// Stdio transport for a locally spawned server process.
    Stdio {
        /// Command to execute (e.g. "python", "node").
        command: String,
        /// Command arguments (e.g. ["server.py"]).
        args: Vec<String>,
        /// Optional working directory.
        cwd: Option<String>,
        /// Optional environment variables.
        env: Option<Vec<(String, String)>>,
    },
}

impl TransportConfig {
    /// An HTTP transport.
    #[must_use]
    pub fn http(url: impl Into<String>) -> Self {
        Self::Http { url: url.into() }
    }

    /// A stdio transport.
    #[must_use]
    pub fn stdio(command: impl Into<String>, args: &[&str]) -> Self {
        Self::Stdio {
            command: command.into(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            cwd: None,
            env: None,
        }
    }

    /// A stdio transport with a working directory.
    #[must_use]
    pub fn stdio_with_cwd(
        command: impl Into<String>,
        args: &[&str],
        cwd: impl Into<String>,
    ) -> Self {
        Self::Stdio {
            command: command.into(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            cwd: Some(cwd.into()),
            env: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdio_copies_args() {
        let config = TransportConfig::stdio("python", &["server.py", "--verbose"]);
        let TransportConfig::Stdio { command, args, cwd, env } = config else {
            panic!("expected stdio variant");
        };
        assert_eq!(command, "python");
        assert_eq!(args, vec!["server.py", "--verbose"]);
        assert!(cwd.is_none());
        assert!(env.is_none());
    }
}
