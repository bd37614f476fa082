//! Completion providers.
//!
//! A [`CompletionProvider`] is the hosted model endpoint the agent loop
//! talks to: it accepts a conversation plus tool schemas and returns an
//! assistant turn with a stop reason. Providers are constructed once by
//! the caller and injected into the loop; the crate never caches a global
//! client.

mod anthropic;
mod scripted;
mod types;

pub use anthropic::{AnthropicBuilder, AnthropicProvider};
pub use scripted::ScriptedProvider;
pub use types::{ConverseRequest, ConverseResponse, TokenUsage};

use async_trait::async_trait;

/// Error type for completion provider operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Transport-level failure (timeout, connection refused, ...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, for diagnostics.
        body: String,
    },

    /// Missing or rejected credentials.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The response could not be interpreted as an assistant turn.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The hosted model endpoint consumed by the agent loop.
///
/// Implementations must be safe to share across concurrent runs; all
/// per-conversation state lives in the [`ConverseRequest`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// The model identifier requests are routed to.
    fn model_id(&self) -> &str;

    /// Send one conversation round-trip and return the assistant turn.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the call fails or the response cannot
    /// be parsed. Providers do not retry internally.
    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse, ProviderError>;
}

/// Trait for providers that can be created from environment variables.
pub trait FromEnv: Sized {
    /// Create a new client from environment variables.
    ///
    /// # Panics
    ///
    /// Panics if required environment variables are not set.
    fn from_env() -> Self;
}
