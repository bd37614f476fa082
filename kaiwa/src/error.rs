//! Unified error types for the kaiwa crate.
//!
//! Only tool-level failures are absorbed into the conversation transcript
//! (as error-flagged tool results); everything here unwinds out of a run
//! to the caller, who decides whether to retry, surface, or log.

use crate::conversation::Conversation;
use crate::provider::ProviderError;

/// Result type alias for kaiwa operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the kaiwa crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The completion service call itself failed. Not retried internally;
    /// retry policy is the caller's responsibility.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The completion service response was missing expected fields.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// The run exceeded its iteration budget without a final answer.
    ///
    /// Carries the partial transcript so progress is not lost.
    #[error("iteration limit ({limit}) reached without a final answer")]
    IterationLimit {
        /// The configured maximum number of model round-trips.
        limit: usize,
        /// The transcript accumulated before the budget ran out.
        conversation: Box<Conversation>,
    },

    /// Caller-triggered cancellation observed at a suspension point.
    ///
    /// Partially completed tool batches are not part of the carried
    /// transcript: every tool result in it answers a request that is also
    /// in it.
    #[error("run cancelled")]
    Cancelled {
        /// The transcript accumulated before cancellation.
        conversation: Box<Conversation>,
    },

    /// Agent configuration error.
    #[error("agent error: {0}")]
    Agent(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an agent configuration error.
    #[must_use]
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    pub(crate) fn iteration_limit(limit: usize, conversation: Conversation) -> Self {
        Self::IterationLimit {
            limit,
            conversation: Box::new(conversation),
        }
    }

    pub(crate) fn cancelled(conversation: Conversation) -> Self {
        Self::Cancelled {
            conversation: Box::new(conversation),
        }
    }

    /// The partial transcript carried by this error, if any.
    #[must_use]
    pub fn conversation(&self) -> Option<&Conversation> {
        match self {
            Self::IterationLimit { conversation, .. } | Self::Cancelled { conversation } => {
                Some(conversation)
            }
            _ => None,
        }
    }

    /// Consume the error and recover the partial transcript, if any.
    #[must_use]
    pub fn into_conversation(self) -> Option<Conversation> {
        match self {
            Self::IterationLimit { conversation, .. } | Self::Cancelled { conversation } => {
                Some(*conversation)
            }
            _ => None,
        }
    }
}
