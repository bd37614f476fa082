//! Request/response types shared by all providers.

use serde::{Deserialize, Serialize};

use crate::conversation::{Message, StopReason};
use crate::tool::ToolDefinition;

/// One conversation round-trip sent to a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConverseRequest {
    /// System prompt, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// The full transcript so far, oldest first.
    pub messages: Vec<Message>,
    /// Schemas of the tools the model may request. An empty list is legal
    /// and simply disables tool use for this call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl ConverseRequest {
    /// Create a request carrying the given transcript.
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            system: None,
            messages,
            tools: Vec::new(),
        }
    }

    /// Set the system prompt.
    #[must_use]
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the tool schemas.
    #[must_use]
    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// A provider's answer to one [`ConverseRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseResponse {
    /// The assistant turn, appended to the transcript unconditionally.
    pub message: Message,
    /// Why the model stopped generating; drives the loop's control flow.
    pub stop_reason: StopReason,
    /// Token usage for this round-trip, if the provider reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub input_tokens: u32,
    /// Tokens in the completion.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Create new token usage with the given counts.
    #[must_use]
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total token count.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for TokenUsage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_adds_saturating() {
        let mut usage = TokenUsage::new(100, 50);
        usage += TokenUsage::new(200, 100);
        assert_eq!(usage, TokenUsage::new(300, 150));
        assert_eq!(usage.total(), 450);

        let max = TokenUsage::new(u32::MAX, u32::MAX) + TokenUsage::new(1, 1);
        assert_eq!(max, TokenUsage::new(u32::MAX, u32::MAX));
    }

    #[test]
    fn usage_sums() {
        let total: TokenUsage = [TokenUsage::new(10, 5), TokenUsage::new(20, 10)]
            .into_iter()
            .sum();
        assert_eq!(total, TokenUsage::new(30, 15));
    }
}
