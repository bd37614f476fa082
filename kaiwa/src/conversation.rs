//! Conversation transcript types.
//!
//! A [`Conversation`] is an ordered, append-only sequence of [`Message`]s.
//! It is the literal context sent to the model on every round-trip, so
//! order is significant and turns are never rewritten in place. Each
//! message carries a list of [`ContentBlock`]s: plain text, a tool
//! invocation requested by the model, or the result of executing one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The author of a [`Message`].
///
/// Tool results travel back to the model inside a `User` turn, mirroring
/// how the upstream conversation APIs frame them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user input or tool results being fed back.
    User,
    /// Model output.
    Assistant,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Identifier unique within the assistant turn; results must echo it.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON arguments for the tool.
    pub input: Value,
}

/// The result of executing one requested tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The `id` of the [`ToolUse`] this result answers.
    pub id: String,
    /// Result payload, conventionally JSON-encoded.
    pub content: String,
    /// Whether the payload describes a failure the model should react to.
    #[serde(default)]
    pub is_error: bool,
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text itself.
        text: String,
    },
    /// A tool invocation requested by the model.
    ToolUse(ToolUse),
    /// The result of a tool invocation.
    ToolResult(ToolResult),
}

impl ContentBlock {
    /// Create a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a tool-use block.
    #[must_use]
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolUse(ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        })
    }

    /// Create a successful tool-result block.
    #[must_use]
    pub fn tool_result(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult(ToolResult {
            id: id.into(),
            content: content.into(),
            is_error: false,
        })
    }

    /// Create a failed tool-result block.
    #[must_use]
    pub fn tool_error(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult(ToolResult {
            id: id.into(),
            content: content.into(),
            is_error: true,
        })
    }

    /// The text of this block, if it is a text block.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// The tool-use payload of this block, if any.
    #[must_use]
    pub fn as_tool_use(&self) -> Option<&ToolUse> {
        match self {
            Self::ToolUse(tu) => Some(tu),
            _ => None,
        }
    }

    /// The tool-result payload of this block, if any.
    #[must_use]
    pub fn as_tool_result(&self) -> Option<&ToolResult> {
        match self {
            Self::ToolResult(tr) => Some(tr),
            _ => None,
        }
    }
}

/// One role-tagged entry in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the turn.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a user turn with a single text block.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create an assistant turn with a single text block.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create a user turn carrying a batch of tool results.
    #[must_use]
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: results,
        }
    }

    /// Concatenate all text blocks in this turn, in order.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect()
    }

    /// Iterate over the tool-use blocks in this turn, in order.
    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUse> {
        self.content.iter().filter_map(ContentBlock::as_tool_use)
    }

    /// Whether this turn carries any non-empty text.
    #[must_use]
    pub fn has_text(&self) -> bool {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .any(|t| !t.is_empty())
    }
}

/// An ordered, append-only conversation transcript.
///
/// A `Conversation` is owned by a single in-flight run; callers that want
/// multiple concurrent conversations hold one instance each. After a run
/// completes the transcript can be passed back into the next run to
/// continue a multi-turn dialogue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Turns are never removed or rewritten.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All turns, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent turn, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate over turns, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl FromIterator<Message> for Conversation {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model produced a final answer.
    EndTurn,
    /// The model wants one or more tools executed before continuing.
    ToolUse,
}
