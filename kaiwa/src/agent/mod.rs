//! Agents and the runner that drives them.
//!
//! An [`Agent`] bundles a system prompt, a [`ToolRegistry`], and loop
//! limits; the stateless [`Runner`] drives it through the tool-use loop
//! against an injected [`CompletionProvider`](crate::provider::CompletionProvider):
//! send the transcript, execute whatever tools the model requests, feed
//! the results back, repeat until the model answers.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use kaiwa::agent::{Agent, RunConfig, Runner};
//!
//! let agent = Agent::new("assistant")
//!     .instructions("You are a helpful assistant.")
//!     .tool(my_weather_tool);
//!
//! let result = Runner::run(&provider, &agent, "Weather in London?", RunConfig::default()).await?;
//! println!("{}", result.output);
//! ```
//!
//! Sub-agents registered with [`Agent::sub_agent`] are advertised to the
//! model as tools and dispatched as recursive child runs, which is enough
//! to build small delegation pipelines.

mod runner;

pub use runner::Runner;

use tokio_util::sync::CancellationToken;

use crate::conversation::Conversation;
use crate::provider::TokenUsage;
use crate::tool::{Tool, ToolRegistry};

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// A named agent: system prompt, tools, sub-agents, and loop limits.
#[derive(Debug, Default)]
pub struct Agent {
    name: String,
    description: Option<String>,
    instructions: String,
    tools: ToolRegistry,
    sub_agents: Vec<Agent>,
    max_iterations: usize,
    tool_error_suggestion: Option<String>,
}

impl Agent {
    /// Create an agent with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            ..Self::default()
        }
    }

    /// Set the system prompt.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Set the description used when this agent is advertised as a tool
    /// to a parent agent.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Register a tool.
    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Replace the whole tool registry.
    #[must_use]
    pub fn registry(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Register a sub-agent, exposed to the model as a tool taking a
    /// `task` string.
    #[must_use]
    pub fn sub_agent(mut self, agent: Agent) -> Self {
        self.sub_agents.push(agent);
        self
    }

    /// Cap the number of model round-trips per run. Clamped to at least 1.
    #[must_use]
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Add a fixed `suggestion` field to tool error payloads, giving the
    /// model a hint on how to proceed when a tool fails.
    #[must_use]
    pub fn tool_error_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.tool_error_suggestion = Some(suggestion.into());
        self
    }

    /// The agent's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The agent's system prompt.
    #[must_use]
    pub fn get_instructions(&self) -> &str {
        &self.instructions
    }

    /// The agent's tool registry.
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The agent's registered sub-agents.
    #[must_use]
    pub fn sub_agents(&self) -> &[Agent] {
        &self.sub_agents
    }

    /// The configured iteration cap.
    #[must_use]
    pub fn get_max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub(crate) fn suggestion(&self) -> Option<&str> {
        self.tool_error_suggestion.as_deref()
    }

    pub(crate) fn tool_stub_description(&self) -> String {
        self.description.clone().unwrap_or_else(|| {
            format!("Delegate a task to the '{}' agent.", self.name)
        })
    }
}

/// Per-run configuration for [`Runner::run`].
#[derive(Debug, Default)]
pub struct RunConfig {
    /// Prior transcript to continue; a fresh conversation when `None`.
    pub conversation: Option<Conversation>,
    /// Override of the agent's iteration cap for this run.
    pub max_iterations: Option<usize>,
    /// Cap on concurrent tool dispatches within one assistant turn.
    /// `None` runs the whole batch at once; `Some(1)` is sequential.
    pub max_tool_concurrency: Option<usize>,
    /// Cancellation token observed at every suspension point.
    pub cancellation: Option<CancellationToken>,
}

impl RunConfig {
    /// Continue a prior conversation.
    #[must_use]
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = Some(conversation);
        self
    }

    /// Override the iteration cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Cap concurrent tool dispatches.
    #[must_use]
    pub const fn with_max_tool_concurrency(mut self, max: usize) -> Self {
        self.max_tool_concurrency = Some(max);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// The outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// The final answer: all text blocks of the closing assistant turn,
    /// concatenated in order.
    pub output: String,
    /// The full transcript, ready to be passed into a follow-up run.
    pub conversation: Conversation,
    /// Cumulative token usage across every round-trip of this run.
    pub usage: TokenUsage,
    /// Number of model round-trips the run took.
    pub iterations: usize,
}
