#![cfg_attr(docsrs, feature(doc_cfg))]
//! Kaiwa is a small Rust library for driving tool-augmented conversations
//! with a hosted language model.
//!
//! The heart of the crate is the [`agent::Runner`]: it sends a conversation
//! to a [`provider::CompletionProvider`], executes any tools the model
//! requests against a [`tool::ToolRegistry`], feeds the results back, and
//! repeats until the model produces a final answer (or the iteration budget
//! runs out).
//!
//! ```rust,ignore
//! use kaiwa::agent::{Agent, RunConfig, Runner};
//! use kaiwa::provider::AnthropicProvider;
//!
//! let provider = AnthropicProvider::from_env().model("claude-sonnet-4-5");
//! let agent = Agent::new("assistant").instructions("You are a helpful assistant.");
//! let result = Runner::run(&provider, &agent, "Hello!", RunConfig::default()).await?;
//! println!("{}", result.output);
//! ```

pub mod agent;
pub mod conversation;
pub mod error;
pub mod provider;
pub mod router;
pub mod tool;

#[cfg(feature = "rmcp")]
#[cfg_attr(docsrs, doc(cfg(feature = "rmcp")))]
pub mod mcp;

pub use conversation::{Conversation, ContentBlock, Message, Role, StopReason};
pub use error::{Error, Result};
