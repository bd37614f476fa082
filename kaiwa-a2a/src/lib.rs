//! Agent-to-agent (A2A) surface for kaiwa agents.
//!
//! Exposes a kaiwa [`Agent`](kaiwa::agent::Agent) to other agents over
//! HTTP: an agent card at `/.well-known/agent.json` for discovery, and a
//! small task API (`POST /tasks`, `GET /tasks/{id}`) where submitted
//! messages run through the agent loop in the background and callers poll
//! for the result.
//!
//! The matching [`A2aClient`] discovers remote agents and delegates work
//! to them with the same submit-then-poll flow.

mod card;
mod client;
mod error;
mod server;

pub use card::{AgentCapabilities, AgentCard, AgentSkill};
pub use client::A2aClient;
pub use error::A2aError;
pub use server::{A2aServer, Task, TaskRequest, TaskStatus};
