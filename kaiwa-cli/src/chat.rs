//! Interactive REPL for chatting with a local agent.

use std::io::{self, Write};

use kaiwa::agent::{Agent, RunConfig, Runner};
use kaiwa::conversation::Conversation;
use kaiwa::provider::{CompletionProvider, TokenUsage};

/// A chat session: one agent, one retained conversation.
pub struct ChatSession<P> {
    provider: P,
    agent: Agent,
    conversation: Conversation,
    show_usage: bool,
    last_usage: Option<TokenUsage>,
}

impl<P: CompletionProvider> ChatSession<P> {
    /// Create a session with an empty transcript.
    pub fn new(provider: P, agent: Agent) -> Self {
        Self {
            provider,
            agent,
            conversation: Conversation::new(),
            show_usage: false,
            last_usage: None,
        }
    }

    /// Display token usage after each response.
    #[must_use]
    pub fn show_usage(mut self, show: bool) -> Self {
        self.show_usage = show;
        self
    }

    /// Send one user turn through the agent loop.
    ///
    /// The transcript is retained across turns; when a run fails partway
    /// it is restored from the error so the next turn continues from the
    /// last good state.
    pub async fn send(&mut self, input: &str) -> Option<String> {
        let config = RunConfig::default().with_conversation(self.conversation.clone());

        match Runner::run(&self.provider, &self.agent, input, config).await {
            Ok(result) => {
                self.conversation = result.conversation;
                self.last_usage = Some(result.usage);
                Some(result.output)
            }
            Err(error) => {
                eprintln!("error: {error}");
                // Iteration-limit and cancellation errors carry the partial
                // transcript; adopt it. Other errors keep the prior state.
                if let Some(conversation) = error.into_conversation() {
                    self.conversation = conversation;
                }
                None
            }
        }
    }

    /// Run the interactive REPL loop.
    pub async fn run(mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        println!(
            "kaiwa chat (type 'exit' or Ctrl+C to quit, 'clear' to reset the conversation)"
        );
        println!("Tools: {}", self.agent.tools().names().join(", "));
        println!();

        loop {
            print!("> ");
            stdout.flush()?;

            let mut input = String::new();
            if stdin.read_line(&mut input)? == 0 {
                break;
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match input {
                "exit" | "quit" => break,
                "clear" => {
                    self.conversation = Conversation::new();
                    println!("Conversation cleared.");
                    continue;
                }
                _ => {}
            }

            println!();
            if let Some(output) = self.send(input).await {
                println!("{output}");
            }

            if self.show_usage {
                if let Some(usage) = &self.last_usage {
                    println!(
                        "[Tokens: {} in / {} out]",
                        usage.input_tokens, usage.output_tokens
                    );
                }
            }
            println!();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kaiwa::provider::{ProviderError, ScriptedProvider};

    use super::*;

    #[tokio::test]
    async fn send_retains_conversation_across_turns() {
        let provider = ScriptedProvider::new().reply("hello").reply("again");
        let mut session = ChatSession::new(provider, Agent::new("assistant"));

        assert_eq!(session.send("hi").await.as_deref(), Some("hello"));
        assert_eq!(session.send("more").await.as_deref(), Some("again"));

        // user/assistant twice.
        assert_eq!(session.conversation.len(), 4);
    }

    #[tokio::test]
    async fn failed_turn_keeps_prior_transcript() {
        let provider = ScriptedProvider::new().reply("hello").fail(ProviderError::Status {
            status: 500,
            body: "boom".into(),
        });
        let mut session = ChatSession::new(provider, Agent::new("assistant"));

        assert!(session.send("hi").await.is_some());
        assert!(session.send("more").await.is_none());

        // The failed turn left the last good transcript untouched.
        assert_eq!(session.conversation.len(), 2);
    }
}
