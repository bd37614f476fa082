//! A scripted provider for tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::conversation::{ContentBlock, Message, Role, StopReason};

use super::{CompletionProvider, ConverseRequest, ConverseResponse, ProviderError, TokenUsage};

/// A [`CompletionProvider`] that replays a fixed script of responses.
///
/// Each call to [`converse`](CompletionProvider::converse) pops the next
/// scripted response (or error) and records the request it was given, so
/// tests can assert both the loop's outputs and exactly what was sent
/// upstream.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ConverseResponse, ProviderError>>>,
    requests: Mutex<Vec<ConverseRequest>>,
}

impl ScriptedProvider {
    /// Create a provider with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a final text answer (`end_turn`).
    #[must_use]
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.respond(ConverseResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: Some(TokenUsage::new(10, 5)),
        })
    }

    /// Script an assistant turn requesting the given tool invocations,
    /// in order.
    #[must_use]
    pub fn tool_calls(self, calls: &[(&str, &str, Value)]) -> Self {
        let content = calls
            .iter()
            .map(|(id, name, input)| ContentBlock::tool_use(*id, *name, input.clone()))
            .collect();
        self.respond(ConverseResponse {
            message: Message {
                role: Role::Assistant,
                content,
            },
            stop_reason: StopReason::ToolUse,
            usage: Some(TokenUsage::new(10, 5)),
        })
    }

    /// Script an arbitrary response.
    #[must_use]
    pub fn respond(self, response: ConverseResponse) -> Self {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(Ok(response));
        self
    }

    /// Script a provider failure.
    #[must_use]
    pub fn fail(self, error: ProviderError) -> Self {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(Err(error));
        self
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().expect("request lock poisoned").len()
    }

    /// Snapshot of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ConverseRequest> {
        self.requests
            .lock()
            .expect("request lock poisoned")
            .clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse, ProviderError> {
        self.requests
            .lock()
            .expect("request lock poisoned")
            .push(request.clone());

        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::Malformed(
                    "scripted provider has no more responses".into(),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replays_script_in_order() {
        let provider = ScriptedProvider::new()
            .tool_calls(&[("t1", "echo", json!({"x": "hi"}))])
            .reply("done");

        let request = ConverseRequest::new(vec![Message::user("hi")]);

        let first = provider.converse(&request).await.unwrap();
        assert_eq!(first.stop_reason, StopReason::ToolUse);

        let second = provider.converse(&request).await.unwrap();
        assert_eq!(second.stop_reason, StopReason::EndTurn);
        assert_eq!(second.message.text(), "done");

        assert_eq!(provider.calls(), 2);
        assert!(provider.converse(&request).await.is_err());
    }
}
