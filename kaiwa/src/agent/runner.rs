//! Runner — the agent execution loop.
//!
//! The [`Runner`] drives an [`Agent`] through its tool-use loop:
//!
//! 1. Send the transcript, system prompt, and tool schemas to the provider
//! 2. Append the assistant turn (always, even if tool dispatch fails later)
//! 3. On `end_turn`, return the concatenated text as the final answer
//! 4. On `tool_use`, execute every requested tool and append the batched
//!    results as one user turn, in request order
//! 5. Loop, bounded by the iteration cap
//!
//! Tool failures — including requests for names the registry does not know —
//! are folded into error-flagged result payloads so the model can recover;
//! they never abort the run. Provider failures, malformed responses,
//! iteration-budget exhaustion, and cancellation do abort, surfacing to the
//! caller per [`crate::error::Error`].

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
#[cfg(test)]
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::conversation::{ContentBlock, Message, StopReason, ToolUse};
use crate::error::{Error, Result};
use crate::provider::{CompletionProvider, ConverseRequest, TokenUsage};
use crate::tool::ToolDefinition;

use super::{Agent, RunConfig, RunResult};

/// Stateless execution engine that drives an [`Agent`] through its
/// tool-use loop.
///
/// `Runner` owns no state — the transcript and counters live in local
/// variables inside [`Runner::run`], so concurrent runs (of the same or
/// different agents) never interfere. Each run owns its [`Conversation`]
/// exclusively until it returns it.
///
/// [`Conversation`]: crate::conversation::Conversation
#[derive(Debug, Clone, Copy)]
pub struct Runner;

impl Runner {
    /// Execute one agent run to completion.
    ///
    /// Appends `input` as a user turn to the (possibly fresh) conversation
    /// from `config`, then loops against `provider` until the model stops
    /// requesting tools or the iteration budget runs out.
    ///
    /// # Errors
    ///
    /// * [`Error::Provider`] — the completion call failed; not retried.
    /// * [`Error::Malformed`] — the provider signalled `tool_use` without
    ///   any tool-use blocks.
    /// * [`Error::IterationLimit`] — no final answer within the budget;
    ///   carries the partial transcript.
    /// * [`Error::Cancelled`] — the token fired at a suspension point;
    ///   carries the transcript without any partially-completed batch.
    pub fn run<'a>(
        provider: &'a dyn CompletionProvider,
        agent: &'a Agent,
        input: &'a str,
        config: RunConfig,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        Box::pin(Self::run_inner(provider, agent, input, config))
    }

    async fn run_inner(
        provider: &dyn CompletionProvider,
        agent: &Agent,
        input: &str,
        config: RunConfig,
    ) -> Result<RunResult> {
        let max_iterations = config
            .max_iterations
            .unwrap_or_else(|| agent.get_max_iterations())
            .max(1);
        let cancel = config.cancellation.unwrap_or_default();

        let mut conversation = config.conversation.unwrap_or_default();
        conversation.push(Message::user(input));

        let definitions = Self::collect_definitions(agent);
        let instructions = agent.get_instructions();
        let system = (!instructions.is_empty()).then(|| instructions.to_string());
        let mut usage = TokenUsage::default();

        for iteration in 1..=max_iterations {
            debug!(agent = %agent.name(), iteration, model = provider.model_id(), "starting iteration");

            let request = ConverseRequest {
                system: system.clone(),
                messages: conversation.messages().to_vec(),
                tools: definitions.clone(),
            };

            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::cancelled(conversation)),
                result = provider.converse(&request) => result?,
            };

            if let Some(step_usage) = response.usage {
                usage += step_usage;
            }

            // The assistant turn is appended unconditionally: even when tool
            // dispatch fails downstream it may carry reasoning text.
            let assistant = response.message;
            conversation.push(assistant.clone());

            match response.stop_reason {
                StopReason::EndTurn => {
                    return Ok(RunResult {
                        output: assistant.text(),
                        conversation,
                        usage,
                        iterations: iteration,
                    });
                }
                StopReason::ToolUse => {
                    let requests: Vec<ToolUse> = assistant.tool_uses().cloned().collect();
                    if requests.is_empty() {
                        return Err(Error::Malformed(
                            "stop reason was tool_use but the assistant turn has no tool_use blocks"
                                .into(),
                        ));
                    }

                    let results = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(Error::cancelled(conversation)),
                        results = Self::dispatch_batch(
                            provider,
                            agent,
                            &requests,
                            config.max_tool_concurrency,
                        ) => results,
                    };

                    // One turn per batch, results in request order.
                    conversation.push(Message::tool_results(results));
                }
            }
        }

        warn!(agent = %agent.name(), max_iterations, "iteration limit reached");
        Err(Error::iteration_limit(max_iterations, conversation))
    }

    /// Tool definitions advertised to the model: registered tools plus a
    /// stub per sub-agent.
    fn collect_definitions(agent: &Agent) -> Vec<ToolDefinition> {
        let mut definitions = agent.tools().definitions();
        definitions.extend(agent.sub_agents().iter().map(|sub| ToolDefinition {
            name: sub.name().to_string(),
            description: sub.tool_stub_description(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "task": {
                        "type": "string",
                        "description": "The task to delegate to this agent."
                    }
                },
                "required": ["task"]
            }),
        }));
        definitions
    }

    /// Execute one assistant turn's tool requests, preserving request order
    /// in the returned results.
    ///
    /// Requests run in chunks of up to `max_concurrency` at a time via
    /// [`futures::future::join_all`]; `None` runs the whole batch at once.
    async fn dispatch_batch(
        provider: &dyn CompletionProvider,
        agent: &Agent,
        requests: &[ToolUse],
        max_concurrency: Option<usize>,
    ) -> Vec<ContentBlock> {
        let concurrency = max_concurrency.unwrap_or(requests.len()).max(1);
        let mut results = Vec::with_capacity(requests.len());

        for chunk in requests.chunks(concurrency) {
            let futures: Vec<_> = chunk
                .iter()
                .map(|request| Self::dispatch_one(provider, agent, request))
                .collect();
            results.extend(futures::future::join_all(futures).await);
        }

        results
    }

    /// Execute a single tool request, folding every failure into an
    /// error-flagged result block.
    async fn dispatch_one(
        provider: &dyn CompletionProvider,
        agent: &Agent,
        request: &ToolUse,
    ) -> ContentBlock {
        debug!(tool = %request.name, args = %request.input, "dispatching tool");

        if let Some(sub) = agent
            .sub_agents()
            .iter()
            .find(|sub| sub.name() == request.name)
        {
            return Self::dispatch_sub_agent(provider, agent, sub, request).await;
        }

        let Some(tool) = agent.tools().lookup(&request.name) else {
            warn!(tool = %request.name, "unknown tool requested");
            return ContentBlock::tool_error(
                &request.id,
                Self::error_payload(agent, &format!("unknown tool '{}'", request.name)),
            );
        };

        match tool.call(request.input.clone()).await {
            Ok(payload) => ContentBlock::tool_result(&request.id, payload),
            Err(error) => {
                warn!(tool = %request.name, %error, "tool failed");
                ContentBlock::tool_error(&request.id, Self::error_payload(agent, &error.to_string()))
            }
        }
    }

    /// Run a sub-agent as a recursive child run on the delegated task.
    async fn dispatch_sub_agent(
        provider: &dyn CompletionProvider,
        parent: &Agent,
        sub: &Agent,
        request: &ToolUse,
    ) -> ContentBlock {
        let task = request
            .input
            .get("task")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match Self::run(provider, sub, task, RunConfig::default()).await {
            Ok(result) => ContentBlock::tool_result(&request.id, result.output),
            Err(error) => {
                warn!(sub_agent = %sub.name(), %error, "sub-agent run failed");
                ContentBlock::tool_error(
                    &request.id,
                    Self::error_payload(
                        parent,
                        &format!("sub-agent '{}' failed: {error}", sub.name()),
                    ),
                )
            }
        }
    }

    /// Build the structured error payload handed back to the model.
    fn error_payload(agent: &Agent, message: &str) -> String {
        let mut payload = serde_json::json!({ "error": message });
        if let Some(suggestion) = agent.suggestion() {
            payload["suggestion"] = Value::String(suggestion.to_string());
        }
        payload.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use crate::conversation::Role;
    use crate::provider::{ProviderError, ScriptedProvider};
    use crate::tool::{FnTool, ToolError, ToolRegistry};

    use super::*;

    fn echo_registry() -> ToolRegistry {
        ToolRegistry::new().with(FnTool::new(
            "echo",
            "Echo the arguments back.",
            json!({"type": "object", "properties": {"x": {"type": "string"}}}),
            |args| async move { Ok(args.to_string()) },
        ))
    }

    #[tokio::test]
    async fn terminates_on_first_final_answer() {
        let provider = ScriptedProvider::new().reply("hello there");
        let agent = Agent::new("assistant");

        let result = Runner::run(&provider, &agent, "hi", RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.output, "hello there");
        assert_eq!(result.iterations, 1);
        assert_eq!(provider.calls(), 1);

        // Exactly the user turn and one assistant turn.
        let messages = result.conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn tool_round_trip_appends_matching_result_turn() {
        let provider = ScriptedProvider::new()
            .tool_calls(&[("t1", "echo", json!({"x": "hi"}))])
            .reply("echoed");
        let agent = Agent::new("assistant").registry(echo_registry());

        let result = Runner::run(&provider, &agent, "say hi", RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.output, "echoed");
        assert_eq!(result.iterations, 2);

        let messages = result.conversation.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].tool_uses().count(), 1);

        // The result turn carries exactly one result whose id matches.
        let results: Vec<_> = messages[2]
            .content
            .iter()
            .filter_map(ContentBlock::as_tool_result)
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "t1");
        assert!(!results[0].is_error);
        assert_eq!(results[0].content, r#"{"x":"hi"}"#);

        assert_eq!(messages[3].role, Role::Assistant);
    }

    #[tokio::test]
    async fn unknown_tool_is_non_fatal() {
        let provider = ScriptedProvider::new()
            .tool_calls(&[("t1", "does_not_exist", json!({}))])
            .reply("recovered");
        let agent = Agent::new("assistant").registry(echo_registry());

        let result = Runner::run(&provider, &agent, "go", RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.output, "recovered");
        let result_block = result.conversation.messages()[2].content[0]
            .as_tool_result()
            .unwrap();
        assert!(result_block.is_error);

        let payload: Value = serde_json::from_str(&result_block.content).unwrap();
        assert!(
            payload["error"]
                .as_str()
                .unwrap()
                .contains("unknown tool 'does_not_exist'")
        );
    }

    #[tokio::test]
    async fn tool_failure_is_non_fatal_and_carries_message() {
        let registry = ToolRegistry::new().with(FnTool::new(
            "get_stock_price",
            "Get stock price (may fail).",
            json!({"type": "object", "properties": {"symbol": {"type": "string"}}}),
            |_| async move { Err(ToolError::execution("stock API unavailable for NWG")) },
        ));
        let provider = ScriptedProvider::new()
            .tool_calls(&[("t1", "get_stock_price", json!({"symbol": "NWG"}))])
            .reply("sorry, no quote");
        let agent = Agent::new("assistant").registry(registry);

        let result = Runner::run(&provider, &agent, "price of NWG?", RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.output, "sorry, no quote");
        let result_block = result.conversation.messages()[2].content[0]
            .as_tool_result()
            .unwrap();
        assert!(result_block.is_error);
        assert!(result_block.content.contains("stock API unavailable for NWG"));
    }

    #[tokio::test]
    async fn error_payload_carries_configured_suggestion() {
        let provider = ScriptedProvider::new()
            .tool_calls(&[("t1", "missing", json!({}))])
            .reply("ok");
        let agent = Agent::new("assistant")
            .tool_error_suggestion("Try answering without the tool.");

        let result = Runner::run(&provider, &agent, "go", RunConfig::default())
            .await
            .unwrap();

        let payload: Value = serde_json::from_str(
            &result.conversation.messages()[2].content[0]
                .as_tool_result()
                .unwrap()
                .content,
        )
        .unwrap();
        assert_eq!(payload["suggestion"], "Try answering without the tool.");
    }

    #[tokio::test]
    async fn batch_results_preserve_request_order() {
        // Tools complete in reverse order; results must still come back
        // as t1, t2, t3.
        let sleepy = |millis: u64| {
            move |args: Value| async move {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(args["tag"].as_str().unwrap_or_default().to_string())
            }
        };
        let registry = ToolRegistry::new()
            .with(FnTool::new("slow", "", json!({"type": "object"}), sleepy(40)))
            .with(FnTool::new("medium", "", json!({"type": "object"}), sleepy(15)))
            .with(FnTool::new("fast", "", json!({"type": "object"}), sleepy(0)));

        let provider = ScriptedProvider::new()
            .tool_calls(&[
                ("t1", "slow", json!({"tag": "first"})),
                ("t2", "medium", json!({"tag": "second"})),
                ("t3", "fast", json!({"tag": "third"})),
            ])
            .reply("done");
        let agent = Agent::new("assistant").registry(registry);

        let result = Runner::run(&provider, &agent, "go", RunConfig::default())
            .await
            .unwrap();

        let results: Vec<_> = result.conversation.messages()[2]
            .content
            .iter()
            .filter_map(ContentBlock::as_tool_result)
            .collect();
        assert_eq!(
            results.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["t1", "t2", "t3"]
        );
        assert_eq!(
            results.iter().map(|r| r.content.as_str()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );
    }

    #[tokio::test]
    async fn sequential_dispatch_is_equivalent() {
        let provider = ScriptedProvider::new()
            .tool_calls(&[
                ("t1", "echo", json!({"x": "a"})),
                ("t2", "echo", json!({"x": "b"})),
            ])
            .reply("done");
        let agent = Agent::new("assistant").registry(echo_registry());

        let config = RunConfig::default().with_max_tool_concurrency(1);
        let result = Runner::run(&provider, &agent, "go", config).await.unwrap();

        let results: Vec<_> = result.conversation.messages()[2]
            .content
            .iter()
            .filter_map(ContentBlock::as_tool_result)
            .collect();
        assert_eq!(
            results.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["t1", "t2"]
        );
    }

    #[tokio::test]
    async fn iteration_budget_is_enforced_exactly() {
        // The model never stops asking for tools.
        let provider = ScriptedProvider::new()
            .tool_calls(&[("t1", "echo", json!({"x": "1"}))])
            .tool_calls(&[("t2", "echo", json!({"x": "2"}))])
            .tool_calls(&[("t3", "echo", json!({"x": "3"}))]);
        let agent = Agent::new("assistant").registry(echo_registry());

        let config = RunConfig::default().with_max_iterations(2);
        let err = Runner::run(&provider, &agent, "go", config).await.unwrap_err();

        // Exactly 2 provider calls, never a 3rd.
        assert_eq!(provider.calls(), 2);
        let Error::IterationLimit { limit, conversation } = err else {
            panic!("expected IterationLimit, got {err:?}");
        };
        assert_eq!(limit, 2);
        // user + 2 * (assistant + results) = 5 turns of partial progress.
        assert_eq!(conversation.len(), 5);
    }

    #[tokio::test]
    async fn reentry_appends_exactly_one_user_turn() {
        let provider = ScriptedProvider::new().reply("first answer").reply("second answer");
        let agent = Agent::new("assistant");

        let first = Runner::run(&provider, &agent, "one", RunConfig::default())
            .await
            .unwrap();
        let prior = first.conversation.clone();

        let config = RunConfig::default().with_conversation(first.conversation);
        let second = Runner::run(&provider, &agent, "two", config).await.unwrap();

        // Prior turns are untouched and in order; exactly one user turn and
        // one assistant turn were appended.
        assert_eq!(second.conversation.len(), prior.len() + 2);
        assert_eq!(&second.conversation.messages()[..prior.len()], prior.messages());
        assert_eq!(
            second.conversation.messages()[prior.len()].text(),
            "two"
        );
        assert_eq!(second.output, "second answer");
    }

    #[tokio::test]
    async fn empty_registry_allows_tool_free_conversation() {
        let provider = ScriptedProvider::new().reply("no tools needed");
        let agent = Agent::new("assistant").instructions("Be helpful.");

        let result = Runner::run(&provider, &agent, "hi", RunConfig::default())
            .await
            .unwrap();
        assert_eq!(result.output, "no tools needed");

        // No tool schemas were advertised.
        let sent = provider.requests();
        assert!(sent[0].tools.is_empty());
        assert_eq!(sent[0].system.as_deref(), Some("Be helpful."));
    }

    #[tokio::test]
    async fn provider_failure_surfaces_to_caller() {
        let provider = ScriptedProvider::new().fail(ProviderError::Status {
            status: 503,
            body: "service unavailable".into(),
        });
        let agent = Agent::new("assistant");

        let err = Runner::run(&provider, &agent, "hi", RunConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn tool_use_without_blocks_is_malformed() {
        let provider = ScriptedProvider::new().respond(crate::provider::ConverseResponse {
            message: Message::assistant("thinking..."),
            stop_reason: StopReason::ToolUse,
            usage: None,
        });
        let agent = Agent::new("assistant");

        let err = Runner::run(&provider, &agent, "hi", RunConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[tokio::test]
    async fn cancellation_before_first_call_keeps_user_turn_only() {
        let provider = ScriptedProvider::new().reply("never seen");
        let agent = Agent::new("assistant");

        let token = CancellationToken::new();
        token.cancel();
        let config = RunConfig::default().with_cancellation(token);

        let err = Runner::run(&provider, &agent, "hi", config).await.unwrap_err();
        assert_eq!(provider.calls(), 0);

        let conversation = err.into_conversation().unwrap();
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn cancellation_during_batch_drops_partial_results() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let started = Arc::new(AtomicUsize::new(0));
        let started_probe = Arc::clone(&started);

        // A tool that cancels the run while it is executing and then stalls.
        let registry = ToolRegistry::new().with(FnTool::new(
            "stall",
            "",
            json!({"type": "object"}),
            move |_| {
                let trigger = trigger.clone();
                let started = Arc::clone(&started_probe);
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    trigger.cancel();
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok("too late".to_string())
                }
            },
        ));

        let provider = ScriptedProvider::new().tool_calls(&[("t1", "stall", json!({}))]);
        let agent = Agent::new("assistant").registry(registry);
        let config = RunConfig::default().with_cancellation(token);

        let err = Runner::run(&provider, &agent, "go", config).await.unwrap_err();
        assert_eq!(started.load(Ordering::SeqCst), 1);

        // The transcript ends at the assistant turn; no partial batch.
        let conversation = err.into_conversation().unwrap();
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn sub_agent_is_advertised_and_dispatched() {
        let provider = ScriptedProvider::new()
            // Parent delegates to the researcher.
            .tool_calls(&[("t1", "researcher", json!({"task": "dig into KYC"}))])
            // Child run: final answer straight away.
            .reply("KYC means know your customer")
            // Parent wraps up with the child's findings in context.
            .reply("Done: KYC means know your customer");

        let agent = Agent::new("orchestrator")
            .sub_agent(Agent::new("researcher").instructions("You research topics."));

        let result = Runner::run(&provider, &agent, "what is KYC?", RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.output, "Done: KYC means know your customer");
        assert_eq!(provider.calls(), 3);

        // The sub-agent was advertised as a tool taking a task string.
        let first_request = &provider.requests()[0];
        assert_eq!(first_request.tools.len(), 1);
        assert_eq!(first_request.tools[0].name, "researcher");
        assert_eq!(
            first_request.tools[0].parameters["required"],
            json!(["task"])
        );

        // Its answer came back as the tool result.
        let result_block = result.conversation.messages()[2].content[0]
            .as_tool_result()
            .unwrap();
        assert_eq!(result_block.content, "KYC means know your customer");
    }

    #[tokio::test]
    async fn sub_agent_failure_is_folded_not_fatal() {
        let provider = ScriptedProvider::new()
            .tool_calls(&[("t1", "researcher", json!({"task": "dig"}))])
            .fail(ProviderError::Status {
                status: 500,
                body: "boom".into(),
            })
            .reply("the researcher is unavailable");

        let agent = Agent::new("orchestrator").sub_agent(Agent::new("researcher"));

        let result = Runner::run(&provider, &agent, "go", RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.output, "the researcher is unavailable");
        let result_block = result.conversation.messages()[2].content[0]
            .as_tool_result()
            .unwrap();
        assert!(result_block.is_error);
        assert!(result_block.content.contains("sub-agent 'researcher' failed"));
    }
}
