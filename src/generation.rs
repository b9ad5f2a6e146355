//! Generation loop: drives the bounded generate -> tool-use -> generate
//! cycle for one agent turn.
//!
//! Grounded on the base crate's `Client::auto_execute_loop` (`client.rs`),
//! generalized from a fixed max-iterations counter into the turn-capped,
//! finish-now-coercing loop, with `before_generate` hook firing added at the
//! top of each turn.

use crate::confirmer::Confirmer;
use crate::dispatcher::Dispatcher;
use crate::events::{EventOrigin, EventPayload, EventPublisher, ResponseEvent, ResponseEventType};
use crate::hooks::{BeforeGenerateEvent, Hooks};
use crate::llm::{GenerateOptions, Llm, ToolChoice};
use crate::response::{Response, Usage};
use crate::tools::Tool;
use crate::types::{ContentBlock, Message, TextBlock};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Default tool-iteration limit (N) when an agent doesn't override it.
pub const DEFAULT_TOOL_ITERATION_LIMIT: u32 = 8;

/// Appended to history on the last allowed turn to coerce a definite answer
/// instead of another tool call; paired with `tool_choice = none` on that
/// turn's call.
const FINISH_NOW_NOTICE: &str = "You have reached the maximum number of tool-use turns. \
Respond now with your final answer; do not call any more tools.";

/// Final state after a generation loop terminates successfully: the last
/// response (the model's final answer) and the full message history
/// including every assistant/tool turn appended along the way.
pub struct GenerationOutcome {
    pub response: Response,
    pub messages: Vec<Message>,
}

/// Drives one bounded generate -> tool-use -> generate cycle. Borrows
/// everything it needs for a single call to [`GenerationLoop::run`].
pub struct GenerationLoop<'a> {
    llm: &'a dyn Llm,
    tools: &'a HashMap<String, Arc<Tool>>,
    confirmer: &'a dyn Confirmer,
    hooks: &'a Hooks,
    publisher: &'a EventPublisher,
    agent_name: &'a str,
    tool_iteration_limit: u32,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl<'a> GenerationLoop<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        llm: &'a dyn Llm,
        tools: &'a HashMap<String, Arc<Tool>>,
        confirmer: &'a dyn Confirmer,
        hooks: &'a Hooks,
        publisher: &'a EventPublisher,
        agent_name: &'a str,
        tool_iteration_limit: u32,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Self {
        Self {
            llm,
            tools,
            confirmer,
            hooks,
            publisher,
            agent_name,
            tool_iteration_limit,
            temperature,
            max_tokens,
        }
    }

    /// Run the loop starting from `messages`. Terminates on whichever comes
    /// first: zero tool calls in a turn's response (success), the N+1th turn
    /// being reached (success, that turn's response is the final answer), a
    /// provider/transport error, a blocking `before_generate` hook decision,
    /// an empty response from the provider, or a dispatcher error
    /// (`unknown-tool` / `tool-call-failed`): all of the latter three fail
    /// the whole call.
    pub async fn run(&self, mut messages: Vec<Message>) -> Result<GenerationOutcome> {
        let max_turns = self.tool_iteration_limit + 1;
        let tool_values: Vec<Arc<Tool>> = self.tools.values().cloned().collect();

        self.publish(ResponseEventType::ResponseCreated, None).await?;

        let mut last_response: Option<Response> = None;
        let mut total_usage = Usage::default();

        for turn in 1..=max_turns {
            let is_final_turn = turn == max_turns;

            let history_json: Vec<serde_json::Value> = messages
                .iter()
                .filter_map(|m| serde_json::to_value(m).ok())
                .collect();

            if let Some(decision) = self
                .hooks
                .execute_before_generate(BeforeGenerateEvent::new(history_json, turn))
                .await
            {
                if !decision.continue_execution {
                    let reason = decision
                        .reason
                        .unwrap_or_else(|| "blocked by before_generate hook".to_string());
                    return Err(Error::other(reason));
                }
                if let Some(prompt) = decision.modified_prompt {
                    messages.push(Message::user(prompt));
                }
            }

            let mut opts = GenerateOptions::new(self.temperature);
            opts.max_tokens = self.max_tokens;
            opts.tools = tool_values.clone();
            opts.tool_choice = if is_final_turn {
                ToolChoice::None
            } else {
                ToolChoice::Auto
            };

            self.publish(ResponseEventType::ResponseInProgress, None).await?;

            let response = self.llm.generate(&messages, &opts).await?;

            if response.content.is_empty() {
                return Err(Error::LlmNoResponse);
            }

            total_usage += response.usage;

            messages.push(Message::assistant(response.content.clone()));

            let calls: Vec<_> = response.tool_calls().cloned().collect();

            if calls.is_empty() || is_final_turn {
                last_response = Some(response);
                break;
            }

            let dispatcher = Dispatcher::new(
                self.tools,
                self.confirmer,
                self.hooks,
                self.publisher,
                self.agent_name,
            );
            let outcome = dispatcher.dispatch(&calls, &messages).await?;

            match outcome.tool_message {
                Some(mut tool_message) => {
                    if turn == max_turns - 1 {
                        tool_message
                            .content
                            .push(ContentBlock::Text(TextBlock::new(FINISH_NOW_NOTICE)));
                    }
                    messages.push(tool_message);
                    last_response = Some(response);
                }
                None => {
                    last_response = Some(response);
                    break;
                }
            }
        }

        let mut response = last_response.ok_or(Error::LlmNoResponse)?;
        response.usage = total_usage;
        self.publish(
            ResponseEventType::ResponseCompleted,
            Some(EventPayload::Response(response.clone())),
        )
        .await?;

        Ok(GenerationOutcome { response, messages })
    }

    async fn publish(
        &self,
        event_type: ResponseEventType,
        payload: Option<EventPayload>,
    ) -> Result<()> {
        let mut event =
            ResponseEvent::new(event_type).with_origin(EventOrigin::agent(self.agent_name));
        if let Some(payload) = payload {
            event = event.with_payload(payload);
        }
        self.publisher.send(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmer::{AutoConfirmer, ConfirmMode};
    use crate::events::channel;
    use crate::types::{ContentBlock, TextBlock, ToolUseBlock};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::collections::VecDeque;

    struct ScriptedLlm {
        responses: Mutex<VecDeque<Response>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<Response>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
            }
        }
    }

    impl Llm for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate<'a>(
            &'a self,
            _messages: &'a [Message],
            _opts: &'a GenerateOptions,
        ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>> {
            Box::pin(async move {
                self.responses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .ok_or_else(|| Error::other("no more scripted responses"))
            })
        }
    }

    fn text_response(text: &str) -> Response {
        let mut response = Response::new("r", "m");
        response.content.push(ContentBlock::Text(TextBlock::new(text)));
        response
    }

    fn tool_call_response(name: &str) -> Response {
        let mut response = Response::new("r", "m");
        response
            .content
            .push(ContentBlock::ToolUse(ToolUseBlock::new("call_1", name, serde_json::json!({}))));
        response
    }

    fn response_with_usage(mut response: Response, input_tokens: u64, output_tokens: u64) -> Response {
        response.usage = Usage {
            input_tokens,
            output_tokens,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
        };
        response
    }

    fn tools_map(tools: Vec<Tool>) -> HashMap<String, Arc<Tool>> {
        tools
            .into_iter()
            .map(|t| (t.name().to_string(), Arc::new(t)))
            .collect()
    }

    #[tokio::test]
    async fn zero_tool_calls_terminates_successfully() {
        let llm = ScriptedLlm::new(vec![text_response("hello there")]);
        let tools = tools_map(vec![]);
        let confirmer = AutoConfirmer::new(ConfirmMode::Auto);
        let hooks = Hooks::new();
        let (publisher, _stream) = channel(16);
        let generation = GenerationLoop::new(&llm, &tools, &confirmer, &hooks, &publisher, "agent", 8, 0.7, None);

        let outcome = generation.run(vec![Message::user("hi")]).await.unwrap();
        assert_eq!(outcome.response.text(), "hello there");
    }

    #[tokio::test]
    async fn dispatches_tool_then_returns_final_answer() {
        let echo = Tool::new("echo", "echoes", serde_json::json!({"type": "object"}), |args| async move {
            Ok(args)
        });
        let tools = tools_map(vec![echo]);
        let llm = ScriptedLlm::new(vec![tool_call_response("echo"), text_response("done")]);
        let confirmer = AutoConfirmer::new(ConfirmMode::Auto);
        let hooks = Hooks::new();
        let (publisher, _stream) = channel(16);
        let generation = GenerationLoop::new(&llm, &tools, &confirmer, &hooks, &publisher, "agent", 8, 0.7, None);

        let outcome = generation.run(vec![Message::user("hi")]).await.unwrap();
        assert_eq!(outcome.response.text(), "done");
        // user + assistant(tool_use) + tool + assistant(text)
        assert_eq!(outcome.messages.len(), 4);
    }

    #[tokio::test]
    async fn turn_cap_forces_finish_now() {
        let tool = Tool::new("loop_tool", "always callable", serde_json::json!({"type": "object"}), |_a| async move {
            Ok(serde_json::json!(null))
        });
        let tools = tools_map(vec![tool]);
        let llm = ScriptedLlm::new(vec![tool_call_response("loop_tool"), tool_call_response("loop_tool")]);
        let confirmer = AutoConfirmer::new(ConfirmMode::Auto);
        let hooks = Hooks::new();
        let (publisher, _stream) = channel(16);
        // tool_iteration_limit 1 => max_turns 2
        let generation = GenerationLoop::new(&llm, &tools, &confirmer, &hooks, &publisher, "agent", 1, 0.7, None);

        let outcome = generation.run(vec![Message::user("hi")]).await.unwrap();
        // Second turn is coerced to be final even though the model still emitted a tool call.
        assert!(outcome.response.tool_calls().next().is_some());
    }

    #[tokio::test]
    async fn usage_accumulates_across_turns() {
        let echo = Tool::new("echo", "echoes", serde_json::json!({"type": "object"}), |args| async move {
            Ok(args)
        });
        let tools = tools_map(vec![echo]);
        let llm = ScriptedLlm::new(vec![
            response_with_usage(tool_call_response("echo"), 10, 5),
            response_with_usage(text_response("done"), 20, 8),
        ]);
        let confirmer = AutoConfirmer::new(ConfirmMode::Auto);
        let hooks = Hooks::new();
        let (publisher, _stream) = channel(16);
        let generation = GenerationLoop::new(&llm, &tools, &confirmer, &hooks, &publisher, "agent", 8, 0.7, None);

        let outcome = generation.run(vec![Message::user("hi")]).await.unwrap();
        assert_eq!(outcome.response.usage.input_tokens, 30);
        assert_eq!(outcome.response.usage.output_tokens, 13);
    }

    #[tokio::test]
    async fn finish_now_notice_is_folded_into_tool_message_not_a_new_user_message() {
        let tool = Tool::new("loop_tool", "always callable", serde_json::json!({"type": "object"}), |_a| async move {
            Ok(serde_json::json!(null))
        });
        let tools = tools_map(vec![tool]);
        let llm = ScriptedLlm::new(vec![tool_call_response("loop_tool"), text_response("final answer")]);
        let confirmer = AutoConfirmer::new(ConfirmMode::Auto);
        let hooks = Hooks::new();
        let (publisher, _stream) = channel(16);
        // tool_iteration_limit 1 => max_turns 2, so turn 1 is max_turns - 1.
        let generation = GenerationLoop::new(&llm, &tools, &confirmer, &hooks, &publisher, "agent", 1, 0.7, None);

        let outcome = generation.run(vec![Message::user("hi")]).await.unwrap();
        // user, assistant(tool_use), tool(result+notice), assistant(final) — no synthetic user turn.
        assert_eq!(outcome.messages.len(), 4);
        assert_eq!(outcome.messages[0].role, crate::types::MessageRole::User);
        let tool_message = &outcome.messages[2];
        assert_eq!(tool_message.role, crate::types::MessageRole::Tool);
        let has_notice = tool_message.content.iter().any(|c| {
            matches!(c, ContentBlock::Text(t) if t.text.contains("maximum number of tool-use turns"))
        });
        assert!(has_notice, "expected finish-now notice folded into the tool message");
    }

    #[tokio::test]
    async fn unknown_tool_fails_the_whole_generation() {
        let tools = tools_map(vec![]);
        let llm = ScriptedLlm::new(vec![tool_call_response("missing")]);
        let confirmer = AutoConfirmer::new(ConfirmMode::Auto);
        let hooks = Hooks::new();
        let (publisher, _stream) = channel(16);
        let generation = GenerationLoop::new(&llm, &tools, &confirmer, &hooks, &publisher, "agent", 8, 0.7, None);

        let err = generation.run(vec![Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(_)));
    }
}
