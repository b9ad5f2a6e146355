//! Tool dispatcher: looks up tools by name, consults hooks and the
//! confirmer, invokes them, and folds the results into a single `tool`
//! message for the generation loop to append to history.
//!
//! Grounded on the base crate's per-tool-call block inside `Client`'s
//! auto-execution path (`client.rs`), extended with [`ToolAnnotations`] +
//! [`Confirmer`] consultation and `PreToolUse`/`PostToolUse` hook firing from
//! `hooks.rs`.

use crate::confirmer::Confirmer;
use crate::events::{EventOrigin, EventPayload, EventPublisher, ResponseEvent, ResponseEventType};
use crate::hooks::{Hooks, PostToolUseEvent, PreToolUseEvent};
use crate::tools::Tool;
use crate::types::{ContentBlock, Message, MessageRole, ToolResultBlock, ToolUseBlock};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of dispatching one full batch of tool-use blocks from a turn.
pub struct DispatchOutcome {
    /// The `tool` message to append to history, or `None` when every tool
    /// in the batch opted out of returning a result.
    pub tool_message: Option<Message>,
}

/// Stateless dispatcher borrowing everything it needs for one turn's batch.
pub struct Dispatcher<'a> {
    tools: &'a HashMap<String, Arc<Tool>>,
    confirmer: &'a dyn Confirmer,
    hooks: &'a Hooks,
    publisher: &'a EventPublisher,
    agent_name: &'a str,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        tools: &'a HashMap<String, Arc<Tool>>,
        confirmer: &'a dyn Confirmer,
        hooks: &'a Hooks,
        publisher: &'a EventPublisher,
        agent_name: &'a str,
    ) -> Self {
        Self {
            tools,
            confirmer,
            hooks,
            publisher,
            agent_name,
        }
    }

    /// Execute every tool-use block in array order. Unknown tool names abort
    /// the whole batch (and, by propagation, the enclosing generation) with
    /// `unknown-tool`; an actual tool execution error aborts the same way
    /// with `tool-call-failed`. A confirmer denial or a blocking
    /// `pre_tool_use` hook decision is *not* an abort. It becomes an
    /// error-flagged tool-result the model can see and react to.
    pub async fn dispatch(
        &self,
        tool_calls: &[ToolUseBlock],
        history: &[Message],
    ) -> Result<DispatchOutcome> {
        let history_json: Vec<serde_json::Value> = history
            .iter()
            .filter_map(|m| serde_json::to_value(m).ok())
            .collect();

        let mut results = Vec::with_capacity(tool_calls.len());
        let mut any_returns_result = false;

        for call in tool_calls {
            let tool = self
                .tools
                .get(&call.name)
                .ok_or_else(|| Error::unknown_tool(call.name.clone()))?;

            self.publish(
                ResponseEventType::ResponseToolCall,
                EventPayload::ToolUse(call.clone()),
            )
            .await?;

            let decision = self
                .hooks
                .execute_pre_tool_use(PreToolUseEvent::new(
                    call.name.clone(),
                    call.input.clone(),
                    call.id.clone(),
                    history_json.clone(),
                ))
                .await;

            let input = match decision {
                Some(d) if !d.continue_execution => {
                    let reason = d
                        .reason
                        .unwrap_or_else(|| "blocked by pre_tool_use hook".to_string());
                    self.record_denial(tool, call, &reason, &mut results, &mut any_returns_result)
                        .await?;
                    continue;
                }
                Some(d) => d.modified_input.unwrap_or_else(|| call.input.clone()),
                None => call.input.clone(),
            };

            if !self.confirmer.confirm(self.agent_name, tool, &input).await? {
                let reason = format!("call to '{}' was denied", tool.name());
                self.record_denial(tool, call, &reason, &mut results, &mut any_returns_result)
                    .await?;
                continue;
            }

            let outcome = tool.execute(input.clone()).await;

            self.hooks
                .execute_post_tool_use(PostToolUseEvent::new(
                    call.name.clone(),
                    input.clone(),
                    call.id.clone(),
                    match &outcome {
                        Ok(v) => v.clone(),
                        Err(e) => serde_json::json!(e.to_string()),
                    },
                    history_json.clone(),
                ))
                .await;

            let value = outcome.map_err(|e| Error::tool_call_failed(tool.name(), e))?;

            let result = ToolResultBlock::new(call.id.clone(), value);
            self.publish(
                ResponseEventType::ResponseToolResult,
                EventPayload::ToolResult(result.clone()),
            )
            .await?;
            if tool.should_return_result() {
                any_returns_result = true;
            }
            results.push(result);
        }

        if !any_returns_result {
            return Ok(DispatchOutcome { tool_message: None });
        }

        let content = results.into_iter().map(ContentBlock::ToolResult).collect();
        Ok(DispatchOutcome {
            tool_message: Some(Message::new(MessageRole::Tool, content)),
        })
    }

    async fn record_denial(
        &self,
        tool: &Tool,
        call: &ToolUseBlock,
        reason: &str,
        results: &mut Vec<ToolResultBlock>,
        any_returns_result: &mut bool,
    ) -> Result<()> {
        let result = ToolResultBlock::error(call.id.clone(), serde_json::json!(reason));
        self.publish(
            ResponseEventType::ResponseToolResult,
            EventPayload::ToolResult(result.clone()),
        )
        .await?;
        if tool.should_return_result() {
            *any_returns_result = true;
        }
        results.push(result);
        Ok(())
    }

    async fn publish(&self, event_type: ResponseEventType, payload: EventPayload) -> Result<()> {
        self.publisher
            .send(
                ResponseEvent::new(event_type)
                    .with_origin(EventOrigin::agent(self.agent_name))
                    .with_payload(payload),
            )
            .await
    }
}
