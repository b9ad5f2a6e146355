//! Delegation tool: the built-in `assign_work` tool that lets a supervisor
//! hand a unit of work to a named peer and wait for its answer.
//!
//! Grounded on [`crate::tools::Tool::new`]'s closure-handler shape, with the
//! peer call built on [`crate::actor::Agent::stream_response`] and a manual
//! drain loop rather than [`crate::actor::drain_to_response`], since a peer
//! stream that closes without completing is its own distinct failure
//! (`no-result`), not the generic `llm-no-response` the latter returns on an
//! empty stream.

use crate::actor::{environment_handle, Agent, ChatRequest};
use crate::events::ResponseEventType;
use crate::tools::{Tool, ToolAnnotations};
use crate::types::Message;
use crate::{Error, Result};
use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::Weak;

const TERMINAL_INSTRUCTION: &str =
    "Respond only with the requested output; do not ask clarifying questions.";

/// Builds the `assign_work` tool scoped to `agent`: calling it delegates to
/// one of `agent`'s peers by name. Supervisors get this tool automatically
/// if they weren't given one of the same name; see
/// [`crate::actor::AgentBuilder::build`].
pub fn delegation_tool(agent: &Agent) -> Tool {
    delegation_tool_for(agent.name().to_string(), environment_handle(agent))
}

/// Builds the `assign_work` tool from its raw parts, for callers (agent
/// construction) that need it before an `Agent` exists to borrow.
pub(crate) fn delegation_tool_for(
    self_name: String,
    environment: Option<Weak<dyn crate::environment::Environment>>,
) -> Tool {
    let annotations = ToolAnnotations {
        title: Some("Delegate work to a teammate".to_string()),
        read_only_hint: true,
        destructive_hint: false,
        idempotent_hint: false,
        open_world_hint: true,
    };

    Tool::new(
        "assign_work",
        "Assign a unit of work to a named teammate and wait for their answer.",
        json!({
            "type": "object",
            "properties": {
                "agent": {"type": "string", "description": "Name of the teammate to delegate to."},
                "name": {"type": "string", "description": "Short label for the assigned work."},
                "description": {"type": "string", "description": "What the teammate should do."},
                "expected_output": {"type": "string", "description": "What a good answer looks like."},
                "output_format": {"type": "string", "enum": ["text", "markdown", "json"]},
                "context": {"type": "string", "description": "Optional background the teammate needs."}
            },
            "required": ["agent", "name", "description", "expected_output"]
        }),
        move |input| {
            let environment = environment.clone();
            let self_name = self_name.clone();
            async move { run_delegation(&self_name, environment, input).await }
        },
    )
    .with_annotations(annotations)
}

async fn run_delegation(
    self_name: &str,
    environment: Option<Weak<dyn crate::environment::Environment>>,
    input: Value,
) -> Result<Value> {
    let target = match required_field(&input, "agent") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let task_name = match required_field(&input, "name") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let description = match required_field(&input, "description") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let expected_output = match required_field(&input, "expected_output") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let output_format = input.get("output_format").and_then(Value::as_str);
    let context = input.get("context").and_then(Value::as_str);

    if target == self_name {
        return Ok(json!({ "error": format!("cannot delegate to self ('{target}')") }));
    }

    let peer = match environment.as_ref().and_then(Weak::upgrade) {
        Some(env) => match env.get_agent(&target).await {
            Some(peer) => peer,
            None => {
                return Ok(json!({ "error": format!("no such teammate: '{target}'") }));
            }
        },
        None => {
            return Ok(json!({ "error": format!("no such teammate: '{target}'") }));
        }
    };

    let prompt = compose_prompt(&task_name, &description, &expected_output, output_format, context);

    let mut stream = peer.stream_response(ChatRequest::new(vec![Message::user(prompt)])).await?;

    while let Some(event) = stream.next().await {
        match event.event_type {
            ResponseEventType::ResponseCompleted => {
                if let Some(crate::events::EventPayload::Response(response)) = event.payload {
                    return Ok(json!(response.text()));
                }
            }
            ResponseEventType::ResponseFailed => {
                return Err(Error::other(
                    event.error.unwrap_or_else(|| "delegated agent failed".to_string()),
                ));
            }
            _ => {}
        }
    }

    Err(Error::no_result(format!(
        "'{target}' closed its stream without a completed response"
    )))
}

fn required_field(input: &Value, field: &str) -> std::result::Result<String, Value> {
    match input.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(json!({ "error": format!("missing required field '{field}'") })),
    }
}

fn compose_prompt(
    name: &str,
    description: &str,
    expected_output: &str,
    output_format: Option<&str>,
    context: Option<&str>,
) -> String {
    let mut prompt = String::new();
    if let Some(context) = context {
        if !context.is_empty() {
            prompt.push_str("## Context\n\n");
            prompt.push_str(context);
            prompt.push_str("\n\n");
        }
    }
    prompt.push_str(&format!("<task name=\"{name}\">\n{description}\n</task>\n\n"));
    prompt.push_str(&format!("Expected output: {expected_output}\n"));
    if let Some(format) = output_format {
        prompt.push_str(&format!("Format: {format}\n"));
    }
    prompt.push('\n');
    prompt.push_str(TERMINAL_INSTRUCTION);
    prompt
}
