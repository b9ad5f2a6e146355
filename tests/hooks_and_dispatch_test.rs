//! Integration tests for lifecycle hooks and tool-dispatch semantics as seen
//! through the actor's public surface: `before_generate`, `pre_tool_use`,
//! `post_tool_use`, confirmer denial, and opt-out tools.

use agentrie::{
    AgentBuilder, AgentIdentity, AutoConfirmer, ChatRequest, ConfirmMode, ContentBlock, Error,
    GenerateOptions, HookDecision, Hooks, Llm, Message, Response, TextBlock, ToolAnnotations,
    ToolUseBlock, tool,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

struct OneShotToolCallLlm {
    tool_name: String,
    tool_input: serde_json::Value,
}

impl Llm for OneShotToolCallLlm {
    fn name(&self) -> &str {
        "one-shot"
    }

    fn generate<'a>(
        &'a self,
        messages: &'a [Message],
        _opts: &'a GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = agentrie::Result<Response>> + Send + 'a>> {
        Box::pin(async move {
            let already_called = messages.iter().any(|m| m.role == agentrie::MessageRole::Tool);
            let mut response = Response::new("r", "m");
            if already_called {
                response.content.push(ContentBlock::Text(TextBlock::new("done")));
            } else {
                response.content.push(ContentBlock::ToolUse(ToolUseBlock::new(
                    "call_1",
                    self.tool_name.clone(),
                    self.tool_input.clone(),
                )));
            }
            Ok(response)
        })
    }
}

/// A blocking `before_generate` hook fails the whole generation, surfacing
/// as `response.failed` on the stream rather than a panic or hang.
#[tokio::test]
async fn blocking_before_generate_hook_fails_the_turn() {
    let hooks = Hooks::new().add_before_generate(|_event| async move {
        Some(HookDecision::block("not allowed right now"))
    });

    let llm = OneShotToolCallLlm {
        tool_name: "noop".to_string(),
        tool_input: serde_json::json!({}),
    };
    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(llm))
        .hooks(hooks)
        .build(None)
        .unwrap();
    agent.start().await.unwrap();

    let err = agent
        .create_response(ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();
    assert!(!matches!(err, Error::NotRunning));
    agent.stop().await.unwrap();
}

/// A blocking `pre_tool_use` hook turns a tool call into an in-band
/// error-flagged result, not a hard failure; the model gets a chance to
/// react in its next turn.
#[tokio::test]
async fn blocking_pre_tool_use_hook_yields_error_result_not_failure() {
    let hooks = Hooks::new().add_pre_tool_use(|event| async move {
        if event.tool_name == "divide" {
            Some(HookDecision::block("division by zero prevented"))
        } else {
            None
        }
    });

    let divide = tool("divide", "divide a by b")
        .param("a", "number")
        .param("b", "number")
        .build(|_args| async move { Ok(serde_json::json!(0.0)) });

    let llm = OneShotToolCallLlm {
        tool_name: "divide".to_string(),
        tool_input: serde_json::json!({"a": 1, "b": 0}),
    };
    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(llm))
        .tool(divide)
        .hooks(hooks)
        .build(None)
        .unwrap();
    agent.start().await.unwrap();

    let response = agent
        .create_response(ChatRequest::new(vec![Message::user("divide 1 by 0")]))
        .await
        .unwrap();
    assert_eq!(response.text(), "done");
    agent.stop().await.unwrap();
}

/// `post_tool_use` observes a successful call's result without altering it.
#[tokio::test]
async fn post_tool_use_hook_observes_successful_results() {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();
    let hooks = Hooks::new().add_post_tool_use(move |event| {
        let log = log_clone.clone();
        async move {
            log.lock().unwrap().push(event.tool_name);
            None
        }
    });

    let echo = tool("echo", "echoes the input").build(|args| async move { Ok(args) });
    let llm = OneShotToolCallLlm {
        tool_name: "echo".to_string(),
        tool_input: serde_json::json!({"x": 1}),
    };
    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(llm))
        .tool(echo)
        .hooks(hooks)
        .build(None)
        .unwrap();
    agent.start().await.unwrap();

    agent
        .create_response(ChatRequest::new(vec![Message::user("echo")]))
        .await
        .unwrap();

    assert_eq!(log.lock().unwrap().as_slice(), ["echo".to_string()]);
    agent.stop().await.unwrap();
}

/// Property #5: a turn whose only tool opts out of returning a result ends
/// in that same turn, with no follow-up LLM call.
#[tokio::test]
async fn opt_out_only_tool_ends_generation_in_the_same_turn() {
    let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let calls_clone = calls.clone();

    struct CountingOneShotLlm {
        calls: Arc<std::sync::atomic::AtomicU32>,
    }
    impl Llm for CountingOneShotLlm {
        fn name(&self) -> &str {
            "counting"
        }
        fn generate<'a>(
            &'a self,
            _messages: &'a [Message],
            _opts: &'a GenerateOptions,
        ) -> Pin<Box<dyn Future<Output = agentrie::Result<Response>> + Send + 'a>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Box::pin(async move {
                let mut response = Response::new("r", "m");
                response.content.push(ContentBlock::ToolUse(ToolUseBlock::new(
                    "call_1",
                    "log_event",
                    serde_json::json!({}),
                )));
                Ok(response)
            })
        }
    }

    let log_event = tool("log_event", "fire-and-forget logging")
        .returns_result(false)
        .build(|_args| async move { Ok(serde_json::json!(null)) });

    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(CountingOneShotLlm { calls: calls_clone }))
        .tool(log_event)
        .build(None)
        .unwrap();
    agent.start().await.unwrap();

    let response = agent
        .create_response(ChatRequest::new(vec![Message::user("log something")]))
        .await
        .unwrap();

    // The final response is the turn that made the tool call, not a
    // follow-up: it carries no text since the model only emitted a tool use.
    assert_eq!(response.text(), "");
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    agent.stop().await.unwrap();
}

/// A denied call (confirmer policy, not a hook) also yields an in-band
/// error result rather than aborting the batch.
#[tokio::test]
async fn denied_destructive_call_is_not_a_hard_failure() {
    let delete_all = tool("delete_all", "deletes everything")
        .build(|_args| async move { Ok(serde_json::json!(null)) })
        .with_annotations({
            let mut a = ToolAnnotations::default();
            a.destructive_hint = true;
            a
        });

    let llm = OneShotToolCallLlm {
        tool_name: "delete_all".to_string(),
        tool_input: serde_json::json!({}),
    };
    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(llm))
        .tool(delete_all)
        .confirmer(Arc::new(AutoConfirmer::new(ConfirmMode::Deny)))
        .build(None)
        .unwrap();
    agent.start().await.unwrap();

    let response = agent
        .create_response(ChatRequest::new(vec![Message::user("delete everything")]))
        .await
        .unwrap();
    assert_eq!(response.text(), "done");
    agent.stop().await.unwrap();
}

/// An unknown tool name fails the whole generation with `unknown-tool`.
#[tokio::test]
async fn unknown_tool_call_fails_the_generation() {
    let llm = OneShotToolCallLlm {
        tool_name: "does_not_exist".to_string(),
        tool_input: serde_json::json!({}),
    };
    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(llm))
        .build(None)
        .unwrap();
    agent.start().await.unwrap();

    let err = agent
        .create_response(ChatRequest::new(vec![Message::user("call a ghost tool")]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTool(_)));
    agent.stop().await.unwrap();
}
