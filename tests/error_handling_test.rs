//! Integration tests for the error taxonomy reachable from the public
//! actor surface: construction-time `no-llm`, `not-running` before/after
//! the actor's lifecycle, and `llm-no-response`.

use agentrie::{AgentBuilder, AgentIdentity, ChatRequest, Error, GenerateOptions, Llm, Message, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

struct EmptyResponseLlm;

impl Llm for EmptyResponseLlm {
    fn name(&self) -> &str {
        "empty"
    }

    fn generate<'a>(
        &'a self,
        _messages: &'a [Message],
        _opts: &'a GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = agentrie::Result<Response>> + Send + 'a>> {
        Box::pin(async move { Ok(Response::new("r", "m")) })
    }
}

/// Building an agent with no `.llm(...)` call fails fast with `no-llm`,
/// before any chat turn is ever attempted.
#[test]
fn building_without_an_llm_fails_with_no_llm() {
    let err = AgentBuilder::new(AgentIdentity::new("tester"))
        .build(None)
        .unwrap_err();
    assert!(matches!(err, Error::NoLlm(_)));
}

/// Calling `chat`/`create_response` before `start()` fails with
/// `not-running` rather than queuing silently.
#[tokio::test]
async fn chat_before_start_fails_with_not_running() {
    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(EmptyResponseLlm))
        .build(None)
        .unwrap();

    let err = agent
        .create_response(ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotRunning));
}

/// Calling `chat` again after `stop()` also fails with `not-running`, and
/// `stop()` itself fails the same way when the agent was never started.
#[tokio::test]
async fn chat_after_stop_fails_with_not_running() {
    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(EmptyResponseLlm))
        .build(None)
        .unwrap();

    let never_started = agent.stop().await.unwrap_err();
    assert!(matches!(never_started, Error::NotRunning));

    agent.start().await.unwrap();
    agent.stop().await.unwrap();

    let err = agent
        .create_response(ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotRunning));
}

/// A provider returning a turn with no content blocks at all fails the
/// generation with `llm-no-response`. The failure happens inside the
/// actor's background loop, so it reaches `create_response` as a
/// `response.failed` event folded into a generic error carrying
/// `LlmNoResponse`'s message, not the original enum variant.
#[tokio::test]
async fn empty_provider_response_fails_with_llm_no_response() {
    let agent = AgentBuilder::new(AgentIdentity::new("tester"))
        .llm(Arc::new(EmptyResponseLlm))
        .build(None)
        .unwrap();
    agent.start().await.unwrap();

    let err = agent
        .create_response(ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), Error::LlmNoResponse.to_string());
    agent.stop().await.unwrap();
}
