//! Timeout and Cancellation Demo
//!
//! The actor doesn't expose a mid-generation interrupt: once a chat turn is
//! dequeued, the generation loop runs it to completion. What callers *can*
//! do is stop reading a stream early (the caller gives up, even though the
//! turn keeps running in the background) and shut the whole agent down
//! cooperatively with `Agent::stop()`, which drains whatever is in flight
//! before returning.
//!
//! This example demonstrates:
//! 1. Bounding how long a caller waits on a stream with `tokio::time::timeout`
//! 2. Stopping an agent while a task is queued behind an active one
//!
//! Note: This example targets Ollama at http://localhost:11434 with a model
//! loaded.

use agentrie::{AgentBuilder, AgentIdentity, ChatRequest, EventPayload, Message, OpenAiCompatLlm, ResponseEventType};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

async fn timeout_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(60));
    println!("Example 1: Bounding a stream read with a timeout");
    println!("{}", "=".repeat(60));
    println!();

    let llm = OpenAiCompatLlm::new(
        "qwen3:8b",
        "http://localhost:11434/v1",
        "not-needed",
        Duration::from_secs(120),
    )?;
    let agent = AgentBuilder::new(AgentIdentity::new("verbose-writer"))
        .llm(Arc::new(llm))
        .build(None)?;
    agent.start().await?;

    let mut stream = agent
        .chat(ChatRequest::new(vec![Message::user(
            "Write a detailed 1000-word essay about quantum computing",
        )]))
        .await?;

    println!("Reading the stream (giving up after 3 seconds)...\n");

    let mut text = String::new();
    let result = timeout(Duration::from_secs(3), async {
        while let Some(event) = stream.next().await {
            if event.event_type == ResponseEventType::ResponseCompleted {
                if let Some(EventPayload::Response(response)) = event.payload {
                    text = response.text();
                }
                break;
            }
        }
    })
    .await;

    match result {
        Ok(_) => println!("Response completed within the timeout.\n{text}"),
        Err(_) => println!(
            "Timed out waiting on the stream; the turn may still be running \
             server-side, but this caller has moved on."
        ),
    }

    agent.stop().await?;
    println!();
    Ok(())
}

async fn stop_drains_in_flight_work() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(60));
    println!("Example 2: stop() drains in-flight work before returning");
    println!("{}", "=".repeat(60));
    println!();

    let llm = OpenAiCompatLlm::new(
        "qwen3:8b",
        "http://localhost:11434/v1",
        "not-needed",
        Duration::from_secs(60),
    )?;
    let agent = AgentBuilder::new(AgentIdentity::new("assistant"))
        .llm(Arc::new(llm))
        .build(None)?;
    agent.start().await?;

    // Queue a chat turn, then immediately request a stop. stop() waits for
    // the loop to drain its mailbox and exit rather than abandoning it.
    let mut stream = agent
        .chat(ChatRequest::new(vec![Message::user(
            "Say hello in three words.",
        )]))
        .await?;

    let stop_result = tokio::join!(agent.stop(), async {
        while stream.next().await.is_some() {}
    });
    stop_result.0?;

    println!("Agent stopped after draining its queued turn.\n");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "=".repeat(60));
    println!("TIMEOUT AND CANCELLATION DEMO");
    println!("{}", "=".repeat(60));
    println!();
    println!("This demo requires Ollama running at http://localhost:11434");
    println!("with a model loaded (e.g., qwen3:8b)\n");

    if let Err(e) = timeout_example().await {
        eprintln!("Timeout example error: {}", e);
    }

    if let Err(e) = stop_drains_in_flight_work().await {
        eprintln!("Stop example error: {}", e);
    }

    println!("{}", "=".repeat(60));
    println!("All examples completed!");
    println!("{}", "=".repeat(60));

    Ok(())
}
