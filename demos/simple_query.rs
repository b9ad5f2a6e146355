//! Simple chat example
//!
//! Demonstrates sending a single chat turn to an agent and streaming its
//! events as they arrive.

use agentrie::{AgentBuilder, AgentIdentity, ChatRequest, EventPayload, Message, OpenAiCompatLlm, ResponseEventType};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
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

    println!("Sending query to model...\n");

    let request = ChatRequest::new(vec![Message::user(
        "What's the capital of France? Please be brief.",
    )]);
    let mut stream = agent.chat(request).await?;

    print!("Response: ");
    while let Some(event) = stream.next().await {
        match event.event_type {
            ResponseEventType::ResponseCompleted => {
                if let Some(EventPayload::Response(response)) = event.payload {
                    print!("{}", response.text());
                }
            }
            ResponseEventType::ResponseFailed | ResponseEventType::Error => {
                eprintln!("\nerror: {}", event.error.unwrap_or_default());
            }
            _ => {}
        }
    }

    println!("\n\nQuery complete!");

    agent.stop().await?;
    Ok(())
}
