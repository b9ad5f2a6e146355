//! Task Mode Demo
//!
//! Demonstrates submitting a long-running unit of work to an agent with
//! `Agent::work`, as opposed to a single chat turn. Tasks progress through
//! `TaskStatus` transitions (`Queued` -> `Active` -> a terminal state) and
//! publish `Task*` events as they go, rather than a single
//! `ResponseCompleted`.
//!
//! Usage:
//!   cargo run --example task_agent
//!
//! Requires:
//!   - Ollama running on localhost:11434
//!   - qwen3:8b model (or adjust model name)

use agentrie::{AgentBuilder, AgentIdentity, EventPayload, OpenAiCompatLlm, ResponseEventType, Task, TaskPrompt};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("TASK MODE DEMO");
    println!("{}", "=".repeat(70));
    println!();

    let llm = OpenAiCompatLlm::new(
        "qwen3:8b",
        "http://localhost:11434/v1",
        "not-needed",
        Duration::from_secs(120),
    )?;

    let identity = AgentIdentity {
        goal: Some("Summarize short pieces of text clearly and concisely.".to_string()),
        ..AgentIdentity::new("summarizer")
    };

    let agent = AgentBuilder::new(identity).llm(Arc::new(llm)).build(None)?;
    agent.start().await?;

    let prompt = TaskPrompt::new(
        "Summarize the following in two sentences: Rust is a systems \
         programming language focused on safety, speed, and concurrency. \
         It achieves memory safety without a garbage collector via its \
         ownership and borrowing system, checked at compile time.",
    );

    let task = Task::new("summarize-rust-blurb", prompt);

    println!("Submitting task '{}'...\n", task.name);
    let mut stream = agent.work(task).await?;

    while let Some(event) = stream.next().await {
        match event.event_type {
            ResponseEventType::TaskActivated => println!("Task activated."),
            ResponseEventType::TaskProgress => println!("Task progress update received."),
            ResponseEventType::TaskCompleted => {
                if let Some(EventPayload::Task(payload)) = event.payload {
                    println!("Task completed (status: {:?})", payload.status);
                    if let Some(content) = payload.content {
                        println!("\nSummary:\n{content}");
                    }
                }
            }
            ResponseEventType::TaskError => {
                println!("Task errored: {}", event.error.unwrap_or_default());
            }
            _ => {}
        }
    }

    agent.stop().await?;
    println!();
    println!("{}", "=".repeat(70));
    println!("Task mode demo complete!");
    println!("{}", "=".repeat(70));

    Ok(())
}
