//! Supervisor Delegation Demo
//!
//! Demonstrates a supervisor agent delegating a unit of work to a named
//! peer through the automatically-attached `assign_work` tool. Supervisors
//! (`AgentIdentity.is_supervisor = true`) that don't register a tool of
//! that name get one built for them at `build()` time; calling it looks the
//! named peer up in the shared `Environment` and waits for its answer.
//!
//! Usage:
//!   cargo run --example supervisor_delegation
//!
//! Requires:
//!   - Ollama running on localhost:11434
//!   - qwen3:8b model (or adjust model name)

use agentrie::{
    AgentBuilder, AgentIdentity, ChatRequest, Environment, LocalEnvironment, Message,
    OpenAiCompatLlm,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("SUPERVISOR DELEGATION DEMO");
    println!("{}", "=".repeat(70));
    println!();

    let environment = Arc::new(LocalEnvironment::new("demo-team"));

    let llm: Arc<dyn agentrie::Llm> = Arc::new(OpenAiCompatLlm::new(
        "qwen3:8b",
        "http://localhost:11434/v1",
        "not-needed",
        Duration::from_secs(120),
    )?);

    let researcher_identity = AgentIdentity {
        goal: Some("Answer focused factual questions in a sentence or two.".to_string()),
        ..AgentIdentity::new("researcher")
    };
    let researcher = AgentBuilder::new(researcher_identity)
        .llm(llm.clone())
        .build(Some(environment.clone() as Arc<dyn Environment>))?;
    researcher.start().await?;
    environment.add_agent(researcher.clone()).await?;

    let supervisor_identity = AgentIdentity {
        goal: Some(
            "Coordinate with your team to answer the user's question. \
             Delegate research to the researcher teammate when needed."
                .to_string(),
        ),
        is_supervisor: true,
        subordinates: vec!["researcher".to_string()],
        ..AgentIdentity::new("lead")
    };
    let supervisor = AgentBuilder::new(supervisor_identity)
        .llm(llm)
        .build(Some(environment.clone() as Arc<dyn Environment>))?;
    supervisor.start().await?;
    environment.add_agent(supervisor.clone()).await?;

    println!("Team assembled: lead (supervisor) + researcher");
    println!("The lead was given an `assign_work` tool automatically.\n");

    let response = supervisor
        .create_response(ChatRequest::new(vec![Message::user(
            "Ask the researcher what the capital of France is, then tell me.",
        )]))
        .await?;

    println!("Lead's final answer: {}", response.text());

    supervisor.stop().await?;
    researcher.stop().await?;

    println!();
    println!("{}", "=".repeat(70));
    println!("Supervisor delegation demo complete!");
    println!("{}", "=".repeat(70));

    Ok(())
}
