//! Hooks Example
//!
//! Demonstrates using hooks to monitor and control agent behavior at
//! lifecycle points:
//! - BeforeGenerate: runs ahead of every LLM call in the generation loop
//! - PreToolUse: intercept and block/modify a tool call before it runs
//! - PostToolUse: observe a tool's result after it runs

use agentrie::{
    AgentBuilder, AgentIdentity, ChatRequest, HookDecision, Hooks, Message, OpenAiCompatLlm, tool,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("HOOKS EXAMPLE");
    println!("{}", "=".repeat(70));
    println!();

    // ========================================================================
    // Example 1: BeforeGenerate - log every turn sent to the model
    // ========================================================================
    println!("Example 1: BeforeGenerate Hook");
    println!("{}", "-".repeat(70));

    let hooks = Hooks::new().add_before_generate(|event| async move {
        println!("📨 Turn {}: {} messages in history", event.turn, event.messages.len());
        None
    });

    let llm = OpenAiCompatLlm::new(
        "qwen3:8b",
        "http://localhost:11434/v1",
        "not-needed",
        Duration::from_secs(60),
    )?;

    let agent = AgentBuilder::new(AgentIdentity::new("assistant"))
        .llm(Arc::new(llm))
        .hooks(hooks)
        .build(None)?;
    agent.start().await?;

    let response = agent
        .create_response(ChatRequest::new(vec![Message::user(
            "What is the capital of France?",
        )]))
        .await?;
    println!("Assistant: {}", response.text());

    agent.stop().await?;
    println!();
    println!("{}", "=".repeat(70));

    // ========================================================================
    // Example 2: PreToolUse / PostToolUse - safety checks and logging
    // ========================================================================
    println!("\nExample 2: PreToolUse / PostToolUse Hooks");
    println!("{}", "-".repeat(70));

    let execution_log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = execution_log.clone();

    let hooks = Hooks::new()
        .add_pre_tool_use(|event| async move {
            println!("🔍 PreToolUse: {}", event.tool_name);
            if event.tool_name == "divide" {
                if let Some(b) = event.tool_input.get("b").and_then(|v| v.as_f64()) {
                    if b == 0.0 {
                        println!("   🛑 BLOCKED: division by zero");
                        return Some(HookDecision::block("division by zero prevented"));
                    }
                }
            }
            println!("   ✅ Allowed");
            None
        })
        .add_post_tool_use(move |event| {
            let log = log_clone.clone();
            async move {
                println!("✨ PostToolUse: {} -> {}", event.tool_name, event.tool_result);
                log.lock()
                    .unwrap()
                    .push(format!("{} -> {}", event.tool_name, event.tool_result));
                None
            }
        });

    let divide_tool = tool("divide", "Divide two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            if b == 0.0 {
                return Err(agentrie::Error::tool("division by zero"));
            }
            Ok(json!({"result": a / b}))
        });

    let llm = OpenAiCompatLlm::new(
        "qwen3:8b",
        "http://localhost:11434/v1",
        "not-needed",
        Duration::from_secs(60),
    )?;

    let agent = AgentBuilder::new(AgentIdentity::new("calculator"))
        .llm(Arc::new(llm))
        .tool(divide_tool)
        .hooks(hooks)
        .build(None)?;
    agent.start().await?;

    let response = agent
        .create_response(ChatRequest::new(vec![Message::user("What is 10 divided by 2?")]))
        .await?;
    println!("Assistant: {}", response.text());

    println!("\nExecution log:");
    for entry in execution_log.lock().unwrap().iter() {
        println!("  {}", entry);
    }

    agent.stop().await?;

    println!();
    println!("{}", "=".repeat(70));
    println!("Hooks example complete!");
    println!("{}", "=".repeat(70));

    Ok(())
}
