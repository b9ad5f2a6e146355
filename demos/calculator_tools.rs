//! Calculator with Tools Example
//!
//! Demonstrates giving a local LLM function-calling abilities through
//! `Tool`s. The agent dispatches tool calls itself; the caller just reads
//! the final text back off the response.

use agentrie::{AgentBuilder, AgentIdentity, ChatRequest, Message, OpenAiCompatLlm, tool};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let add_tool = tool("add", "Add two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(json!({"result": a + b}))
        });

    let subtract_tool = tool("subtract", "Subtract two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(json!({"result": a - b}))
        });

    let multiply_tool = tool("multiply", "Multiply two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(json!({"result": a * b}))
        });

    let divide_tool = tool("divide", "Divide two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            if b == 0.0 {
                return Err(agentrie::Error::tool("Cannot divide by zero"));
            }
            Ok(json!({"result": a / b}))
        });

    let llm = OpenAiCompatLlm::new(
        "qwen3:8b",
        "http://localhost:11434/v1",
        "not-needed",
        Duration::from_secs(60),
    )?;

    let identity = AgentIdentity {
        instructions: Some(
            "Use the provided tools to perform calculations. Always show your \
             work and explain the result."
                .to_string(),
        ),
        temperature: 0.1,
        ..AgentIdentity::new("calculator")
    };

    let agent = AgentBuilder::new(identity)
        .llm(Arc::new(llm))
        .tool(add_tool)
        .tool(subtract_tool)
        .tool(multiply_tool)
        .tool(divide_tool)
        .build(None)?;
    agent.start().await?;

    let queries = [
        "What is 25 plus 17?",
        "Calculate 144 divided by 12",
        "What's 7 times 8, then add 5?",
    ];

    println!("{}", "=".repeat(70));
    println!("CALCULATOR TOOLS EXAMPLE");
    println!("{}", "=".repeat(70));
    println!();

    for query in queries {
        println!("User: {}", query);
        println!("{}", "-".repeat(50));

        let response = agent
            .create_response(ChatRequest::new(vec![Message::user(query)]))
            .await?;
        println!("Assistant: {}", response.text());
        println!();
    }

    println!("{}", "=".repeat(70));
    println!("Example complete!");

    agent.stop().await?;
    Ok(())
}
