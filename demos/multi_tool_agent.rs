//! Multi-Tool Agent Example
//!
//! Demonstrates a more realistic agent with several tools and safety/logging
//! hooks. The agent dispatches tools itself (there's no manual mode); hooks
//! observe and can veto individual tool calls.
//!
//! This agent can:
//! - Perform calculations
//! - Get the current Unix timestamp
//! - Convert between common units
//! - Search (mocked)
//!
//! Usage:
//!   cargo run --example multi_tool_agent
//!
//! Requires:
//!   - Ollama running on localhost:11434
//!   - qwen3:8b model (or adjust model name)

use agentrie::{
    AgentBuilder, AgentIdentity, ChatRequest, HookDecision, Hooks, Message, OpenAiCompatLlm, tool,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("MULTI-TOOL AGENT DEMO");
    println!("Realistic agent with several tools and safety/logging hooks");
    println!("{}", "=".repeat(70));
    println!();

    let execution_log = Arc::new(Mutex::new(Vec::new()));

    let calculator = tool("calculate", "Perform arithmetic")
        .param("operation", "string")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let op = args["operation"].as_str().unwrap_or("");
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);

            let result = match op {
                "add" => a + b,
                "subtract" => a - b,
                "multiply" => a * b,
                "divide" => {
                    if b == 0.0 {
                        return Err(agentrie::Error::tool("Division by zero"));
                    }
                    a / b
                }
                _ => return Err(agentrie::Error::tool("Unknown operation")),
            };

            Ok(json!({"result": result, "operation": op}))
        });

    let datetime = tool("get_datetime", "Get the current Unix timestamp")
        .build(|_args| async move {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_secs();
            Ok(json!({"unix_timestamp": now}))
        });

    let converter = tool("convert_units", "Convert between units")
        .param("value", "number")
        .param("from_unit", "string")
        .param("to_unit", "string")
        .build(|args| async move {
            let value = args["value"].as_f64().unwrap_or(0.0);
            let from = args["from_unit"].as_str().unwrap_or("");
            let to = args["to_unit"].as_str().unwrap_or("");

            let result = match (from, to) {
                ("km", "miles") => value * 0.621371,
                ("miles", "km") => value / 0.621371,
                ("kg", "lbs") => value * 2.20462,
                ("lbs", "kg") => value / 2.20462,
                ("celsius", "fahrenheit") => (value * 9.0 / 5.0) + 32.0,
                ("fahrenheit", "celsius") => (value - 32.0) * 5.0 / 9.0,
                _ => return Err(agentrie::Error::tool("Unsupported conversion")),
            };

            Ok(json!({"result": result, "from": from, "to": to, "original_value": value}))
        });

    let search = tool("search", "Search for information")
        .param("query", "string")
        .build(|args| async move {
            let query = args["query"].as_str().unwrap_or("");
            Ok(json!({
                "results": [
                    {"title": format!("Result for: {}", query), "relevance": 0.95},
                    {"title": "Related information", "relevance": 0.80},
                ],
                "query": query
            }))
        });

    let log_clone = execution_log.clone();
    let hooks = Hooks::new()
        .add_pre_tool_use(|event| async move {
            println!("🔍 PreToolUse: {}", event.tool_name);

            if event.tool_name == "calculate" {
                if let Some("divide") = event.tool_input.get("operation").and_then(|v| v.as_str()) {
                    if event.tool_input.get("b").and_then(|v| v.as_f64()) == Some(0.0) {
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
                println!("✨ PostToolUse: {} completed", event.tool_name);
                log.lock().unwrap().push(format!(
                    "{} -> {}",
                    event.tool_name,
                    serde_json::to_string(&event.tool_result).unwrap_or_default()
                ));
                None
            }
        });

    let llm = OpenAiCompatLlm::new(
        "qwen3:8b",
        "http://localhost:11434/v1",
        "not-needed",
        Duration::from_secs(60),
    )?;

    let identity = AgentIdentity {
        instructions: Some(
            "You are a helpful multi-tool assistant. You have access to a \
             calculator, a datetime tool, a unit converter, and search. Use \
             these tools to help answer questions."
                .to_string(),
        ),
        temperature: 0.3,
        ..AgentIdentity::new("multi-tool-assistant")
    };

    let agent = AgentBuilder::new(identity)
        .llm(Arc::new(llm))
        .tool(calculator)
        .tool(datetime)
        .tool(converter)
        .tool(search)
        .hooks(hooks)
        .build(None)?;
    agent.start().await?;

    println!("Agent configured with 4 tools: calculator, datetime, converter, search");
    println!("Hooks: PreToolUse (safety), PostToolUse (logging)");
    println!();
    println!("{}", "-".repeat(70));
    println!();

    let queries = [
        "What's 15 kilometers in miles?",
        "Calculate 25 divided by 5, then multiply by 3",
        "What's the current Unix timestamp?",
        "Search for information about Rust programming",
    ];

    for (i, query) in queries.iter().enumerate() {
        println!("Query {}: {}", i + 1, query);
        println!();

        let response = agent
            .create_response(ChatRequest::new(vec![Message::user(*query)]))
            .await?;
        println!("Assistant: {}", response.text());

        println!();
        println!("{}", "-".repeat(70));
        println!();
    }

    println!("Execution Log:");
    println!("{}", "=".repeat(70));
    for entry in execution_log.lock().unwrap().iter() {
        println!("{}", entry);
    }
    println!("{}", "=".repeat(70));
    println!();

    agent.stop().await?;

    println!("{}", "=".repeat(70));
    println!("DEMO COMPLETE");
    println!("{}", "=".repeat(70));
    println!();
    println!("Key features demonstrated:");
    println!("- Multiple tools working together");
    println!("- PreToolUse hooks (safety validation)");
    println!("- PostToolUse hooks (logging)");
    println!("- Error handling (division-by-zero prevention)");
    println!("{}", "=".repeat(70));

    Ok(())
}
