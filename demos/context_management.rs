//! Context Management Examples
//!
//! `actor.rs` already truncates history automatically once it approaches a
//! conservative context-window threshold, but the underlying helpers
//! (`estimate_tokens`, `truncate_messages`, `is_approaching_limit`) are
//! exposed directly too, for callers managing their own history outside an
//! `Agent` (e.g. a `ThreadRepository` consumer enforcing a tighter budget).
//!
//! Patterns demonstrated:
//! 1. Estimating token usage for a message list
//! 2. Manual truncation at a natural breakpoint
//! 3. Token budget monitoring across a growing conversation

use agentrie::{ContentBlock, Message, TextBlock, estimate_tokens, is_approaching_limit, truncate_messages};

fn main() {
    println!("{}", "=".repeat(70));
    println!("CONTEXT MANAGEMENT EXAMPLES");
    println!("{}", "=".repeat(70));
    println!();

    pattern_1_estimation();
    pattern_2_manual_truncation();
    pattern_3_token_monitoring();
}

// ============================================================================
// Pattern 1: Token estimation
// ============================================================================

fn pattern_1_estimation() {
    println!("=== Pattern 1: Token Estimation ===");
    println!();

    let history = vec![
        Message::system("You are a helpful assistant"),
        Message::user("Explain Rust ownership in one paragraph."),
    ];

    println!("Messages: {}", history.len());
    println!("Estimated tokens: {}", estimate_tokens(&history));
    println!();
    println!("{}", "-".repeat(70));
    println!();
}

// ============================================================================
// Pattern 2: Manual truncation at a natural breakpoint
// ============================================================================

fn pattern_2_manual_truncation() {
    println!("=== Pattern 2: Manual Truncation ===");
    println!("Best for: multi-turn conversations with clear task boundaries");
    println!();

    let mut history = vec![Message::system("You are a helpful coding assistant")];
    for i in 0..12 {
        history.push(Message::user(format!("Message {i}")));
        history.push(Message::assistant(vec![ContentBlock::Text(TextBlock::new(format!(
            "Reply {i}"
        )))]));
    }
    println!("Before truncation: {} messages", history.len());

    history = truncate_messages(&history, 6, true);
    println!("After truncation (keep last 6, preserve system): {} messages", history.len());
    println!("First message role: {:?}", history[0].role);

    println!();
    println!("{}", "-".repeat(70));
    println!();
}

// ============================================================================
// Pattern 3: Token budget monitoring
// ============================================================================

fn pattern_3_token_monitoring() {
    println!("=== Pattern 3: Token Budget Monitoring ===");
    println!("Best for: long-running conversations with a token limit");
    println!();

    let mut history = vec![Message::system("You are a helpful assistant")];
    let interactions = [
        "What is Rust?",
        "Explain ownership",
        "What are lifetimes?",
        "How do traits work?",
        "Explain async/await",
    ];

    let token_limit = 200; // low limit so the demo actually triggers truncation
    let margin = 0.8;

    for (i, prompt) in interactions.iter().enumerate() {
        history.push(Message::user(*prompt));
        println!("Interaction {}: {}", i + 1, prompt);
        println!("  Current tokens: {}", estimate_tokens(&history));

        if is_approaching_limit(&history, token_limit, margin) {
            println!("  Approaching token limit, truncating...");
            history = truncate_messages(&history, 3, true);
            println!("  After truncation: {} tokens", estimate_tokens(&history));
        }
        println!();
    }

    println!("Final history size: {} messages", history.len());
    println!("Final token count: {}", estimate_tokens(&history));
    println!();
    println!("{}", "-".repeat(70));
}
