//! # Open Agent SDK - Rust Implementation
//!
//! A production-ready, streaming-first Rust SDK for building AI agents with local OpenAI-compatible servers.
//!
//! ## Overview
//!
//! This SDK provides a clean, ergonomic API for working with local LLM servers such as:
//! - LM Studio
//! - Ollama
//! - llama.cpp
//! - vLLM
//!
//! ## Key Features
//!
//! - **Zero API Costs**: Run models on your own hardware
//! - **Privacy-First**: All data stays local on your machine
//! - **High Performance**: Native async/await with Tokio runtime
//! - **Streaming Responses**: Real-time token-by-token streaming
//! - **Tool Calling**: Define and execute tools with automatic schema generation
//! - **Lifecycle Hooks**: Intercept and control execution at key points
//! - **Interrupts**: Gracefully cancel long-running operations
//! - **Context Management**: Manual token estimation and history truncation
//! - **Retry Logic**: Exponential backoff with jitter for reliability
//!
//! ## Agents
//!
//! The SDK is built around long-lived [`Agent`] actors rather than a bare
//! request function: an agent owns its own mailbox and background loop, and
//! callers submit chat turns or tasks to it rather than driving a streaming
//! query object directly.
//!
//! ### Single chat turn
//!
//! ```rust,no_run
//! use agentrie::{AgentBuilder, AgentIdentity, ChatRequest, Message, OpenAiCompatLlm};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let llm = OpenAiCompatLlm::new(
//!         "qwen2.5-32b-instruct",
//!         "http://localhost:1234/v1",
//!         "not-needed",
//!         Duration::from_secs(120),
//!     )?;
//!
//!     let agent = AgentBuilder::new(AgentIdentity::new("assistant"))
//!         .llm(Arc::new(llm))
//!         .build(None)?;
//!     agent.start().await?;
//!
//!     let response = agent
//!         .create_response(ChatRequest::new(vec![Message::user("What's the capital of France?")]))
//!         .await?;
//!     println!("{}", response.text());
//!
//!     agent.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Multi-turn conversation via a thread
//!
//! Passing the same `thread_id` on successive [`ChatRequest`]s loads and
//! persists history through a [`ThreadRepository`], so the agent remembers
//! earlier turns without the caller re-sending them.
//!
//! ```rust,no_run
//! use agentrie::{AgentBuilder, AgentIdentity, ChatRequest, MemoryThreadRepository, Message, OpenAiCompatLlm};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let llm = OpenAiCompatLlm::new(
//!         "qwen2.5-32b-instruct",
//!         "http://localhost:1234/v1",
//!         "not-needed",
//!         Duration::from_secs(120),
//!     )?;
//!
//!     let agent = AgentBuilder::new(AgentIdentity::new("assistant"))
//!         .llm(Arc::new(llm))
//!         .threads(Arc::new(MemoryThreadRepository::new()))
//!         .build(None)?;
//!     agent.start().await?;
//!
//!     let first = agent
//!         .create_response(ChatRequest::new(vec![Message::user("What's 2+2?")]).with_thread("t1"))
//!         .await?;
//!     println!("{}", first.text());
//!
//!     let second = agent
//!         .create_response(ChatRequest::new(vec![Message::user("Now multiply that by 3")]).with_thread("t1"))
//!         .await?;
//!     println!("{}", second.text());
//!
//!     agent.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The SDK is organized into several modules, each with a specific responsibility:
//!
//! - **types**: Data structures for messages, content blocks, and configuration
//! - **tools**: Tool definition system with automatic JSON schema generation
//! - **hooks**: Lifecycle event system for intercepting execution
//! - **config**: Provider-specific configuration helpers
//! - **error**: Comprehensive error types and conversions
//! - **context**: Token estimation and message truncation utilities
//! - **retry**: Exponential backoff retry logic with jitter
//! - **utils**: Internal utilities for SSE parsing and tool aggregation
//! - **response**: Per-turn usage counters and the response they sum into
//! - **accumulator**: Folds a provider's streaming events into a response
//! - **events**: Bounded event stream and publisher for agent progress
//! - **task**: Task description types, state machine, and recent-task ring
//! - **llm**: `Llm`/`StreamingLlm` traits and the OpenAI-compatible adapter
//! - **dispatcher**: Looks up, confirms, and executes a turn's tool-use batch
//! - **generation**: Bounded generate -> tool-use -> generate loop
//! - **thread**: Durable chat-thread history, behind a repository trait
//! - **document**: Read-mostly named-blob storage for task context entries
//! - **prompt**: Renders an agent's identity and mode into a system prompt
//! - **actor**: Per-agent mailbox/ticker/task-queue loop (`Agent`)
//! - **environment**: Peer lookup for supervisor delegation
//! - **delegate**: Built-in `assign_work` delegation tool

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
// These modules are private (internal implementation details) unless explicitly
// re-exported through `pub use` statements below.

/// Folds a provider's streaming event sequence into a [`response::Response`].
mod accumulator;

/// Confirmer policy gate consulted before certain tool calls.
mod confirmer;

/// Bounded event stream and publisher used to report agent progress to callers.
mod events;

/// `Llm`/`StreamingLlm` traits and the OpenAI-compatible provider adapter.
mod llm;

/// Aggregate LLM turn output: token usage and the response they sum into.
mod response;

/// Task description types, the task state machine, and the recent-task ring.
mod task;

/// Tool dispatcher: looks up, confirms, executes, and folds tool-use batches.
mod dispatcher;

/// Bounded generate -> tool-use -> generate loop for a single agent turn.
mod generation;

/// Thread repository trait plus memory and per-file JSON implementations.
mod thread;

/// Document repository trait plus memory and per-file JSON implementations.
mod document;

/// System prompt assembler rendering agent identity + mode into prompt text.
mod prompt;

/// Agent actor: the per-agent mailbox/ticker/task-queue loop and its public
/// chat/work/response operations.
mod actor;

/// Peer lookup for supervisor delegation.
mod environment;

/// Built-in `assign_work` delegation tool.
mod delegate;

/// Provider configuration helpers for LM Studio, Ollama, llama.cpp, and vLLM.
/// Simplifies endpoint and model name resolution with environment variable support.
mod config;

/// Context window management utilities for token estimation and history truncation.
/// Provides manual control over conversation memory to prevent context overflow.
mod context;

/// Error types and conversions for comprehensive error handling throughout the SDK.
/// Defines the `Error` enum and `Result<T>` type alias used across all public APIs.
mod error;

/// Lifecycle hooks system for intercepting and controlling execution at key points.
/// Enables security gates, audit logging, input/output modification, and compliance checks.
mod hooks;

/// Tool definition and execution system with automatic JSON schema generation.
/// Allows LLMs to call Rust functions with type-safe parameter handling.
mod tools;

/// Core type definitions for messages, content blocks, and agent configuration.
/// Includes builder patterns for ergonomic configuration and OpenAI API serialization.
mod types;

/// Internal utilities for Server-Sent Events (SSE) parsing and tool call aggregation.
/// Handles the low-level details of streaming response parsing.
mod utils;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================
// These items form the public API of the SDK. Everything else is internal.

/// Retry utilities with exponential backoff and jitter.
/// Made public as a module so users can access retry configuration and functions
/// for their own operations that need retry logic.
pub mod retry;

// --- Provider Configuration ---

pub use config::{Provider, get_base_url, get_model};

// --- Context Management ---

pub use context::{estimate_tokens, is_approaching_limit, truncate_messages};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Lifecycle Hooks ---

pub use hooks::{
    BeforeGenerateEvent, HOOK_BEFORE_GENERATE, HOOK_POST_TOOL_USE, HOOK_PRE_TOOL_USE,
    HOOK_USER_PROMPT_SUBMIT, HookDecision, Hooks, PostToolUseEvent, PreToolUseEvent,
    UserPromptSubmitEvent,
};

// --- Tool System ---

pub use tools::{Tool, ToolAnnotations, ToolBuilder, tool};

// --- Core Types ---

pub use types::{
    AgentOptions, AgentOptionsBuilder, ContentBlock, Message, MessageRole, TextBlock,
    ToolResultBlock, ToolUseBlock,
};

// --- Response Accumulation ---

pub use accumulator::{BlockDelta, ContentBlockStub, ProviderEvent, ResponseAccumulator};

// --- Event Stream ---

pub use events::{
    EVENT_CHANNEL_CAPACITY, EventOrigin, EventPayload, EventPublisher, EventStream, ResponseEvent,
    ResponseEventType, TaskEventPayload, channel as event_channel,
};

// --- Response & Usage ---

pub use response::{Response, Usage};

// --- LLM Adapter ---

pub use llm::{GenerateOptions, Llm, OpenAiCompatLlm, ProviderEventStream, StreamingLlm, ToolChoice};

// --- Confirmer ---

pub use confirmer::{AutoConfirmer, ConfirmMode, Confirmer, DenyConfirmer, InteractiveConfirmer};

// --- Task Scheduling ---

pub use task::{
    ContextEntry, OutputFormat, ParsedResponse, RECENT_TASKS_CAPACITY, RecentTaskRing,
    Task, TaskPrompt, TaskState, TaskStatus, parse_structured_response, resume_nudge,
};

// --- Tool Dispatcher ---

pub use dispatcher::{DispatchOutcome, Dispatcher};

// --- Generation Loop ---

pub use generation::{DEFAULT_TOOL_ITERATION_LIMIT, GenerationLoop, GenerationOutcome};

// --- Thread Repository ---

pub use thread::{
    FileThreadRepository, MemoryThreadRepository, SharedThreadRepository, Thread, ThreadFilter,
    ThreadPage, ThreadRepository, ThreadSummary,
};

// --- Document Repository ---

pub use document::{
    Document, DocumentRepository, FileDocumentRepository, MemoryDocumentRepository,
    SharedDocumentRepository,
};

// --- System Prompt Assembler ---

pub use prompt::{PromptIdentity, PromptMode, render_system_prompt};

// --- Agent Actor ---

pub use actor::{
    Agent, AgentBuilder, AgentIdentity, ChatRequest, DEFAULT_TICK_INTERVAL, MAILBOX_CAPACITY,
};

// --- Environment ---

pub use environment::{Environment, LocalEnvironment};

// --- Delegation Tool ---

pub use delegate::delegation_tool;

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// Convenience module containing the most commonly used types and functions.
/// Import with `use agentrie::prelude::*;` to get everything you need for typical usage.
///
/// This includes:
/// - Configuration: AgentOptions, AgentOptionsBuilder
/// - Actor: Agent, AgentBuilder, AgentIdentity, ChatRequest
/// - Content: ContentBlock, TextBlock, ToolUseBlock
/// - Tools: Tool, tool()
/// - Hooks: Hooks, HookDecision, hook event types
/// - Errors: Error, Result
pub mod prelude {
    pub use crate::{
        Agent, AgentBuilder, AgentIdentity, AgentOptions, AgentOptionsBuilder, ChatRequest,
        ContentBlock, Environment, Error, EventStream, HookDecision, Hooks, LocalEnvironment,
        PostToolUseEvent, PreToolUseEvent, Response, ResponseEvent, Result, Task, TaskPrompt,
        TaskState, TaskStatus, TextBlock, Tool, ToolAnnotations, ToolUseBlock, Usage,
        UserPromptSubmitEvent, tool,
    };
}
