//! Error types for the Open Agent SDK

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SDK
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// API error from the model server
    #[error("API error: {0}")]
    Api(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Tool execution error
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout error
    #[error("Request timeout")]
    Timeout,

    /// Other errors
    #[error("Error: {0}")]
    Other(String),

    /// Operation attempted before `Start` or after `Stop`.
    #[error("agent is not running")]
    NotRunning,

    /// No model configured and autodetect failed.
    #[error("no LLM configured: {0}")]
    NoLlm(String),

    /// A task was submitted with empty prompt text.
    #[error("task has no instructions")]
    NoInstructions,

    /// A thread id was given but no thread repository was configured.
    #[error("threads are not enabled for this agent")]
    ThreadsNotEnabled,

    /// The LLM returned no response and no error.
    #[error("LLM returned no response")]
    LlmNoResponse,

    /// The model invoked a tool that isn't registered on the agent.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A tool call returned an error; the generation fails with it attached.
    #[error("tool '{name}' failed: {source}")]
    ToolCallFailed {
        /// Name of the failing tool.
        name: String,
        /// Underlying error returned by the tool.
        #[source]
        source: Box<Error>,
    },

    /// A tool-use block's JSON input could not be parsed.
    #[error("malformed tool input: {0}")]
    MalformedToolInput(String),

    /// The operation was cancelled (deadline expired or explicit cancel).
    #[error("operation cancelled")]
    Cancelled,

    /// A send was attempted on a publisher that was already closed.
    #[error("stream is closed")]
    StreamClosed,

    /// The response accumulator observed an invalid provider event order.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A thread lookup found no thread with the given id.
    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    /// A document lookup found no document with the given name.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// A delegated peer's stream ended before a completed response arrived.
    #[error("no result from delegated agent: {0}")]
    NoResult(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new API error
    pub fn api(msg: impl Into<String>) -> Self {
        Error::Api(msg.into())
    }

    /// Create a new stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Error::Stream(msg.into())
    }

    /// Create a new tool error
    pub fn tool(msg: impl Into<String>) -> Self {
        Error::Tool(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create a timeout error
    pub fn timeout() -> Self {
        Error::Timeout
    }

    /// Create a no-LLM-configured error
    pub fn no_llm(msg: impl Into<String>) -> Self {
        Error::NoLlm(msg.into())
    }

    /// Create an unknown-tool error
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Error::UnknownTool(name.into())
    }

    /// Create a tool-call-failed error wrapping the tool's own error
    pub fn tool_call_failed(name: impl Into<String>, source: Error) -> Self {
        Error::ToolCallFailed {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Create a malformed-tool-input error
    pub fn malformed_tool_input(msg: impl Into<String>) -> Self {
        Error::MalformedToolInput(msg.into())
    }

    /// Create a protocol-violation error
    pub fn protocol_violation(msg: impl Into<String>) -> Self {
        Error::ProtocolViolation(msg.into())
    }

    /// Create a thread-not-found error
    pub fn thread_not_found(id: impl Into<String>) -> Self {
        Error::ThreadNotFound(id.into())
    }

    /// Create a document-not-found error
    pub fn document_not_found(name: impl Into<String>) -> Self {
        Error::DocumentNotFound(name.into())
    }

    /// Create a no-result error
    pub fn no_result(msg: impl Into<String>) -> Self {
        Error::NoResult(msg.into())
    }

    /// Returns true if this error kind is transient/retryable.
    ///
    /// Mirrors [`crate::retry::is_retryable_error`] but also accounts for
    /// the actor-level error kinds added beyond the base transport errors.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = Error::config("Invalid model");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Invalid configuration: Invalid model");
    }

    #[test]
    fn test_error_api() {
        let err = Error::api("500 Internal Server Error");
        assert!(matches!(err, Error::Api(_)));
        assert_eq!(err.to_string(), "API error: 500 Internal Server Error");
    }

    #[test]
    fn test_error_stream() {
        let err = Error::stream("Connection lost");
        assert!(matches!(err, Error::Stream(_)));
        assert_eq!(err.to_string(), "Streaming error: Connection lost");
    }

    #[test]
    fn test_error_tool() {
        let err = Error::tool("Tool not found");
        assert!(matches!(err, Error::Tool(_)));
        assert_eq!(err.to_string(), "Tool execution error: Tool not found");
    }

    #[test]
    fn test_error_invalid_input() {
        let err = Error::invalid_input("Missing parameter");
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(err.to_string(), "Invalid input: Missing parameter");
    }

    #[test]
    fn test_error_timeout() {
        let err = Error::timeout();
        assert!(matches!(err, Error::Timeout));
        assert_eq!(err.to_string(), "Request timeout");
    }

    #[test]
    fn test_error_other() {
        let err = Error::other("Something went wrong");
        assert!(matches!(err, Error::Other(_)));
        assert_eq!(err.to_string(), "Error: Something went wrong");
    }

    #[test]
    fn test_error_from_reqwest() {
        // Test that reqwest::Error can be converted
        // This is mostly for compile-time checking
        fn _test_conversion(_e: reqwest::Error) -> Error {
            // This function just needs to compile
            Error::Http(_e)
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        // Test that serde_json::Error can be converted
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_error_not_running() {
        let err = Error::NotRunning;
        assert_eq!(err.to_string(), "agent is not running");
    }

    #[test]
    fn test_error_unknown_tool() {
        let err = Error::unknown_tool("search");
        assert!(matches!(err, Error::UnknownTool(_)));
        assert_eq!(err.to_string(), "unknown tool: search");
    }

    #[test]
    fn test_error_tool_call_failed_wraps_source() {
        let err = Error::tool_call_failed("search", Error::tool("boom"));
        assert_eq!(
            err.to_string(),
            "tool 'search' failed: Tool execution error: boom"
        );
    }

    #[test]
    fn test_error_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::Timeout.is_cancelled());
        assert!(!Error::NotRunning.is_cancelled());
    }

    #[test]
    fn test_error_thread_not_found() {
        let err = Error::thread_not_found("t1");
        assert_eq!(err.to_string(), "thread not found: t1");
    }

    #[test]
    fn test_error_no_result() {
        let err = Error::no_result("stream ended without response.completed");
        assert!(matches!(err, Error::NoResult(_)));
    }

    #[test]
    fn test_result_type_alias() {
        // Test that our Result type alias works correctly
        fn _returns_result() -> Result<i32> {
            Ok(42)
        }

        fn _returns_error() -> Result<i32> {
            Err(Error::timeout())
        }
    }
}
