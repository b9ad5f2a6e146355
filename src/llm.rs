//! LLM adapter: the [`Llm`]/[`StreamingLlm`] traits and an
//! OpenAI-compatible implementation.
//!
//! Grounded on the base crate's request-building and SSE transport in
//! `client.rs`/`utils.rs`, restructured to emit [`ProviderEvent`]s rather than
//! [`ContentBlock`]s directly: [`accumulator::ResponseAccumulator`] owns the
//! fold, this module only owns the wire translation.

use crate::accumulator::{BlockDelta, ContentBlockStub, ProviderEvent, ResponseAccumulator};
use crate::config::{self, Provider};
use crate::response::{Response, Usage};
use crate::retry::{self, RetryConfig};
use crate::tools::Tool;
use crate::types::{
    ContentBlock, Message, MessageRole, OpenAIChunk, OpenAIContent, OpenAIFunction, OpenAIMessage,
    OpenAIRequest, OpenAIToolCall,
};
use crate::utils::parse_sse_stream;
use crate::{Error, Result};
use futures::stream::{Stream, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Whether the model may call tools on this turn. `None` forces a text-only
/// reply, the finish-now coercion's mechanism on the turn before the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
}

/// Per-call generation parameters, distinct from the transport-level settings
/// (`base_url`/`api_key`/`model`) owned by the concrete [`Llm`] impl.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub max_tokens: Option<u32>,
    pub temperature: f32,
    pub tools: Vec<Arc<Tool>>,
    pub tool_choice: ToolChoice,
}

impl GenerateOptions {
    pub fn new(temperature: f32) -> Self {
        Self {
            max_tokens: None,
            temperature,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
        }
    }
}

pub type ProviderEventStream = Pin<Box<dyn Stream<Item = Result<ProviderEvent>> + Send>>;

/// A single non-streaming (or internally-streamed-then-folded) turn with an
/// LLM provider.
pub trait Llm: Send + Sync {
    fn name(&self) -> &str;

    fn generate<'a>(
        &'a self,
        messages: &'a [Message],
        opts: &'a GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;
}

/// A provider that can stream its turn as [`ProviderEvent`]s instead of
/// returning only the final [`Response`].
pub trait StreamingLlm: Llm {
    fn stream<'a>(
        &'a self,
        messages: &'a [Message],
        opts: &'a GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderEventStream>> + Send + 'a>>;
}

/// An OpenAI-compatible chat-completions provider (LM Studio, Ollama,
/// llama.cpp, vLLM, or any server speaking the same wire format).
pub struct OpenAiCompatLlm {
    model: String,
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
    retry: RetryConfig,
}

impl OpenAiCompatLlm {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            model: model.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            http_client,
            retry: RetryConfig::default(),
        })
    }

    /// Builds an adapter from provider/environment resolution instead of an
    /// explicit base URL: see [`config::get_base_url`]/[`config::get_model`]
    /// for the priority order (`OPEN_AGENT_BASE_URL`/`OPEN_AGENT_MODEL` env
    /// vars, then `provider`'s default, then the supplied fallbacks).
    pub fn from_config(
        provider: Option<Provider>,
        model_fallback: Option<&str>,
        base_url_fallback: Option<&str>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = config::get_base_url(provider, base_url_fallback);
        let model = config::get_model(model_fallback, true)
            .ok_or_else(|| Error::config("no model configured: set OPEN_AGENT_MODEL or pass a fallback"))?;
        Self::new(model, base_url, api_key, timeout)
    }

    /// Overrides the default retry policy used around the transport call.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(&self, messages: &[Message], opts: &GenerateOptions) -> Result<OpenAIRequest> {
        let mut wire_messages = Vec::with_capacity(messages.len());
        for message in messages {
            wire_messages.push(to_openai_message(message)?);
        }

        let tools = if opts.tools.is_empty() {
            None
        } else {
            Some(opts.tools.iter().map(|t| t.to_openai_format()).collect())
        };

        let tool_choice = match opts.tool_choice {
            ToolChoice::Auto => None,
            ToolChoice::None => Some(serde_json::Value::String("none".to_string())),
        };

        Ok(OpenAIRequest {
            model: self.model.clone(),
            messages: wire_messages,
            stream: true,
            max_tokens: opts.max_tokens,
            temperature: Some(opts.temperature),
            tools,
            tool_choice,
        })
    }

    async fn send(&self, request: &OpenAIRequest) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::api(format!("API error {status}: {body}")));
        }
        Ok(response)
    }
}

impl Llm for OpenAiCompatLlm {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate<'a>(
        &'a self,
        messages: &'a [Message],
        opts: &'a GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>> {
        Box::pin(async move {
            let mut stream = StreamingLlm::stream(self, messages, opts).await?;
            let mut accumulator = ResponseAccumulator::new();
            while let Some(event) = stream.next().await {
                accumulator.fold(event?)?;
            }
            accumulator.into_response()
        })
    }
}

impl StreamingLlm for OpenAiCompatLlm {
    fn stream<'a>(
        &'a self,
        messages: &'a [Message],
        opts: &'a GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderEventStream>> + Send + 'a>> {
        Box::pin(async move {
            let request = self.build_request(messages, opts)?;
            let response =
                retry::retry_with_backoff_conditional(self.retry.clone(), || self.send(&request))
                    .await?;
            let chunks = parse_sse_stream(response);
            Ok(Box::pin(ChunkToProviderEvents::new(chunks)) as ProviderEventStream)
        })
    }
}

/// Open content-block kinds tracked while translating OpenAI deltas into
/// [`ProviderEvent`]s, keyed by a global index distinct from OpenAI's
/// per-tool-call index (text always gets index 0 when present).
enum OpenBlock {
    Text,
    ToolUse,
}

/// Adapts a stream of [`OpenAIChunk`]s into the provider-agnostic
/// [`ProviderEvent`] sequence the accumulator expects: `message_start` on the
/// first chunk, `content_block_start` the first time text or a given tool
/// index appears, `content_block_delta` per chunk, `content_block_stop` +
/// `message_stop` once `finish_reason` arrives.
struct ChunkToProviderEvents<S> {
    inner: S,
    started: bool,
    text_index: Option<usize>,
    tool_indices: HashMap<u32, usize>,
    open: HashMap<usize, OpenBlock>,
    next_index: usize,
    pending: std::collections::VecDeque<ProviderEvent>,
    done: bool,
}

impl<S> ChunkToProviderEvents<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            started: false,
            text_index: None,
            tool_indices: HashMap::new(),
            open: HashMap::new(),
            next_index: 0,
            pending: std::collections::VecDeque::new(),
            done: false,
        }
    }
}

impl<S> Stream for ChunkToProviderEvents<S>
where
    S: Stream<Item = Result<OpenAIChunk>> + Unpin,
{
    type Item = Result<ProviderEvent>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return std::task::Poll::Ready(Some(Ok(event)));
            }
            if self.done {
                return std::task::Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                std::task::Poll::Pending => return std::task::Poll::Pending,
                std::task::Poll::Ready(None) => {
                    self.done = true;
                    continue;
                }
                std::task::Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return std::task::Poll::Ready(Some(Err(e)));
                }
                std::task::Poll::Ready(Some(Ok(chunk))) => {
                    if let Err(e) = self.absorb_chunk(chunk) {
                        self.done = true;
                        return std::task::Poll::Ready(Some(Err(e)));
                    }
                    continue;
                }
            }
        }
    }
}

impl<S> ChunkToProviderEvents<S> {
    fn absorb_chunk(&mut self, chunk: OpenAIChunk) -> Result<()> {
        if !self.started {
            self.pending.push_back(ProviderEvent::MessageStart {
                id: chunk.id.clone(),
                model: chunk.model.clone(),
            });
            self.started = true;
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(());
        };

        if let Some(text) = choice.delta.content {
            let index = *self.text_index.get_or_insert_with(|| {
                let index = self.next_index;
                self.next_index += 1;
                index
            });
            if !self.open.contains_key(&index) {
                self.open.insert(index, OpenBlock::Text);
                self.pending.push_back(ProviderEvent::ContentBlockStart {
                    index,
                    block: ContentBlockStub::Text,
                });
            }
            self.pending.push_back(ProviderEvent::ContentBlockDelta {
                index,
                delta: BlockDelta::Text(text),
            });
        }

        if let Some(tool_deltas) = choice.delta.tool_calls {
            for delta in tool_deltas {
                let index = *self.tool_indices.entry(delta.index).or_insert_with(|| {
                    let index = self.next_index;
                    self.next_index += 1;
                    index
                });
                if !self.open.contains_key(&index) {
                    self.open.insert(index, OpenBlock::ToolUse);
                    self.pending.push_back(ProviderEvent::ContentBlockStart {
                        index,
                        block: ContentBlockStub::ToolUse {
                            id: delta.id.clone().unwrap_or_default(),
                            name: delta
                                .function
                                .as_ref()
                                .and_then(|f| f.name.clone())
                                .unwrap_or_default(),
                        },
                    });
                }
                if let Some(function) = delta.function {
                    if let Some(arguments) = function.arguments {
                        self.pending.push_back(ProviderEvent::ContentBlockDelta {
                            index,
                            delta: BlockDelta::ToolInputJson(arguments),
                        });
                    }
                }
            }
        }

        if choice.finish_reason.is_some() {
            for index in self.open.keys().copied().collect::<Vec<_>>() {
                self.pending
                    .push_back(ProviderEvent::ContentBlockStop { index });
            }
            self.pending.push_back(ProviderEvent::MessageDelta { usage: None });
            self.pending.push_back(ProviderEvent::MessageStop);
        }

        Ok(())
    }
}

fn to_openai_message(message: &Message) -> Result<OpenAIMessage> {
    let role = match message.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
    .to_string();

    let mut tool_calls = Vec::new();
    let mut tool_call_id = None;
    let mut text = String::new();

    for block in &message.content {
        match block {
            ContentBlock::Text(t) => text.push_str(&t.text),
            ContentBlock::ToolUse(tool_use) => {
                tool_calls.push(OpenAIToolCall {
                    id: tool_use.id.clone(),
                    call_type: "function".to_string(),
                    function: OpenAIFunction {
                        name: tool_use.name.clone(),
                        arguments: serde_json::to_string(&tool_use.input)
                            .map_err(Error::Json)?,
                    },
                });
            }
            ContentBlock::ToolResult(result) => {
                tool_call_id = Some(result.tool_use_id.clone());
                text.push_str(&serde_json::to_string(&result.content).map_err(Error::Json)?);
            }
            ContentBlock::Image(_) | ContentBlock::Document(_) => {
                // Attachment-bearing content parts aren't sent to this
                // provider shape today; text content still goes through.
            }
        }
    }

    Ok(OpenAIMessage {
        role,
        content: if text.is_empty() && !tool_calls.is_empty() {
            None
        } else {
            Some(OpenAIContent::Text(text))
        },
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        tool_call_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TextBlock, ToolResultBlock, ToolUseBlock};

    #[test]
    fn converts_assistant_tool_use_message() {
        let message = Message::new(
            MessageRole::Assistant,
            vec![ContentBlock::ToolUse(ToolUseBlock::new(
                "call_1",
                "add",
                serde_json::json!({"a": 1, "b": 2}),
            ))],
        );
        let wire = to_openai_message(&message).unwrap();
        assert_eq!(wire.role, "assistant");
        assert!(wire.content.is_none());
        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "add");
    }

    #[test]
    fn converts_tool_result_message_with_call_id() {
        let message = Message::new(
            MessageRole::Tool,
            vec![ContentBlock::ToolResult(ToolResultBlock::new(
                "call_1",
                serde_json::json!({"sum": 3}),
            ))],
        );
        let wire = to_openai_message(&message).unwrap();
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn converts_plain_text_message() {
        let message = Message::new(
            MessageRole::User,
            vec![ContentBlock::Text(TextBlock::new("hi"))],
        );
        let wire = to_openai_message(&message).unwrap();
        match wire.content {
            Some(OpenAIContent::Text(t)) => assert_eq!(t, "hi"),
            _ => panic!("expected text content"),
        }
    }

    fn sample_usage() -> Usage {
        Usage::default()
    }

    #[test]
    fn generate_options_defaults_to_auto_tool_choice() {
        let opts = GenerateOptions::new(0.7);
        assert_eq!(opts.tool_choice, ToolChoice::Auto);
        assert_eq!(opts.max_tokens, None);
        let _ = sample_usage();
    }
}
