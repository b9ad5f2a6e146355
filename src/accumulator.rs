//! Response accumulator: folds a provider's streaming event sequence into
//! one [`Response`].
//!
//! Grounded on the base crate's `ToolCallAggregator`/`PartialToolCall` in
//! `utils.rs`, generalized from the OpenAI delta shape to a provider-agnostic
//! [`ProviderEvent`] enum so non-OpenAI-compatible `StreamingLlm` impls can
//! feed the same fold.

use crate::response::{Response, Usage};
use crate::types::{ContentBlock, TextBlock, ToolUseBlock};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// A content block as announced by `content_block_start`, before any deltas
/// have been applied.
#[derive(Debug, Clone)]
pub enum ContentBlockStub {
    Text,
    ToolUse { id: String, name: String },
}

/// An incremental update to an open content block.
#[derive(Debug, Clone)]
pub enum BlockDelta {
    Text(String),
    ToolInputJson(String),
}

/// Provider-agnostic streaming event, named directly after the accumulator's
/// folding contract (`message_start`, `content_block_start/delta/stop`,
/// `message_delta`, `message_stop`).
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    MessageStart { id: String, model: String },
    ContentBlockStart { index: usize, block: ContentBlockStub },
    ContentBlockDelta { index: usize, delta: BlockDelta },
    ContentBlockStop { index: usize },
    MessageDelta { usage: Option<Usage> },
    MessageStop,
}

enum PartialBlock {
    Text(String),
    ToolUse { id: String, name: String, buf: String },
}

/// Stateful fold of a provider's event stream into a [`Response`].
///
/// One accumulator per generation turn. Feed events via [`fold`](Self::fold)
/// in the order the provider emits them, then call
/// [`into_response`](Self::into_response) once `message_stop` has been seen.
pub struct ResponseAccumulator {
    id: Option<String>,
    model: Option<String>,
    open: BTreeMap<usize, PartialBlock>,
    finalized: BTreeMap<usize, ContentBlock>,
    usage: Usage,
    started: bool,
    sealed: bool,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self {
            id: None,
            model: None,
            open: BTreeMap::new(),
            finalized: BTreeMap::new(),
            usage: Usage::default(),
            started: false,
            sealed: false,
        }
    }

    /// Fold one provider event into the accumulator's state.
    pub fn fold(&mut self, event: ProviderEvent) -> Result<()> {
        match event {
            ProviderEvent::MessageStart { id, model } => {
                self.id = Some(id);
                self.model = Some(model);
                self.started = true;
            }
            ProviderEvent::ContentBlockStart { index, block } => {
                if !self.started {
                    return Err(Error::protocol_violation(
                        "content_block_start before message_start",
                    ));
                }
                if self.open.contains_key(&index) || self.finalized.contains_key(&index) {
                    return Err(Error::protocol_violation(format!(
                        "content_block_start for already-open index {index}"
                    )));
                }
                let partial = match block {
                    ContentBlockStub::Text => PartialBlock::Text(String::new()),
                    ContentBlockStub::ToolUse { id, name } => PartialBlock::ToolUse {
                        id,
                        name,
                        buf: String::new(),
                    },
                };
                self.open.insert(index, partial);
            }
            ProviderEvent::ContentBlockDelta { index, delta } => {
                let block = self.open.get_mut(&index).ok_or_else(|| {
                    Error::protocol_violation(format!("delta for unopened index {index}"))
                })?;
                match (block, delta) {
                    (PartialBlock::Text(text), BlockDelta::Text(chunk)) => text.push_str(&chunk),
                    (PartialBlock::ToolUse { buf, .. }, BlockDelta::ToolInputJson(chunk)) => {
                        buf.push_str(&chunk)
                    }
                    _ => {
                        return Err(Error::protocol_violation(format!(
                            "delta kind mismatched open block kind at index {index}"
                        )));
                    }
                }
            }
            ProviderEvent::ContentBlockStop { index } => {
                let partial = self.open.remove(&index).ok_or_else(|| {
                    Error::protocol_violation(format!("content_block_stop for unopened index {index}"))
                })?;
                let block = match partial {
                    PartialBlock::Text(text) => ContentBlock::Text(TextBlock::new(text)),
                    PartialBlock::ToolUse { id, name, buf } => {
                        let input = if buf.trim().is_empty() {
                            serde_json::json!({})
                        } else {
                            serde_json::from_str(&buf).map_err(|e| {
                                Error::malformed_tool_input(format!(
                                    "tool '{name}' input is not valid JSON: {e}"
                                ))
                            })?
                        };
                        ContentBlock::ToolUse(ToolUseBlock::new(id, name, input))
                    }
                };
                self.finalized.insert(index, block);
            }
            ProviderEvent::MessageDelta { usage } => {
                if let Some(usage) = usage {
                    self.usage += usage;
                }
            }
            ProviderEvent::MessageStop => {
                self.sealed = true;
            }
        }
        Ok(())
    }

    /// Seal the accumulator and produce its [`Response`]. Returns
    /// `protocol-violation` if `message_start` was never observed.
    pub fn into_response(self) -> Result<Response> {
        let id = self
            .id
            .ok_or_else(|| Error::protocol_violation("response sealed without message_start"))?;
        let model = self.model.unwrap_or_default();
        Ok(Response {
            id,
            model,
            content: self.finalized.into_values().collect(),
            usage: self.usage,
        })
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

impl Default for ResponseAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_text_only_turn() {
        let mut acc = ResponseAccumulator::new();
        acc.fold(ProviderEvent::MessageStart {
            id: "r1".into(),
            model: "m1".into(),
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockStart {
            index: 0,
            block: ContentBlockStub::Text,
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockDelta {
            index: 0,
            delta: BlockDelta::Text("hello ".into()),
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockDelta {
            index: 0,
            delta: BlockDelta::Text("world".into()),
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockStop { index: 0 }).unwrap();
        acc.fold(ProviderEvent::MessageDelta {
            usage: Some(Usage {
                input_tokens: 10,
                output_tokens: 5,
                ..Default::default()
            }),
        })
        .unwrap();
        acc.fold(ProviderEvent::MessageStop).unwrap();

        let response = acc.into_response().unwrap();
        assert_eq!(response.text(), "hello world");
        assert_eq!(response.usage.input_tokens, 10);
        assert_eq!(response.usage.output_tokens, 5);
    }

    #[test]
    fn folds_tool_use_and_parses_json_on_stop() {
        let mut acc = ResponseAccumulator::new();
        acc.fold(ProviderEvent::MessageStart {
            id: "r1".into(),
            model: "m1".into(),
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockStart {
            index: 0,
            block: ContentBlockStub::ToolUse {
                id: "call_1".into(),
                name: "add".into(),
            },
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockDelta {
            index: 0,
            delta: BlockDelta::ToolInputJson("{\"a\":1,".into()),
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockDelta {
            index: 0,
            delta: BlockDelta::ToolInputJson("\"b\":2}".into()),
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockStop { index: 0 }).unwrap();
        acc.fold(ProviderEvent::MessageStop).unwrap();

        let response = acc.into_response().unwrap();
        let calls: Vec<_> = response.tool_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input, serde_json::json!({"a": 1, "b": 2}));
    }

    #[test]
    fn malformed_tool_json_fails_on_stop() {
        let mut acc = ResponseAccumulator::new();
        acc.fold(ProviderEvent::MessageStart {
            id: "r1".into(),
            model: "m1".into(),
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockStart {
            index: 0,
            block: ContentBlockStub::ToolUse {
                id: "call_1".into(),
                name: "add".into(),
            },
        })
        .unwrap();
        acc.fold(ProviderEvent::ContentBlockDelta {
            index: 0,
            delta: BlockDelta::ToolInputJson("{not json".into()),
        })
        .unwrap();
        let err = acc.fold(ProviderEvent::ContentBlockStop { index: 0 }).unwrap_err();
        assert!(matches!(err, Error::MalformedToolInput(_)));
    }

    #[test]
    fn content_block_start_before_message_start_is_protocol_violation() {
        let mut acc = ResponseAccumulator::new();
        let err = acc
            .fold(ProviderEvent::ContentBlockStart {
                index: 0,
                block: ContentBlockStub::Text,
            })
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }

    #[test]
    fn stop_on_unopened_index_is_protocol_violation() {
        let mut acc = ResponseAccumulator::new();
        acc.fold(ProviderEvent::MessageStart {
            id: "r1".into(),
            model: "m1".into(),
        })
        .unwrap();
        let err = acc.fold(ProviderEvent::ContentBlockStop { index: 5 }).unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }
}
