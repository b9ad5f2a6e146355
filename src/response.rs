//! Aggregate LLM turn output: [`Usage`] counters and the [`Response`] they sum into.

use crate::types::{ContentBlock, ToolUseBlock};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Non-negative token counters for a single LLM turn, summed additively across turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
            cache_creation_tokens: self.cache_creation_tokens + rhs.cache_creation_tokens,
            cache_read_tokens: self.cache_read_tokens + rhs.cache_read_tokens,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        *self = *self + rhs;
    }
}

/// Aggregate of a single LLM turn: stable id, model name, the assistant's content
/// blocks, and the usage it cost. Role is always assistant, so it isn't a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

impl Response {
    pub fn new(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            content: Vec::new(),
            usage: Usage::default(),
        }
    }

    /// Tool-use blocks requested by the model in this turn, in array order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolUseBlock> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse(tool_use) => Some(tool_use),
            _ => None,
        })
    }

    /// Concatenated text of every text block, in order. Empty if the turn was
    /// tool-calls-only.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_adds_componentwise() {
        let a = Usage {
            input_tokens: 10,
            output_tokens: 5,
            cache_creation_tokens: 1,
            cache_read_tokens: 2,
        };
        let b = Usage {
            input_tokens: 3,
            output_tokens: 7,
            cache_creation_tokens: 0,
            cache_read_tokens: 1,
        };
        let mut c = a;
        c += b;
        assert_eq!(c.input_tokens, 13);
        assert_eq!(c.output_tokens, 12);
        assert_eq!(c.cache_read_tokens, 3);
    }

    #[test]
    fn tool_calls_filters_non_tool_use_blocks() {
        use crate::types::{TextBlock, ToolUseBlock};
        let mut response = Response::new("r1", "m1");
        response.content.push(ContentBlock::Text(TextBlock::new("hi")));
        response
            .content
            .push(ContentBlock::ToolUse(ToolUseBlock::new(
                "call_1",
                "add",
                serde_json::json!({"a": 1}),
            )));
        let calls: Vec<_> = response.tool_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "add");
    }

    #[test]
    fn text_joins_text_blocks_only() {
        use crate::types::TextBlock;
        let mut response = Response::new("r1", "m1");
        response
            .content
            .push(ContentBlock::Text(TextBlock::new("hello ")));
        response
            .content
            .push(ContentBlock::Text(TextBlock::new("world")));
        assert_eq!(response.text(), "hello world");
    }
}
