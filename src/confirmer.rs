//! Confirmer: a policy gate consulted before certain tool calls.
//!
//! Modes are policy, not new capabilities: every mode is implemented by the
//! same [`AutoConfirmer`] consulting a tool's [`ToolAnnotations`]. Grounded on
//! the base crate's `ToolHandler` closure signature (`tools.rs`) for the async
//! trait shape, and `async-trait`'s usage elsewhere in its stack.

use crate::tools::Tool;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;

/// Policy selecting when a [`Confirmer`] is consulted before a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMode {
    /// Always approve without asking.
    Auto,
    /// Always deny without asking.
    Deny,
    /// Always ask.
    Always,
    /// Ask unless the tool is annotated read-only.
    IfNotReadOnly,
    /// Ask only if the tool is annotated destructive.
    IfDestructive,
    /// Never consult. Equivalent to `Auto` but named for clarity at call sites.
    Never,
}

/// Gate consulted by the dispatcher before running a tool call whose
/// annotations or the active [`ConfirmMode`] require it.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, agent: &str, tool: &Tool, tool_use_content: &Value) -> Result<bool>;
}

/// Policy-driven confirmer: decides whether to ask at all based on
/// `mode` and the tool's annotations, then always approves once it
/// decides not to ask (or has nothing else to consult).
pub struct AutoConfirmer {
    mode: ConfirmMode,
}

impl AutoConfirmer {
    pub fn new(mode: ConfirmMode) -> Self {
        Self { mode }
    }

    fn needs_consultation(&self, tool: &Tool) -> bool {
        match self.mode {
            ConfirmMode::Auto | ConfirmMode::Never => false,
            ConfirmMode::Deny => true,
            ConfirmMode::Always => true,
            ConfirmMode::IfNotReadOnly => !tool.annotations().read_only_hint,
            ConfirmMode::IfDestructive => tool.annotations().destructive_hint,
        }
    }
}

#[async_trait]
impl Confirmer for AutoConfirmer {
    async fn confirm(&self, _agent: &str, tool: &Tool, _tool_use_content: &Value) -> Result<bool> {
        if !self.needs_consultation(tool) {
            return Ok(true);
        }
        Ok(self.mode != ConfirmMode::Deny)
    }
}

/// Denies every consultation-requiring call outright, useful in tests and
/// locked-down demos.
pub struct DenyConfirmer;

#[async_trait]
impl Confirmer for DenyConfirmer {
    async fn confirm(&self, _agent: &str, _tool: &Tool, _tool_use_content: &Value) -> Result<bool> {
        Ok(false)
    }
}

/// Prompts on stdin/stdout. The confirmer may interact with a terminal;
/// implementations serialize their own I/O, so this one locks stdout for the
/// duration of the prompt.
pub struct InteractiveConfirmer {
    mode: ConfirmMode,
}

impl InteractiveConfirmer {
    pub fn new(mode: ConfirmMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl Confirmer for InteractiveConfirmer {
    async fn confirm(&self, agent: &str, tool: &Tool, tool_use_content: &Value) -> Result<bool> {
        let needs_ask = match self.mode {
            ConfirmMode::Auto | ConfirmMode::Never => false,
            ConfirmMode::Deny => return Ok(false),
            ConfirmMode::Always => true,
            ConfirmMode::IfNotReadOnly => !tool.annotations().read_only_hint,
            ConfirmMode::IfDestructive => tool.annotations().destructive_hint,
        };
        if !needs_ask {
            return Ok(true);
        }

        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let _ = write!(
            handle,
            "{agent} wants to call '{}' with {tool_use_content}. Allow? [y/N] ",
            tool.name()
        );
        let _ = handle.flush();

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| crate::Error::other(format!("failed to read confirmation: {e}")))?;
        Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolAnnotations;
    use serde_json::json;

    fn read_only_tool() -> Tool {
        Tool::new(
            "list_files",
            "lists files",
            json!({"type": "object"}),
            |_input| async move { Ok(json!([])) },
        )
        .with_annotations(ToolAnnotations::read_only("List files"))
    }

    fn destructive_tool() -> Tool {
        let mut annotations = ToolAnnotations::default();
        annotations.destructive_hint = true;
        Tool::new(
            "delete_file",
            "deletes a file",
            json!({"type": "object"}),
            |_input| async move { Ok(json!(null)) },
        )
        .with_annotations(annotations)
    }

    #[tokio::test]
    async fn never_mode_always_approves() {
        let confirmer = AutoConfirmer::new(ConfirmMode::Never);
        let tool = destructive_tool();
        assert!(confirmer.confirm("agent", &tool, &json!({})).await.unwrap());
    }

    #[tokio::test]
    async fn if_destructive_only_asks_destructive_tools() {
        let confirmer = AutoConfirmer::new(ConfirmMode::IfDestructive);
        assert!(
            confirmer
                .confirm("agent", &read_only_tool(), &json!({}))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn deny_mode_denies_consulted_calls() {
        let confirmer = AutoConfirmer::new(ConfirmMode::Deny);
        assert!(
            !confirmer
                .confirm("agent", &destructive_tool(), &json!({}))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn if_not_read_only_skips_read_only_tools() {
        let confirmer = AutoConfirmer::new(ConfirmMode::IfNotReadOnly);
        assert!(
            confirmer
                .confirm("agent", &read_only_tool(), &json!({}))
                .await
                .unwrap()
        );
    }
}
