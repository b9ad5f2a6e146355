//! Task state machine: task description types, the mutable per-task
//! runtime record, structured-response parsing (`<status>`/`<think>`), and the
//! bounded recent-task ring used as context for future work.
//!
//! Grounded on the `<status>`/`<think>` convention and the ring-buffer
//! eviction pattern used by `other_examples`'s `ChatSessions`
//! (`8ac16540_bochaco-formicaio`), generalized to a fixed-size oldest-evicting
//! `VecDeque`.

use crate::response::Usage;
use crate::types::Message;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Upper bound on the recent-task ring: oldest entry is evicted once full.
pub const RECENT_TASKS_CAPACITY: usize = 10;

/// A context item supplied alongside a task prompt.
#[derive(Debug, Clone)]
pub enum ContextEntry {
    Text(String),
    Path(PathBuf),
    Url(String),
    Document(String),
}

/// Desired shape of a task's final output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Markdown,
    Json,
}

/// The prompt portion of a task description.
#[derive(Debug, Clone)]
pub struct TaskPrompt {
    pub text: String,
    pub name: Option<String>,
    pub expected_output: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub context: Vec<ContextEntry>,
}

impl TaskPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            name: None,
            expected_output: None,
            output_format: None,
            context: Vec::new(),
        }
    }
}

/// An immutable description of work to be scheduled on an agent.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub timeout: Option<Duration>,
    pub prompt: TaskPrompt,
}

impl Task {
    pub fn new(name: impl Into<String>, prompt: TaskPrompt) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            prompt,
        }
    }
}

/// Closed set of states a [`TaskState`] may occupy. `Completed`, `Error`,
/// `Invalid`, and `Blocked` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Active,
    Paused,
    Blocked,
    Completed,
    Error,
    Invalid,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Error | TaskStatus::Invalid | TaskStatus::Blocked
        )
    }

    /// Map the first recognized word of a `<status>` block to a status.
    /// Unrecognized tokens map to `Invalid`.
    fn from_token(token: &str) -> TaskStatus {
        match token.trim().to_ascii_lowercase().as_str() {
            "active" => TaskStatus::Active,
            "paused" => TaskStatus::Paused,
            "completed" => TaskStatus::Completed,
            "blocked" => TaskStatus::Blocked,
            "error" => TaskStatus::Error,
            _ => TaskStatus::Invalid,
        }
    }
}

/// Mutable runtime record for a queued or active task. The publisher handle
/// for this task's event stream is owned by the actor's scheduling loop, not
/// stored here, so `TaskState` stays `Send` without a trait-object field.
#[derive(Debug, Clone)]
pub struct TaskState {
    pub task: Task,
    pub status: TaskStatus,
    pub messages: Vec<Message>,
    pub usage: Usage,
    pub paused: bool,
    pub started_at: Option<Instant>,
    pub last_status: String,
}

impl TaskState {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            status: TaskStatus::Queued,
            messages: Vec::new(),
            usage: Usage::default(),
            paused: false,
            started_at: None,
            last_status: String::new(),
        }
    }

    /// A task is fresh (never run) until it has accumulated messages.
    pub fn is_fresh(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Result of parsing `<status>…</status>`/`<think>…</think>` out of an
/// assistant's final text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub status: TaskStatus,
    pub thinking: Option<String>,
    pub text: String,
}

/// Parse the structured report out of assistant text. The status token is the
/// first word inside `<status>…</status>`; the visible text has both the
/// status and think blocks stripped. Absence of a `<status>` block yields
/// `TaskStatus::Invalid` with the whole input as text.
pub fn parse_structured_response(raw: &str) -> ParsedResponse {
    let (status, after_status) = match extract_tag(raw, "status") {
        Some((body, rest)) => {
            let token = body.split_whitespace().next().unwrap_or("");
            (TaskStatus::from_token(token), rest)
        }
        None => (TaskStatus::Invalid, raw.to_string()),
    };

    let (thinking, text) = match extract_tag(&after_status, "think") {
        Some((body, rest)) => (Some(body.trim().to_string()), rest),
        None => (None, after_status),
    };

    ParsedResponse {
        status,
        thinking,
        text: text.trim().to_string(),
    }
}

/// Remove the first `<tag>…</tag>` occurrence, returning its inner body and
/// the input with that occurrence excised.
fn extract_tag(input: &str, tag: &str) -> Option<(String, String)> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = input.find(&open)?;
    let body_start = start + open.len();
    let end = input[body_start..].find(&close)? + body_start;
    let body = input[body_start..end].to_string();
    let mut rest = String::with_capacity(input.len());
    rest.push_str(&input[..start]);
    rest.push_str(&input[end + close.len()..]);
    Some((body, rest))
}

/// Bounded, oldest-evicting history of terminal [`TaskState`]s, used to build
/// the recent-task summary prepended to fresh tasks.
#[derive(Debug, Clone, Default)]
pub struct RecentTaskRing {
    entries: VecDeque<TaskState>,
}

impl RecentTaskRing {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(RECENT_TASKS_CAPACITY),
        }
    }

    /// Push a terminal TaskState, evicting the oldest entry if full.
    pub fn push(&mut self, state: TaskState) {
        if self.entries.len() == RECENT_TASKS_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(state);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render a summary of the ring for prepending to a fresh task's first
    /// message: each entry truncated to ~8 words of title and ~10 words of
    /// output, overall summary clamped to 200 bytes. Byte-clamped, not
    /// token-bound: a coarse cap on system-prompt growth.
    pub fn summarize(&self) -> String {
        let mut lines = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let title = truncate_words(&entry.task.name, 8);
            let output = truncate_words(&entry.last_status, 10);
            lines.push(format!("- {title}: {output}"));
        }
        let joined = lines.join("\n");
        clamp_bytes(&joined, 200)
    }
}

fn truncate_words(s: &str, max_words: usize) -> String {
    let words: Vec<&str> = s.split_whitespace().take(max_words).collect();
    words.join(" ")
}

fn clamp_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Given a task's accumulated message count, pick the resume nudge to send
/// when re-activating a paused/blocked task: `continue` while history stays
/// under 32 messages, `finish-now` once it reaches the cap.
pub fn resume_nudge(history_len: usize) -> &'static str {
    if history_len < 32 {
        "continue"
    } else {
        "finish-now"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_and_think_and_strips_both() {
        let raw = "<status>paused</status> draft in progress <think>need a rhyme</think>";
        let parsed = parse_structured_response(raw);
        assert_eq!(parsed.status, TaskStatus::Paused);
        assert_eq!(parsed.thinking.as_deref(), Some("need a rhyme"));
        assert_eq!(parsed.text, "draft in progress");
    }

    #[test]
    fn unrecognized_status_token_maps_to_invalid() {
        let parsed = parse_structured_response("<status>sleeping</status> zzz");
        assert_eq!(parsed.status, TaskStatus::Invalid);
    }

    #[test]
    fn missing_status_block_maps_to_invalid_with_full_text() {
        let parsed = parse_structured_response("just some text");
        assert_eq!(parsed.status, TaskStatus::Invalid);
        assert_eq!(parsed.text, "just some text");
    }

    #[test]
    fn round_trip_is_stable() {
        let raw = "<status>completed</status> final poem <think>done</think>";
        let first = parse_structured_response(raw);
        let reencoded = format!(
            "<status>{:?}</status> {} <think>{}</think>",
            first.status,
            first.text,
            first.thinking.clone().unwrap_or_default()
        )
        .to_lowercase();
        let second = parse_structured_response(&reencoded);
        assert_eq!(first.status, second.status);
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn recent_task_ring_evicts_oldest_beyond_capacity() {
        let mut ring = RecentTaskRing::new();
        for i in 0..(RECENT_TASKS_CAPACITY + 3) {
            let mut state = TaskState::new(Task::new(format!("task-{i}"), TaskPrompt::new("x")));
            state.last_status = "done".to_string();
            ring.push(state);
        }
        assert_eq!(ring.len(), RECENT_TASKS_CAPACITY);
        assert_eq!(ring.entries[0].task.name, "task-3");
    }

    #[test]
    fn summary_is_clamped_to_200_bytes() {
        let mut ring = RecentTaskRing::new();
        for i in 0..RECENT_TASKS_CAPACITY {
            let mut state = TaskState::new(Task::new(
                format!("a very long task title number {i} with many words in it"),
                TaskPrompt::new("x"),
            ));
            state.last_status =
                "a very long output description with quite a few words attached".to_string();
            ring.push(state);
        }
        let summary = ring.summarize();
        assert!(summary.len() <= 200);
    }

    #[test]
    fn resume_nudge_switches_at_32_messages() {
        assert_eq!(resume_nudge(0), "continue");
        assert_eq!(resume_nudge(31), "continue");
        assert_eq!(resume_nudge(32), "finish-now");
        assert_eq!(resume_nudge(100), "finish-now");
    }
}
