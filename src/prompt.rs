//! System prompt assembler: renders an agent's identity, mode,
//! and optional response guidelines into the system prompt sent on every
//! turn.
//!
//! Grounded on `other_examples/8ac16540_bochaco-formicaio`'s
//! `build_system_prompt` string-builder style: a `String` grown with
//! `push_str` section by section rather than a templating crate, which this
//! dependency stack doesn't carry.

use std::time::{SystemTime, UNIX_EPOCH};

/// Which behavioral mode the rendered prompt targets. Only `Task` gets the
/// status/think vocabulary section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Chat,
    Task,
}

/// Inputs to [`render_system_prompt`]. Mirrors the subset of `AgentIdentity`
/// the prompt actually renders, so callers don't need to construct a whole
/// agent just to preview a prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptIdentity {
    pub name: Option<String>,
    pub goal: Option<String>,
    pub instructions: Option<String>,
    pub is_supervisor: bool,
    pub subordinates: Vec<String>,
}

/// Renders the system prompt. Deterministic given identical inputs, except
/// for the `Date and Time` section when `date_awareness` is enabled. A
/// caller comparing two renders for equality should disable it.
pub fn render_system_prompt(
    identity: &PromptIdentity,
    mode: PromptMode,
    response_guidelines: Option<&str>,
    date_awareness: bool,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("## About You\n\n");
    match &identity.name {
        Some(name) => prompt.push_str(&format!("You are {name}.\n")),
        None => prompt.push_str("You are an AI agent.\n"),
    }
    if let Some(goal) = &identity.goal {
        prompt.push_str(&format!("\n### Goal\n\n{goal}\n"));
    }
    if let Some(instructions) = &identity.instructions {
        prompt.push_str(&format!("\n### Instructions\n\n{instructions}\n"));
    }

    if identity.is_supervisor {
        prompt.push_str("\n## Teamwork\n\n");
        prompt.push_str("You can delegate work to the following teammates using the `assign_work` tool:\n");
        for name in &identity.subordinates {
            prompt.push_str(&format!("- {name}\n"));
        }
    }

    prompt.push_str("\n## Tools\n\n");
    prompt.push_str(
        "Prefer calling a tool over relying on prior knowledge whenever a tool can answer the question or perform the action.\n",
    );

    if mode == PromptMode::Task {
        prompt.push_str("\n## Status\n\n");
        prompt.push_str(
            "When you are done working on this turn, report your status by wrapping one of \
             active, paused, completed, blocked, error in <status></status> tags. You may \
             include your reasoning in <think></think> tags before the status tag.\n",
        );
    }

    if let Some(guidelines) = response_guidelines {
        if !guidelines.is_empty() {
            prompt.push_str("\n## Response Guidelines\n\n");
            prompt.push_str(guidelines);
            prompt.push('\n');
        }
    }

    if date_awareness {
        prompt.push_str("\n## Date and Time\n\n");
        prompt.push_str(&format!("The current date and time is {}.\n", format_now()));
    }

    prompt.trim().to_string()
}

/// Formats the current moment without a `chrono` dependency: Unix seconds
/// expressed as an ISO-8601-shaped UTC timestamp. Good enough for a model's
/// date awareness; not intended as a general-purpose formatter.
fn format_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_unix_seconds(secs)
}

fn format_unix_seconds(secs: u64) -> String {
    const SECONDS_PER_DAY: u64 = 86_400;
    let days_since_epoch = secs / SECONDS_PER_DAY;
    let time_of_day = secs % SECONDS_PER_DAY;
    let (hour, minute, second) = (time_of_day / 3600, (time_of_day / 60) % 60, time_of_day % 60);

    let (year, month, day) = civil_from_days(days_since_epoch as i64);
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Howard Hinnant's days-from-civil algorithm, inverted: converts a day
/// count since the Unix epoch into a (year, month, day) triple.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_minimal_chat_prompt() {
        let identity = PromptIdentity::default();
        let prompt = render_system_prompt(&identity, PromptMode::Chat, None, false);
        assert!(prompt.contains("About You"));
        assert!(prompt.contains("You are an AI agent."));
        assert!(!prompt.contains("Teamwork"));
        assert!(!prompt.contains("Status"));
        assert!(!prompt.contains("Date and Time"));
    }

    #[test]
    fn supervisor_gets_teamwork_section_listing_subordinates() {
        let identity = PromptIdentity {
            name: Some("Lead".to_string()),
            is_supervisor: true,
            subordinates: vec!["researcher".to_string(), "writer".to_string()],
            ..Default::default()
        };
        let prompt = render_system_prompt(&identity, PromptMode::Chat, None, false);
        assert!(prompt.contains("## Teamwork"));
        assert!(prompt.contains("researcher"));
        assert!(prompt.contains("writer"));
    }

    #[test]
    fn task_mode_declares_status_vocabulary() {
        let identity = PromptIdentity::default();
        let prompt = render_system_prompt(&identity, PromptMode::Task, None, false);
        assert!(prompt.contains("<status>"));
        assert!(prompt.contains("<think>"));
        assert!(prompt.contains("blocked"));
    }

    #[test]
    fn date_awareness_appends_date_section() {
        let identity = PromptIdentity::default();
        let prompt = render_system_prompt(&identity, PromptMode::Chat, None, true);
        assert!(prompt.contains("## Date and Time"));
    }

    #[test]
    fn is_trimmed_and_deterministic_without_date_awareness() {
        let identity = PromptIdentity {
            name: Some("Assistant".to_string()),
            goal: Some("Help users".to_string()),
            ..Default::default()
        };
        let a = render_system_prompt(&identity, PromptMode::Chat, None, false);
        let b = render_system_prompt(&identity, PromptMode::Chat, None, false);
        assert_eq!(a, b);
        assert_eq!(a, a.trim());
    }

    #[test]
    fn civil_from_days_matches_known_epoch_date() {
        // 2024-01-01 is 19723 days after 1970-01-01.
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
    }
}
