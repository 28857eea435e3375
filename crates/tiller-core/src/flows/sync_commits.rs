//! Match recent commits against open tasks. Matches are proposals only:
//! the applier annotates a task with the commit that touched it, and never
//! completes or removes anything.

use crate::flows::response;
use crate::flows::ParseOutcome;
use crate::markers;
use crate::proposal::{action_for, Selection, SelectionAction};
use crate::section;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    fn from_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" | "med" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// CommitMatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitMatch {
    pub id: usize,
    pub commit_id: String,
    pub message: String,
    pub task_text: String,
    /// Line of the matched open task in the Tasks document.
    pub task_line: usize,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse the generation response into commit matches anchored to open
/// tasks. Matches naming a completed task, a struck task, or no task at
/// all are dropped here — completed work is never a match candidate.
pub fn parse(raw: &str, tasks_doc: &str) -> ParseOutcome<CommitMatch> {
    if raw.trim().is_empty() {
        return ParseOutcome::failed("empty response");
    }
    let Some(value) = response::extract_json(raw) else {
        return ParseOutcome::empty();
    };
    let Some(items) = response::array_of(&value, &["matches", "items", "commits"]) else {
        return ParseOutcome::empty();
    };

    let open = open_tasks(tasks_doc);
    let mut entities = Vec::new();
    for item in items {
        let Some(commit_id) = response::string_field(item, &["commit", "commit_id", "id"]) else {
            continue;
        };
        let Some(task_text) = response::string_field(item, &["task", "task_text"]) else {
            continue;
        };
        let Some(task_line) = match_open_task(&open, &task_text) else {
            continue;
        };
        entities.push(CommitMatch {
            id: entities.len(),
            commit_id,
            message: response::string_field(item, &["message", "commit_message"])
                .unwrap_or_default(),
            task_text,
            task_line,
            confidence: response::string_field(item, &["confidence"])
                .map(|c| Confidence::from_loose(&c))
                .unwrap_or(Confidence::Low),
            reasoning: response::string_field(item, &["reasoning", "why", "reason"]),
        });
    }
    ParseOutcome::ok(entities)
}

/// Open, unstruck checkbox lines: (line, text).
fn open_tasks(tasks_doc: &str) -> Vec<(usize, String)> {
    let (lines, _) = section::split_lines(tasks_doc);
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, l)| {
            let cb = markers::parse_checkbox(l)?;
            if cb.done || markers::is_struck(cb.text) {
                return None;
            }
            Some((i, cb.text.to_string()))
        })
        .collect()
}

fn match_open_task(open: &[(usize, String)], task_text: &str) -> Option<usize> {
    let needle = task_text.trim();
    open.iter()
        .find(|(_, text)| text == needle)
        .or_else(|| open.iter().find(|(_, text)| text.contains(needle)))
        .map(|(line, _)| *line)
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Annotate accepted matches under their task line:
/// `  - commit <id>: <message>`. Idempotent per commit id — a task already
/// annotated with that commit is left alone.
pub fn apply(tasks_doc: &str, entities: &[CommitMatch], selections: &[Selection]) -> String {
    let mut accepted: Vec<&CommitMatch> = entities
        .iter()
        .filter(|m| {
            matches!(
                action_for(selections, m.id),
                Some(SelectionAction::Accept) | Some(SelectionAction::Keep)
            )
        })
        .collect();
    if accepted.is_empty() {
        return tasks_doc.to_string();
    }

    let (lines, trailing) = section::split_lines(tasks_doc);
    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();

    // Bottom-up so line indexes stay valid across insertions.
    accepted.sort_by_key(|m| std::cmp::Reverse(m.task_line));
    for m in accepted {
        if m.task_line >= lines.len() {
            continue;
        }
        if already_annotated(&lines, m.task_line, &m.commit_id) {
            continue;
        }
        let indent = markers::parse_checkbox(lines[m.task_line])
            .map(|cb| cb.indent.to_string())
            .unwrap_or_default();
        let annotation = format!("{indent}  - commit {}: {}", m.commit_id, m.message);
        out.insert(m.task_line + 1, annotation);
    }

    let refs: Vec<&str> = out.iter().map(String::as_str).collect();
    section::join_lines(&refs, trailing)
}

/// Check the task's indented sub-lines for an existing annotation with
/// this commit id.
fn already_annotated(lines: &[&str], task_line: usize, commit_id: &str) -> bool {
    let task_indent = markers::parse_checkbox(lines[task_line])
        .map(|cb| cb.indent.len())
        .unwrap_or(0);
    let needle = format!("commit {commit_id}:");
    for line in lines.iter().skip(task_line + 1) {
        let indent = line.len() - line.trim_start().len();
        if line.trim().is_empty() || indent <= task_indent {
            return false;
        }
        if line.contains(&needle) {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TASKS: &str = "# Tasks\n\n## Active\n\n- [ ] Fix webhook retries\n- [x] Fix webhook logging\n- [ ] Ship CSV export\n";

    #[test]
    fn parse_anchors_to_open_task() {
        let raw = r#"{"matches": [
            {"commit": "a1b2c3d", "message": "retry webhooks with backoff", "task": "Fix webhook retries", "confidence": "high", "reasoning": "same wording"}
        ]}"#;
        let outcome = parse(raw, TASKS);
        assert!(outcome.success);
        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.entities[0].task_line, 4);
        assert_eq!(outcome.entities[0].confidence, Confidence::High);
    }

    #[test]
    fn completed_task_never_matches() {
        // The completed task is textually closer, but only the open task is
        // a candidate.
        let raw = r#"{"matches": [
            {"commit": "a1b2c3d", "message": "fix logging", "task": "Fix webhook logging", "confidence": "high"}
        ]}"#;
        let outcome = parse(raw, TASKS);
        assert!(outcome.success);
        assert!(outcome.is_empty());
    }

    #[test]
    fn unknown_task_dropped() {
        let raw = r#"{"matches": [{"commit": "abc", "message": "m", "task": "Invented task"}]}"#;
        let outcome = parse(raw, TASKS);
        assert!(outcome.is_empty());
    }

    #[test]
    fn malformed_response_is_not_a_crash() {
        assert!(!parse("", TASKS).success);
        assert!(parse("no structure here", TASKS).is_empty());
        assert!(parse(r#"{"matches": "not an array"}"#, TASKS).is_empty());
    }

    #[test]
    fn apply_annotates_under_task() {
        let raw = r#"{"matches": [
            {"commit": "a1b2c3d", "message": "retry webhooks with backoff", "task": "Fix webhook retries", "confidence": "high"}
        ]}"#;
        let outcome = parse(raw, TASKS);
        let selections = vec![Selection::new(0, SelectionAction::Accept)];
        let out = apply(TASKS, &outcome.entities, &selections);
        assert!(out.contains(
            "- [ ] Fix webhook retries\n  - commit a1b2c3d: retry webhooks with backoff\n"
        ));
        // The task itself is annotated, never completed.
        assert!(!out.contains("- [x] Fix webhook retries"));
    }

    #[test]
    fn apply_is_idempotent_per_commit() {
        let raw = r#"{"matches": [
            {"commit": "a1b2c3d", "message": "retry webhooks with backoff", "task": "Fix webhook retries"}
        ]}"#;
        let outcome = parse(raw, TASKS);
        let selections = vec![Selection::new(0, SelectionAction::Accept)];
        let once = apply(TASKS, &outcome.entities, &selections);

        let reparsed = parse(raw, &once);
        let twice = apply(&once, &reparsed.entities, &selections);
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_without_selection_is_noop() {
        let raw = r#"{"matches": [{"commit": "abc", "message": "m", "task": "Ship CSV export"}]}"#;
        let outcome = parse(raw, TASKS);
        assert_eq!(apply(TASKS, &outcome.entities, &[]), TASKS);
    }

    #[test]
    fn apply_multiple_matches_bottom_up() {
        let raw = r#"{"matches": [
            {"commit": "aaa1111", "message": "retries", "task": "Fix webhook retries"},
            {"commit": "bbb2222", "message": "export", "task": "Ship CSV export"}
        ]}"#;
        let outcome = parse(raw, TASKS);
        let selections = vec![
            Selection::new(0, SelectionAction::Accept),
            Selection::new(1, SelectionAction::Accept),
        ];
        let out = apply(TASKS, &outcome.entities, &selections);
        assert!(out.contains("- [ ] Fix webhook retries\n  - commit aaa1111: retries"));
        assert!(out.contains("- [ ] Ship CSV export\n  - commit bbb2222: export"));
    }
}
