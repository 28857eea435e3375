//! Enrich open tasks with AI-proposed elaborations. The applier only adds
//! an indented bullet under the task; the task line itself is never edited.

use crate::flows::response;
use crate::flows::ParseOutcome;
use crate::markers;
use crate::proposal::{action_for, Selection, SelectionAction};
use crate::section;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub id: usize,
    pub task_text: String,
    pub elaboration: String,
    /// Model-reported confidence in [0, 1]; out-of-range values clamp.
    pub confidence: f32,
    /// Line of the matching open task in the Tasks document. Unanchored
    /// enrichments are shown but never applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_line: Option<usize>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse the generation response into enrichments anchored to open tasks.
pub fn parse(raw: &str, tasks_doc: &str) -> ParseOutcome<Enrichment> {
    if raw.trim().is_empty() {
        return ParseOutcome::failed("empty response");
    }
    let Some(value) = response::extract_json(raw) else {
        return ParseOutcome::empty();
    };
    let Some(items) = response::array_of(&value, &["enrichments", "tasks", "items"]) else {
        return ParseOutcome::empty();
    };

    let open = open_tasks(tasks_doc);
    let mut entities = Vec::new();
    for item in items {
        let Some(task_text) = response::string_field(item, &["task", "task_text", "text"]) else {
            continue;
        };
        let Some(elaboration) =
            response::string_field(item, &["elaboration", "detail", "description"])
        else {
            continue;
        };
        let confidence = response::f64_field(item, &["confidence"])
            .map(|c| c.clamp(0.0, 1.0) as f32)
            .unwrap_or(0.0);
        entities.push(Enrichment {
            id: entities.len(),
            task_line: match_open_task(&open, &task_text),
            task_text,
            elaboration,
            confidence,
        });
    }
    ParseOutcome::ok(entities)
}

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

/// Insert accepted elaborations as indented bullets under their task.
/// Idempotent: a task already followed by this elaboration text is left
/// alone.
pub fn apply(tasks_doc: &str, entities: &[Enrichment], selections: &[Selection]) -> String {
    let mut accepted: Vec<&Enrichment> = entities
        .iter()
        .filter(|e| {
            e.task_line.is_some()
                && matches!(
                    action_for(selections, e.id),
                    Some(SelectionAction::Accept) | Some(SelectionAction::Keep)
                )
        })
        .collect();
    if accepted.is_empty() {
        return tasks_doc.to_string();
    }

    let (lines, trailing) = section::split_lines(tasks_doc);
    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();

    accepted.sort_by_key(|e| std::cmp::Reverse(e.task_line));
    for e in accepted {
        let line = e.task_line.unwrap_or(usize::MAX);
        if line >= lines.len() {
            continue;
        }
        if already_elaborated(&lines, line, &e.elaboration) {
            continue;
        }
        let indent = markers::parse_checkbox(lines[line])
            .map(|cb| cb.indent.to_string())
            .unwrap_or_default();
        out.insert(line + 1, format!("{indent}  - {}", e.elaboration));
    }

    let refs: Vec<&str> = out.iter().map(String::as_str).collect();
    section::join_lines(&refs, trailing)
}

fn already_elaborated(lines: &[&str], task_line: usize, elaboration: &str) -> bool {
    let task_indent = markers::parse_checkbox(lines[task_line])
        .map(|cb| cb.indent.len())
        .unwrap_or(0);
    for line in lines.iter().skip(task_line + 1) {
        let indent = line.len() - line.trim_start().len();
        if line.trim().is_empty() || indent <= task_indent {
            return false;
        }
        if line.trim().trim_start_matches("- ").trim() == elaboration.trim() {
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

    const TASKS: &str = "# Tasks\n\n## Next Up\n\n- [ ] Add rate limiting\n- [x] Write release notes\n- [ ] Migrate billing tables\n";

    const RAW: &str = r#"{"enrichments": [
        {"task": "Add rate limiting", "elaboration": "Token bucket per API key, 429 with Retry-After", "confidence": 0.9},
        {"task": "Migrate billing tables", "elaboration": "Dual-write first, backfill, then cut over", "confidence": 0.7}
    ]}"#;

    #[test]
    fn parse_anchors_to_open_tasks() {
        let outcome = parse(RAW, TASKS);
        assert!(outcome.success);
        assert_eq!(outcome.entities.len(), 2);
        assert_eq!(outcome.entities[0].task_line, Some(4));
        assert!((outcome.entities[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(outcome.entities[1].task_line, Some(6));
    }

    #[test]
    fn parse_completed_task_unanchored() {
        let raw = r#"[{"task": "Write release notes", "elaboration": "x", "confidence": 1.0}]"#;
        let outcome = parse(raw, TASKS);
        assert_eq!(outcome.entities.len(), 1);
        assert!(outcome.entities[0].task_line.is_none());
    }

    #[test]
    fn parse_clamps_confidence() {
        let raw = r#"[{"task": "Add rate limiting", "elaboration": "x", "confidence": 3.5}]"#;
        let outcome = parse(raw, TASKS);
        assert_eq!(outcome.entities[0].confidence, 1.0);
    }

    #[test]
    fn apply_inserts_elaboration_bullet() {
        let outcome = parse(RAW, TASKS);
        let selections = vec![Selection::new(0, SelectionAction::Accept)];
        let out = apply(TASKS, &outcome.entities, &selections);
        assert!(out.contains(
            "- [ ] Add rate limiting\n  - Token bucket per API key, 429 with Retry-After\n"
        ));
        // The second enrichment was not accepted.
        assert!(!out.contains("Dual-write"));
    }

    #[test]
    fn apply_is_idempotent() {
        let outcome = parse(RAW, TASKS);
        let selections = vec![
            Selection::new(0, SelectionAction::Accept),
            Selection::new(1, SelectionAction::Accept),
        ];
        let once = apply(TASKS, &outcome.entities, &selections);

        let reparsed = parse(RAW, &once);
        let twice = apply(&once, &reparsed.entities, &selections);
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_skip_and_unanchored_are_noops() {
        let outcome = parse(RAW, TASKS);
        assert_eq!(
            apply(TASKS, &outcome.entities, &[Selection::new(0, SelectionAction::Skip)]),
            TASKS
        );

        let raw = r#"[{"task": "Invented", "elaboration": "x", "confidence": 1.0}]"#;
        let unanchored = parse(raw, TASKS);
        assert_eq!(
            apply(TASKS, &unanchored.entities, &[Selection::new(0, SelectionAction::Accept)]),
            TASKS
        );
    }
}
