//! Extract candidate tasks from the Log narrative (AI-backed) and write
//! them back as machine-owned potential-tasks blocks under the entries
//! they came from.

use crate::flows::response;
use crate::flows::ParseOutcome;
use crate::markers;
use crate::proposal::{action_for, Selection, SelectionAction};
use crate::section;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CandidateTask
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTask {
    pub id: usize,
    /// Entry header time (`HH:MMam/pm`) this task was inferred from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_time: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse the generation response into candidate tasks. JSON first (an array
/// of objects or strings, possibly under a `tasks` key), bullet lines as a
/// fallback. Never fails on malformed input.
pub fn parse_response(raw: &str) -> ParseOutcome<CandidateTask> {
    if raw.trim().is_empty() {
        return ParseOutcome::failed("empty response");
    }

    let mut entities = Vec::new();

    if let Some(value) = response::extract_json(raw) {
        if let Some(items) = response::array_of(&value, &["tasks", "items", "candidates"]) {
            for item in items {
                let text = match item {
                    serde_json::Value::String(s) if !s.trim().is_empty() => {
                        s.trim().to_string()
                    }
                    _ => match response::string_field(item, &["task", "text", "title"]) {
                        Some(t) => t,
                        None => continue,
                    },
                };
                entities.push(CandidateTask {
                    id: entities.len(),
                    entry_time: response::string_field(item, &["entry", "time", "entry_time"]),
                    text,
                    reasoning: response::string_field(item, &["reasoning", "why", "reason"]),
                });
            }
            return ParseOutcome::ok(entities);
        }
    }

    for text in response::bullet_lines(raw) {
        entities.push(CandidateTask {
            id: entities.len(),
            entry_time: None,
            text,
            reasoning: None,
        });
    }
    ParseOutcome::ok(entities)
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Insert one potential-tasks block per Log entry for the kept candidates.
/// Entries that already carry a block before the next entry header are left
/// alone, so re-applying never duplicates markers.
pub fn apply(log: &str, entities: &[CandidateTask], selections: &[Selection]) -> String {
    let kept: Vec<&CandidateTask> = entities
        .iter()
        .filter(|t| {
            matches!(
                action_for(selections, t.id),
                Some(SelectionAction::Keep) | Some(SelectionAction::Accept)
            )
        })
        .collect();
    if kept.is_empty() {
        return log.to_string();
    }

    let (lines, trailing) = section::split_lines(log);

    // Entry header line indexes, in document order.
    let headers: Vec<(usize, String)> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, l)| markers::parse_entry_header(l).map(|h| (i, h.time)))
        .collect();

    // Group kept tasks by target entry. Tasks with no recognizable entry
    // attach to the last entry; with no entries at all, to the document end.
    let mut groups: Vec<(Option<usize>, Vec<&CandidateTask>)> = Vec::new();
    for task in kept {
        let target = task
            .entry_time
            .as_deref()
            .and_then(|time| headers.iter().find(|(_, t)| t == time).map(|(i, _)| *i))
            .or_else(|| headers.last().map(|(i, _)| *i));
        match groups.iter_mut().find(|(line, _)| *line == target) {
            Some((_, tasks)) => tasks.push(task),
            None => groups.push((target, vec![task])),
        }
    }

    // Drop groups whose entry already has a block before the next header.
    groups.retain(|(target, _)| match target {
        Some(header_line) => !entry_has_block(&lines, *header_line),
        None => !lines.iter().any(|l| markers::is_task_block_start(l)),
    });
    if groups.is_empty() {
        return log.to_string();
    }

    // Insert bottom-up so earlier line indexes stay valid.
    groups.sort_by_key(|(target, _)| std::cmp::Reverse(target.unwrap_or(lines.len())));

    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    for (target, tasks) in groups {
        let insert_at = match target {
            Some(header_line) => header_line + 1,
            None => out.len(),
        };
        let mut block = Vec::with_capacity(tasks.len() + 2);
        block.push(markers::TASK_BLOCK_START.to_string());
        for task in tasks {
            block.push(markers::render_checkbox(false, &task.text));
        }
        block.push(markers::TASK_BLOCK_END.to_string());
        out.splice(insert_at..insert_at, block);
    }

    let refs: Vec<&str> = out.iter().map(String::as_str).collect();
    section::join_lines(&refs, trailing || log.is_empty())
}

/// True when a potential-tasks block already opens between this entry
/// header and the next one (or the end of the document).
fn entry_has_block(lines: &[&str], header_line: usize) -> bool {
    for line in lines.iter().skip(header_line + 1) {
        if markers::parse_entry_header(line).is_some() {
            return false;
        }
        if markers::is_task_block_start(line) {
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

    const LOG: &str = "## 2026-08-14\n\n10:45am - Importer debugging\n\nFound the retry bug.\n\n2:30pm - Planning\n\nSketched the export flow.\n";

    fn keep_all(entities: &[CandidateTask]) -> Vec<Selection> {
        entities
            .iter()
            .map(|t| Selection::new(t.id, SelectionAction::Keep))
            .collect()
    }

    #[test]
    fn parse_json_array() {
        let raw = r#"[{"task": "Fix retry backoff", "entry": "10:45am", "reasoning": "mentioned bug"}]"#;
        let outcome = parse_response(raw);
        assert!(outcome.success);
        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.entities[0].text, "Fix retry backoff");
        assert_eq!(outcome.entities[0].entry_time.as_deref(), Some("10:45am"));
    }

    #[test]
    fn parse_object_with_tasks_key() {
        let raw = r#"{"tasks": ["One", "Two"]}"#;
        let outcome = parse_response(raw);
        assert_eq!(outcome.entities.len(), 2);
        assert_eq!(outcome.entities[1].id, 1);
    }

    #[test]
    fn parse_bullet_fallback() {
        let outcome = parse_response("I suggest:\n- Write docs\n- Add tests\n");
        assert!(outcome.success);
        assert_eq!(outcome.entities.len(), 2);
        assert!(outcome.entities[0].entry_time.is_none());
    }

    #[test]
    fn parse_empty_is_failure() {
        let outcome = parse_response("   ");
        assert!(!outcome.success);
        assert!(outcome.is_empty());
    }

    #[test]
    fn parse_prose_yields_nothing() {
        let outcome = parse_response("Nothing actionable in this log.");
        assert!(outcome.success);
        assert!(outcome.is_empty());
    }

    #[test]
    fn parse_is_deterministic() {
        let raw = r#"{"tasks": [{"task": "A"}, {"task": "B"}]}"#;
        let a = parse_response(raw);
        let b = parse_response(raw);
        assert_eq!(a.entities, b.entities);
    }

    #[test]
    fn apply_inserts_block_under_entry() {
        let entities = vec![CandidateTask {
            id: 0,
            entry_time: Some("10:45am".to_string()),
            text: "Fix retry backoff".to_string(),
            reasoning: None,
        }];
        let out = apply(LOG, &entities, &keep_all(&entities));
        let expected = "## 2026-08-14\n\n10:45am - Importer debugging\n<!-- AI: potential-tasks start -->\n- [ ] Fix retry backoff\n<!-- AI: potential-tasks end -->\n\nFound the retry bug.\n\n2:30pm - Planning\n\nSketched the export flow.\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn apply_skips_entry_with_existing_block() {
        let entities = vec![CandidateTask {
            id: 0,
            entry_time: Some("10:45am".to_string()),
            text: "Fix retry backoff".to_string(),
            reasoning: None,
        }];
        let once = apply(LOG, &entities, &keep_all(&entities));
        let twice = apply(&once, &entities, &keep_all(&entities));
        assert_eq!(once, twice);
        assert_eq!(
            twice.matches(markers::TASK_BLOCK_START).count(),
            1,
            "no duplicate markers"
        );
    }

    #[test]
    fn apply_unknown_time_attaches_to_last_entry() {
        let entities = vec![CandidateTask {
            id: 0,
            entry_time: Some("11:59pm".to_string()),
            text: "Orphan".to_string(),
            reasoning: None,
        }];
        let out = apply(LOG, &entities, &keep_all(&entities));
        let planning = out.find("2:30pm - Planning").unwrap();
        let block = out.find(markers::TASK_BLOCK_START).unwrap();
        assert!(block > planning);
    }

    #[test]
    fn apply_no_entries_appends_at_end() {
        let log = "Just prose, no entries.\n";
        let entities = vec![CandidateTask {
            id: 0,
            entry_time: None,
            text: "Something".to_string(),
            reasoning: None,
        }];
        let out = apply(log, &entities, &keep_all(&entities));
        assert!(out.ends_with(
            "<!-- AI: potential-tasks start -->\n- [ ] Something\n<!-- AI: potential-tasks end -->\n"
        ));
    }

    #[test]
    fn apply_without_selections_is_noop() {
        let entities = vec![CandidateTask {
            id: 0,
            entry_time: None,
            text: "Unconfirmed".to_string(),
            reasoning: None,
        }];
        assert_eq!(apply(LOG, &entities, &[]), LOG);
    }

    #[test]
    fn apply_rejected_candidates_omitted() {
        let entities = vec![
            CandidateTask {
                id: 0,
                entry_time: Some("10:45am".to_string()),
                text: "Wanted".to_string(),
                reasoning: None,
            },
            CandidateTask {
                id: 1,
                entry_time: Some("10:45am".to_string()),
                text: "Unwanted".to_string(),
                reasoning: None,
            },
        ];
        let selections = vec![
            Selection::new(0, SelectionAction::Keep),
            Selection::new(1, SelectionAction::Reject),
        ];
        let out = apply(LOG, &entities, &selections);
        assert!(out.contains("- [ ] Wanted"));
        assert!(!out.contains("Unwanted"));
    }
}
