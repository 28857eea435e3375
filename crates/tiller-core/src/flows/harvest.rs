//! Harvest previously suggested tasks out of the Log's potential-tasks
//! blocks: keep them in place, reject them with strikethrough, or move
//! them into the Tasks document.
//!
//! This is the markdown-scanning half of the task pipeline — it never sees
//! generation output. Every mutation targets the byte spans recovered at
//! parse time, so duplicate text elsewhere in the Log is never touched.

use crate::flows::{ParseOutcome, CONTEXT_LOOKBACK_LINES};
use crate::markers::{self, EntryHeader};
use crate::proposal::{action_for, Selection, SelectionAction};
use crate::section::{self, LineSpan};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestTask {
    /// Selection id, unique across all blocks in one parse.
    pub id: usize,
    /// Line index within the Log.
    pub line: usize,
    pub text: String,
    pub done: bool,
    pub struck: bool,
}

impl HarvestTask {
    /// Open and not already rejected.
    pub fn actionable(&self) -> bool {
        !self.done && !self.struck
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBlock {
    /// Start marker line through end marker line, half-open.
    pub span: LineSpan,
    /// Heading line immediately above the start marker, if one introduces
    /// the block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_heading: Option<usize>,
    /// Nearest preceding entry header within the lookback window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryHeader>,
    /// Nearest preceding date heading within the lookback window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub tasks: Vec<HarvestTask>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Scan the Log for potential-tasks blocks, recovering exact line spans and
/// provenance. An unterminated block is malformed input, reported without
/// panicking.
pub fn parse(log: &str) -> ParseOutcome<TaskBlock> {
    let (lines, _) = section::split_lines(log);
    let mut blocks = Vec::new();
    let mut next_id = 0usize;
    let mut i = 0usize;

    while i < lines.len() {
        if !markers::is_task_block_start(lines[i]) {
            i += 1;
            continue;
        }
        let Some(end_offset) = lines[i + 1..]
            .iter()
            .position(|l| markers::is_task_block_end(l))
        else {
            return ParseOutcome::failed(format!(
                "unterminated potential-tasks block at line {}",
                i + 1
            ));
        };
        let end = i + 1 + end_offset;

        let mut tasks = Vec::new();
        for (offset, line) in lines[i + 1..end].iter().enumerate() {
            if let Some(cb) = markers::parse_checkbox(line) {
                tasks.push(HarvestTask {
                    id: next_id,
                    line: i + 1 + offset,
                    text: cb.text.to_string(),
                    done: cb.done,
                    struck: markers::is_struck(cb.text),
                });
                next_id += 1;
            }
        }

        blocks.push(TaskBlock {
            span: LineSpan::new(i, end + 1),
            intro_heading: intro_heading(&lines, i),
            entry: lookback(&lines, i, markers::parse_entry_header),
            date: lookback(&lines, i, markers::parse_date_heading),
            tasks,
        });
        i = end + 1;
    }

    ParseOutcome::ok(blocks)
}

/// Heading line immediately above `start`, with only blank lines between.
fn intro_heading(lines: &[&str], start: usize) -> Option<usize> {
    let mut i = start;
    while i > 0 {
        i -= 1;
        if lines[i].trim().is_empty() {
            continue;
        }
        return markers::heading(lines[i]).map(|_| i);
    }
    None
}

/// Nearest line above `from` (within the lookback window) that `recognize`
/// accepts. Provenance recovery without a strict document grammar.
fn lookback<T>(lines: &[&str], from: usize, recognize: fn(&str) -> Option<T>) -> Option<T> {
    let floor = from.saturating_sub(CONTEXT_LOOKBACK_LINES);
    lines[floor..from]
        .iter()
        .rev()
        .find_map(|l| recognize(l))
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestOutput {
    pub log: String,
    pub tasks: String,
    pub moved: usize,
    pub rejected: usize,
}

pub const DESTINATION_SECTION: &str = "Potential Future Tasks";

/// Apply harvest selections. Keep leaves a task untouched; Reject strikes
/// only the text portion in place; Move removes the line and appends the
/// task under "Potential Future Tasks" in the Tasks document. A block left
/// with no task lines is removed whole, markers and intro heading included.
pub fn apply(
    log: &str,
    tasks_doc: &str,
    blocks: &[TaskBlock],
    selections: &[Selection],
) -> HarvestOutput {
    let (lines, trailing) = section::split_lines(log);
    let mut edited: Vec<Option<String>> = lines.iter().map(|l| Some(l.to_string())).collect();
    let mut moved_texts: Vec<String> = Vec::new();
    let mut rejected = 0usize;

    for block in blocks {
        for task in &block.tasks {
            if task.line >= lines.len() {
                continue;
            }
            match action_for(selections, task.id) {
                Some(SelectionAction::Move) if task.actionable() => {
                    edited[task.line] = None;
                    moved_texts.push(task.text.clone());
                }
                Some(SelectionAction::Reject) if task.actionable() => {
                    let cb = markers::parse_checkbox(lines[task.line]);
                    let indent = cb.as_ref().map(|c| c.indent).unwrap_or("");
                    let mark = if task.done { "x" } else { " " };
                    edited[task.line] = Some(format!(
                        "{indent}- [{mark}] {}",
                        markers::strike(&task.text)
                    ));
                    rejected += 1;
                }
                _ => {}
            }
        }

        // Whole-block removal once no task lines remain inside the markers.
        let task_lines_left = (block.span.start + 1..block.span.end.saturating_sub(1))
            .filter(|i| {
                edited
                    .get(*i)
                    .and_then(|l| l.as_deref())
                    .map(|l| markers::parse_checkbox(l).is_some())
                    .unwrap_or(false)
            })
            .count();
        if task_lines_left == 0 && !block.tasks.is_empty() {
            for slot in edited
                .iter_mut()
                .take(block.span.end)
                .skip(block.span.start)
            {
                *slot = None;
            }
            if let Some(h) = block.intro_heading {
                if heading_only_introduces_block(&lines, h, block.span) {
                    for slot in edited.iter_mut().take(block.span.start).skip(h) {
                        *slot = None;
                    }
                }
            }
            absorb_blank_neighbor(&mut edited, block.span);
        }
    }

    let remaining: Vec<&str> = edited.iter().flatten().map(String::as_str).collect();
    let new_log = section::join_lines(&remaining, trailing);

    let moved = moved_texts.len();
    let new_tasks = if moved_texts.is_empty() {
        tasks_doc.to_string()
    } else {
        let items: Vec<String> = moved_texts
            .iter()
            .map(|t| markers::render_checkbox(false, t))
            .collect();
        section::append_to_section(tasks_doc, DESTINATION_SECTION, 2, &items)
    };

    HarvestOutput {
        log: new_log,
        tasks: new_tasks,
        moved,
        rejected,
    }
}

/// True when nothing but blank lines sits between the heading and the
/// block, and nothing but blanks follows the block before the next heading
/// or entry header — the heading exists solely to introduce the block.
fn heading_only_introduces_block(lines: &[&str], heading_line: usize, span: LineSpan) -> bool {
    if lines[heading_line + 1..span.start]
        .iter()
        .any(|l| !l.trim().is_empty())
    {
        return false;
    }
    for line in &lines[span.end..] {
        if line.trim().is_empty() {
            continue;
        }
        return markers::heading(line).is_some() || markers::parse_entry_header(line).is_some();
    }
    true
}

/// Removing a block can leave two adjacent blank lines; drop one so the
/// document stays tidy without rewriting untouched regions.
fn absorb_blank_neighbor(edited: &mut [Option<String>], span: LineSpan) {
    let before_blank = edited[..span.start]
        .iter()
        .rev()
        .flatten()
        .next()
        .map(|l| l.trim().is_empty());
    let after_idx = (span.end..edited.len()).find(|i| edited[*i].is_some());
    match (before_blank, after_idx) {
        (Some(true), Some(i)) if edited[i].as_deref().map(|l| l.trim().is_empty()) == Some(true) => {
            edited[i] = None;
        }
        (Some(true), None) => {
            // Block was at EOF; drop the now-trailing blank line.
            if let Some(i) = (0..span.start).rev().find(|i| edited[*i].is_some()) {
                if edited[i].as_deref().map(|l| l.trim().is_empty()) == Some(true) {
                    edited[i] = None;
                }
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "## 2026-08-14\n\n10:45am - Importer debugging\n\nFound the retry bug.\n\n<!-- AI: potential-tasks start -->\n- [ ] T1\n- [ ] T2\n- [ ] T3\n<!-- AI: potential-tasks end -->\n\n2:30pm - Planning\n\nNotes here.\n";

    const TASKS: &str = "# Tasks\n\n## Active\n\n- [ ] Existing\n";

    #[test]
    fn parse_recovers_span_and_provenance() {
        let outcome = parse(LOG);
        assert!(outcome.success);
        assert_eq!(outcome.entities.len(), 1);
        let block = &outcome.entities[0];
        assert_eq!(block.span, LineSpan::new(6, 11));
        assert_eq!(block.tasks.len(), 3);
        assert_eq!(block.tasks[1].text, "T2");
        assert_eq!(block.entry.as_ref().unwrap().time, "10:45am");
        assert_eq!(block.date.unwrap().to_string(), "2026-08-14");
        assert!(block.intro_heading.is_none());
    }

    #[test]
    fn parse_is_idempotent() {
        let a = parse(LOG);
        let b = parse(LOG);
        assert_eq!(a.entities, b.entities);
    }

    #[test]
    fn parse_unterminated_block_fails_cleanly() {
        let log = "<!-- AI: potential-tasks start -->\n- [ ] dangling\n";
        let outcome = parse(log);
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("unterminated"));
    }

    #[test]
    fn parse_ignores_content_outside_blocks() {
        let log = "- [ ] not in a block\n\n10:45am\nplain text\n";
        let outcome = parse(log);
        assert!(outcome.success);
        assert!(outcome.is_empty());
    }

    #[test]
    fn parse_lookback_window_bounds_provenance() {
        let mut log = String::from("## 2026-01-01\n");
        for _ in 0..CONTEXT_LOOKBACK_LINES + 5 {
            log.push_str("filler\n");
        }
        log.push_str("<!-- AI: potential-tasks start -->\n- [ ] far\n<!-- AI: potential-tasks end -->\n");
        let outcome = parse(&log);
        assert!(outcome.entities[0].date.is_none());
    }

    #[test]
    fn keep_all_is_noop() {
        let outcome = parse(LOG);
        let selections: Vec<Selection> = outcome.entities[0]
            .tasks
            .iter()
            .map(|t| Selection::new(t.id, SelectionAction::Keep))
            .collect();
        let out = apply(LOG, TASKS, &outcome.entities, &selections);
        assert_eq!(out.log, LOG);
        assert_eq!(out.tasks, TASKS);
        assert_eq!(out.moved, 0);
    }

    #[test]
    fn selective_rejection_strikes_text_only() {
        let outcome = parse(LOG);
        let selections = vec![Selection::new(
            outcome.entities[0].tasks[1].id,
            SelectionAction::Reject,
        )];
        let out = apply(LOG, TASKS, &outcome.entities, &selections);
        assert!(out.log.contains("- [ ] ~~T2~~"));
        assert!(out.log.contains("- [ ] T1"));
        assert!(out.log.contains("- [ ] T3"));
        // Actionable tasks remain, so the markers stay.
        assert!(out.log.contains(markers::TASK_BLOCK_START));
        assert!(out.log.contains(markers::TASK_BLOCK_END));
        assert_eq!(out.rejected, 1);
    }

    #[test]
    fn move_appends_to_tasks_document() {
        let outcome = parse(LOG);
        let selections = vec![Selection::new(
            outcome.entities[0].tasks[0].id,
            SelectionAction::Move,
        )];
        let out = apply(LOG, TASKS, &outcome.entities, &selections);
        assert!(!out.log.contains("- [ ] T1"));
        assert!(out.log.contains("- [ ] T2"));
        assert!(out.tasks.contains("## Potential Future Tasks"));
        assert!(out.tasks.contains("- [ ] T1"));
        assert_eq!(out.moved, 1);
    }

    #[test]
    fn whole_block_removal() {
        let log = "10:45am - Entry\n\n#### Potential tasks\n\n<!-- AI: potential-tasks start -->\n- [ ] Only task\n<!-- AI: potential-tasks end -->\n\n2:30pm - Next\n\nMore notes.\n";
        let outcome = parse(log);
        assert_eq!(outcome.entities[0].intro_heading, Some(2));
        let selections = vec![Selection::new(
            outcome.entities[0].tasks[0].id,
            SelectionAction::Move,
        )];
        let out = apply(log, "", &outcome.entities, &selections);
        assert!(!out.log.contains("Only task"));
        assert!(!out.log.contains(markers::TASK_BLOCK_START));
        assert!(!out.log.contains(markers::TASK_BLOCK_END));
        assert!(!out.log.contains("Potential tasks"));
        assert_eq!(out.log, "10:45am - Entry\n\n2:30pm - Next\n\nMore notes.\n");
    }

    #[test]
    fn intro_heading_kept_when_section_has_other_content() {
        let log = "#### Potential tasks\n\n<!-- AI: potential-tasks start -->\n- [ ] Only task\n<!-- AI: potential-tasks end -->\n\nNotes under the same heading.\n";
        let outcome = parse(log);
        let selections = vec![Selection::new(
            outcome.entities[0].tasks[0].id,
            SelectionAction::Move,
        )];
        let out = apply(log, "", &outcome.entities, &selections);
        assert!(out.log.contains("#### Potential tasks"));
        assert!(out.log.contains("Notes under the same heading."));
        assert!(!out.log.contains(markers::TASK_BLOCK_START));
    }

    #[test]
    fn rejecting_every_task_keeps_markers() {
        let outcome = parse(LOG);
        let selections: Vec<Selection> = outcome.entities[0]
            .tasks
            .iter()
            .map(|t| Selection::new(t.id, SelectionAction::Reject))
            .collect();
        let out = apply(LOG, TASKS, &outcome.entities, &selections);
        // Struck lines are still task lines; the block stays.
        assert!(out.log.contains(markers::TASK_BLOCK_START));
        assert!(out.log.contains("~~T1~~"));
        assert!(out.log.contains("~~T3~~"));
    }

    #[test]
    fn round_trip_preserves_existing_items() {
        let outcome = parse(LOG);
        let selections: Vec<Selection> = outcome.entities[0]
            .tasks
            .iter()
            .map(|t| Selection::new(t.id, SelectionAction::Move))
            .collect();
        let tasks_doc = "## Potential Future Tasks\n\n- [ ] Old one\n";
        let out = apply(LOG, tasks_doc, &outcome.entities, &selections);
        let section = section::find_section(&out.tasks, DESTINATION_SECTION, 2).unwrap();
        let (lines, _) = section::split_lines(&out.tasks);
        let items: Vec<&str> = lines[section.body.start..section.body.end]
            .iter()
            .filter(|l| !l.trim().is_empty())
            .copied()
            .collect();
        assert_eq!(
            items,
            vec!["- [ ] Old one", "- [ ] T1", "- [ ] T2", "- [ ] T3"]
        );
    }

    #[test]
    fn unknown_selection_ids_ignored() {
        let outcome = parse(LOG);
        let selections = vec![Selection::new(999, SelectionAction::Move)];
        let out = apply(LOG, TASKS, &outcome.entities, &selections);
        assert_eq!(out.log, LOG);
        assert_eq!(out.tasks, TASKS);
    }

    #[test]
    fn struck_tasks_are_not_movable() {
        let log = "<!-- AI: potential-tasks start -->\n- [ ] ~~already rejected~~\n- [ ] live\n<!-- AI: potential-tasks end -->\n";
        let outcome = parse(log);
        assert!(outcome.entities[0].tasks[0].struck);
        let selections = vec![Selection::new(
            outcome.entities[0].tasks[0].id,
            SelectionAction::Move,
        )];
        let out = apply(log, "", &outcome.entities, &selections);
        assert_eq!(out.log, log);
        assert_eq!(out.moved, 0);
    }
}
