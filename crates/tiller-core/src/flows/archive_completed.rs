//! Move completed tasks out of the Tasks document into the Archive,
//! grouped by roadmap slice. Tasks without a resolvable slice link land in
//! the fixed "Completed Tasks" bucket. Existing destination headings are
//! reused, never duplicated.

use crate::flows::ParseOutcome;
use crate::markers::{self, SliceRef};
use crate::proposal::{action_for, Selection, SelectionAction};
use crate::section::{self, LineSpan};
use serde::{Deserialize, Serialize};

pub const STANDALONE_HEADING: &str = "Completed Tasks";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub id: usize,
    /// Line index within the Tasks document.
    pub line: usize,
    /// Full task text, slice link included.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveGroup {
    /// `None` is the standalone bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice: Option<SliceRef>,
    pub tasks: Vec<CompletedTask>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Collect `- [x]` tasks and group them by slice link, slice groups in
/// first-appearance order, the standalone bucket last. Zero completed
/// tasks is a successful empty outcome — callers report it as "nothing to
/// archive", distinct from a parse failure.
pub fn parse(tasks_doc: &str) -> ParseOutcome<ArchiveGroup> {
    let (lines, _) = section::split_lines(tasks_doc);
    let mut groups: Vec<ArchiveGroup> = Vec::new();
    let mut standalone: Vec<CompletedTask> = Vec::new();
    let mut next_id = 0usize;

    for (i, line) in lines.iter().enumerate() {
        let Some(cb) = markers::parse_checkbox(line) else {
            continue;
        };
        if !cb.done || markers::is_struck(cb.text) {
            continue;
        }
        let task = CompletedTask {
            id: next_id,
            line: i,
            text: cb.text.to_string(),
        };
        next_id += 1;

        match markers::parse_slice_link(cb.text) {
            Some(slice) => {
                match groups
                    .iter_mut()
                    .find(|g| g.slice.as_ref() == Some(&slice))
                {
                    Some(group) => group.tasks.push(task),
                    None => groups.push(ArchiveGroup {
                        slice: Some(slice),
                        tasks: vec![task],
                    }),
                }
            }
            None => standalone.push(task),
        }
    }

    if !standalone.is_empty() {
        groups.push(ArchiveGroup {
            slice: None,
            tasks: standalone,
        });
    }
    ParseOutcome::ok(groups)
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveOutput {
    pub tasks: String,
    pub archive: String,
    pub archived: usize,
}

/// Apply archive selections: remove archived tasks from the Tasks document
/// by span and append them to the Archive under their group heading. Skip
/// leaves a task where it is.
pub fn apply(
    tasks_doc: &str,
    archive_doc: &str,
    groups: &[ArchiveGroup],
    selections: &[Selection],
) -> ArchiveOutput {
    let mut removals: Vec<LineSpan> = Vec::new();
    let mut archive = archive_doc.to_string();
    let mut archived = 0usize;

    for group in groups {
        let mut items: Vec<String> = Vec::new();
        for task in &group.tasks {
            if !matches!(
                action_for(selections, task.id),
                Some(SelectionAction::Archive) | Some(SelectionAction::Move)
            ) {
                continue;
            }
            removals.push(LineSpan::new(task.line, task.line + 1));
            // Under a slice heading the link is redundant; strip it there.
            let text = match &group.slice {
                Some(_) => markers::strip_slice_links(&task.text),
                None => task.text.clone(),
            };
            items.push(markers::render_checkbox(true, &text));
            archived += 1;
        }
        if items.is_empty() {
            continue;
        }
        let heading = match &group.slice {
            Some(slice) => slice.heading(),
            None => STANDALONE_HEADING.to_string(),
        };
        archive = section::append_to_section(&archive, &heading, 3, &items);
    }

    ArchiveOutput {
        tasks: section::remove_spans(tasks_doc, &removals),
        archive,
        archived,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TASKS: &str = "# Tasks\n\n## Active\n\n- [x] Login form [[Roadmap#VS1 — Auth]]\n- [ ] Session refresh [[Roadmap#VS1 — Auth]]\n- [x] Token rotation [[Roadmap#VS1 — Auth]]\n- [x] Fix flaky CI job\n";

    fn archive_all(groups: &[ArchiveGroup]) -> Vec<Selection> {
        groups
            .iter()
            .flat_map(|g| g.tasks.iter())
            .map(|t| Selection::new(t.id, SelectionAction::Archive))
            .collect()
    }

    #[test]
    fn parse_groups_by_slice() {
        let outcome = parse(TASKS);
        assert!(outcome.success);
        assert_eq!(outcome.entities.len(), 2);

        let auth = &outcome.entities[0];
        assert_eq!(auth.slice.as_ref().unwrap().heading(), "VS1 — Auth");
        assert_eq!(auth.tasks.len(), 2);

        let standalone = &outcome.entities[1];
        assert!(standalone.slice.is_none());
        assert_eq!(standalone.tasks.len(), 1);
        assert_eq!(standalone.tasks[0].text, "Fix flaky CI job");
    }

    #[test]
    fn parse_skips_open_tasks() {
        let outcome = parse(TASKS);
        let all: Vec<&str> = outcome
            .entities
            .iter()
            .flat_map(|g| g.tasks.iter())
            .map(|t| t.text.as_str())
            .collect();
        assert!(!all.iter().any(|t| t.contains("Session refresh")));
    }

    #[test]
    fn parse_zero_completed_is_empty_success() {
        let outcome = parse("# Tasks\n\n- [ ] Everything still open\n");
        assert!(outcome.success);
        assert!(outcome.is_empty());
    }

    #[test]
    fn archive_all_moves_and_groups() {
        let outcome = parse(TASKS);
        let out = apply(TASKS, "# Archive\n", &outcome.entities, &archive_all(&outcome.entities));

        // Source: all three completed tasks gone, open task stays.
        assert!(!out.tasks.contains("- [x]"));
        assert!(out.tasks.contains("- [ ] Session refresh"));
        assert_eq!(out.archived, 3);

        // Destination: exactly one heading per group.
        assert_eq!(out.archive.matches("### VS1 — Auth").count(), 1);
        assert_eq!(out.archive.matches("### Completed Tasks").count(), 1);
        assert!(out.archive.contains("- [x] Login form"));
        assert!(out.archive.contains("- [x] Token rotation"));
        assert!(out.archive.contains("- [x] Fix flaky CI job"));
        // Slice link stripped under the slice heading.
        assert!(!out.archive.contains("[[Roadmap#VS1 — Auth]]"));
    }

    #[test]
    fn existing_heading_reused() {
        let archive = "# Archive\n\n### VS1 — Auth\n\n- [x] Old item\n";
        let outcome = parse(TASKS);
        let out = apply(TASKS, archive, &outcome.entities, &archive_all(&outcome.entities));
        assert_eq!(out.archive.matches("### VS1 — Auth").count(), 1);
        assert!(out.archive.contains("- [x] Old item"));
        assert!(out.archive.contains("- [x] Login form"));
    }

    #[test]
    fn skip_leaves_task_in_place() {
        let outcome = parse(TASKS);
        let standalone_id = outcome.entities[1].tasks[0].id;
        let mut selections = archive_all(&outcome.entities);
        selections.retain(|s| s.id != standalone_id);
        selections.push(Selection::new(standalone_id, SelectionAction::Skip));

        let out = apply(TASKS, "", &outcome.entities, &selections);
        assert!(out.tasks.contains("- [x] Fix flaky CI job"));
        assert!(!out.archive.contains("Fix flaky CI job"));
        assert_eq!(out.archived, 2);
    }

    #[test]
    fn no_selections_is_noop() {
        let outcome = parse(TASKS);
        let out = apply(TASKS, "# Archive\n", &outcome.entities, &[]);
        assert_eq!(out.tasks, TASKS);
        assert_eq!(out.archive, "# Archive\n");
    }
}
