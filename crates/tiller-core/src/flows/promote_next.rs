//! Promote tasks from the "Next Up" pool into "Active". Non-AI: the pool
//! is parsed straight from the Tasks document. An empty pool and an
//! already-populated destination are reported as distinct statuses; the
//! caller decides what to do with `already_active`, nothing is silently
//! skipped here.

use crate::flows::ParseOutcome;
use crate::markers;
use crate::proposal::{action_for, Selection, SelectionAction};
use crate::section::{self, LineSpan};
use serde::{Deserialize, Serialize};

pub const SOURCE_SECTION: &str = "Next Up";
pub const DESTINATION_SECTION: &str = "Active";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoteStatus {
    NoTasks,
    AlreadyActive,
    Proposed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTask {
    pub id: usize,
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotePool {
    pub status: PromoteStatus,
    pub tasks: Vec<PoolTask>,
    /// Open tasks already sitting in the destination.
    pub active_count: usize,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Read the promotion pool out of the Tasks document. Always one entity.
pub fn parse(tasks_doc: &str) -> ParseOutcome<PromotePool> {
    let (lines, _) = section::split_lines(tasks_doc);

    let tasks = open_in_section(&lines, SOURCE_SECTION);
    let active_count = open_in_section(&lines, DESTINATION_SECTION).len();

    let status = if tasks.is_empty() {
        PromoteStatus::NoTasks
    } else if active_count > 0 {
        PromoteStatus::AlreadyActive
    } else {
        PromoteStatus::Proposed
    };

    ParseOutcome::ok(vec![PromotePool {
        status,
        tasks,
        active_count,
    }])
}

fn open_in_section(lines: &[&str], title: &str) -> Vec<PoolTask> {
    let Some(sec) = section::find_section_in(lines, title, 2) else {
        return Vec::new();
    };
    let mut tasks = Vec::new();
    for i in sec.body.start..sec.body.end {
        if let Some(cb) = markers::parse_checkbox(lines[i]) {
            if !cb.done && !markers::is_struck(cb.text) {
                tasks.push(PoolTask {
                    id: tasks.len(),
                    line: i,
                    text: cb.text.to_string(),
                });
            }
        }
    }
    tasks
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Apply promotion selections: Current moves a task into "Active",
/// Discard removes it outright, Later leaves it in the pool.
pub fn apply(tasks_doc: &str, pool: &PromotePool, selections: &[Selection]) -> String {
    let mut removals: Vec<LineSpan> = Vec::new();
    let mut promoted: Vec<String> = Vec::new();

    for task in &pool.tasks {
        match action_for(selections, task.id) {
            Some(SelectionAction::Current) => {
                removals.push(LineSpan::new(task.line, task.line + 1));
                promoted.push(markers::render_checkbox(false, &task.text));
            }
            Some(SelectionAction::Discard) => {
                removals.push(LineSpan::new(task.line, task.line + 1));
            }
            _ => {}
        }
    }

    // Append first: destination lies above the source in document order is
    // not guaranteed, so work on stable line indexes by removing last only
    // when the destination insert cannot shift pool lines... it can. Remove
    // by span on the original, then append to the result instead.
    let without = section::remove_spans(tasks_doc, &removals);
    if promoted.is_empty() {
        return without;
    }
    section::append_to_section(&without, DESTINATION_SECTION, 2, &promoted)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
