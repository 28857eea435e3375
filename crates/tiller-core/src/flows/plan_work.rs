//! Turn a free-form work description into concrete tasks. The human's
//! instruction goes out with Overview, Roadmap, and Tasks as context; the
//! response comes back as a plan whose accepted tasks land in "Next Up".

use crate::flows::response;
use crate::flows::ParseOutcome;
use crate::markers::{self, SliceRef};
use crate::proposal::{action_for, Selection, SelectionAction};
use crate::section;
use serde::{Deserialize, Serialize};

pub const DESTINATION_SECTION: &str = "Next Up";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub id: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPlan {
    /// Roadmap slice the plan targets, when the response names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice: Option<SliceRef>,
    pub tasks: Vec<PlannedTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse the generation response into a work plan. JSON first; a bullet
/// list of tasks is accepted as a fallback.
pub fn parse(raw: &str) -> ParseOutcome<WorkPlan> {
    if raw.trim().is_empty() {
        return ParseOutcome::failed("empty response");
    }

    if let Some(value) = response::extract_json(raw) {
        let items = response::array_of(&value, &["tasks", "items", "plan"]);
        let mut tasks = Vec::new();
        if let Some(items) = items {
            for item in items {
                let text = match item {
                    serde_json::Value::String(s) => {
                        let t = s.trim();
                        if t.is_empty() {
                            continue;
                        }
                        t.to_string()
                    }
                    _ => match response::string_field(item, &["task", "text", "title"]) {
                        Some(t) => t,
                        None => continue,
                    },
                };
                tasks.push(PlannedTask {
                    id: tasks.len(),
                    text,
                });
            }
        }
        if !tasks.is_empty() {
            let slice = response::string_field(&value, &["slice", "roadmap_slice"])
                .and_then(|s| markers::parse_slice_link(&s));
            return ParseOutcome::ok(vec![WorkPlan {
                slice,
                tasks,
                notes: response::string_field(&value, &["notes", "summary"]),
            }]);
        }
    }

    let bullets = response::bullet_lines(raw);
    if bullets.is_empty() {
        return ParseOutcome::empty();
    }
    let tasks = bullets
        .into_iter()
        .enumerate()
        .map(|(id, text)| PlannedTask { id, text })
        .collect();
    ParseOutcome::ok(vec![WorkPlan {
        slice: None,
        tasks,
        notes: None,
    }])
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Append accepted planned tasks to "Next Up" as open checkboxes, suffixed
/// with the plan's slice link when one is present.
pub fn apply(tasks_doc: &str, plan: &WorkPlan, selections: &[Selection]) -> String {
    let mut items: Vec<String> = Vec::new();
    for task in &plan.tasks {
        if !matches!(
            action_for(selections, task.id),
            Some(SelectionAction::Accept) | Some(SelectionAction::Keep)
        ) {
            continue;
        }
        let text = match &plan.slice {
            Some(slice) => format!("{} {}", task.text, slice.link()),
            None => task.text.clone(),
        };
        items.push(markers::render_checkbox(false, &text));
    }
    if items.is_empty() {
        return tasks_doc.to_string();
    }
    section::append_to_section(tasks_doc, DESTINATION_SECTION, 2, &items)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TASKS: &str = "# Tasks\n\n## Next Up\n\n- [ ] Existing task\n";

    const RAW: &str = r#"{
        "slice": "[[Roadmap#VS2 — Billing]]",
        "tasks": [
            {"task": "Model invoices"},
            {"task": "Wire up payment provider"},
            "Add usage metering"
        ],
        "notes": "Start with the data model."
    }"#;

    #[test]
    fn parse_plan_with_slice() {
        let outcome = parse(RAW);
        assert!(outcome.success);
        let plan = &outcome.entities[0];
        assert_eq!(plan.slice.as_ref().unwrap().heading(), "VS2 — Billing");
        assert_eq!(plan.tasks.len(), 3);
        assert_eq!(plan.tasks[2].text, "Add usage metering");
        assert_eq!(plan.notes.as_deref(), Some("Start with the data model."));
    }

    #[test]
    fn parse_bullet_fallback() {
        let outcome = parse("Here's a plan:\n- First step\n- Second step\n");
        let plan = &outcome.entities[0];
        assert!(plan.slice.is_none());
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].text, "First step");
    }

    #[test]
    fn parse_prose_yields_nothing() {
        let outcome = parse("I would need more detail to plan this.");
        assert!(outcome.success);
        assert!(outcome.is_empty());
    }

    #[test]
    fn apply_appends_accepted_with_slice_link() {
        let outcome = parse(RAW);
        let selections = vec![
            Selection::new(0, SelectionAction::Accept),
            Selection::new(2, SelectionAction::Accept),
        ];
        let out = apply(TASKS, &outcome.entities[0], &selections);
        assert!(out.contains("- [ ] Model invoices [[Roadmap#VS2 — Billing]]"));
        assert!(out.contains("- [ ] Add usage metering [[Roadmap#VS2 — Billing]]"));
        assert!(!out.contains("Wire up payment provider"));
        assert!(out.contains("- [ ] Existing task"));
    }

    #[test]
    fn apply_without_slice_leaves_text_bare() {
        let outcome = parse("- Just do it\n");
        let out = apply(
            TASKS,
            &outcome.entities[0],
            &[Selection::new(0, SelectionAction::Accept)],
        );
        assert!(out.contains("- [ ] Just do it\n"));
        assert!(!out.contains("Just do it [["));
    }

    #[test]
    fn apply_no_selections_is_noop() {
        let outcome = parse(RAW);
        assert_eq!(apply(TASKS, &outcome.entities[0], &[]), TASKS);
    }
}
