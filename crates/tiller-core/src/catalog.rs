//! Static registry of workflow definitions. Pure data: names, declared
//! read/write document sets, risk and confirmation levels, the instruction
//! text handed to the text-generation collaborator, and step lists for
//! combined workflows. Validated once at engine construction; a combined
//! step that does not resolve is fatal there, never at run time.

use crate::docs::DocFile;
use crate::error::{Result, TillerError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Risk / Confirmation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    None,
    Preview,
    Confirm,
}

// ---------------------------------------------------------------------------
// WorkflowFamily
// ---------------------------------------------------------------------------

/// Closed enum over the parser/applier families. Selecting a family is an
/// exhaustive match everywhere it is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowFamily {
    PotentialTasks,
    Harvest,
    IdeasGroom,
    SyncCommits,
    ArchiveCompleted,
    PromoteNext,
    Enrich,
    PlanWork,
    InitSummary,
}

impl WorkflowFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowFamily::PotentialTasks => "potential_tasks",
            WorkflowFamily::Harvest => "harvest",
            WorkflowFamily::IdeasGroom => "ideas_groom",
            WorkflowFamily::SyncCommits => "sync_commits",
            WorkflowFamily::ArchiveCompleted => "archive_completed",
            WorkflowFamily::PromoteNext => "promote_next",
            WorkflowFamily::Enrich => "enrich",
            WorkflowFamily::PlanWork => "plan_work",
            WorkflowFamily::InitSummary => "init_summary",
        }
    }
}

impl fmt::Display for WorkflowFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkflowDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDefinition {
    pub name: &'static str,
    pub display_name: &'static str,
    pub reads: &'static [DocFile],
    pub writes: &'static [DocFile],
    pub risk: Risk,
    pub confirmation: Confirmation,
    pub allows_delete: bool,
    pub allows_cross_file_move: bool,
    pub uses_ai: bool,
    /// Parser/applier family for single workflows; `None` for combined.
    pub family: Option<WorkflowFamily>,
    /// Constituent step names, in order, for combined workflows.
    pub combined_steps: &'static [&'static str],
    /// Natural-language rules handed verbatim to the text-generation
    /// collaborator as the instruction for this workflow.
    pub rules: &'static str,
    /// Document this workflow edits in a dedicated context, if any.
    pub focused_file: Option<DocFile>,
    /// Whether the workflow needs upfront free-text input from the user.
    pub needs_input: bool,
}

impl WorkflowDefinition {
    pub fn is_combined(&self) -> bool {
        !self.combined_steps.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

fn definitions() -> Vec<WorkflowDefinition> {
    use DocFile::*;
    vec![
        WorkflowDefinition {
            name: "potential-tasks",
            display_name: "Extract potential tasks",
            reads: &[Log],
            writes: &[Log],
            risk: Risk::Low,
            confirmation: Confirmation::Confirm,
            allows_delete: false,
            allows_cross_file_move: false,
            uses_ai: true,
            family: Some(WorkflowFamily::PotentialTasks),
            combined_steps: &[],
            rules: "Read the log entries and list concrete follow-up tasks \
                    the author implied but did not capture. One task per \
                    item, imperative mood, no duplicates of tasks already \
                    present in a potential-tasks block.",
            focused_file: None,
            needs_input: false,
        },
        WorkflowDefinition {
            name: "harvest",
            display_name: "Harvest suggested tasks",
            reads: &[Log, Tasks],
            writes: &[Log, Tasks],
            risk: Risk::Medium,
            confirmation: Confirmation::Confirm,
            allows_delete: true,
            allows_cross_file_move: true,
            uses_ai: false,
            family: Some(WorkflowFamily::Harvest),
            combined_steps: &[],
            rules: "",
            focused_file: None,
            needs_input: false,
        },
        WorkflowDefinition {
            name: "ideas-groom",
            display_name: "Groom the idea bin",
            reads: &[Ideas, Tasks],
            writes: &[Ideas, Tasks],
            risk: Risk::High,
            confirmation: Confirmation::Confirm,
            allows_delete: true,
            allows_cross_file_move: true,
            uses_ai: true,
            family: Some(WorkflowFamily::IdeasGroom),
            combined_steps: &[],
            rules: "For each idea, judge whether it is still worth keeping. \
                    Verdicts: discard (stale or superseded), current (ready \
                    to become a task now), later (keep in the bin). Give a \
                    one-line reason per verdict.",
            focused_file: None,
            needs_input: false,
        },
        WorkflowDefinition {
            name: "sync-commits",
            display_name: "Match commits to tasks",
            reads: &[Tasks],
            writes: &[Tasks],
            risk: Risk::Low,
            confirmation: Confirmation::Preview,
            allows_delete: false,
            allows_cross_file_move: false,
            uses_ai: true,
            family: Some(WorkflowFamily::SyncCommits),
            combined_steps: &[],
            rules: "Match recent commits against the open tasks. Only match \
                    open tasks, never completed ones. Rate each match high, \
                    medium, or low confidence and explain the match in one \
                    line. Matches annotate tasks; they never complete them.",
            focused_file: None,
            needs_input: false,
        },
        WorkflowDefinition {
            name: "archive-completed",
            display_name: "Archive completed tasks",
            reads: &[Tasks, Archive],
            writes: &[Tasks, Archive],
            risk: Risk::Medium,
            confirmation: Confirmation::Confirm,
            allows_delete: true,
            allows_cross_file_move: true,
            uses_ai: false,
            family: Some(WorkflowFamily::ArchiveCompleted),
            combined_steps: &[],
            rules: "",
            focused_file: None,
            needs_input: false,
        },
        WorkflowDefinition {
            name: "promote-next",
            display_name: "Promote next tasks",
            reads: &[Tasks],
            writes: &[Tasks],
            risk: Risk::Low,
            confirmation: Confirmation::Confirm,
            allows_delete: true,
            allows_cross_file_move: false,
            uses_ai: false,
            family: Some(WorkflowFamily::PromoteNext),
            combined_steps: &[],
            rules: "",
            focused_file: None,
            needs_input: false,
        },
        WorkflowDefinition {
            name: "enrich",
            display_name: "Enrich task descriptions",
            reads: &[Tasks, Overview],
            writes: &[Tasks],
            risk: Risk::Low,
            confirmation: Confirmation::Preview,
            allows_delete: false,
            allows_cross_file_move: false,
            uses_ai: true,
            family: Some(WorkflowFamily::Enrich),
            combined_steps: &[],
            rules: "For each open task that is a bare title, write one \
                    sentence of elaboration: the concrete outcome that marks \
                    it done. Include a confidence score from 0 to 1.",
            focused_file: None,
            needs_input: false,
        },
        WorkflowDefinition {
            name: "plan-work",
            display_name: "Plan a unit of work",
            reads: &[Overview, Roadmap, Tasks],
            writes: &[Tasks],
            risk: Risk::Medium,
            confirmation: Confirmation::Confirm,
            allows_delete: false,
            allows_cross_file_move: false,
            uses_ai: true,
            family: Some(WorkflowFamily::PlanWork),
            combined_steps: &[],
            rules: "Break the stated goal into 3-7 concrete tasks. If the \
                    goal maps onto a roadmap slice, name the slice. Tasks \
                    must be independently completable and verifiable.",
            focused_file: None,
            needs_input: true,
        },
        WorkflowDefinition {
            name: "init-summary",
            display_name: "Draft the overview summary",
            reads: &[Overview, Roadmap],
            writes: &[Overview],
            risk: Risk::Low,
            confirmation: Confirmation::Confirm,
            allows_delete: false,
            allows_cross_file_move: false,
            uses_ai: true,
            family: Some(WorkflowFamily::InitSummary),
            combined_steps: &[],
            rules: "Write a 3-5 sentence summary of the project for the \
                    overview document: what it is, who it is for, and where \
                    it currently stands.",
            focused_file: Some(Overview),
            needs_input: false,
        },
        WorkflowDefinition {
            name: "sync-session",
            display_name: "Sync session",
            reads: &[Tasks, Archive],
            writes: &[Tasks, Archive],
            risk: Risk::Medium,
            confirmation: Confirmation::Confirm,
            allows_delete: true,
            allows_cross_file_move: true,
            uses_ai: true,
            family: None,
            combined_steps: &["sync-commits", "archive-completed", "promote-next"],
            rules: "",
            focused_file: None,
            needs_input: false,
        },
        WorkflowDefinition {
            name: "groom-backlog",
            display_name: "Groom backlog",
            reads: &[Log, Tasks, Ideas],
            writes: &[Log, Tasks, Ideas],
            risk: Risk::High,
            confirmation: Confirmation::Confirm,
            allows_delete: true,
            allows_cross_file_move: true,
            uses_ai: true,
            family: None,
            combined_steps: &["potential-tasks", "harvest", "ideas-groom"],
            rules: "",
            focused_file: None,
            needs_input: false,
        },
    ]
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub struct Catalog {
    defs: Vec<WorkflowDefinition>,
}

impl Catalog {
    /// Build and validate the registry. Validation failures are
    /// configuration errors and should terminate startup.
    pub fn new() -> Result<Self> {
        let catalog = Self {
            defs: definitions(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    #[cfg(test)]
    pub(crate) fn from_defs(defs: Vec<WorkflowDefinition>) -> Self {
        Self { defs }
    }

    pub fn get(&self, name: &str) -> Result<&WorkflowDefinition> {
        self.defs
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| TillerError::WorkflowNotFound(name.to_string()))
    }

    /// All definitions in declaration order.
    pub fn all(&self) -> &[WorkflowDefinition] {
        &self.defs
    }

    pub fn validate(&self) -> Result<()> {
        for def in &self.defs {
            if def.is_combined() {
                for step in def.combined_steps {
                    let resolved = self.defs.iter().find(|d| d.name == *step);
                    match resolved {
                        None => {
                            return Err(TillerError::UnknownStep {
                                combined: def.name.to_string(),
                                step: step.to_string(),
                            })
                        }
                        Some(target) if target.is_combined() => {
                            return Err(TillerError::InvalidDefinition(
                                def.name.to_string(),
                                format!("step '{step}' is itself a combined workflow"),
                            ))
                        }
                        Some(_) => {}
                    }
                }
            } else if def.family.is_none() {
                return Err(TillerError::InvalidDefinition(
                    def.name.to_string(),
                    "single workflow without a family".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
