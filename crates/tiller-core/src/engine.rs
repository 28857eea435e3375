//! Workflow lifecycle: start, suspend on a collaborator, ingest the
//! response, apply confirmed selections, drive combined sequences.
//!
//! All state is owned by the `Engine` value: at most one pending proposal
//! set and at most one combined workflow per engine, no globals. Starting
//! any workflow invalidates whatever was pending before.

use crate::catalog::{Catalog, WorkflowDefinition, WorkflowFamily};
use crate::config::ProjectConfig;
use crate::docs::{DocFile, DocumentStore};
use crate::error::{Result, TillerError};
use crate::flows::{
    archive_completed, enrich, harvest, ideas_groom, init_summary, plan_work, potential_tasks,
    promote_next, sync_commits,
};
use crate::proposal::{PendingProposals, ProposalSet, Selection};
use crate::stepper::{CombinedState, StepSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// ExecutionMode
// ---------------------------------------------------------------------------

/// How a workflow is driven once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Parses project documents directly; proposals are ready immediately.
    NonAi,
    /// Sequences other workflows through the stepper.
    Combined,
    /// Standard AI flow, but the result lands in one dedicated document.
    FocusedFile,
    /// Needs free-text input from the user before generation.
    InputModal,
    /// Instruction + context out, proposals parsed from the response.
    StandardAi,
}

pub fn execution_mode(def: &WorkflowDefinition) -> ExecutionMode {
    if def.is_combined() {
        ExecutionMode::Combined
    } else if !def.uses_ai {
        ExecutionMode::NonAi
    } else if def.needs_input {
        ExecutionMode::InputModal
    } else if def.focused_file.is_some() {
        ExecutionMode::FocusedFile
    } else {
        ExecutionMode::StandardAi
    }
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// What `start` hands back; each variant names the next move.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowStart {
    /// Proposals were parsed directly; confirm with `apply` or `cancel`.
    PendingReady { workflow: String, count: usize },
    /// The workflow ran its parser and found nothing to propose.
    Nothing { workflow: String, status: String },
    /// Hand `instruction` + `context` to the text generator, then call
    /// `ingest_response`.
    NeedsGeneration { instruction: String, context: String },
    /// Collect free-text input from the user, then call `provide_input`.
    NeedsInput { workflow: String },
    /// A combined workflow is initialized; drive it with `next_step`.
    CombinedStarted { workflow: String, total_steps: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Response held no usable entities. Routine, never an error.
    NothingFound { reason: String },
    /// Pending proposals installed; confirm with `apply` or `cancel`.
    Proposals { workflow: String, count: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub workflow: String,
    pub written: Vec<DocFile>,
    /// Selections that named a known entity.
    pub applied: usize,
    /// Selections referencing unknown entity ids, ignored by the applier.
    pub ignored: usize,
}

/// One turn of a combined workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step's precondition failed; already advanced past it.
    Skipped { workflow: String, reason: String },
    PendingReady { workflow: String, count: usize },
    Nothing { workflow: String, status: String },
    NeedsGeneration { instruction: String, context: String },
    /// Every step is done; combined state has been cleared.
    Finished(StepSummary),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    catalog: Catalog,
    config: ProjectConfig,
    pending: Option<PendingProposals>,
    combined: Option<CombinedState>,
    /// Workflow awaiting a generation response (or user input).
    awaiting: Option<(String, WorkflowFamily)>,
}

impl Engine {
    pub fn new(config: ProjectConfig) -> Result<Self> {
        Ok(Self {
            catalog: Catalog::new()?,
            config,
            pending: None,
            combined: None,
            awaiting: None,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn pending(&self) -> Option<&PendingProposals> {
        self.pending.as_ref()
    }

    pub fn combined_state(&self) -> Option<&CombinedState> {
        self.combined.as_ref()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start a workflow by catalog name. Any pending proposals, awaited
    /// response, or combined workflow from before is discarded first.
    pub fn start(&mut self, name: &str, store: &dyn DocumentStore) -> Result<WorkflowStart> {
        self.invalidate("starting a new workflow");
        self.combined = None;

        let def = self.catalog.get(name)?;
        info!(workflow = name, mode = ?execution_mode(def), "workflow started");

        match execution_mode(def) {
            ExecutionMode::Combined => {
                let workflow = def.name.to_string();
                let state = CombinedState::init(def)?;
                let total_steps = state.steps.len();
                self.combined = Some(state);
                Ok(WorkflowStart::CombinedStarted {
                    workflow,
                    total_steps,
                })
            }
            ExecutionMode::InputModal => {
                self.awaiting = Some((def.name.to_string(), required_family(def)?));
                Ok(WorkflowStart::NeedsInput {
                    workflow: def.name.to_string(),
                })
            }
            _ => self.begin_single(def.name.to_string(), store),
        }
    }

    /// Drop all transient state. Documents are never touched.
    pub fn cancel(&mut self) {
        self.invalidate("cancelled");
        self.combined = None;
    }

    /// Supply the free-text input an InputModal workflow asked for. Returns
    /// the generation request with the input folded into the instruction.
    pub fn provide_input(
        &mut self,
        input: &str,
        store: &dyn DocumentStore,
    ) -> Result<WorkflowStart> {
        let Some((name, _)) = self.awaiting.clone() else {
            return Err(TillerError::NotAwaitingResponse);
        };
        let def = self.catalog.get(&name)?;
        if !def.needs_input {
            return Err(TillerError::NotAwaitingResponse);
        }
        let context = build_context(store, def.reads, None)?;
        Ok(WorkflowStart::NeedsGeneration {
            instruction: format!("{}\n\nGoal: {}", def.rules, input.trim()),
            context,
        })
    }

    /// Feed the text-generation response back in. Only valid while a
    /// workflow is awaiting one.
    pub fn ingest_response(
        &mut self,
        raw: &str,
        store: &dyn DocumentStore,
    ) -> Result<IngestOutcome> {
        let Some((name, family)) = self.awaiting.take() else {
            return Err(TillerError::NotAwaitingResponse);
        };

        let set = match family {
            WorkflowFamily::PotentialTasks => {
                let outcome = potential_tasks::parse_response(raw);
                outcome_to_set(outcome, |entities| ProposalSet::PotentialTasks { entities })
            }
            WorkflowFamily::IdeasGroom => {
                let ideas = store.read(DocFile::Ideas)?;
                let outcome = ideas_groom::parse(raw, &ideas);
                outcome_to_set(outcome, |entities| ProposalSet::IdeasGroom { entities })
            }
            WorkflowFamily::SyncCommits => {
                let tasks = store.read(DocFile::Tasks)?;
                let outcome = sync_commits::parse(raw, &tasks);
                outcome_to_set(outcome, |entities| ProposalSet::SyncCommits { entities })
            }
            WorkflowFamily::Enrich => {
                let tasks = store.read(DocFile::Tasks)?;
                let outcome = enrich::parse(raw, &tasks);
                outcome_to_set(outcome, |entities| ProposalSet::Enrich { entities })
            }
            WorkflowFamily::PlanWork => {
                let outcome = plan_work::parse(raw);
                outcome_to_set(outcome, |mut plans| ProposalSet::PlanWork {
                    plan: plans.remove(0),
                })
            }
            WorkflowFamily::InitSummary => {
                let outcome = init_summary::parse(raw);
                outcome_to_set(outcome, |mut drafts| ProposalSet::InitSummary {
                    draft: drafts.remove(0),
                })
            }
            // Non-AI families never await a response.
            WorkflowFamily::Harvest
            | WorkflowFamily::ArchiveCompleted
            | WorkflowFamily::PromoteNext => return Err(TillerError::NotAwaitingResponse),
        };

        match set {
            Err(reason) => {
                debug!(workflow = %name, %reason, "response held nothing");
                self.step_produced_nothing();
                Ok(IngestOutcome::NothingFound { reason })
            }
            Ok(set) => {
                let count = set.len();
                self.pending = Some(PendingProposals {
                    workflow: name.clone(),
                    set,
                });
                Ok(IngestOutcome::Proposals {
                    workflow: name,
                    count,
                })
            }
        }
    }

    /// Apply confirmed selections to the pending proposal set, write the
    /// changed documents, and clear the pending state. Advances the combined
    /// workflow when one is in flight.
    pub fn apply(
        &mut self,
        selections: &[Selection],
        store: &mut dyn DocumentStore,
    ) -> Result<ApplyReport> {
        let Some(pending) = self.pending.take() else {
            return Err(TillerError::NoPendingProposals);
        };

        let known = pending.set.len();
        let applied = selections.iter().filter(|s| s.id < known).count();
        let ignored = selections.len() - applied;

        let mut written = Vec::new();
        match &pending.set {
            ProposalSet::PotentialTasks { entities } => {
                let log = store.read(DocFile::Log)?;
                let new = potential_tasks::apply(&log, entities, selections);
                write_if_changed(store, DocFile::Log, &log, &new, &mut written)?;
            }
            ProposalSet::Harvest { entities } => {
                let log = store.read(DocFile::Log)?;
                let tasks = read_or_empty(store, DocFile::Tasks)?;
                let out = harvest::apply(&log, &tasks, entities, selections);
                write_if_changed(store, DocFile::Log, &log, &out.log, &mut written)?;
                write_if_changed(store, DocFile::Tasks, &tasks, &out.tasks, &mut written)?;
            }
            ProposalSet::IdeasGroom { entities } => {
                let ideas = store.read(DocFile::Ideas)?;
                let tasks = read_or_empty(store, DocFile::Tasks)?;
                let out = ideas_groom::apply(&ideas, &tasks, entities, selections);
                write_if_changed(store, DocFile::Ideas, &ideas, &out.ideas, &mut written)?;
                write_if_changed(store, DocFile::Tasks, &tasks, &out.tasks, &mut written)?;
            }
            ProposalSet::SyncCommits { entities } => {
                let tasks = store.read(DocFile::Tasks)?;
                let new = sync_commits::apply(&tasks, entities, selections);
                write_if_changed(store, DocFile::Tasks, &tasks, &new, &mut written)?;
            }
            ProposalSet::ArchiveCompleted { entities } => {
                let tasks = store.read(DocFile::Tasks)?;
                let archive = read_or_empty(store, DocFile::Archive)?;
                let out = archive_completed::apply(&tasks, &archive, entities, selections);
                write_if_changed(store, DocFile::Tasks, &tasks, &out.tasks, &mut written)?;
                write_if_changed(store, DocFile::Archive, &archive, &out.archive, &mut written)?;
            }
            ProposalSet::PromoteNext { pool } => {
                let tasks = store.read(DocFile::Tasks)?;
                let new = promote_next::apply(&tasks, pool, selections);
                write_if_changed(store, DocFile::Tasks, &tasks, &new, &mut written)?;
            }
            ProposalSet::Enrich { entities } => {
                let tasks = store.read(DocFile::Tasks)?;
                let new = enrich::apply(&tasks, entities, selections);
                write_if_changed(store, DocFile::Tasks, &tasks, &new, &mut written)?;
            }
            ProposalSet::PlanWork { plan } => {
                let tasks = read_or_empty(store, DocFile::Tasks)?;
                let new = plan_work::apply(&tasks, plan, selections);
                write_if_changed(store, DocFile::Tasks, &tasks, &new, &mut written)?;
            }
            ProposalSet::InitSummary { draft } => {
                let overview = read_or_empty(store, DocFile::Overview)?;
                let new = init_summary::apply(&overview, draft, selections);
                write_if_changed(store, DocFile::Overview, &overview, &new, &mut written)?;
            }
        }

        info!(
            workflow = %pending.workflow,
            written = written.len(),
            applied,
            ignored,
            "selections applied"
        );
        self.step_applied();

        Ok(ApplyReport {
            workflow: pending.workflow,
            written,
            applied,
            ignored,
        })
    }

    // -----------------------------------------------------------------------
    // Combined driving
    // -----------------------------------------------------------------------

    /// Evaluate and begin the current step of the combined workflow in
    /// flight. Steps whose precondition fails are skipped and advanced past
    /// in the same call.
    pub fn next_step(&mut self, store: &dyn DocumentStore) -> Result<StepOutcome> {
        let Some(state) = self.combined.as_mut() else {
            return Err(TillerError::NoCombinedWorkflow);
        };
        if state.is_complete() {
            let summary = state.summary();
            self.combined = None;
            return Ok(StepOutcome::Finished(summary));
        }

        let workflow = state
            .current()
            .map(|s| s.workflow.clone())
            .ok_or(TillerError::NoCombinedWorkflow)?;

        if let Some(reason) = self.skip_reason(&workflow, store)? {
            info!(workflow = %workflow, %reason, "step skipped");
            let state = self.combined.as_mut().ok_or(TillerError::NoCombinedWorkflow)?;
            state.skip(reason.clone());
            state.advance();
            return Ok(StepOutcome::Skipped { workflow, reason });
        }

        let state = self.combined.as_mut().ok_or(TillerError::NoCombinedWorkflow)?;
        state.mark_running();

        match self.begin_single(workflow.clone(), store)? {
            WorkflowStart::PendingReady { workflow, count } => {
                Ok(StepOutcome::PendingReady { workflow, count })
            }
            // `begin_single` has already advanced past a step that found
            // nothing to propose.
            WorkflowStart::Nothing { workflow, status } => {
                Ok(StepOutcome::Nothing { workflow, status })
            }
            WorkflowStart::NeedsGeneration {
                instruction,
                context,
            } => Ok(StepOutcome::NeedsGeneration {
                instruction,
                context,
            }),
            // Combined steps are always singles; the catalog validator
            // rejects nesting and InputModal steps never appear in a
            // combined definition.
            other => {
                debug!(?other, "unexpected step start outcome");
                self.skip_current_step("step not runnable")?;
                Ok(StepOutcome::Nothing {
                    workflow,
                    status: "step not runnable".to_string(),
                })
            }
        }
    }

    /// Skip the current combined step on the user's request.
    pub fn skip_current_step(&mut self, reason: impl Into<String>) -> Result<()> {
        let Some(state) = self.combined.as_mut() else {
            return Err(TillerError::NoCombinedWorkflow);
        };
        state.skip(reason);
        state.advance();
        self.pending = None;
        self.awaiting = None;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Begin a single (non-combined) workflow: parse directly for non-AI
    /// families, otherwise assemble the generation request and suspend.
    fn begin_single(&mut self, name: String, store: &dyn DocumentStore) -> Result<WorkflowStart> {
        let def = self.catalog.get(&name)?;
        let family = required_family(def)?;

        match family {
            WorkflowFamily::Harvest => {
                let log = store.read(DocFile::Log)?;
                let outcome = harvest::parse(&log);
                self.install(
                    name,
                    outcome.success,
                    outcome.error,
                    "no task blocks found",
                    outcome.entities.is_empty(),
                    ProposalSet::Harvest {
                        entities: outcome.entities,
                    },
                )
            }
            WorkflowFamily::ArchiveCompleted => {
                let tasks = store.read(DocFile::Tasks)?;
                let outcome = archive_completed::parse(&tasks);
                self.install(
                    name,
                    outcome.success,
                    outcome.error,
                    "no completed tasks",
                    outcome.entities.is_empty(),
                    ProposalSet::ArchiveCompleted {
                        entities: outcome.entities,
                    },
                )
            }
            WorkflowFamily::PromoteNext => {
                let tasks = store.read(DocFile::Tasks)?;
                let mut outcome = promote_next::parse(&tasks);
                let pool = outcome.entities.remove(0);
                let empty = pool.status == promote_next::PromoteStatus::NoTasks;
                self.install(
                    name,
                    true,
                    None,
                    "no tasks queued",
                    empty,
                    ProposalSet::PromoteNext { pool },
                )
            }
            _ => {
                let context = build_context(store, def.reads, def.reads.first().copied())?;
                let instruction = def.rules.to_string();
                self.awaiting = Some((name, family));
                Ok(WorkflowStart::NeedsGeneration {
                    instruction,
                    context,
                })
            }
        }
    }

    /// Install a directly-parsed proposal set, or report why there is
    /// nothing to confirm.
    fn install(
        &mut self,
        workflow: String,
        success: bool,
        error: Option<String>,
        empty_status: &str,
        empty: bool,
        set: ProposalSet,
    ) -> Result<WorkflowStart> {
        if !success {
            self.step_produced_nothing();
            return Ok(WorkflowStart::Nothing {
                workflow,
                status: error.unwrap_or_else(|| "unreadable input".to_string()),
            });
        }
        if empty {
            self.step_produced_nothing();
            return Ok(WorkflowStart::Nothing {
                workflow,
                status: empty_status.to_string(),
            });
        }
        let count = set.len();
        self.pending = Some(PendingProposals {
            workflow: workflow.clone(),
            set,
        });
        Ok(WorkflowStart::PendingReady { workflow, count })
    }

    /// Precondition check for a combined step. `Some(reason)` means skip.
    fn skip_reason(&self, workflow: &str, store: &dyn DocumentStore) -> Result<Option<String>> {
        let reason = match workflow {
            "sync-commits" => {
                if !self.config.has_repo() {
                    Some("no repository configured".to_string())
                } else {
                    None
                }
            }
            "archive-completed" => match store.read(DocFile::Tasks) {
                Err(TillerError::MissingDocument(_)) => {
                    Some("tasks document missing".to_string())
                }
                Err(e) => return Err(e),
                Ok(tasks) => {
                    if archive_completed::parse(&tasks).is_empty() {
                        Some("no completed tasks".to_string())
                    } else {
                        None
                    }
                }
            },
            "promote-next" => match store.read(DocFile::Tasks) {
                Err(TillerError::MissingDocument(_)) => {
                    Some("tasks document missing".to_string())
                }
                Err(e) => return Err(e),
                Ok(tasks) => {
                    let outcome = promote_next::parse(&tasks);
                    match outcome.entities[0].status {
                        promote_next::PromoteStatus::NoTasks => {
                            Some("no tasks queued".to_string())
                        }
                        promote_next::PromoteStatus::AlreadyActive => {
                            Some("destination already has active tasks".to_string())
                        }
                        promote_next::PromoteStatus::Proposed => None,
                    }
                }
            },
            "harvest" | "potential-tasks" => {
                if !store.exists(DocFile::Log) {
                    Some("log document missing".to_string())
                } else {
                    None
                }
            }
            "ideas-groom" => match store.read(DocFile::Ideas) {
                Err(TillerError::MissingDocument(_)) => {
                    Some("idea bin is empty".to_string())
                }
                Err(e) => return Err(e),
                Ok(ideas) => {
                    let has_bullet = ideas.lines().any(|l| l.trim_start().starts_with("- "));
                    if has_bullet {
                        None
                    } else {
                        Some("idea bin is empty".to_string())
                    }
                }
            },
            _ => None,
        };
        Ok(reason)
    }

    fn invalidate(&mut self, why: &str) {
        if let Some(pending) = self.pending.take() {
            info!(workflow = %pending.workflow, why, "pending proposals invalidated");
        }
        if let Some((workflow, _)) = self.awaiting.take() {
            info!(%workflow, why, "awaited response abandoned");
        }
    }

    /// A step that ended without proposals still counts as run through.
    fn step_produced_nothing(&mut self) {
        if let Some(state) = self.combined.as_mut() {
            state.advance();
        }
    }

    fn step_applied(&mut self) {
        if let Some(state) = self.combined.as_mut() {
            state.advance();
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn required_family(def: &WorkflowDefinition) -> Result<WorkflowFamily> {
    def.family.ok_or_else(|| {
        TillerError::InvalidDefinition(def.name.to_string(), "no family".to_string())
    })
}

/// Concatenate the declared read documents into one generation context.
/// `required` must exist; the other reads are tolerated missing.
fn build_context(
    store: &dyn DocumentStore,
    reads: &[DocFile],
    required: Option<DocFile>,
) -> Result<String> {
    let mut parts = Vec::new();
    for file in reads {
        match store.read(*file) {
            Ok(content) => parts.push(format!("## {}\n\n{}", file.filename(), content)),
            Err(TillerError::MissingDocument(_)) if Some(*file) != required => {}
            Err(e) => return Err(e),
        }
    }
    Ok(parts.join("\n"))
}

fn read_or_empty(store: &dyn DocumentStore, file: DocFile) -> Result<String> {
    match store.read(file) {
        Ok(content) => Ok(content),
        Err(TillerError::MissingDocument(_)) => Ok(String::new()),
        Err(e) => Err(e),
    }
}

fn write_if_changed(
    store: &mut dyn DocumentStore,
    file: DocFile,
    before: &str,
    after: &str,
    written: &mut Vec<DocFile>,
) -> Result<()> {
    if before != after {
        store.write(file, after)?;
        written.push(file);
    }
    Ok(())
}

fn outcome_to_set<T>(
    outcome: crate::flows::ParseOutcome<T>,
    wrap: impl FnOnce(Vec<T>) -> ProposalSet,
) -> std::result::Result<ProposalSet, String> {
    if !outcome.success {
        return Err(outcome
            .error
            .unwrap_or_else(|| "unreadable response".to_string()));
    }
    if outcome.entities.is_empty() {
        return Err("no entities extracted".to_string());
    }
    Ok(wrap(outcome.entities))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
