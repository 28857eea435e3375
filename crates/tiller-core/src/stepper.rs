//! Combined-workflow step sequencer.
//!
//! Content-agnostic state machine: per-step `pending → running →
//! {completed | skipped}`, a cursor over the ordered step list, and a
//! user-facing summary at the end. What each step actually does — and what
//! conditions justify a skip — is the engine's business logic.

use crate::catalog::WorkflowDefinition;
use crate::error::{Result, TillerError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// StepStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// CombinedStep / CombinedState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedStep {
    pub workflow: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

/// Live state of one combined workflow. Held in process memory only: if the
/// host exits mid-sequence, the combined workflow restarts from step 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedState {
    pub combined_name: String,
    pub display_name: String,
    pub steps: Vec<CombinedStep>,
    pub current_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    pub display_name: String,
    pub completed: usize,
    pub skipped: usize,
    pub total: usize,
}

impl CombinedState {
    /// Build the step list from a combined definition, all steps pending,
    /// cursor at 0. An empty step list is an invalid definition.
    pub fn init(definition: &WorkflowDefinition) -> Result<Self> {
        if definition.combined_steps.is_empty() {
            return Err(TillerError::InvalidDefinition(
                definition.name.to_string(),
                "combined workflow has no steps".to_string(),
            ));
        }
        Ok(Self {
            combined_name: definition.name.to_string(),
            display_name: definition.display_name.to_string(),
            steps: definition
                .combined_steps
                .iter()
                .map(|name| CombinedStep {
                    workflow: name.to_string(),
                    status: StepStatus::Pending,
                    skip_reason: None,
                })
                .collect(),
            current_index: 0,
        })
    }

    pub fn current(&self) -> Option<&CombinedStep> {
        self.steps.get(self.current_index)
    }

    /// Mark the current step running. No-op when the step has already
    /// reached a terminal status.
    pub fn mark_running(&mut self) {
        if let Some(step) = self.steps.get_mut(self.current_index) {
            if matches!(step.status, StepStatus::Pending) {
                step.status = StepStatus::Running;
            }
        }
    }

    /// Mark the current step skipped with a human-readable reason. The
    /// cursor stays put; `advance` moves past the skipped step.
    pub fn skip(&mut self, reason: impl Into<String>) {
        if let Some(step) = self.steps.get_mut(self.current_index) {
            step.status = StepStatus::Skipped;
            step.skip_reason = Some(reason.into());
        }
    }

    /// Complete the current step (if it was running) and advance the cursor.
    /// A skipped step keeps its status; a step that never ran stays pending.
    pub fn advance(&mut self) {
        if let Some(step) = self.steps.get_mut(self.current_index) {
            if matches!(step.status, StepStatus::Running) {
                step.status = StepStatus::Completed;
            }
        }
        self.current_index += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.steps.len()
    }

    pub fn summary(&self) -> StepSummary {
        StepSummary {
            display_name: self.display_name.clone(),
            completed: self
                .steps
                .iter()
                .filter(|s| s.status == StepStatus::Completed)
                .count(),
            skipped: self
                .steps
                .iter()
                .filter(|s| s.status == StepStatus::Skipped)
                .count(),
            total: self.steps.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn three_step_state() -> CombinedState {
        let catalog = Catalog::new().unwrap();
        CombinedState::init(catalog.get("sync-session").unwrap()).unwrap()
    }

    #[test]
    fn init_all_pending() {
        let state = three_step_state();
        assert_eq!(state.steps.len(), 3);
        assert_eq!(state.current_index, 0);
        assert!(state
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Pending));
        assert!(!state.is_complete());
    }

    #[test]
    fn init_rejects_empty_steps() {
        let catalog = Catalog::new().unwrap();
        let single = catalog.get("harvest").unwrap();
        assert!(matches!(
            CombinedState::init(single),
            Err(TillerError::InvalidDefinition(..))
        ));
    }

    #[test]
    fn full_sequence_with_middle_skip() {
        let mut state = three_step_state();

        state.mark_running();
        state.advance();

        state.mark_running();
        state.skip("no repository configured");
        state.advance();

        state.mark_running();
        state.advance();

        assert!(state.is_complete());
        let summary = state.summary();
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.display_name, "Sync session");
        assert_eq!(
            state.steps[1].skip_reason.as_deref(),
            Some("no repository configured")
        );
    }

    #[test]
    fn skip_does_not_move_cursor() {
        let mut state = three_step_state();
        state.skip("precondition failed");
        assert_eq!(state.current_index, 0);
        assert_eq!(state.steps[0].status, StepStatus::Skipped);
        state.advance();
        // Advance past a skipped step keeps it skipped.
        assert_eq!(state.steps[0].status, StepStatus::Skipped);
        assert_eq!(state.current_index, 1);
    }

    #[test]
    fn advance_without_running_leaves_pending() {
        let mut state = three_step_state();
        state.advance();
        // Step never ran, so it is not counted as completed.
        assert_eq!(state.steps[0].status, StepStatus::Pending);
        assert_eq!(state.summary().completed, 0);
    }

    #[test]
    fn mark_running_is_noop_on_terminal_step() {
        let mut state = three_step_state();
        state.mark_running();
        state.advance();
        state.current_index = 0;
        state.mark_running();
        assert_eq!(state.steps[0].status, StepStatus::Completed);
    }

    #[test]
    fn current_step_tracks_cursor() {
        let mut state = three_step_state();
        assert_eq!(state.current().unwrap().workflow, "sync-commits");
        state.mark_running();
        state.advance();
        assert_eq!(state.current().unwrap().workflow, "archive-completed");
        state.skip("nothing completed");
        state.advance();
        assert_eq!(state.current().unwrap().workflow, "promote-next");
        state.mark_running();
        state.advance();
        assert!(state.current().is_none());
    }
}
