//! The pending proposal set and the selections a human makes over it.
//!
//! One `PendingProposals` value exists per engine at most; starting any new
//! workflow discards it. Proposal entities are transient — they live from
//! one extraction parse until the matching apply or cancellation.

use crate::catalog::WorkflowFamily;
use crate::flows::archive_completed::ArchiveGroup;
use crate::flows::enrich::Enrichment;
use crate::flows::harvest::TaskBlock;
use crate::flows::ideas_groom::IdeaVerdict;
use crate::flows::init_summary::SummaryDraft;
use crate::flows::plan_work::WorkPlan;
use crate::flows::potential_tasks::CandidateTask;
use crate::flows::promote_next::PromotePool;
use crate::flows::sync_commits::CommitMatch;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SelectionAction / Selection
// ---------------------------------------------------------------------------

/// Action tag a human attaches to one proposal entity. Appliers ignore
/// actions that do not apply to their family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionAction {
    Keep,
    Reject,
    Move,
    Archive,
    Skip,
    Discard,
    Current,
    Later,
    Accept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Entity identifier within the pending set (assigned at parse time).
    pub id: usize,
    pub action: SelectionAction,
}

impl Selection {
    pub fn new(id: usize, action: SelectionAction) -> Self {
        Self { id, action }
    }
}

/// Look up the action chosen for entity `id`, if any.
pub fn action_for(selections: &[Selection], id: usize) -> Option<SelectionAction> {
    selections.iter().find(|s| s.id == id).map(|s| s.action)
}

// ---------------------------------------------------------------------------
// ProposalSet
// ---------------------------------------------------------------------------

/// Closed union over the workflow families' proposal entities. Dispatch is
/// an exhaustive match — adding a family is compile-time checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ProposalSet {
    PotentialTasks { entities: Vec<CandidateTask> },
    Harvest { entities: Vec<TaskBlock> },
    IdeasGroom { entities: Vec<IdeaVerdict> },
    SyncCommits { entities: Vec<CommitMatch> },
    ArchiveCompleted { entities: Vec<ArchiveGroup> },
    PromoteNext { pool: PromotePool },
    Enrich { entities: Vec<Enrichment> },
    PlanWork { plan: WorkPlan },
    InitSummary { draft: SummaryDraft },
}

impl ProposalSet {
    pub fn family(&self) -> WorkflowFamily {
        match self {
            ProposalSet::PotentialTasks { .. } => WorkflowFamily::PotentialTasks,
            ProposalSet::Harvest { .. } => WorkflowFamily::Harvest,
            ProposalSet::IdeasGroom { .. } => WorkflowFamily::IdeasGroom,
            ProposalSet::SyncCommits { .. } => WorkflowFamily::SyncCommits,
            ProposalSet::ArchiveCompleted { .. } => WorkflowFamily::ArchiveCompleted,
            ProposalSet::PromoteNext { .. } => WorkflowFamily::PromoteNext,
            ProposalSet::Enrich { .. } => WorkflowFamily::Enrich,
            ProposalSet::PlanWork { .. } => WorkflowFamily::PlanWork,
            ProposalSet::InitSummary { .. } => WorkflowFamily::InitSummary,
        }
    }

    /// Number of individually selectable entities in the set.
    pub fn len(&self) -> usize {
        match self {
            ProposalSet::PotentialTasks { entities } => entities.len(),
            ProposalSet::Harvest { entities } => {
                entities.iter().map(|b| b.tasks.len()).sum()
            }
            ProposalSet::IdeasGroom { entities } => entities.len(),
            ProposalSet::SyncCommits { entities } => entities.len(),
            ProposalSet::ArchiveCompleted { entities } => {
                entities.iter().map(|g| g.tasks.len()).sum()
            }
            ProposalSet::PromoteNext { pool } => pool.tasks.len(),
            ProposalSet::Enrich { entities } => entities.len(),
            ProposalSet::PlanWork { plan } => plan.tasks.len(),
            ProposalSet::InitSummary { .. } => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The single pending value the engine owns between the two suspension
/// points (generation response, human confirmation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingProposals {
    pub workflow: String,
    pub set: ProposalSet,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_lookup() {
        let selections = vec![
            Selection::new(0, SelectionAction::Keep),
            Selection::new(2, SelectionAction::Reject),
        ];
        assert_eq!(action_for(&selections, 0), Some(SelectionAction::Keep));
        assert_eq!(action_for(&selections, 1), None);
        assert_eq!(action_for(&selections, 2), Some(SelectionAction::Reject));
    }

    #[test]
    fn set_family_and_len() {
        let set = ProposalSet::PotentialTasks {
            entities: vec![CandidateTask {
                id: 0,
                entry_time: None,
                text: "Do it".to_string(),
                reasoning: None,
            }],
        };
        assert_eq!(set.family(), WorkflowFamily::PotentialTasks);
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
    }
}
