//! Parser/applier pairs, one module per workflow family.
//!
//! Shared contract: parsers never fail — malformed input becomes a
//! `ParseOutcome` with `success == false` or zero entities, never a panic
//! or an `Err`. Appliers are pure and total: original content in, new
//! content out; selections referencing unknown entity ids are ignored.

pub mod archive_completed;
pub mod enrich;
pub mod harvest;
pub mod ideas_groom;
pub mod init_summary;
pub mod plan_work;
pub mod potential_tasks;
pub mod promote_next;
pub mod response;
pub mod sync_commits;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ParseOutcome
// ---------------------------------------------------------------------------

/// Result of one extraction parse. `success == false` means the input was
/// malformed beyond salvage; `success == true` with zero entities means the
/// input was readable but held nothing to propose. Both are routine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOutcome<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub entities: Vec<T>,
}

impl<T> ParseOutcome<T> {
    pub fn ok(entities: Vec<T>) -> Self {
        Self {
            success: true,
            error: None,
            entities,
        }
    }

    pub fn empty() -> Self {
        Self::ok(Vec::new())
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            entities: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Fixed lookback window, in lines, when recovering an item's provenance
/// (nearest entry header and date heading) from a running log.
pub const CONTEXT_LOOKBACK_LINES: usize = 40;
