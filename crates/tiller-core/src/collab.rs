//! Interfaces owned by external collaborators. The engine never blocks on
//! these; hosts call the engine back once a response or decision exists.

use crate::error::Result;
use crate::proposal::Selection;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// External text-generation service. The engine only selects which
/// instruction to send and consumes the returned text; prompt assembly and
/// transport belong to the host.
pub trait TextGenerator {
    fn complete(&self, instruction: &str, context: &str) -> Result<String>;
}

/// A commit from the source-control hosting feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub message: String,
    pub date: NaiveDate,
}

/// Recent-commit retrieval, used only by the commit-matching family. An
/// unconfigured repository is a skip condition, not an error.
pub trait CommitFeed {
    fn recent(&self, repo: &str, limit: u32) -> Result<Vec<Commit>>;
}

/// What the human confirmation surface hands back. `confirmed == false`
/// must leave every document unmodified; hosts map it to `Engine::cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationOutcome {
    pub confirmed: bool,
    pub selections: Vec<Selection>,
}
