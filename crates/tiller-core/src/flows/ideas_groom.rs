//! Groom the idea bin: an AI pass proposes a verdict per idea, the human
//! confirms, and confirmed verdicts discard ideas, promote them into the
//! Tasks document, or leave them for later.

use crate::flows::response;
use crate::flows::ParseOutcome;
use crate::markers;
use crate::proposal::{action_for, Selection, SelectionAction};
use crate::section::{self, LineSpan};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Discard,
    Current,
    Later,
}

impl Verdict {
    /// Tolerant parse of a generation-supplied verdict; anything
    /// unrecognized defaults to the safe `Later`.
    fn from_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "discard" | "drop" | "delete" => Verdict::Discard,
            "current" | "now" | "promote" => Verdict::Current,
            _ => Verdict::Later,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Discard => "discard",
            Verdict::Current => "current",
            Verdict::Later => "later",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// IdeaVerdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaVerdict {
    pub id: usize,
    pub idea: String,
    /// The AI's proposal; the human's selection overrides it.
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Line of the matching idea bullet in the Ideas document. Verdicts
    /// that matched nothing are shown but never applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse the generation response and anchor each verdict to its idea bullet
/// in the Ideas document.
pub fn parse(raw: &str, ideas_doc: &str) -> ParseOutcome<IdeaVerdict> {
    if raw.trim().is_empty() {
        return ParseOutcome::failed("empty response");
    }
    let Some(value) = response::extract_json(raw) else {
        return ParseOutcome::empty();
    };
    let Some(items) = response::array_of(&value, &["ideas", "verdicts", "items"]) else {
        return ParseOutcome::empty();
    };

    let bullets = idea_bullets(ideas_doc);
    let mut entities = Vec::new();
    for item in items {
        let Some(idea) = response::string_field(item, &["idea", "text", "title"]) else {
            continue;
        };
        let verdict = response::string_field(item, &["verdict", "action"])
            .map(|v| Verdict::from_loose(&v))
            .unwrap_or(Verdict::Later);
        entities.push(IdeaVerdict {
            id: entities.len(),
            line: match_bullet(&bullets, &idea),
            idea,
            verdict,
            reasoning: response::string_field(item, &["reasoning", "why", "reason"]),
        });
    }
    ParseOutcome::ok(entities)
}

/// Bullet lines (plain or checkbox) in the Ideas document: (line, text).
fn idea_bullets(ideas_doc: &str) -> Vec<(usize, String)> {
    let (lines, _) = section::split_lines(ideas_doc);
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, l)| {
            if let Some(cb) = markers::parse_checkbox(l) {
                return Some((i, cb.text.to_string()));
            }
            let trimmed = l.trim_start();
            trimmed
                .strip_prefix("- ")
                .map(|rest| (i, rest.trim().to_string()))
        })
        .collect()
}

/// Exact text match first, then containment either way.
fn match_bullet(bullets: &[(usize, String)], idea: &str) -> Option<usize> {
    let needle = idea.trim();
    bullets
        .iter()
        .find(|(_, text)| text == needle)
        .or_else(|| {
            bullets
                .iter()
                .find(|(_, text)| text.contains(needle) || needle.contains(text.as_str()))
        })
        .map(|(line, _)| *line)
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroomOutput {
    pub ideas: String,
    pub tasks: String,
    pub discarded: usize,
    pub promoted: usize,
}

pub const PROMOTE_SECTION: &str = "Next Up";

/// Apply confirmed verdicts. Discard removes the idea bullet; Current moves
/// it into "Next Up" in Tasks as an open task; Later (and everything else)
/// leaves the bin untouched.
pub fn apply(
    ideas_doc: &str,
    tasks_doc: &str,
    entities: &[IdeaVerdict],
    selections: &[Selection],
) -> GroomOutput {
    let mut removals: Vec<LineSpan> = Vec::new();
    let mut promoted_texts: Vec<String> = Vec::new();
    let mut discarded = 0usize;

    for entity in entities {
        let Some(line) = entity.line else { continue };
        match action_for(selections, entity.id) {
            Some(SelectionAction::Discard) => {
                removals.push(LineSpan::new(line, line + 1));
                discarded += 1;
            }
            Some(SelectionAction::Current) => {
                removals.push(LineSpan::new(line, line + 1));
                promoted_texts.push(entity.idea.clone());
            }
            _ => {}
        }
    }

    let new_ideas = section::remove_spans(ideas_doc, &removals);
    let promoted = promoted_texts.len();
    let new_tasks = if promoted_texts.is_empty() {
        tasks_doc.to_string()
    } else {
        let items: Vec<String> = promoted_texts
            .iter()
            .map(|t| markers::render_checkbox(false, t))
            .collect();
        section::append_to_section(tasks_doc, PROMOTE_SECTION, 2, &items)
    };

    GroomOutput {
        ideas: new_ideas,
        tasks: new_tasks,
        discarded,
        promoted,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
