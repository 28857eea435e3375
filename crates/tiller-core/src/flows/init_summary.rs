//! Draft the project summary in the Overview document. One entity, one
//! decision: accept the draft and the "## Summary" body is replaced.

use crate::flows::response;
use crate::flows::ParseOutcome;
use crate::proposal::{action_for, Selection, SelectionAction};
use crate::section;
use serde::{Deserialize, Serialize};

pub const SUMMARY_SECTION: &str = "Summary";

// ---------------------------------------------------------------------------
// SummaryDraft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDraft {
    pub summary: String,
}

/// Whether the Overview already carries a non-empty summary body. Callers
/// use this to offer skipping the workflow instead of overwriting.
pub fn is_populated(overview_doc: &str) -> bool {
    let Some(sec) = section::find_section(overview_doc, SUMMARY_SECTION, 2) else {
        return false;
    };
    let (lines, _) = section::split_lines(overview_doc);
    lines[sec.body.start..sec.body.end]
        .iter()
        .any(|l| !l.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// The response is plain prose, not JSON. Fences are stripped; everything
/// else is the draft.
pub fn parse(raw: &str) -> ParseOutcome<SummaryDraft> {
    let summary = response::strip_fences(raw).trim().to_string();
    if summary.is_empty() {
        return ParseOutcome::failed("empty response");
    }
    ParseOutcome::ok(vec![SummaryDraft { summary }])
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Replace the "## Summary" body with the accepted draft, creating the
/// section at end of document when absent.
pub fn apply(overview_doc: &str, draft: &SummaryDraft, selections: &[Selection]) -> String {
    if !matches!(
        action_for(selections, 0),
        Some(SelectionAction::Accept) | Some(SelectionAction::Keep)
    ) {
        return overview_doc.to_string();
    }
    let body: Vec<String> = draft.summary.lines().map(str::to_string).collect();
    section::replace_section_body(overview_doc, SUMMARY_SECTION, 2, &body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const OVERVIEW: &str = "# Overview\n\n## Summary\n\n## Stack\n\n- Rust\n";

    #[test]
    fn parse_strips_fences_and_trims() {
        let raw = "```\nA small tool for tending planning documents.\n```\n";
        let outcome = parse(raw);
        assert!(outcome.success);
        assert_eq!(
            outcome.entities[0].summary,
            "A small tool for tending planning documents."
        );
    }

    #[test]
    fn parse_empty_fails() {
        assert!(!parse("   \n").success);
    }

    #[test]
    fn populated_detection() {
        assert!(!is_populated(OVERVIEW));
        assert!(is_populated(
            "# Overview\n\n## Summary\n\nAlready written.\n\n## Stack\n"
        ));
        assert!(!is_populated("# Overview\n"));
    }

    #[test]
    fn apply_replaces_summary_body() {
        let draft = SummaryDraft {
            summary: "A planning-document tool.".to_string(),
        };
        let out = apply(
            OVERVIEW,
            &draft,
            &[Selection::new(0, SelectionAction::Accept)],
        );
        assert!(out.contains("## Summary\n\nA planning-document tool.\n"));
        // Later sections untouched.
        assert!(out.contains("## Stack\n\n- Rust\n"));
    }

    #[test]
    fn apply_creates_section_when_missing() {
        let draft = SummaryDraft {
            summary: "Fresh summary.".to_string(),
        };
        let out = apply(
            "# Overview\n",
            &draft,
            &[Selection::new(0, SelectionAction::Accept)],
        );
        assert!(out.contains("## Summary"));
        assert!(out.contains("Fresh summary."));
    }

    #[test]
    fn apply_without_accept_is_noop() {
        let draft = SummaryDraft {
            summary: "x".to_string(),
        };
        assert_eq!(apply(OVERVIEW, &draft, &[]), OVERVIEW);
        assert_eq!(
            apply(OVERVIEW, &draft, &[Selection::new(0, SelectionAction::Skip)]),
            OVERVIEW
        );
    }
}
