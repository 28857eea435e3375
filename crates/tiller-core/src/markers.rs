//! Named recognizers for the marker syntax shared across the planning
//! documents. These patterns are the de facto wire format of the whole
//! system and must stay bit-exact: task-block HTML comments, checkbox
//! lines, strikethrough rejection, slice links, log entry headers, and
//! date headings.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Opens a machine-owned block of suggested tasks inside the Log.
pub const TASK_BLOCK_START: &str = "<!-- AI: potential-tasks start -->";
/// Closes a machine-owned block of suggested tasks inside the Log.
pub const TASK_BLOCK_END: &str = "<!-- AI: potential-tasks end -->";

pub fn is_task_block_start(line: &str) -> bool {
    line.trim() == TASK_BLOCK_START
}

pub fn is_task_block_end(line: &str) -> bool {
    line.trim() == TASK_BLOCK_END
}

// ---------------------------------------------------------------------------
// Checkbox lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkbox<'a> {
    pub done: bool,
    pub text: &'a str,
    pub indent: &'a str,
}

static CHECKBOX_RE: OnceLock<Regex> = OnceLock::new();

fn checkbox_re() -> &'static Regex {
    CHECKBOX_RE.get_or_init(|| Regex::new(r"^(\s*)- \[( |x)\] (.*)$").unwrap())
}

/// Recognize `- [ ] text` / `- [x] text`, preserving leading indentation.
pub fn parse_checkbox(line: &str) -> Option<Checkbox<'_>> {
    let caps = checkbox_re().captures(line)?;
    Some(Checkbox {
        done: caps.get(2).map(|m| m.as_str() == "x").unwrap_or(false),
        text: caps.get(3).map(|m| m.as_str()).unwrap_or(""),
        indent: caps.get(1).map(|m| m.as_str()).unwrap_or(""),
    })
}

/// Render a checkbox line with the canonical prefix.
pub fn render_checkbox(done: bool, text: &str) -> String {
    let mark = if done { "x" } else { " " };
    format!("- [{mark}] {text}")
}

// ---------------------------------------------------------------------------
// Strikethrough (rejected items)
// ---------------------------------------------------------------------------

/// Wrap only the text portion of a rejected item; the checkbox prefix is
/// kept intact by the caller.
pub fn strike(text: &str) -> String {
    format!("~~{text}~~")
}

pub fn is_struck(text: &str) -> bool {
    text.len() >= 4 && text.starts_with("~~") && text.ends_with("~~")
}

// ---------------------------------------------------------------------------
// Slice links
// ---------------------------------------------------------------------------

/// A roadmap slice reference parsed from `[[Roadmap#VS<n> — <Slice Name>]]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceRef {
    pub number: u32,
    pub name: String,
}

impl SliceRef {
    /// Re-render the exact wiki-link syntax.
    pub fn link(&self) -> String {
        format!("[[Roadmap#VS{} — {}]]", self.number, self.name)
    }

    /// Heading text used when archiving under this slice.
    pub fn heading(&self) -> String {
        format!("VS{} — {}", self.number, self.name)
    }
}

impl fmt::Display for SliceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VS{} — {}", self.number, self.name)
    }
}

static SLICE_RE: OnceLock<Regex> = OnceLock::new();

fn slice_re() -> &'static Regex {
    SLICE_RE.get_or_init(|| Regex::new(r"\[\[Roadmap#VS(\d+) — ([^\]]+)\]\]").unwrap())
}

/// Find the first slice link in `text`.
pub fn parse_slice_link(text: &str) -> Option<SliceRef> {
    let caps = slice_re().captures(text)?;
    let number: u32 = caps.get(1)?.as_str().parse().ok()?;
    Some(SliceRef {
        number,
        name: caps.get(2)?.as_str().trim().to_string(),
    })
}

/// Remove every slice link from `text`, collapsing the surrounding spaces.
pub fn strip_slice_links(text: &str) -> String {
    let stripped = slice_re().replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Log entry headers
// ---------------------------------------------------------------------------

/// A timestamp-style entry header inside the Log: `HH:MMam/pm` optionally
/// followed by ` - <title>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryHeader {
    pub time: String,
    pub title: Option<String>,
}

static ENTRY_RE: OnceLock<Regex> = OnceLock::new();

fn entry_re() -> &'static Regex {
    ENTRY_RE.get_or_init(|| Regex::new(r"^(\d{1,2}:\d{2}(?:am|pm))(?: - (.+))?\s*$").unwrap())
}

pub fn parse_entry_header(line: &str) -> Option<EntryHeader> {
    let caps = entry_re().captures(line)?;
    Some(EntryHeader {
        time: caps.get(1)?.as_str().to_string(),
        title: caps.get(2).map(|m| m.as_str().trim().to_string()),
    })
}

// ---------------------------------------------------------------------------
// Date headings
// ---------------------------------------------------------------------------

static DATE_RE: OnceLock<Regex> = OnceLock::new();

fn date_re() -> &'static Regex {
    DATE_RE.get_or_init(|| Regex::new(r"^## (\d{4}-\d{2}-\d{2})\s*$").unwrap())
}

/// Recognize `## YYYY-MM-DD`. Returns `None` for calendar-invalid dates.
pub fn parse_date_heading(line: &str) -> Option<NaiveDate> {
    let caps = date_re().captures(line)?;
    NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Recognize an ATX heading; returns (level, title).
pub fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_end();
    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some((hashes, rest[1..].trim_start()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
