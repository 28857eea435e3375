//! Line-span section editing shared by the selection appliers.
//!
//! All mutation here is span-based: callers locate content by line span and
//! edits never re-match text, so duplicate text elsewhere in a document is
//! never disturbed. Functions preserve the presence or absence of a trailing
//! newline so repeated applies produce byte-stable output.

use crate::markers;

// ---------------------------------------------------------------------------
// LineSpan
// ---------------------------------------------------------------------------

/// Half-open line range `[start, end)` within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line < self.end
    }
}

// ---------------------------------------------------------------------------
// Section lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Index of the heading line itself.
    pub heading_line: usize,
    /// Body span: everything after the heading up to (not including) the
    /// next heading of equal or higher level.
    pub body: LineSpan,
}

pub fn split_lines(content: &str) -> (Vec<&str>, bool) {
    let lines: Vec<&str> = content.lines().collect();
    let trailing = content.ends_with('\n');
    (lines, trailing)
}

pub fn join_lines(lines: &[&str], trailing_newline: bool) -> String {
    let mut out = lines.join("\n");
    if trailing_newline && !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Find the first heading with exactly `title` at exactly `level`.
pub fn find_section(content: &str, title: &str, level: usize) -> Option<Section> {
    let (lines, _) = split_lines(content);
    find_section_in(&lines, title, level)
}

pub fn find_section_in(lines: &[&str], title: &str, level: usize) -> Option<Section> {
    let heading_line = lines
        .iter()
        .position(|l| markers::heading(l) == Some((level, title)))?;
    let end = section_end(lines, heading_line, level);
    Some(Section {
        heading_line,
        body: LineSpan::new(heading_line + 1, end),
    })
}

/// First line at or after `from + 1` holding a heading of `level` or higher
/// (fewer hashes), else the document end.
fn section_end(lines: &[&str], from: usize, level: usize) -> usize {
    lines
        .iter()
        .enumerate()
        .skip(from + 1)
        .find(|(_, l)| matches!(markers::heading(l), Some((lvl, _)) if lvl <= level))
        .map(|(i, _)| i)
        .unwrap_or(lines.len())
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Append `new_lines` to the named section, creating the section at the end
/// of the document when absent. Existing section content keeps its order;
/// new lines land after the last non-blank body line, before the next
/// heading of equal or higher level.
pub fn append_to_section(content: &str, title: &str, level: usize, new_lines: &[String]) -> String {
    if new_lines.is_empty() {
        return content.to_string();
    }
    let (lines, trailing) = split_lines(content);

    if let Some(section) = find_section_in(&lines, title, level) {
        // Insert after the last non-blank line of the body so appended items
        // sit with the existing ones, not after the separating blank lines.
        let mut insert_at = section.body.end;
        while insert_at > section.body.start && lines[insert_at - 1].trim().is_empty() {
            insert_at -= 1;
        }

        let mut out: Vec<&str> = Vec::with_capacity(lines.len() + new_lines.len());
        out.extend_from_slice(&lines[..insert_at]);
        out.extend(new_lines.iter().map(String::as_str));
        out.extend_from_slice(&lines[insert_at..]);
        return join_lines(&out, trailing || content.is_empty());
    }

    // Section absent: create it at the end of the document.
    let heading = format!("{} {}", "#".repeat(level), title);
    let mut out: Vec<&str> = lines.clone();
    if !out.is_empty() && !out.last().map(|l| l.trim().is_empty()).unwrap_or(true) {
        out.push("");
    }
    out.push(&heading);
    out.push("");
    out.extend(new_lines.iter().map(String::as_str));
    join_lines(&out, trailing || content.is_empty())
}

/// Replace the body of the named section with `body_lines`, creating the
/// section at the end of the document when absent.
pub fn replace_section_body(
    content: &str,
    title: &str,
    level: usize,
    body_lines: &[String],
) -> String {
    let (lines, trailing) = split_lines(content);

    if let Some(section) = find_section_in(&lines, title, level) {
        let mut out: Vec<&str> = Vec::with_capacity(lines.len());
        out.extend_from_slice(&lines[..section.body.start]);
        out.push("");
        out.extend(body_lines.iter().map(String::as_str));
        if section.body.end < lines.len() {
            out.push("");
        }
        out.extend_from_slice(&lines[section.body.end..]);
        return join_lines(&out, trailing || content.is_empty());
    }

    append_to_section(content, title, level, body_lines)
}

/// Remove the given line spans. Spans may be given in any order and must not
/// overlap; lines outside every span are carried through untouched.
pub fn remove_spans(content: &str, spans: &[LineSpan]) -> String {
    if spans.is_empty() {
        return content.to_string();
    }
    let (lines, trailing) = split_lines(content);
    let mut sorted: Vec<LineSpan> = spans.to_vec();
    sorted.sort_by_key(|s| s.start);

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut cursor = 0usize;
    for span in &sorted {
        if span.start > cursor {
            out.extend_from_slice(&lines[cursor..span.start.min(lines.len())]);
        }
        cursor = cursor.max(span.end);
    }
    if cursor < lines.len() {
        out.extend_from_slice(&lines[cursor..]);
    }
    join_lines(&out, trailing)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
