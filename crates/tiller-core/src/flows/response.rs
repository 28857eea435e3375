//! Tolerant extraction of structured data from text-generation output.
//!
//! Responses arrive as loose natural language around JSON: fenced code
//! blocks, preambles ("Here are the tasks I found:"), trailing commentary.
//! These helpers salvage the JSON payload without ever panicking; a caller
//! that gets `None` treats the response as "nothing found".

use serde_json::Value;

/// Strip markdown code fences, keeping only their contents. Text outside
/// fences is kept too, so a fenceless response passes through unchanged.
pub fn strip_fences(raw: &str) -> String {
    let mut out = Vec::new();
    for line in raw.lines() {
        if line.trim().starts_with("```") {
            continue;
        }
        out.push(line);
    }
    out.join("\n")
}

/// Best-effort JSON extraction: try the whole (fence-stripped) text first,
/// then the outermost `{...}` or `[...]` substring.
pub fn extract_json(raw: &str) -> Option<Value> {
    let cleaned = strip_fences(raw);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if end > start {
                if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Pull the top-level array out of a salvaged value: the value itself, or
/// the first array found under any of `keys` on a top-level object.
pub fn array_of<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    if let Value::Array(items) = value {
        return Some(items);
    }
    if let Value::Object(map) = value {
        for key in keys {
            if let Some(Value::Array(items)) = map.get(*key) {
                return Some(items);
            }
        }
    }
    None
}

/// First non-empty string found under any of `keys`.
pub fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = value.get(*key).and_then(Value::as_str) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// First numeric value found under any of `keys`.
pub fn f64_field(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(n) = value.get(*key).and_then(Value::as_f64) {
            return Some(n);
        }
    }
    None
}

/// Plain bullet lines (`- text` or `* text`, not checkboxes) from a
/// free-text response. Fallback when no JSON can be salvaged.
pub fn bullet_lines(raw: &str) -> Vec<String> {
    strip_fences(raw)
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            let rest = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))?;
            if rest.starts_with("[ ]") || rest.starts_with("[x]") {
                return Some(rest[3..].trim().to_string());
            }
            Some(rest.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bare_json() {
        let value = extract_json(r#"[{"task": "Do it"}]"#).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn extract_fenced_json() {
        let raw = "Here you go:\n```json\n[{\"task\": \"Do it\"}]\n```\nLet me know!";
        let value = extract_json(raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[test]
    fn extract_embedded_json() {
        let raw = "I found two tasks: [\"first\", \"second\"] as requested.";
        let value = extract_json(raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn extract_nothing_from_prose() {
        assert!(extract_json("No structured content here.").is_none());
        assert!(extract_json("").is_none());
        assert!(extract_json("   \n \n").is_none());
    }

    #[test]
    fn extract_tolerates_broken_json() {
        assert!(extract_json(r#"[{"task": "unterminated"#).is_none());
    }

    #[test]
    fn array_under_key() {
        let value = extract_json(r#"{"tasks": [{"task": "a"}], "note": "x"}"#).unwrap();
        assert_eq!(array_of(&value, &["tasks", "items"]).unwrap().len(), 1);
        assert!(array_of(&value, &["matches"]).is_none());
    }

    #[test]
    fn string_field_first_match_wins() {
        let value = extract_json(r#"{"task": "", "text": "real one"}"#).unwrap();
        assert_eq!(
            string_field(&value, &["task", "text"]).as_deref(),
            Some("real one")
        );
        assert!(string_field(&value, &["missing"]).is_none());
    }

    #[test]
    fn bullet_fallback() {
        let raw = "Suggestions:\n- First thing\n* Second thing\n- [ ] Third thing\nnot a bullet";
        assert_eq!(
            bullet_lines(raw),
            vec!["First thing", "Second thing", "Third thing"]
        );
    }
}
