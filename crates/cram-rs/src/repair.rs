//! Lenient JSON syntax repair for model completions.
//!
//! Language models reliably produce *almost*-valid JSON: fenced in
//! markdown, wrapped in prose, with a trailing comma, or cut off
//! mid-object by a token limit. Rejecting on that noise wastes an
//! expensive retry, so [`repair`] coerces the common cases first:
//!
//! - strips code fences and any prose before/after the object
//! - cuts at the balanced end of the outermost object, dropping trailing junk
//! - closes an unterminated final string and unbalanced brackets/braces
//! - removes trailing commas before `}` and `]`
//!
//! Repair fails only when no JSON object can be located at all; text that
//! survives repair but still doesn't parse is the parse stage's failure.

use crate::error::AttemptError;

/// Coerce a raw completion into its best-effort JSON object text.
pub fn repair(raw: &str) -> Result<String, AttemptError> {
    let text = strip_fences(raw);
    let start = text.find('{').ok_or_else(|| {
        AttemptError::Repair("no JSON object found in completion".to_string())
    })?;
    let candidate = text.get(start..).unwrap_or_default();
    let candidate = match balanced_end(candidate) {
        // A balanced object exists — drop anything after it.
        Some(end) => candidate.get(..=end).unwrap_or(candidate),
        None => candidate,
    };
    let closed = close_open_scopes(candidate);
    Ok(remove_trailing_commas(&closed))
}

/// Strip a markdown code fence, returning the fenced content (or the whole
/// text trimmed when no fence is present).
fn strip_fences(text: &str) -> &str {
    if let Some((_, rest)) = text.split_once("```json") {
        rest.split("```").next().unwrap_or(rest).trim()
    } else if let Some((_, rest)) = text.split_once("```") {
        rest.split("```").next().unwrap_or(rest).trim()
    } else {
        text.trim()
    }
}

/// Byte index of the character that balances the opening brace at the start
/// of `text`, or `None` if the object never closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0i64;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Close an unterminated final string and any unbalanced brackets/braces.
fn close_open_scopes(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = text.to_string();
    if in_string {
        // A trailing lone escape would swallow the closing quote.
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Remove commas that directly precede a closing `}` or `]` (string-aware).
fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = chars.get(i + 1..).and_then(|rest| {
                    rest.iter().find(|c| !c.is_whitespace()).copied()
                });
                if !matches!(next, Some('}' | ']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parses(text: &str) -> serde_json::Value {
        serde_json::from_str(text).expect("repaired text should parse")
    }

    #[test]
    fn valid_json_passes_through() {
        let out = repair(r#"{"a": 1, "b": [2, 3]}"#).unwrap();
        assert_eq!(parses(&out), serde_json::json!({"a": 1, "b": [2, 3]}));
    }

    #[test]
    fn removes_trailing_comma() {
        let out = repair(r#"{"a": 1, "b": [2, 3,],}"#).unwrap();
        assert_eq!(parses(&out), serde_json::json!({"a": 1, "b": [2, 3]}));
    }

    #[test]
    fn strips_json_code_fence() {
        let out = repair("Here you go:\n```json\n{\"a\": 1}\n```\nHope that helps!").unwrap();
        assert_eq!(parses(&out), serde_json::json!({"a": 1}));
    }

    #[test]
    fn strips_bare_code_fence() {
        let out = repair("```\n{\"a\": 1}\n```").unwrap();
        assert_eq!(parses(&out), serde_json::json!({"a": 1}));
    }

    #[test]
    fn drops_prose_around_object() {
        let out = repair("Sure! The result is {\"a\": 1} as requested.").unwrap();
        assert_eq!(parses(&out), serde_json::json!({"a": 1}));
    }

    #[test]
    fn closes_truncated_object() {
        let out = repair(r#"{"title": "Forces", "notes": [{"heading": "One"#).unwrap();
        let value = parses(&out);
        assert_eq!(value["title"], "Forces");
        assert_eq!(value["notes"][0]["heading"], "One");
    }

    #[test]
    fn closes_unterminated_string_mid_value() {
        let out = repair(r#"{"a": "unfinished"#).unwrap();
        assert_eq!(parses(&out)["a"], "unfinished");
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let out = repair(r#"{"code": "if (x) { y(); }"}"#).unwrap();
        assert_eq!(parses(&out)["code"], "if (x) { y(); }");
    }

    #[test]
    fn no_object_at_all_is_a_repair_failure() {
        let err = repair("I'm sorry, I can't produce that.").unwrap_err();
        assert!(err.to_string().contains("no JSON object"));
    }

    #[test]
    fn empty_completion_is_a_repair_failure() {
        assert!(repair("").is_err());
        assert!(repair("   \n  ").is_err());
    }
}
