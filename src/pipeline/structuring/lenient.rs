//! Tolerant decoding of model-written object literals.
//!
//! Models drift between strict JSON, JavaScript object literals and Python
//! dict reprs. Strict `serde_json` is tried first; on failure the text is
//! rewritten into JSON by [`normalize_relaxed`] and decoded again.
//!
//! Accepted relaxations:
//! - single-quoted strings
//! - bareword keys (`{Name: "x"}`)
//! - trailing commas before `}` / `]`
//! - Python `True` / `False` / `None` and JavaScript `undefined`
//! - `//` line and `/* */` block comments
//! - raw newlines and tabs inside strings

use serde_json::{Map, Value};

use super::StructuringError;

/// Decode `text` as a JSON object, relaxing the syntax if strict decoding fails.
pub fn decode_lenient_object(text: &str) -> Result<Map<String, Value>, StructuringError> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(strict) => {
            let normalized = normalize_relaxed(text);
            serde_json::from_str::<Value>(&normalized).map_err(|relaxed| {
                tracing::debug!(strict = %strict, relaxed = %relaxed, "Lenient decode failed");
                StructuringError::Decode(relaxed.to_string())
            })?
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(StructuringError::Decode(format!(
            "expected an object, found {}",
            value_kind(&other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Rewrite relaxed object-literal syntax into strict JSON.
///
/// Only the relaxations listed in the module docs are handled; anything else
/// is copied through unchanged and left for `serde_json` to reject.
pub fn normalize_relaxed(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => i = copy_string(&chars, i, &mut out),
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            ',' => {
                if !matches!(next_significant(&chars, i + 1), Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "True" | "true" => out.push_str("true"),
                    "False" | "false" => out.push_str("false"),
                    "None" | "null" | "undefined" => out.push_str("null"),
                    _ if next_significant(&chars, i) == Some(':') => {
                        out.push('"');
                        out.push_str(&word);
                        out.push('"');
                    }
                    _ => out.push_str(&word),
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Copy a quoted string starting at `start` as a double-quoted JSON string.
/// Returns the index just past the closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    out.push('"');

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                match chars.get(i + 1) {
                    // \' is not a JSON escape
                    Some('\'') => out.push('\''),
                    Some(&next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => out.push('\\'),
                }
                i += 2;
                continue;
            }
            c if c == quote => {
                out.push('"');
                return i + 1;
            }
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
        i += 1;
    }

    // Unterminated: leave it open so the strict decoder reports it
    i
}

/// Next character that is not whitespace or inside a comment.
fn next_significant(chars: &[char], mut i: usize) -> Option<char> {
    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            c => return Some(c),
        }
    }
    None
}
