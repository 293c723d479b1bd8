use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::lenient::decode_lenient_object;
use super::StructuringError;
use crate::models::CandidateRecord;

/// Parse a model reply into a candidate record.
///
/// The reply may be fenced, wrapped in prose, or written in relaxed
/// object-literal syntax. The span is looked up in the unfenced reply first
/// and then in the raw reply, which keeps braces that share a line with a
/// fence. Fails with `NoObjectFound` when no `{ … }` span exists and with
/// `Decode` when no span can be decoded into an object.
pub fn parse_candidate_response(raw: &str) -> Result<CandidateRecord, StructuringError> {
    let unfenced = strip_code_fence(raw);
    let spans = candidate_span(&unfenced).into_iter().chain(candidate_span(raw));

    let mut first_error = None;
    for span in spans {
        match decode_lenient_object(&strip_code_fence(span)) {
            Ok(map) => {
                tracing::debug!(fields = map.len(), "Parsed candidate response");
                return Ok(CandidateRecord::from_map(map));
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(first_error.unwrap_or(StructuringError::NoObjectFound))
}

/// Drop the first and last line when the trimmed text is bounded by ``` fences.
pub fn strip_code_fence(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim();
    if !(trimmed.starts_with("```") && trimmed.ends_with("```")) {
        return Cow::Borrowed(trimmed);
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() <= 2 {
        return Cow::Borrowed("");
    }
    Cow::Owned(lines[1..lines.len() - 1].join("\n"))
}

static OBJECT_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"));

/// From the first `{` to the last `}`, inclusive.
pub fn candidate_span(text: &str) -> Option<&str> {
    OBJECT_SPAN.find(text).map(|m| m.as_str())
}
