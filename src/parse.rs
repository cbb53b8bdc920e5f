use serde_json::Value;

use crate::error::EvalError;

const FENCE: &str = "```";

/// Pulls a JSON value out of free-form model output.
///
/// Models wrap their JSON in code fences or surround it with commentary, so
/// this tries, in order: the fence-stripped text as-is, then the span from
/// the first `{` to the last `}`.
pub fn parse_model_json(raw: &str) -> Result<Value, EvalError> {
    let text = strip_code_fence(raw.trim());

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    if let Some(candidate) = outermost_object_span(text)
        && let Ok(value) = serde_json::from_str::<Value>(candidate)
    {
        return Ok(value);
    }

    Err(EvalError::malformed(text))
}

fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with(FENCE) {
        return text;
    }

    let inner = text.trim_matches('`').trim_start();
    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };
    inner.trim()
}

fn outermost_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
