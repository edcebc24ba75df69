use once_cell::sync::Lazy;
use regex::Regex;

/// Reasoning blocks some models emit ahead of the answer
static REASONING_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<think>.*?</think>|<think\s*/>|<reasoning>.*?</reasoning>|<internal>.*?</internal>")
        .unwrap()
});

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip reasoning tags and surrounding noise from a raw model reply
pub fn clean_llm_response(response: &str) -> String {
    let cleaned = REASONING_BLOCK_PATTERN.replace_all(response, "");
    MULTIPLE_NEWLINES_PATTERN
        .replace_all(cleaned.trim(), "\n\n")
        .to_string()
}

/// Pull the JSON document out of a cleaned reply.
///
/// Accepts bare JSON, fenced blocks, and prose around a single array or
/// object. Returns the reply unchanged when nothing JSON-shaped is found.
pub fn extract_json_payload(output: &str) -> String {
    let stripped = strip_code_fence(output);
    if serde_json::from_str::<serde_json::Value>(&stripped).is_ok() {
        return stripped;
    }

    let open = stripped.find(|c| c == '[' || c == '{');
    let close = stripped.rfind(|c| c == ']' || c == '}');
    match (open, close) {
        (Some(start), Some(end)) if end > start => stripped[start..=end].to_string(),
        _ => stripped,
    }
}

fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"));
    match body {
        Some(body) => body.trim().trim_end_matches("```").trim().to_string(),
        None => trimmed.to_string(),
    }
}
