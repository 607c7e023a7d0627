//! Lenient JSON salvage.
//!
//! Upstream producers sometimes wrap the JSON object in noise (a BOM, a log
//! prefix, trailing padding bytes). Everything before the first `{` and
//! after the last `}` is discarded.

use serde_json::Value;

/// The span from the first `{` to the last `}`, inclusive.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Salvage and parse a JSON object. Non-objects count as failures.
pub fn parse_lenient(text: &str) -> Option<Value> {
    let candidate = extract_json_object(text)?;
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

/// `^\s*{.+}\s*$` across lines: the shape a correctly decrypted body has.
pub fn looks_structured(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.len() >= 3 && trimmed.starts_with('{') && trimmed.ends_with('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_object_from_noise() {
        let text = "\u{feff}garbage {\"a\": {\"b\": 1}} trailing\0\0";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(parse_lenient(text).unwrap()["a"]["b"], 1);
    }

    #[test]
    fn test_no_object_is_none() {
        assert_eq!(extract_json_object("} backwards {"), None);
        assert!(parse_lenient("plain text").is_none());
        assert!(parse_lenient("{not: json}").is_none());
    }

    #[test]
    fn test_looks_structured() {
        assert!(looks_structured("  {\"Events\": []}\n"));
        assert!(looks_structured("{\n  \"a\": 1\n}"));
        assert!(!looks_structured("{}"));
        assert!(!looks_structured("\u{1}\u{7f}{x"));
    }
}
