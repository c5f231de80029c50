//! JSON out of free-form model replies

use serde::de::DeserializeOwned;

use super::AiError;

/// Extract a JSON document from text that might wrap it in markdown fences
/// or surround it with prose
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }

    // Wrapped in ```json ... ``` or ``` ... ```
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim());
        }
    }

    // Prose around a bare document
    let open = trimmed.find(['{', '['])?;
    let close = if trimmed[open..].starts_with('{') {
        trimmed.rfind('}')?
    } else {
        trimmed.rfind(']')?
    };
    (close > open).then(|| &trimmed[open..=close])
}

/// Parse a model reply into `T`
pub fn parse_reply<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let json = extract_json(text).ok_or_else(|| {
        AiError::InvalidResponse("Could not find JSON in model response".to_string())
    })?;
    serde_json::from_str(json)
        .map_err(|e| AiError::InvalidResponse(format!("Unexpected model response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn accepts_bare_json() {
        assert_eq!(extract_json("  {\"a\": 1} "), Some("{\"a\": 1}"));
        assert_eq!(extract_json("[1, 2]"), Some("[1, 2]"));
    }

    #[test]
    fn strips_markdown_fences() {
        let reply = "Here you go:\n```json\n{\"plan\": \"rest\"}\n```\nLet me know.";
        assert_eq!(extract_json(reply), Some("{\"plan\": \"rest\"}"));
        assert_eq!(extract_json("```\n[1]\n```"), Some("[1]"));
    }

    #[test]
    fn finds_json_inside_prose() {
        let value: Value = parse_reply("Sure! {\"x\": true} Hope that helps.").unwrap();
        assert_eq!(value["x"], true);
    }

    #[test]
    fn rejects_replies_without_json() {
        assert!(parse_reply::<Value>("I cannot help with that.").is_err());
    }
}
