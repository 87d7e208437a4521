//! Pulling a JSON object out of free-form model text

use serde_json::Value;

/// Parse the text between the first `{` and the last `}` as JSON
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_from_surrounding_prose() {
        let text = "물론입니다! 레시피입니다:\n{\"recipeName\": \"김치전\", \"servings\": 2}\n맛있게 드세요.";
        assert_eq!(
            extract_json_object(text),
            Some(json!({"recipeName": "김치전", "servings": 2}))
        );
    }

    #[test]
    fn test_nested_braces_use_outermost_pair() {
        let text = "```json\n{\"a\": {\"b\": 1}}\n```";
        assert_eq!(extract_json_object(text), Some(json!({"a": {"b": 1}})));
    }

    #[test]
    fn test_no_object_or_broken_json() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
        assert_eq!(extract_json_object("{\"a\": }"), None);
    }
}
