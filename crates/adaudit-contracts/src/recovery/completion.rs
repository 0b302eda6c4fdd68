use serde_json::Value;

/// Plain text of a provider reply's `content`, which is either a string or
/// a list of blocks. Only text blocks contribute.
pub fn extract_completion_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(block_text)
            .collect::<Vec<&str>>()
            .join("\n")
            .trim()
            .to_string(),
        _ => String::new(),
    }
}

fn block_text(block: &Value) -> Option<&str> {
    match block {
        Value::String(text) => Some(text.as_str()),
        Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("text") => {
            obj.get("text").and_then(Value::as_str)
        }
        _ => None,
    }
}
