//! Recovering structured JSON from one-shot assistant replies.
//!
//! In JSON output mode the assistant prints an envelope whose `result` field
//! holds the model's text. That text usually contains the requested object,
//! sometimes wrapped in a code fence or surrounded by prose.

use serde_json::Value;

/// Model text carried by a one-shot reply.
///
/// Unwraps the `{"type":"result","result":...}` envelope when present and
/// falls back to the raw output otherwise.
pub fn reply_text(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty reply".to_string());
    }
    if let Ok(Value::Object(envelope)) = serde_json::from_str::<Value>(trimmed)
        && envelope.get("type").and_then(Value::as_str) == Some("result")
    {
        if envelope.get("is_error").and_then(Value::as_bool) == Some(true) {
            return Err("assistant reported an error result".to_string());
        }
        return match envelope.get("result") {
            Some(Value::String(text)) => Ok(text.clone()),
            _ => Err("result envelope has no text".to_string()),
        };
    }
    Ok(trimmed.to_string())
}

/// The one JSON object embedded in `text`.
///
/// A reply that is itself JSON must be an object. Otherwise every top-level
/// `{...}` in the text (fenced or inline) is a candidate; repeats of an
/// identical object count once. No candidate, or more than one distinct
/// candidate, is an error.
pub fn single_json_object(text: &str) -> Result<Value, String> {
    let mut objects = match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ Value::Object(_)) => vec![value],
        Ok(_) => Vec::new(),
        Err(_) => embedded_objects(text),
    };
    match objects.len() {
        0 => Err("reply contains no JSON object".to_string()),
        1 => Ok(objects.remove(0)),
        n => Err(format!("reply contains {n} different JSON objects")),
    }
}

fn embedded_objects(text: &str) -> Vec<Value> {
    let mut found: Vec<Value> = Vec::new();
    let mut pos = 0;
    while let Some(offset) = text[pos..].find('{') {
        let start = pos + offset;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value @ Value::Object(_))) => {
                // Skip past the object so nested objects are not candidates.
                pos = start + stream.byte_offset();
                if !found.contains(&value) {
                    found.push(value);
                }
            }
            _ => pos = start + 1,
        }
    }
    found
}
