//! Line-delimited stream records emitted by the assistant in streaming mode.
//!
//! Each line is an independent JSON object with a `type` discriminator.
//! Only `assistant` and `result` records matter here; everything else
//! (system init, tool results, partial deltas) is ignored.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawRecord {
    Assistant {
        #[serde(default)]
        message: RawMessage,
    },
    Result {
        #[serde(default)]
        result: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: Vec<RawContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawContent {
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

/// A parsed stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text parts of an assistant message, in order.
    AssistantText(Vec<String>),
    /// Final result text of the session.
    Result(String),
    Ignored,
}

/// Parse one stream line. Returns `None` for blank or malformed lines.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let record: RawRecord = serde_json::from_str(line).ok()?;
    Some(match record {
        RawRecord::Assistant { message } => StreamEvent::AssistantText(
            message
                .content
                .into_iter()
                .filter_map(|part| match part {
                    RawContent::Text { text } => Some(text),
                    RawContent::Other => None,
                })
                .collect(),
        ),
        RawRecord::Result { result } => StreamEvent::Result(result),
        RawRecord::Other => StreamEvent::Ignored,
    })
}

/// Human-readable projection of one stream line, if it has any.
pub fn display_text(line: &str) -> Option<String> {
    match parse_line(line)? {
        StreamEvent::AssistantText(parts) => {
            let text = parts.join("\n");
            (!text.trim().is_empty()).then_some(text)
        }
        StreamEvent::Result(result) => (!result.trim().is_empty()).then_some(result),
        StreamEvent::Ignored => None,
    }
}

/// Result text of the last `result` record in a captured stream.
pub fn last_result(stream: &str) -> Option<String> {
    stream
        .lines()
        .filter_map(parse_line)
        .filter_map(|event| match event {
            StreamEvent::Result(text) => Some(text),
            _ => None,
        })
        .last()
}
