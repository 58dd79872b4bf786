//! Parsing adjudication replies into a [`Verdict`].

use serde::Deserialize;

use crate::core::reply::{reply_text, single_json_object};
use crate::core::types::{Decision, Verdict};

/// Reason used when the assistant denies without explaining why.
pub const DEFAULT_DENY_REASON: &str = "denied by permission policy";

#[derive(Debug, Deserialize)]
struct DecisionReply {
    decision: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Parse the raw stdout of an adjudication call.
pub fn parse_verdict(raw: &str) -> Verdict {
    let text = match reply_text(raw) {
        Ok(text) => text,
        Err(err) => return Verdict::Malformed(err),
    };
    let object = match single_json_object(&text) {
        Ok(object) => object,
        Err(err) => return Verdict::Malformed(err),
    };
    let reply: DecisionReply = match serde_json::from_value(object) {
        Ok(reply) => reply,
        Err(err) => return Verdict::Malformed(format!("unexpected reply shape: {err}")),
    };
    match reply.decision.trim().to_ascii_lowercase().as_str() {
        "allow" => Verdict::Parsed(Decision::Allow),
        "deny" => {
            let reason = reply
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_DENY_REASON.to_string());
            Verdict::Parsed(Decision::Deny { reason })
        }
        other => Verdict::Malformed(format!("unknown decision `{other}`")),
    }
}
