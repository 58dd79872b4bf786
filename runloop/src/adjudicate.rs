//! Permission adjudication for the pre-tool-use hook.
//!
//! Every path through this module ends in a [`Decision`]. Internal failures
//! (bad hook input, render errors, assistant failures, unusable replies) become
//! a deny carrying a diagnostic reason.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::types::{Decision, PermissionRequest, Verdict};
use crate::core::verdict::parse_verdict;
use crate::io::assistant::Assistant;
use crate::io::prompt::PromptEngine;

pub const HOOK_EVENT_NAME: &str = "PreToolUse";

/// Ask the assistant whether `request` may proceed.
#[instrument(skip_all, fields(tool = %request.tool_name))]
pub fn adjudicate<A: Assistant>(assistant: &A, request: &PermissionRequest) -> Decision {
    let verdict = evaluate(assistant, request);
    if let Verdict::Malformed(detail) = &verdict {
        warn!(detail = %detail, "adjudication failed, denying");
    }
    let decision = verdict.into_decision();
    info!(decision = decision.as_str(), "adjudicated");
    decision
}

fn evaluate<A: Assistant>(assistant: &A, request: &PermissionRequest) -> Verdict {
    let prompt = match PromptEngine::new().render_adjudication(request) {
        Ok(prompt) => prompt,
        Err(err) => return Verdict::Malformed(format!("render prompt: {err:#}")),
    };
    match assistant.ask(&prompt) {
        Ok(raw) => parse_verdict(&raw),
        Err(err) => Verdict::Malformed(format!("{err:#}")),
    }
}

/// Decide on raw hook stdin. Input that is not a JSON object is denied
/// without consulting the assistant.
pub fn decide_hook_input<A: Assistant>(assistant: &A, raw: &str) -> Decision {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if value.is_object() => {
            adjudicate(assistant, &PermissionRequest::from_hook_value(&value))
        }
        Ok(_) => Verdict::Malformed("hook input is not a JSON object".to_string()).into_decision(),
        Err(err) => Verdict::Malformed(format!("unreadable hook input: {err}")).into_decision(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HookSpecificOutput<'a> {
    hook_event_name: &'static str,
    permission_decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission_decision_reason: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HookOutput<'a> {
    hook_specific_output: HookSpecificOutput<'a>,
}

/// Serialized hook answer for `decision`.
pub fn hook_output(decision: &Decision) -> String {
    let output = HookOutput {
        hook_specific_output: HookSpecificOutput {
            hook_event_name: HOOK_EVENT_NAME,
            permission_decision: decision.as_str(),
            permission_decision_reason: decision.reason(),
        },
    };
    serde_json::to_string(&output).unwrap_or_else(|_| {
        r#"{"hookSpecificOutput":{"hookEventName":"PreToolUse","permissionDecision":"deny","permissionDecisionReason":"permission evaluation failed"}}"#
            .to_string()
    })
}
