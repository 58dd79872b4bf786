//! Shared deterministic types for the loop controller and the adjudicator.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Completion keyword found in the final `result` record of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionSignal {
    /// The assistant declared more work remains.
    Continue,
    /// The assistant declared the whole task complete.
    Done,
    /// A result record exists but carries neither keyword.
    Absent,
}

/// How a loop run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// A run reported `DONE`.
    Completed { iterations: u32 },
    /// The iteration ceiling was reached without `DONE`.
    Exhausted { iterations: u32 },
}

/// A single operation the host asks permission for.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionRequest {
    pub tool_name: String,
    pub tool_input: Value,
}

impl PermissionRequest {
    /// Extract the request from an arbitrary hook payload.
    ///
    /// Missing or mistyped fields collapse to an empty name / empty object.
    pub fn from_hook_value(value: &Value) -> Self {
        let tool_name = value
            .get("tool_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let tool_input = match value.get("tool_input") {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(other) => other.clone(),
        };
        Self {
            tool_name,
            tool_input,
        }
    }
}

/// Final answer for one permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny { .. } => "deny",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason } => Some(reason),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Adjudication reply after parsing, before it reaches calling code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Parsed(Decision),
    /// The reply (or the call producing it) was unusable; carries a diagnostic.
    Malformed(String),
}

/// Prefix of every deny reason produced by a failed evaluation.
pub const EVALUATION_FAILED: &str = "permission evaluation failed";

impl Verdict {
    /// Collapse to a decision. Malformed replies always deny.
    pub fn into_decision(self) -> Decision {
        match self {
            Self::Parsed(decision) => decision,
            Self::Malformed(detail) => {
                let detail = detail.trim();
                let reason = if detail.is_empty() {
                    EVALUATION_FAILED.to_string()
                } else {
                    format!("{EVALUATION_FAILED}: {detail}")
                };
                Decision::Deny { reason }
            }
        }
    }
}
