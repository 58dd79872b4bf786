//! Audit ("check") mode: compare the grant list against what a task needs.

use anyhow::Result;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::grants::{missing_grants, same_grants, validate_grant_list};
use crate::core::reply::{reply_text, single_json_object};
use crate::core::task::TaskPrompt;
use crate::error::LoopError;
use crate::io::assistant::Assistant;
use crate::io::config::RunConfig;
use crate::io::prompt::PromptEngine;
use crate::io::settings::{read_grants, write_grants};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditMode {
    /// Print missing grants; never writes.
    Report,
    /// Rewrite the grant list from the assistant's proposal.
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    Missing(Vec<String>),
    Applied {
        added: Vec<String>,
        removed: Vec<String>,
    },
    Unchanged,
}

#[instrument(skip_all, fields(?mode, settings = %config.settings_path.display()))]
pub fn run_audit<A: Assistant>(
    config: &RunConfig,
    assistant: &A,
    prompt: &TaskPrompt,
    mode: AuditMode,
) -> Result<AuditOutcome> {
    let current = read_grants(&config.settings_path)?;
    info!(grants = current.len(), "auditing grant list");
    let request = PromptEngine::new().render_audit(
        prompt.as_str(),
        &current,
        mode == AuditMode::Apply,
    )?;
    let reply = reply_object(&assistant.ask(&request)?)?;

    match mode {
        AuditMode::Report => {
            let proposed = string_list(&reply, "missing")?;
            Ok(AuditOutcome::Missing(missing_grants(&current, &proposed)))
        }
        AuditMode::Apply => {
            let proposed = validate_grant_list(&reply).map_err(|violations| {
                warn!(count = violations.len(), "rejected proposed grant list");
                LoopError::InvalidResponse(format!(
                    "proposed grant list rejected: {}",
                    violations.join("; ")
                ))
            })?;
            if same_grants(&current, &proposed) {
                return Ok(AuditOutcome::Unchanged);
            }
            write_grants(&config.settings_path, &proposed)?;
            Ok(AuditOutcome::Applied {
                added: missing_grants(&current, &proposed),
                removed: missing_grants(&proposed, &current),
            })
        }
    }
}

fn reply_object(raw: &str) -> Result<Value, LoopError> {
    let text = reply_text(raw).map_err(LoopError::InvalidResponse)?;
    single_json_object(&text).map_err(LoopError::InvalidResponse)
}

fn string_list(object: &Value, key: &str) -> Result<Vec<String>, LoopError> {
    let items = object
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| LoopError::InvalidResponse(format!("reply has no `{key}` array")))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                LoopError::InvalidResponse(format!("`{key}` holds a non-string entry"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedAssistant, script_run_config};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn seeded(root: &std::path::Path, grants: &[&str]) -> RunConfig {
        let config = script_run_config(root, 1);
        write_grants(&config.settings_path, &strings(grants)).expect("seed grants");
        config
    }

    fn is_invalid_response(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<LoopError>(),
            Some(LoopError::InvalidResponse(_))
        )
    }

    #[test]
    fn report_lists_only_missing_grants() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = seeded(temp.path(), &["git"]);
        let assistant = ScriptedAssistant::replying(
            temp.path(),
            r#"{"type":"result","result":"```json\n{\"missing\": [\"git\", \"Bash(npm test:*)\"]}\n```"}"#,
        );
        let prompt = TaskPrompt::new("Add a test suite").expect("prompt");

        let outcome = run_audit(&config, &assistant, &prompt, AuditMode::Report).expect("audit");

        assert_eq!(
            outcome,
            AuditOutcome::Missing(strings(&["Bash(npm test:*)"]))
        );
        assert!(assistant.asked()[0].contains("- git"));
        assert_eq!(
            read_grants(&config.settings_path).expect("read"),
            strings(&["git"])
        );
    }

    #[test]
    fn report_rejects_unstructured_reply() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = seeded(temp.path(), &[]);
        let assistant = ScriptedAssistant::replying(temp.path(), "You probably need npm.");
        let prompt = TaskPrompt::new("Add a test suite").expect("prompt");

        let err = run_audit(&config, &assistant, &prompt, AuditMode::Report).unwrap_err();
        assert!(is_invalid_response(&err));
    }

    #[test]
    fn apply_writes_validated_list() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = seeded(temp.path(), &["git", "npm"]);
        let assistant = ScriptedAssistant::replying(
            temp.path(),
            r#"{"allow": ["git", "Bash(cargo test:*)"]}"#,
        );
        let prompt = TaskPrompt::new("Port to Rust").expect("prompt");

        let outcome = run_audit(&config, &assistant, &prompt, AuditMode::Apply).expect("audit");

        assert_eq!(
            outcome,
            AuditOutcome::Applied {
                added: strings(&["Bash(cargo test:*)"]),
                removed: strings(&["npm"]),
            }
        );
        assert!(same_grants(
            &read_grants(&config.settings_path).expect("read"),
            &strings(&["git", "Bash(cargo test:*)"])
        ));
    }

    #[test]
    fn apply_with_same_set_is_unchanged() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = seeded(temp.path(), &["git", "npm"]);
        let assistant = ScriptedAssistant::replying(temp.path(), r#"{"allow": ["npm", "git"]}"#);
        let prompt = TaskPrompt::new("Port to Rust").expect("prompt");

        let outcome = run_audit(&config, &assistant, &prompt, AuditMode::Apply).expect("audit");
        assert_eq!(outcome, AuditOutcome::Unchanged);
    }

    #[test]
    fn invalid_candidate_leaves_settings_untouched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = seeded(temp.path(), &["git", "npm"]);
        let before = std::fs::read_to_string(&config.settings_path).expect("read");
        let assistant =
            ScriptedAssistant::replying(temp.path(), r#"{"allow": ["git", "", "git"]}"#);
        let prompt = TaskPrompt::new("Port to Rust").expect("prompt");

        let err = run_audit(&config, &assistant, &prompt, AuditMode::Apply).unwrap_err();

        assert!(is_invalid_response(&err));
        assert_eq!(
            std::fs::read_to_string(&config.settings_path).expect("read"),
            before
        );
        assert_eq!(
            read_grants(&config.settings_path).expect("read"),
            strings(&["git", "npm"])
        );
    }
}
