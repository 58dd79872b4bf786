//! Task prompt sources: inline text or a prompt file.

use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::core::task::TaskPrompt;
use crate::error::LoopError;

/// Build the task prompt from exactly one source.
///
/// Every failure here is a [`LoopError::Configuration`], raised before any
/// assistant process starts.
pub fn resolve_task_prompt(inline: Option<&str>, file: Option<&Path>) -> Result<TaskPrompt> {
    let text = match (inline, file) {
        (Some(_), Some(_)) => {
            return Err(LoopError::Configuration(
                "give either --prompt or --prompt-file, not both".to_string(),
            )
            .into());
        }
        (Some(text), None) => text.to_string(),
        (None, Some(path)) => {
            debug!(path = %path.display(), "reading prompt file");
            fs::read_to_string(path).map_err(|err| {
                LoopError::Configuration(format!("read prompt file {}: {err}", path.display()))
            })?
        }
        (None, None) => {
            return Err(LoopError::Configuration(
                "no task prompt: pass --prompt <TEXT> or --prompt-file <PATH>".to_string(),
            )
            .into());
        }
    };
    Ok(TaskPrompt::new(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_config_error(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<LoopError>(),
            Some(LoopError::Configuration(_))
        )
    }

    #[test]
    fn inline_prompt_is_used() {
        let prompt = resolve_task_prompt(Some("write tests"), None).expect("prompt");
        assert_eq!(prompt.as_str(), "write tests");
    }

    #[test]
    fn prompt_file_is_read() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("TASK.md");
        fs::write(&path, "# Task\nPort the parser.\n").expect("write");
        let prompt = resolve_task_prompt(None, Some(&path)).expect("prompt");
        assert!(prompt.as_str().contains("Port the parser."));
    }

    #[test]
    fn missing_sources_are_configuration_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(is_config_error(&resolve_task_prompt(None, None).unwrap_err()));
        assert!(is_config_error(
            &resolve_task_prompt(None, Some(&temp.path().join("nope.md"))).unwrap_err()
        ));
        assert!(is_config_error(&resolve_task_prompt(Some("   "), None).unwrap_err()));
        assert!(is_config_error(
            &resolve_task_prompt(Some("a"), Some(&temp.path().join("b.md"))).unwrap_err()
        ));
    }
}
