//! Task prompt value and completion-instruction augmentation.

use crate::error::LoopError;

pub const DONE_KEYWORD: &str = "DONE";
pub const CONTINUE_KEYWORD: &str = "CONTINUE";

/// Instruction appended to prompts that do not mention the completion keyword.
pub const COMPLETION_SUFFIX: &str = "\n\n---\n\
When you stop working, finish your final message with a single status word on its own line:\n\
- DONE if the entire task above is complete and verified.\n\
- CONTINUE if work remains for another session.";

/// Operator-supplied task text. Never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPrompt(String);

impl TaskPrompt {
    pub fn new(text: impl Into<String>) -> Result<Self, LoopError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(LoopError::Configuration("task prompt is empty".to_string()));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prompt sent to the assistant on every run.
    pub fn augmented(&self) -> String {
        augment_prompt(&self.0)
    }
}

/// Append [`COMPLETION_SUFFIX`] unless the prompt already contains `DONE`.
///
/// The suffix itself contains `DONE`, so applying this twice is a no-op.
pub fn augment_prompt(prompt: &str) -> String {
    if prompt.contains(DONE_KEYWORD) {
        return prompt.to_string();
    }
    format!("{}{}", prompt.trim_end(), COMPLETION_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_suffix_when_keyword_missing() {
        let out = augment_prompt("Fix the flaky test.\n");
        assert!(out.starts_with("Fix the flaky test."));
        assert!(out.ends_with(COMPLETION_SUFFIX));
    }

    #[test]
    fn leaves_prompt_mentioning_done_untouched() {
        let prompt = "Refactor the parser. Say DONE when finished.";
        assert_eq!(augment_prompt(prompt), prompt);
    }

    #[test]
    fn augmentation_is_idempotent() {
        let once = augment_prompt("Write docs");
        assert_eq!(augment_prompt(&once), once);
    }

    #[test]
    fn lowercase_done_does_not_count() {
        let out = augment_prompt("get it done");
        assert!(out.ends_with(COMPLETION_SUFFIX));
    }

    #[test]
    fn blank_prompt_is_a_configuration_error() {
        let err = TaskPrompt::new("  \n").unwrap_err();
        assert!(matches!(err, LoopError::Configuration(_)));
    }
}
