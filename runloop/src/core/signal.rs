//! Completion keyword extraction from result text.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::task::{CONTINUE_KEYWORD, DONE_KEYWORD};
use crate::core::types::CompletionSignal;

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({DONE_KEYWORD}|{CONTINUE_KEYWORD})\b"))
        .expect("keyword regex should be valid")
});

/// Classify result text by the last whole-word keyword it contains.
///
/// Matching is case-sensitive. Text with neither keyword is `Absent`.
pub fn extract_signal(text: &str) -> CompletionSignal {
    match KEYWORD.find_iter(text).last().map(|m| m.as_str()) {
        Some(DONE_KEYWORD) => CompletionSignal::Done,
        Some(_) => CompletionSignal::Continue,
        None => CompletionSignal::Absent,
    }
}
