//! Stable exit codes for the `runloop` CLI.

use crate::error::LoopError;

/// The task completed, the run ceiling was reached, or check mode finished.
pub const OK: i32 = 0;
/// An assistant run failed or left no result, or any other runtime error.
pub const FAILURE: i32 = 1;
/// Bad or missing input; nothing was started.
pub const CONFIG: i32 = 2;
/// The assistant's reply did not have the expected structure.
pub const INVALID_RESPONSE: i32 = 3;

/// Exit code for an error that reached the CLI edge.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<LoopError>() {
        Some(LoopError::Configuration(_)) => CONFIG,
        Some(LoopError::InvalidResponse(_)) => INVALID_RESPONSE,
        Some(
            LoopError::ProcessFailure { .. }
            | LoopError::LaunchFailure { .. }
            | LoopError::MissingResult { .. },
        )
        | None => FAILURE,
    }
}
