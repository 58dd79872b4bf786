//! Error taxonomy surfaced to the operator.
//!
//! Library functions return `anyhow::Result`; these variants travel inside
//! `anyhow::Error` and are recovered with `downcast_ref` at the CLI edge to
//! pick an exit code.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoopError {
    /// Bad or missing input. Raised before any subprocess runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The assistant exited unsuccessfully; the loop stops without retrying.
    #[error(
        "assistant {} on run {run} (log: {}); {}",
        describe_exit(.exit_code),
        .log_path.display(),
        resume_hint(.remaining)
    )]
    ProcessFailure {
        run: u32,
        exit_code: Option<i32>,
        log_path: PathBuf,
        remaining: u32,
    },

    /// The assistant could not be started; no output was produced.
    #[error(
        "assistant failed to start on run {run}: {detail} (record: {}); {}",
        .log_path.with_extension("meta.json").display(),
        resume_hint(.remaining)
    )]
    LaunchFailure {
        run: u32,
        detail: String,
        log_path: PathBuf,
        remaining: u32,
    },

    /// The assistant exited cleanly but its stream held no result record.
    #[error(
        "assistant produced no result record on run {run} (log: {}); {}",
        .log_path.display(),
        resume_hint(.remaining)
    )]
    MissingResult {
        run: u32,
        log_path: PathBuf,
        remaining: u32,
    },

    /// The assistant's reply did not have the expected structure.
    #[error("invalid assistant response: {0}")]
    InvalidResponse(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

fn resume_hint(remaining: &u32) -> String {
    if *remaining == 0 {
        "no runs remain in this budget".to_string()
    } else {
        format!("resume with --max-runs {remaining}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_failure_message_has_resume_hint() {
        let err = LoopError::ProcessFailure {
            run: 3,
            exit_code: Some(7),
            log_path: PathBuf::from(".runloop/logs/run-003.jsonl"),
            remaining: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("status 7"));
        assert!(msg.contains("run 3"));
        assert!(msg.contains("run-003.jsonl"));
        assert!(msg.contains("--max-runs 7"));
    }

    #[test]
    fn signal_termination_is_described() {
        let err = LoopError::ProcessFailure {
            run: 1,
            exit_code: None,
            log_path: PathBuf::from("log.jsonl"),
            remaining: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("terminated by a signal"));
        assert!(msg.contains("no runs remain"));
    }

    #[test]
    fn launch_failure_points_at_record() {
        let err = LoopError::LaunchFailure {
            run: 1,
            detail: "spawn `claude`: No such file or directory".to_string(),
            log_path: PathBuf::from(".runloop/logs/run-001-20261019T101056.933Z.jsonl"),
            remaining: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains("failed to start on run 1"));
        assert!(msg.contains("run-001-20261019T101056.933Z.meta.json"));
        assert!(msg.contains("resume with --max-runs 9"));
    }
}
