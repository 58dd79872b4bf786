//! Optional pre-run update check.
//!
//! The updater itself is external; runloop only runs the configured command
//! and reports how it went. A failed check never stops the loop.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{info, instrument};

use crate::io::config::UpdateConfig;
use crate::io::process::run_command_with_timeout;

const UPDATE_OUTPUT_LIMIT_BYTES: usize = 64_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// `--skip-update` was given.
    Skipped,
    /// No update command is configured.
    Disabled,
    /// The command ran successfully; carries its last output line.
    Ran(String),
}

#[instrument(skip_all, fields(skipped = skip))]
pub fn run_update_check(config: &UpdateConfig, workdir: &Path, skip: bool) -> Result<UpdateCheck> {
    if skip {
        return Ok(UpdateCheck::Skipped);
    }
    let Some((program, args)) = config.command.split_first() else {
        return Ok(UpdateCheck::Disabled);
    };

    info!(program, "running update check");
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(workdir);
    let output = run_command_with_timeout(
        cmd,
        Duration::from_secs(config.timeout_secs),
        UPDATE_OUTPUT_LIMIT_BYTES,
    )?;
    if output.timed_out {
        return Err(anyhow!(
            "update check timed out after {}s",
            config.timeout_secs
        ));
    }
    if !output.status.success() {
        return Err(anyhow!(
            "update check failed with status {:?}: {}",
            output.status.code(),
            output.stderr_tail()
        ));
    }
    let stdout = output.stdout_lossy();
    let last = stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .to_string();
    Ok(UpdateCheck::Ran(last))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh_update(script: &str) -> UpdateConfig {
        UpdateConfig {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            timeout_secs: 5,
        }
    }

    #[test]
    fn skip_and_disabled() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            run_update_check(&sh_update("exit 1"), temp.path(), true).expect("skip"),
            UpdateCheck::Skipped
        );
        assert_eq!(
            run_update_check(&UpdateConfig::default(), temp.path(), false).expect("disabled"),
            UpdateCheck::Disabled
        );
    }

    #[test]
    fn reports_last_line() {
        let temp = tempfile::tempdir().expect("tempdir");
        let check = run_update_check(
            &sh_update("echo checking; echo 'already up to date'"),
            temp.path(),
            false,
        )
        .expect("ran");
        assert_eq!(check, UpdateCheck::Ran("already up to date".to_string()));
    }

    #[test]
    fn failure_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = run_update_check(&sh_update("echo offline >&2; exit 3"), temp.path(), false)
            .unwrap_err();
        assert!(err.to_string().contains("offline"));
    }
}
