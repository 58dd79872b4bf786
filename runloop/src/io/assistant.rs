//! Assistant abstraction for agent invocation.
//!
//! The [`Assistant`] trait decouples the loop controller, the adjudicator and
//! the audit mode from the actual CLI (currently `claude`). Tests use scripted
//! assistants that return predetermined replies without calling a model.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::io::config::AssistantConfig;
use crate::io::process::run_command_with_timeout;

/// Abstraction over assistant backends.
pub trait Assistant {
    /// Command for one streaming work session on `prompt`.
    ///
    /// The caller owns stdio redirection and process lifetime. The command must
    /// write line-delimited stream records to stdout.
    fn session_command(&self, prompt: &str) -> Command;

    /// Ask a single non-interactive question and return the raw stdout.
    fn ask(&self, prompt: &str) -> Result<String>;
}

/// Assistant backed by an external CLI (`claude -p ...`).
#[derive(Debug, Clone)]
pub struct CliAssistant {
    config: AssistantConfig,
    workdir: PathBuf,
}

impl CliAssistant {
    pub fn new(config: AssistantConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            workdir: workdir.into(),
        }
    }

    fn base_command(&self, prompt: &str, output_format: &str) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg(output_format);
        if let Some(model) = &self.config.model {
            cmd.arg("--model").arg(model);
        }
        cmd.current_dir(&self.workdir);
        cmd
    }
}

impl Assistant for CliAssistant {
    fn session_command(&self, prompt: &str) -> Command {
        let mut cmd = self.base_command(prompt, "stream-json");
        // Print mode only emits stream-json together with --verbose.
        cmd.arg("--verbose");
        cmd
    }

    #[instrument(skip_all, fields(program = %self.config.program, timeout_secs = self.config.ask_timeout_secs))]
    fn ask(&self, prompt: &str) -> Result<String> {
        info!("asking assistant");
        let timeout = Duration::from_secs(self.config.ask_timeout_secs);
        let output = run_command_with_timeout(
            self.base_command(prompt, "json"),
            timeout,
            self.config.output_limit_bytes,
        )?;

        if output.timed_out {
            warn!("assistant call timed out");
            return Err(anyhow!(
                "{} timed out after {:?}",
                self.config.program,
                timeout
            ));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "assistant call failed");
            let stderr = output.stderr_tail();
            return Err(anyhow!(
                "{} failed with status {:?}{}",
                self.config.program,
                output.status.code(),
                if stderr.is_empty() {
                    String::new()
                } else {
                    format!(": {stderr}")
                }
            ));
        }

        debug!(bytes = output.stdout.len(), "assistant replied");
        Ok(output.stdout_lossy())
    }
}
