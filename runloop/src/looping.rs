//! Multi-run loop driver for `runloop`.

use std::io::Write;

use anyhow::Result;
use tracing::{info, warn};

use crate::core::task::TaskPrompt;
use crate::core::types::{CompletionSignal, TerminationOutcome};
use crate::error::LoopError;
use crate::io::assistant::Assistant;
use crate::io::config::RunConfig;
use crate::io::run_log::RunRecord;
use crate::io::session::{SessionRequest, run_session};

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub termination: TerminationOutcome,
    /// Records of every run, in order.
    pub records: Vec<RunRecord>,
}

/// Run the assistant on `prompt` until it reports `DONE` or `max_runs` is reached.
///
/// Runs are strictly sequential. Stops with [`LoopError::LaunchFailure`] when
/// the assistant cannot be started, [`LoopError::ProcessFailure`] on the
/// first unsuccessful exit and with [`LoopError::MissingResult`] when a clean
/// exit leaves no result record. `display` makes the writer each run's output
/// projection prints to; `on_run` sees every finished run.
pub async fn run_loop<A, W, D, F>(
    config: &RunConfig,
    assistant: &A,
    prompt: &TaskPrompt,
    display: D,
    mut on_run: F,
) -> Result<LoopOutcome>
where
    A: Assistant,
    W: Write + Send + 'static,
    D: Fn() -> W,
    F: FnMut(&RunRecord),
{
    let prompt_text = prompt.augmented();
    let mut records = Vec::new();

    for run in 1..=config.max_runs {
        info!(run, max_runs = config.max_runs, "starting run");
        let record = run_session(
            assistant,
            &SessionRequest {
                seq: run,
                prompt: &prompt_text,
                log_dir: &config.log_dir,
                tail_grace: config.tail_grace,
            },
            display(),
        )
        .await?;
        on_run(&record);
        let remaining = config.max_runs - run;

        if let Some(detail) = &record.launch_error {
            return Err(LoopError::LaunchFailure {
                run,
                detail: detail.clone(),
                log_path: record.log_path.clone(),
                remaining,
            }
            .into());
        }
        if !record.succeeded() {
            return Err(LoopError::ProcessFailure {
                run,
                exit_code: record.exit_code,
                log_path: record.log_path,
                remaining,
            }
            .into());
        }

        match record.signal {
            Some(CompletionSignal::Done) => {
                info!(run, "assistant reported DONE");
                records.push(record);
                return Ok(LoopOutcome {
                    termination: TerminationOutcome::Completed { iterations: run },
                    records,
                });
            }
            Some(CompletionSignal::Continue) => {}
            Some(CompletionSignal::Absent) => {
                warn!(run, log = %record.log_path.display(), "result carried no completion keyword, continuing");
            }
            None => {
                return Err(LoopError::MissingResult {
                    run,
                    log_path: record.log_path,
                    remaining,
                }
                .into());
            }
        }
        records.push(record);
    }

    warn!(max_runs = config.max_runs, "run ceiling reached without DONE");
    Ok(LoopOutcome {
        termination: TerminationOutcome::Exhausted {
            iterations: config.max_runs,
        },
        records,
    })
}
