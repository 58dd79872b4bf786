//! One streaming assistant session: spawn, capture to the run log, project, wait.

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::core::signal::extract_signal;
use crate::io::assistant::Assistant;
use crate::io::run_log::{RunLogPaths, RunRecord, create_log, read_last_result, write_record};
use crate::io::tail::Projection;

/// Parameters for one session.
#[derive(Debug, Clone)]
pub struct SessionRequest<'a> {
    pub seq: u32,
    pub prompt: &'a str,
    pub log_dir: &'a std::path::Path,
    /// Drain budget for the projection reader after the process exits.
    pub tail_grace: Duration,
}

/// Run one session and persist its [`RunRecord`].
///
/// The process writes straight into the run log; a projection task tails the
/// same file for display. The signal is read from the log only after both the
/// process and the reader are gone. A process that cannot be spawned still
/// gets a record, with `launch_error` set.
#[instrument(skip_all, fields(seq = request.seq))]
pub async fn run_session<A: Assistant, W: Write + Send + 'static>(
    assistant: &A,
    request: &SessionRequest<'_>,
    display: W,
) -> Result<RunRecord> {
    let started_at = Utc::now();
    let paths = RunLogPaths::new(request.log_dir, request.seq, &started_at);
    let log_file = create_log(&paths)?;

    let mut cmd = assistant.session_command(request.prompt);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(log_file))
        .stderr(Stdio::inherit());
    let program = cmd.get_program().to_string_lossy().into_owned();

    info!(log = %paths.log_path.display(), "starting assistant session");
    let mut child = match tokio::process::Command::from(cmd).kill_on_drop(true).spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(%program, %err, "assistant failed to start");
            let record = RunRecord {
                seq: request.seq,
                started_at: started_at.to_rfc3339(),
                ended_at: Utc::now().to_rfc3339(),
                exit_code: None,
                signal: None,
                launch_error: Some(format!("spawn `{program}`: {err}")),
                log_path: paths.log_path.clone(),
            };
            write_record(&paths, &record)?;
            return Ok(record);
        }
    };

    let projection = Projection::start(paths.log_path.clone(), display);
    let status = child.wait().await;
    // Stop the reader before acting on the status so it never outlives the run.
    projection.stop(request.tail_grace).await;
    let status = status.context("wait for assistant")?;
    let ended_at = Utc::now();

    let signal = if status.success() {
        read_last_result(&paths.log_path)?.map(|text| extract_signal(&text))
    } else {
        warn!(exit_code = ?status.code(), "assistant session failed");
        None
    };
    debug!(exit_code = ?status.code(), ?signal, "session finished");

    let record = RunRecord {
        seq: request.seq,
        started_at: started_at.to_rfc3339(),
        ended_at: ended_at.to_rfc3339(),
        exit_code: status.code(),
        signal,
        launch_error: None,
        log_path: paths.log_path.clone(),
    };
    write_record(&paths, &record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CompletionSignal;
    use crate::test_support::{ScriptedAssistant, SessionScript, assistant_line, result_line};

    #[tokio::test]
    async fn captures_stream_and_extracts_signal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = SessionScript::new(temp.path());
        script
            .respond(1, &[assistant_line("thinking"), result_line("All good. DONE")], 0)
            .expect("script");
        let assistant = ScriptedAssistant::new(temp.path(), Vec::new());
        let log_dir = temp.path().join("logs");

        let record = run_session(
            &assistant,
            &SessionRequest {
                seq: 1,
                prompt: "do it",
                log_dir: &log_dir,
                tail_grace: Duration::from_millis(500),
            },
            std::io::sink(),
        )
        .await
        .expect("session");

        assert_eq!(record.exit_code, Some(0));
        assert_eq!(record.signal, Some(CompletionSignal::Done));
        let log = std::fs::read_to_string(&record.log_path).expect("read log");
        assert!(log.contains("thinking"));
        assert!(record.log_path.with_extension("meta.json").is_file());
    }

    #[tokio::test]
    async fn failed_session_has_no_signal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = SessionScript::new(temp.path());
        script
            .respond(1, &[result_line("DONE")], 4)
            .expect("script");
        let assistant = ScriptedAssistant::new(temp.path(), Vec::new());
        let log_dir = temp.path().join("logs");

        let record = run_session(
            &assistant,
            &SessionRequest {
                seq: 1,
                prompt: "do it",
                log_dir: &log_dir,
                tail_grace: Duration::from_millis(500),
            },
            std::io::sink(),
        )
        .await
        .expect("session");

        assert_eq!(record.exit_code, Some(4));
        assert_eq!(record.signal, None);
    }
}
