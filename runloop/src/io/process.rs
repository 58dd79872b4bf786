//! Blocking child process helper with a timeout and bounded output capture.
//!
//! Used for one-shot assistant calls and the update check. Streaming runs of
//! the loop controller go through `io::session` instead.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CapturedOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Last non-empty stderr line, for short error messages.
    pub fn stderr_tail(&self) -> String {
        String::from_utf8_lossy(&self.stderr)
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

/// Run `cmd` to completion or until `timeout`, capturing both output streams.
///
/// Both pipes are drained on scoped reader threads while the child runs, so a
/// chatty child never blocks on a full pipe. At most `output_limit_bytes` of
/// each stream is kept; the rest is counted and discarded. A child that
/// outlives `timeout` is killed and reported with `timed_out = true`.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CapturedOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let program = cmd.get_program().to_string_lossy().into_owned();
    debug!(%program, "spawning child process");
    let mut child = cmd
        .spawn()
        .inspect_err(|err| error!(%err, %program, "failed to spawn command"))
        .with_context(|| format!("spawn {program}"))?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(anyhow!("{program}: output was not piped"));
    };

    thread::scope(|scope| -> Result<CapturedOutput> {
        let stdout_reader = scope.spawn(move || read_stream_limited(stdout, output_limit_bytes));
        let stderr_reader = scope.spawn(move || read_stream_limited(stderr, output_limit_bytes));

        let (status, timed_out) = match child.wait_timeout(timeout).context("wait for command")? {
            Some(status) => (status, false),
            None => {
                warn!(%program, "command timed out, killing");
                child.kill().context("kill command")?;
                (child.wait().context("wait command after kill")?, true)
            }
        };

        let (stdout, stdout_truncated) = join_reader(stdout_reader).context("stdout")?;
        let (stderr, stderr_truncated) = join_reader(stderr_reader).context("stderr")?;
        if stdout_truncated > 0 || stderr_truncated > 0 {
            warn!(stdout_truncated, stderr_truncated, "output truncated");
        }
        debug!(exit_code = ?status.code(), timed_out, "command finished");

        Ok(CapturedOutput {
            status,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
            timed_out,
        })
    })
}

fn join_reader(handle: ScopedJoinHandle<'_, Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))?
}

/// Keep the first `limit` bytes of `reader`, then drain and count the rest.
fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut kept = Vec::new();
    (&mut reader)
        .take(limit as u64)
        .read_to_end(&mut kept)
        .context("read output")?;
    let discarded = io::copy(&mut reader, &mut io::sink()).context("drain output")?;
    Ok((kept, discarded as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_stdout_and_status() {
        let out = run_command_with_timeout(
            sh("printf 'hello'; echo oops >&2; exit 3"),
            Duration::from_secs(5),
            1024,
        )
        .expect("run");
        assert_eq!(out.stdout_lossy(), "hello");
        assert_eq!(out.stderr_tail(), "oops");
        assert_eq!(out.status.code(), Some(3));
        assert!(!out.timed_out);
    }

    #[test]
    fn truncates_beyond_limit() {
        let out = run_command_with_timeout(
            sh("printf 'abcdef'"),
            Duration::from_secs(5),
            4,
        )
        .expect("run");
        assert_eq!(out.stdout, b"abcd");
        assert_eq!(out.stdout_truncated, 2);
    }

    #[test]
    fn kills_on_timeout() {
        let out = run_command_with_timeout(
            sh("exec sleep 5"),
            Duration::from_millis(100),
            1024,
        )
        .expect("run");
        assert!(out.timed_out);
        assert!(!out.status.success());
    }
}
