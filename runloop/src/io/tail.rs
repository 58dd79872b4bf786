//! Best-effort projection of a growing stream log onto the terminal.
//!
//! The reader never influences capture or signal detection: those are computed
//! from the persisted log after the assistant exits.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::stream::display_text;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A running projection task and the token that stops it.
pub struct Projection<W> {
    handle: JoinHandle<W>,
    cancel: CancellationToken,
}

impl<W: Write + Send + 'static> Projection<W> {
    /// Start tailing `log_path`, writing readable text to `out`.
    pub fn start(log_path: PathBuf, out: W) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut out = out;
            match project_log(&log_path, &mut out, &token).await {
                Ok(lines) => debug!(lines, log = %log_path.display(), "projection finished"),
                Err(err) => warn!(err = %format!("{err:#}"), "projection stopped early"),
            }
            out
        });
        Self { handle, cancel }
    }

    /// Cancel the reader, let it drain for up to `grace`, then abort it.
    ///
    /// Returns the writer when the task finished on its own.
    pub async fn stop(self, grace: Duration) -> Option<W> {
        let Self { mut handle, cancel } = self;
        cancel.cancel();
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(out)) => Some(out),
            Ok(Err(err)) => {
                warn!(err = %err, "projection task failed");
                None
            }
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "projection did not drain in time, aborting");
                handle.abort();
                // Wait for the abort so no reader outlives this call.
                let _ = handle.await;
                None
            }
        }
    }
}

/// Tail `path` until cancelled, then drain what is left. Returns lines shown.
async fn project_log<W: Write>(
    path: &Path,
    out: &mut W,
    cancel: &CancellationToken,
) -> Result<usize> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut pending = String::new();
    let mut shown = 0usize;

    loop {
        let n = reader
            .read_line(&mut pending)
            .await
            .context("read run log")?;
        if n > 0 {
            // A line without its newline is still being written; keep it.
            if pending.ends_with('\n') {
                shown += emit(out, &pending)?;
                pending.clear();
                // Buffered reads never suspend; give abort a chance to land.
                tokio::task::yield_now().await;
            }
            continue;
        }
        if cancel.is_cancelled() {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }

    if !pending.trim().is_empty() {
        shown += emit(out, &pending)?;
    }
    Ok(shown)
}

fn emit<W: Write>(out: &mut W, line: &str) -> Result<usize> {
    let Some(text) = display_text(line) else {
        return Ok(0);
    };
    writeln!(out, "{text}").context("write projection")?;
    out.flush().context("flush projection")?;
    Ok(1)
}
