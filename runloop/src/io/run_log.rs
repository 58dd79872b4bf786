//! Per-run stream logs and run records under the log directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::stream::last_result;
use crate::core::types::CompletionSignal;

/// Everything known about one finished run. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub seq: u32,
    pub started_at: String,
    pub ended_at: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// `None` when the run failed or its stream held no result record.
    pub signal: Option<CompletionSignal>,
    /// Set when the assistant could not be started at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_error: Option<String>,
    pub log_path: PathBuf,
}

impl RunRecord {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone)]
pub struct RunLogPaths {
    pub log_path: PathBuf,
    pub record_path: PathBuf,
}

impl RunLogPaths {
    /// Paths keyed by sequence number and start time, so runs never collide.
    pub fn new(log_dir: &Path, seq: u32, started_at: &DateTime<Utc>) -> Self {
        let stem = format!("run-{seq:03}-{}", started_at.format("%Y%m%dT%H%M%S%.3fZ"));
        Self {
            log_path: log_dir.join(format!("{stem}.jsonl")),
            record_path: log_dir.join(format!("{stem}.meta.json")),
        }
    }
}

/// Create the stream log (and its directory) for a run.
pub fn create_log(paths: &RunLogPaths) -> Result<fs::File> {
    if let Some(parent) = paths.log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    fs::File::create(&paths.log_path)
        .with_context(|| format!("create run log {}", paths.log_path.display()))
}

pub fn write_record(paths: &RunLogPaths, record: &RunRecord) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(record).context("serialize run record")?;
    buf.push('\n');
    fs::write(&paths.record_path, buf)
        .with_context(|| format!("write {}", paths.record_path.display()))
}

/// Result text of the last `result` record in a persisted stream log.
pub fn read_last_result(log_path: &Path) -> Result<Option<String>> {
    let bytes = fs::read(log_path).with_context(|| format!("read {}", log_path.display()))?;
    Ok(last_result(&String::from_utf8_lossy(&bytes)))
}

/// Stream logs in `log_dir`, sorted by name (sequence, then time).
pub fn list_logs(log_dir: &Path) -> Result<Vec<PathBuf>> {
    if !log_dir.exists() {
        return Ok(Vec::new());
    }
    let mut logs = Vec::new();
    for entry in fs::read_dir(log_dir).with_context(|| format!("read {}", log_dir.display()))? {
        let path = entry.context("read log dir entry")?.path();
        if path.extension().is_some_and(|ext| ext == "jsonl") {
            logs.push(path);
        }
    }
    logs.sort();
    Ok(logs)
}
