//! Configuration stored under `.runloop/config.toml`, and the immutable
//! [`RunConfig`] built from it once per process.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LoopError;

/// Config file location relative to the project root.
pub const CONFIG_RELATIVE_PATH: &str = ".runloop/config.toml";

/// File configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to the values in
/// [`Default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunloopConfig {
    /// Iteration ceiling when `--max-runs` is not given.
    pub max_runs: u32,

    /// Directory for per-run stream logs, relative to the project root.
    pub log_dir: PathBuf,

    /// Settings file holding the grant list, relative to the project root.
    pub settings_path: PathBuf,

    /// How long the output projection may drain after the assistant exits.
    pub tail_grace_ms: u64,

    pub assistant: AssistantConfig,

    pub update: UpdateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssistantConfig {
    /// Assistant executable.
    pub program: String,

    /// Extra arguments placed before the runloop-managed ones.
    pub args: Vec<String>,

    /// Passed as `--model` when set.
    pub model: Option<String>,

    /// Wall-clock budget for one-shot calls (adjudication, audit).
    pub ask_timeout_secs: u64,

    /// Truncate captured one-shot output beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateConfig {
    /// Command run before the loop unless `--skip-update` (e.g.
    /// `["claude", "update"]`). Empty disables the check.
    pub command: Vec<String>,

    pub timeout_secs: u64,
}

impl Default for RunloopConfig {
    fn default() -> Self {
        Self {
            max_runs: 20,
            log_dir: PathBuf::from(".runloop/logs"),
            settings_path: PathBuf::from(".claude/settings.local.json"),
            tail_grace_ms: 500,
            assistant: AssistantConfig::default(),
            update: UpdateConfig::default(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            args: Vec::new(),
            model: None,
            ask_timeout_secs: 30,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 60,
        }
    }
}

impl RunloopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_runs == 0 {
            return Err(anyhow!("max_runs must be > 0"));
        }
        if self.assistant.program.trim().is_empty() {
            return Err(anyhow!("assistant.program must be non-empty"));
        }
        if self.assistant.ask_timeout_secs == 0 {
            return Err(anyhow!("assistant.ask_timeout_secs must be > 0"));
        }
        if self.assistant.output_limit_bytes == 0 {
            return Err(anyhow!("assistant.output_limit_bytes must be > 0"));
        }
        if self.update.command.first().is_some_and(|c| c.trim().is_empty()) {
            return Err(anyhow!("update.command must start with a program name"));
        }
        if self.update.timeout_secs == 0 {
            return Err(anyhow!("update.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunloopConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunloopConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = RunloopConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunloopConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RunloopConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path
        .file_name()
        .with_context(|| format!("path missing file name {}", path.display()))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_runs: Option<u32>,
    pub skip_update: bool,
}

/// Immutable runtime configuration shared by every component of one process.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Project root; the assistant runs here.
    pub root: PathBuf,
    pub max_runs: u32,
    pub log_dir: PathBuf,
    pub settings_path: PathBuf,
    pub tail_grace: Duration,
    pub assistant: AssistantConfig,
    pub update: UpdateConfig,
    pub skip_update: bool,
}

impl RunConfig {
    /// Merge file config with CLI overrides. Relative paths resolve against `root`.
    pub fn new(root: &Path, file: RunloopConfig, overrides: &Overrides) -> Result<Self> {
        let max_runs = overrides.max_runs.unwrap_or(file.max_runs);
        if max_runs == 0 {
            return Err(LoopError::Configuration("--max-runs must be > 0".to_string()).into());
        }
        Ok(Self {
            root: root.to_path_buf(),
            max_runs,
            log_dir: root.join(&file.log_dir),
            settings_path: root.join(&file.settings_path),
            tail_grace: Duration::from_millis(file.tail_grace_ms),
            assistant: file.assistant,
            update: file.update,
            skip_update: overrides.skip_update,
        })
    }

    /// Load `config_path` (default: `<root>/.runloop/config.toml`) and apply overrides.
    pub fn load(root: &Path, config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let default_path = root.join(CONFIG_RELATIVE_PATH);
        if let Some(path) = config_path
            && !path.is_file()
        {
            return Err(LoopError::Configuration(format!(
                "config file not found: {}",
                path.display()
            ))
            .into());
        }
        let path = config_path.unwrap_or(&default_path);
        let file = load_config(path)
            .map_err(|err| LoopError::Configuration(format!("{err:#}")))?;
        Self::new(root, file, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RunloopConfig::default());
        assert_eq!(cfg.max_runs, 20);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_RELATIVE_PATH);
        let cfg = RunloopConfig {
            max_runs: 5,
            assistant: AssistantConfig {
                model: Some("sonnet".to_string()),
                ..AssistantConfig::default()
            },
            ..RunloopConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_runs = 3\n[assistant]\nprogram = \"my-claude\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_runs, 3);
        assert_eq!(cfg.assistant.program, "my-claude");
        assert_eq!(cfg.assistant.ask_timeout_secs, 30);
        assert_eq!(cfg.log_dir, PathBuf::from(".runloop/logs"));
    }

    #[test]
    fn zero_max_runs_in_file_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_runs = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("max_runs must be > 0"));
    }

    #[test]
    fn overrides_take_precedence_and_paths_resolve() {
        let root = Path::new("/work/project");
        let cfg = RunConfig::new(
            root,
            RunloopConfig::default(),
            &Overrides {
                max_runs: Some(4),
                skip_update: true,
            },
        )
        .expect("run config");
        assert_eq!(cfg.max_runs, 4);
        assert!(cfg.skip_update);
        assert_eq!(cfg.log_dir, root.join(".runloop/logs"));
        assert_eq!(cfg.settings_path, root.join(".claude/settings.local.json"));
        assert_eq!(cfg.tail_grace, Duration::from_millis(500));
    }

    #[test]
    fn zero_override_is_configuration_error() {
        let err = RunConfig::new(
            Path::new("."),
            RunloopConfig::default(),
            &Overrides {
                max_runs: Some(0),
                skip_update: false,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoopError>(),
            Some(LoopError::Configuration(_))
        ));
    }
}
