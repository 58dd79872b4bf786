//! Test-only helpers: scripted assistants and `sh`-backed session fixtures.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use serde_json::json;

use crate::io::assistant::Assistant;
use crate::io::config::{
    AssistantConfig, CONFIG_RELATIVE_PATH, Overrides, RunConfig, RunloopConfig, write_config,
};

/// Fixture directory (relative to the project root) read by [`SCRIPT`].
pub const SCRIPT_DIR: &str = ".script";

/// Stand-in for the assistant CLI, run as `sh -c SCRIPT runloop-script <args>`.
///
/// Streaming runs (`--output-format stream-json`) count invocations in
/// `.script/count`, save their arguments to `.script/<n>.args`, print
/// `.script/<n>.jsonl` (or `.script/default.jsonl`) and exit with the code in
/// the matching `.exit` file. One-shot calls print `.script/reply`.
pub const SCRIPT: &str = r#"dir=.script
mkdir -p "$dir"
case " $* " in
  *" stream-json "*) ;;
  *)
    if [ -f "$dir/reply" ]; then cat "$dir/reply"; exit 0; fi
    echo "no scripted reply" >&2
    exit 1
    ;;
esac
n=$(cat "$dir/count" 2>/dev/null || echo 0)
n=$((n + 1))
echo "$n" > "$dir/count"
printf '%s\n' "$@" > "$dir/$n.args"
f="$dir/$n"
[ -f "$f.jsonl" ] || f="$dir/default"
[ -f "$f.jsonl" ] && cat "$f.jsonl"
code=0
[ -f "$f.exit" ] && code=$(cat "$f.exit")
exit "$code"
"#;

/// Assistant config that runs [`SCRIPT`] instead of a real CLI.
pub fn script_assistant_config() -> AssistantConfig {
    AssistantConfig {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            SCRIPT.to_string(),
            "runloop-script".to_string(),
        ],
        ask_timeout_secs: 5,
        ..AssistantConfig::default()
    }
}

/// Write `.runloop/config.toml` under `root` pointing at [`SCRIPT`].
pub fn write_script_config(root: &Path, max_runs: u32) -> Result<PathBuf> {
    let path = root.join(CONFIG_RELATIVE_PATH);
    let cfg = RunloopConfig {
        max_runs,
        tail_grace_ms: 500,
        assistant: script_assistant_config(),
        ..RunloopConfig::default()
    };
    write_config(&path, &cfg)?;
    Ok(path)
}

/// Scratch project with a script config, plus its fixture writer.
///
/// Keep the [`tempfile::TempDir`] alive for as long as the project is used.
pub fn scratch_project(max_runs: u32) -> Result<(tempfile::TempDir, SessionScript)> {
    let temp = tempfile::tempdir().context("create scratch project")?;
    write_script_config(temp.path(), max_runs)?;
    let script = SessionScript::new(temp.path());
    Ok((temp, script))
}

/// In-memory [`RunConfig`] for `root` using [`SCRIPT`].
pub fn script_run_config(root: &Path, max_runs: u32) -> RunConfig {
    let file = RunloopConfig {
        max_runs,
        assistant: script_assistant_config(),
        ..RunloopConfig::default()
    };
    RunConfig::new(
        root,
        file,
        &Overrides {
            max_runs: None,
            skip_update: true,
        },
    )
    .expect("script run config")
}

/// Fixture writer for [`SCRIPT`].
pub struct SessionScript {
    dir: PathBuf,
}

impl SessionScript {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join(SCRIPT_DIR),
        }
    }

    /// Stream lines and exit code for the `run`-th streaming invocation.
    pub fn respond(&self, run: u32, lines: &[String], exit_code: i32) -> Result<()> {
        self.write_fixture(&run.to_string(), lines, exit_code)
    }

    /// Stream lines and exit code for invocations without their own fixture.
    pub fn fallback(&self, lines: &[String], exit_code: i32) -> Result<()> {
        self.write_fixture("default", lines, exit_code)
    }

    /// Raw stdout for one-shot calls.
    pub fn reply(&self, stdout: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).context("create script dir")?;
        fs::write(self.dir.join("reply"), stdout).context("write reply fixture")
    }

    /// Number of streaming invocations so far.
    pub fn invocations(&self) -> u32 {
        fs::read_to_string(self.dir.join("count"))
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Arguments received by the `run`-th streaming invocation.
    pub fn args(&self, run: u32) -> Result<String> {
        fs::read_to_string(self.dir.join(format!("{run}.args"))).context("read args fixture")
    }

    fn write_fixture(&self, name: &str, lines: &[String], exit_code: i32) -> Result<()> {
        fs::create_dir_all(&self.dir).context("create script dir")?;
        let mut body = lines.join("\n");
        body.push('\n');
        fs::write(self.dir.join(format!("{name}.jsonl")), body).context("write stream fixture")?;
        fs::write(self.dir.join(format!("{name}.exit")), exit_code.to_string())
            .context("write exit fixture")
    }
}

pub fn assistant_line(text: &str) -> String {
    json!({
        "type": "assistant",
        "message": {"content": [{"type": "text", "text": text}]}
    })
    .to_string()
}

pub fn result_line(text: &str) -> String {
    json!({"type": "result", "subtype": "success", "result": text}).to_string()
}

/// Assistant with queued one-shot replies; streaming runs go through [`SCRIPT`].
pub struct ScriptedAssistant {
    root: PathBuf,
    replies: RefCell<VecDeque<Result<String, String>>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedAssistant {
    pub fn new(root: &Path, replies: Vec<Result<String, String>>) -> Self {
        Self {
            root: root.to_path_buf(),
            replies: RefCell::new(replies.into()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn replying(root: &Path, reply: &str) -> Self {
        Self::new(root, vec![Ok(reply.to_string())])
    }

    /// Prompts passed to [`Assistant::ask`], in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Assistant for ScriptedAssistant {
    fn session_command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(SCRIPT)
            .arg("runloop-script")
            .arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("stream-json")
            .current_dir(&self.root);
        cmd
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(err)) => Err(anyhow!(err)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}
