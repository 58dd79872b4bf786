//! `runloop`: re-invoke an AI coding assistant on one task until it reports
//! `DONE` or the run ceiling is reached.
//!
//! Each run streams into `.runloop/logs/`; `--check` audits the assistant's
//! permission grants for the task instead of running it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use runloop::audit::{AuditMode, AuditOutcome, run_audit};
use runloop::core::types::{CompletionSignal, TerminationOutcome};
use runloop::exit_codes;
use runloop::io::assistant::CliAssistant;
use runloop::io::config::{Overrides, RunConfig};
use runloop::io::run_log::RunRecord;
use runloop::io::task::resolve_task_prompt;
use runloop::io::update::{UpdateCheck, run_update_check};
use runloop::logging;
use runloop::looping::run_loop;

#[derive(Debug, Parser)]
#[command(
    name = "runloop",
    version,
    about = "Re-run an AI coding assistant on one task until it reports DONE"
)]
struct Cli {
    /// Task prompt text.
    #[arg(short, long, conflicts_with = "prompt_file")]
    prompt: Option<String>,
    /// Read the task prompt from a file.
    #[arg(short = 'f', long, value_name = "PATH")]
    prompt_file: Option<PathBuf>,
    /// Maximum number of assistant runs (default from config, else 20).
    #[arg(short = 'n', long, value_name = "N")]
    max_runs: Option<u32>,
    /// Audit the permission grants the task needs instead of running it.
    #[arg(long)]
    check: bool,
    /// With --check, rewrite the grant list instead of only reporting.
    #[arg(short, long, requires = "check")]
    yes: bool,
    /// Skip the pre-run update check.
    #[arg(long)]
    skip_update: bool,
    /// Config file (default: .runloop/config.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("runloop: {err:#}");
            exit_codes::for_error(&err)
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let root = std::env::current_dir().context("resolve working directory")?;
    let prompt = resolve_task_prompt(cli.prompt.as_deref(), cli.prompt_file.as_deref())?;
    let config = RunConfig::load(
        &root,
        cli.config.as_deref(),
        &Overrides {
            max_runs: cli.max_runs,
            skip_update: cli.skip_update,
        },
    )?;
    let assistant = CliAssistant::new(config.assistant.clone(), &config.root);

    if cli.check {
        let mode = if cli.yes {
            AuditMode::Apply
        } else {
            AuditMode::Report
        };
        let outcome = run_audit(&config, &assistant, &prompt, mode)?;
        print_audit(&outcome, &config);
        return Ok(exit_codes::OK);
    }

    match run_update_check(&config.update, &config.root, config.skip_update) {
        Ok(UpdateCheck::Ran(line)) => info!(%line, "update check finished"),
        Ok(_) => {}
        Err(err) => warn!("update check failed, continuing: {err:#}"),
    }

    let max_runs = config.max_runs;
    let outcome = run_loop(&config, &assistant, &prompt, std::io::stdout, |record| {
        eprintln!("runloop: {}", run_summary(record, max_runs));
    })
    .await?;

    match outcome.termination {
        TerminationOutcome::Completed { iterations } => {
            eprintln!("runloop: task completed after {iterations} run(s)");
        }
        TerminationOutcome::Exhausted { iterations } => {
            eprintln!(
                "runloop: warning: reached the run ceiling ({iterations}) without DONE; logs in {}",
                config.log_dir.display()
            );
        }
    }
    Ok(exit_codes::OK)
}

fn run_summary(record: &RunRecord, max_runs: u32) -> String {
    let status = match (record.exit_code, record.signal) {
        _ if record.launch_error.is_some() => "failed to start".to_string(),
        (Some(0), Some(CompletionSignal::Done)) => "DONE".to_string(),
        (Some(0), Some(CompletionSignal::Continue)) => "CONTINUE".to_string(),
        (Some(0), Some(CompletionSignal::Absent)) => "no completion keyword".to_string(),
        (Some(0), None) => "no result".to_string(),
        (Some(code), _) => format!("exit {code}"),
        (None, _) => "killed by signal".to_string(),
    };
    format!(
        "run {}/{max_runs}: {status} ({})",
        record.seq,
        record.log_path.display()
    )
}

fn print_audit(outcome: &AuditOutcome, config: &RunConfig) {
    let settings = config.settings_path.display();
    match outcome {
        AuditOutcome::Missing(grants) if grants.is_empty() => {
            println!("No missing grants in {settings}.");
        }
        AuditOutcome::Missing(grants) => {
            println!("Missing grants (not in {settings}):");
            for grant in grants {
                println!("  {grant}");
            }
            println!("Re-run with --check --yes to apply.");
        }
        AuditOutcome::Applied { added, removed } => {
            println!("Updated {settings}:");
            for grant in added {
                println!("  + {grant}");
            }
            for grant in removed {
                println!("  - {grant}");
            }
        }
        AuditOutcome::Unchanged => println!("{settings} is already up to date."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parse_prompt_and_ceiling() {
        let cli = Cli::parse_from(["runloop", "-p", "fix it", "-n", "3"]);
        assert_eq!(cli.prompt.as_deref(), Some("fix it"));
        assert_eq!(cli.max_runs, Some(3));
        assert!(!cli.check);
    }

    #[test]
    fn prompt_sources_conflict() {
        let err = Cli::try_parse_from(["runloop", "-p", "a", "-f", "TASK.md"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn yes_requires_check() {
        assert!(Cli::try_parse_from(["runloop", "-p", "a", "--yes"]).is_err());
        let cli = Cli::parse_from(["runloop", "-p", "a", "--check", "--yes"]);
        assert!(cli.check && cli.yes);
    }

    #[test]
    fn summary_names_signal_or_exit() {
        let record = RunRecord {
            seq: 2,
            started_at: String::new(),
            ended_at: String::new(),
            exit_code: Some(0),
            signal: Some(CompletionSignal::Done),
            launch_error: None,
            log_path: Path::new("logs/run-002.jsonl").to_path_buf(),
        };
        assert_eq!(
            run_summary(&record, 5),
            "run 2/5: DONE (logs/run-002.jsonl)"
        );
        let failed = RunRecord {
            exit_code: Some(7),
            signal: None,
            ..record
        };
        assert!(run_summary(&failed, 5).contains("exit 7"));
        let unstarted = RunRecord {
            exit_code: None,
            launch_error: Some("spawn `claude`: not found".to_string()),
            ..failed
        };
        assert!(run_summary(&unstarted, 5).contains("failed to start"));
    }
}
