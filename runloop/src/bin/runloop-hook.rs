//! `runloop-hook`: pre-tool-use permission hook.
//!
//! Reads one permission request from stdin, asks the assistant to adjudicate
//! it, and prints the hook decision. Always exits 0; every failure is a deny.

use std::io::Read;

use runloop::adjudicate::{decide_hook_input, hook_output};
use runloop::core::types::{Decision, Verdict};
use runloop::io::assistant::CliAssistant;
use runloop::io::config::{Overrides, RunConfig};
use runloop::logging;

fn main() {
    logging::init();
    let decision = decide();
    println!("{}", hook_output(&decision));
}

fn decide() -> Decision {
    let mut raw = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut raw) {
        return Verdict::Malformed(format!("read hook input: {err}")).into_decision();
    }
    let config = match std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|root| RunConfig::load(&root, None, &Overrides::default()))
    {
        Ok(config) => config,
        Err(err) => return Verdict::Malformed(format!("{err:#}")).into_decision(),
    };
    let assistant = CliAssistant::new(config.assistant, &config.root);
    decide_hook_input(&assistant, &raw)
}
