//! I/O helpers: configuration, subprocesses, logs and the settings file.

pub mod assistant;
pub mod config;
pub mod process;
pub mod prompt;
pub mod run_log;
pub mod session;
pub mod settings;
pub mod tail;
pub mod task;
pub mod update;
