//! Re-run an AI coding assistant on one task until it reports `DONE`.
//!
//! - **[`core`]**: Pure logic: prompt augmentation, stream parsing, signal
//!   extraction, verdict parsing, grant list checks. No I/O.
//! - **[`io`]**: Configuration, subprocesses, run logs, the settings file.
//!
//! Orchestration modules ([`looping`], [`adjudicate`], [`audit`]) combine the
//! two to implement the `runloop` and `runloop-hook` binaries.

pub mod adjudicate;
pub mod audit;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
