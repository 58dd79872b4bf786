//! Deterministic, pure logic shared by the loop controller and the adjudicator.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod grants;
pub mod reply;
pub mod signal;
pub mod stream;
pub mod task;
pub mod types;
pub mod verdict;
