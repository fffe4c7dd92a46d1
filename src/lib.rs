// Copyright 2026 cvise-rs contributors

//! `cvise-rs`: reduce a source file to a minimal variant that still
//! satisfies a user-supplied interestingness test.
//!
//! The crate is organized bottom-up, matching the dependency order of the
//! system: [sandbox] and [test_runner] are leaves; [hint] is a pure data
//! model; [pass]/[passes] wrap concrete transformers behind one interface;
//! [test_manager] drives a pass's states in parallel and commits the
//! earliest interesting one; [scheduler] drives a whole pass group to a
//! fixpoint.

pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod exit_code;
pub mod fur;
pub mod hint;
pub mod interrupt;
pub mod log_file;
pub mod options;
pub mod pass;
pub mod pass_group;
pub mod passes;
pub mod process;
pub mod run_lock;
pub mod sandbox;
pub mod scheduler;
pub mod test_manager;
pub mod test_runner;

/// The crate's own version, reported in `--version` and embedded in log
/// output the way the teacher embeds its own version in `lock.json`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub type Result<T> = anyhow::Result<T>;
