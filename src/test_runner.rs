// Copyright 2026 cvise-rs contributors

//! Runs the interestingness script inside a sandbox, enforces a timeout,
//! and returns a verdict. A thin layer over [crate::process::Process] that
//! adds nothing pass- or state-specific: it is handed a ready sandbox and
//! a path to the script, and reports only interesting/uninteresting/
//! timeout/spawn_error.

use std::time::Duration;

use camino::Utf8Path;

use crate::errors::{Category, CategorizedError, CategorizeExt};
use crate::log_file::LogFile;
use crate::process::{Process, ProcessStatus};
use crate::sandbox::Sandbox;

/// How long to sleep between polls of the child process. Small enough that
/// a fast interestingness test is not held up waiting on the next tick,
/// large enough not to spin a CPU core per in-flight trial.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Interesting,
    Uninteresting,
    Timeout,
    /// The run was interrupted (e.g. Ctrl-C) before a verdict was reached.
    Interrupted,
    /// Terminated early by the coordinator because an earlier-state trial
    /// already won.
    Cancelled,
}

impl Verdict {
    pub fn is_interesting(self) -> bool {
        matches!(self, Verdict::Interesting)
    }
}

/// Runs `script` with its CWD set to `sandbox`, no arguments, enforcing
/// `timeout`. A spawn failure is reported as `spawn_error` rather than
/// folded into `Uninteresting`, so callers can apply the retry/backoff
/// policy of spec §7 instead of silently treating a broken script as a
/// failing trial.
pub fn run(
    script: &Utf8Path,
    sandbox: &Sandbox,
    env: &[(&str, &str)],
    timeout: Duration,
    log_file: &LogFile,
) -> Result<Verdict, CategorizedError> {
    run_cancelable(script, sandbox, env, timeout, log_file, &std::sync::atomic::AtomicBool::new(false))
}

/// Like [run], but also polls `cancel`: the coordinator sets it once a
/// different, earlier-state trial has already committed, so this trial's
/// script is killed rather than left to run to an answer nobody will use.
pub fn run_cancelable(
    script: &Utf8Path,
    sandbox: &Sandbox,
    env: &[(&str, &str)],
    timeout: Duration,
    log_file: &LogFile,
    cancel: &std::sync::atomic::AtomicBool,
) -> Result<Verdict, CategorizedError> {
    let argv = vec![script.to_string()];
    let mut process = Process::start(&argv, env, sandbox.path(), timeout, log_file)
        .categorize(Category::SpawnError)?;
    let status = process
        .wait_cancelable(POLL_INTERVAL, cancel)
        .categorize(Category::IoError)?;
    let verdict = match status {
        ProcessStatus::Success => Verdict::Interesting,
        ProcessStatus::Failure => Verdict::Uninteresting,
        ProcessStatus::Timeout => Verdict::Timeout,
        ProcessStatus::Interrupted => Verdict::Interrupted,
        ProcessStatus::Cancelled => Verdict::Cancelled,
    };
    log_file.message(&format!("verdict: {verdict:?}"));
    Ok(verdict)
}
