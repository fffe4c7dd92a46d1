// Copyright 2021 - 2026 cvise-rs contributors

//! Manage a subprocess, with polling, timeouts, and termination.
//!
//! This module has no knowledge of whether it's running an interestingness
//! script, an external pass helper, or anything else.
//!
//! On Unix, the subprocess runs as its own process group, so that any
//! grandchild processes are also signalled when it's terminated.

use std::ffi::OsString;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use camino::Utf8Path;
use subprocess::{Popen, PopenConfig, Redirection};
#[allow(unused_imports)]
use tracing::{debug, debug_span, error, info, span, trace, warn, Level};

use crate::interrupt::check_interrupted;
use crate::log_file::LogFile;
use crate::Result;

pub struct Process {
    child: Popen,
    start: Instant,
    timeout: Duration,
}

impl Process {
    /// Start a subprocess with its stdout and stderr appended to `log_file`.
    pub fn start(
        argv: &[String],
        env: &[(&str, &str)],
        cwd: &Utf8Path,
        timeout: Duration,
        log_file: &LogFile,
    ) -> Result<Process> {
        let start = Instant::now();
        log_file.message(&format!("run {}", argv.join(" ")));
        debug!("start {argv:?}");
        let mut os_env = PopenConfig::current_env();
        os_env.extend(
            env.iter()
                .map(|&(k, v)| (OsString::from(k), OsString::from(v))),
        );
        let child = Popen::create(
            argv,
            PopenConfig {
                stdin: Redirection::None,
                stdout: Redirection::File(log_file.open_append()?),
                stderr: Redirection::Merge,
                cwd: Some(cwd.as_os_str().to_owned()),
                env: Some(os_env),
                ..setpgid_on_unix()
            },
        )
        .with_context(|| format!("failed to spawn {}", argv.join(" ")))?;
        Ok(Process {
            child,
            start,
            timeout,
        })
    }

    /// Non-blocking: return the status if the process has already finished,
    /// terminating it first if it has timed out or the run was interrupted.
    pub fn poll(&mut self) -> Result<Option<ProcessStatus>> {
        let elapsed = self.start.elapsed();
        if elapsed > self.timeout {
            info!(
                "timeout after {:.1}s, terminating child process...",
                elapsed.as_secs_f32()
            );
            self.terminate()?;
            Ok(Some(ProcessStatus::Timeout))
        } else if check_interrupted().is_err() {
            debug!("interrupted, terminating child process...");
            self.terminate()?;
            Ok(Some(ProcessStatus::Interrupted))
        } else if let Some(status) = self.child.poll() {
            if status.success() {
                Ok(Some(ProcessStatus::Success))
            } else {
                Ok(Some(ProcessStatus::Failure))
            }
        } else {
            Ok(None)
        }
    }

    /// Block (with internal polling) until the process exits, a timeout is
    /// hit, or the process is interrupted.
    pub fn wait(&mut self, poll_interval: Duration) -> Result<ProcessStatus> {
        loop {
            if let Some(status) = self.poll()? {
                return Ok(status);
            }
            std::thread::sleep(poll_interval);
        }
    }

    /// Like [Process::wait], but also polls `cancel` (set by another thread,
    /// the coordinator, once a later trial has already committed) and
    /// terminates the child early if it becomes true. Used by worker
    /// threads in the [crate::test_manager] so a losing trial doesn't run
    /// to completion after its answer is already moot.
    pub fn wait_cancelable(
        &mut self,
        poll_interval: Duration,
        cancel: &std::sync::atomic::AtomicBool,
    ) -> Result<ProcessStatus> {
        use std::sync::atomic::Ordering;
        loop {
            if cancel.load(Ordering::Relaxed) {
                debug!("cancelled by coordinator, terminating child process...");
                self.terminate()?;
                return Ok(ProcessStatus::Cancelled);
            }
            if let Some(status) = self.poll()? {
                return Ok(status);
            }
            std::thread::sleep(poll_interval);
        }
    }

    /// Cancel a trial that lost the race: a later state committed first.
    /// Cooperative where possible, forceful otherwise.
    pub fn cancel(&mut self) -> Result<()> {
        self.terminate()
    }

    /// Terminate the subprocess, initially gently and then harshly.
    ///
    /// Blocks until the subprocess is terminated.
    fn terminate(&mut self) -> Result<()> {
        let _span = span!(Level::DEBUG, "terminate_child", pid = self.child.pid()).entered();
        debug!("terminating child process");
        terminate_child_impl(&mut self.child)?;
        trace!("wait for child after termination");
        if let Some(exit_status) = self
            .child
            .wait_timeout(Duration::from_secs(10))
            .context("wait for child after terminating pgroup")?
        {
            debug!("terminated child exit status {exit_status:?}");
        } else {
            warn!("child did not exit after termination");
            let kill_result = self.child.kill();
            warn!("force kill child: {:?}", kill_result);
            if kill_result.is_ok() {
                if let Ok(Some(exit_status)) = self
                    .child
                    .wait_timeout(Duration::from_secs(10))
                    .context("wait for child after force kill")
                {
                    debug!("force kill child exit status {exit_status:?}");
                } else {
                    warn!("child did not exit after force kill");
                }
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn terminate_child_impl(child: &mut Popen) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};

    let pid = nix::unistd::Pid::from_raw(child.pid().expect("child has a pid").try_into().unwrap());
    if let Err(errno) = killpg(pid, Signal::SIGTERM) {
        // It might have already exited, in which case we can proceed to wait for it.
        if errno != Errno::ESRCH {
            let message = format!("failed to terminate child: {errno}");
            warn!("{}", message);
            return Err(anyhow!(message));
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn terminate_child_impl(child: &mut Popen) -> Result<()> {
    if let Err(e) = child.terminate() {
        let message = format!("failed to terminate child: {e}");
        warn!("{}", message);
        return Err(anyhow!(message));
    }
    Ok(())
}

/// The result of running a single child process.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProcessStatus {
    Success,
    Failure,
    Timeout,
    Interrupted,
    /// Terminated early because a different, earlier-state trial already
    /// won the race and committed.
    Cancelled,
}

#[cfg(unix)]
fn setpgid_on_unix() -> PopenConfig {
    PopenConfig {
        setpgid: true,
        ..Default::default()
    }
}

#[cfg(not(unix))]
fn setpgid_on_unix() -> PopenConfig {
    Default::default()
}
