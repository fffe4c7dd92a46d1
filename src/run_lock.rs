// Copyright 2026 cvise-rs contributors

//! A `run.lock` file marking one run's root directory as in use, the same
//! role the teacher's `mutants.out/lock.json` plays for its output
//! directory: an exclusive OS-level lock plus a record of who started the
//! run and when, useful for telling a live run root from a leaked one
//! during post-mortem cleanup.

use std::fs::File;
use std::io::Write;

use anyhow::Context;
use camino::Utf8Path;
use fs2::FileExt;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::Result;

const LOCK_FILENAME: &str = "run.lock";

#[derive(Serialize)]
struct LockInfo {
    cvise_version: String,
    start_time: String,
    hostname: String,
    username: String,
}

/// Holds an exclusive lock on `run.lock` inside a run root for as long as
/// it's alive. The lock is released when this is dropped, including on
/// process exit, so a killed run never leaves a stuck lock behind.
pub struct RunLock {
    file: File,
}

impl RunLock {
    /// Acquire the lock, creating `run_root` if it doesn't exist yet. Fails
    /// immediately, without blocking, if another live process already holds
    /// it: two runs sharing one run root would race on the same sandbox and
    /// log directories.
    pub fn acquire(run_root: &Utf8Path) -> Result<RunLock> {
        std::fs::create_dir_all(run_root.as_std_path()).with_context(|| format!("create run root {run_root}"))?;
        let lock_path = run_root.join(LOCK_FILENAME);
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path.as_std_path())
            .with_context(|| format!("open {lock_path}"))?;
        file.try_lock_exclusive()
            .with_context(|| format!("{lock_path} is held by another cvise run"))?;

        let info = LockInfo {
            cvise_version: crate::VERSION.to_owned(),
            start_time: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_else(|_| "unknown".to_owned()),
            hostname: whoami::fallible::hostname().unwrap_or_default(),
            username: whoami::username(),
        };
        let mut writer = &file;
        let _ = serde_json::to_writer(&mut writer, &info);
        let _ = writer.flush();

        Ok(RunLock { file })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_creates_lock_file_with_run_info() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let lock = RunLock::acquire(root).unwrap();
        let content = std::fs::read_to_string(root.join(LOCK_FILENAME).as_std_path()).unwrap();
        assert!(content.contains("cvise_version"));
        assert!(content.contains("start_time"));
        drop(lock);
    }

    #[test]
    fn a_second_acquire_on_the_same_root_fails_while_the_first_is_held() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let _first = RunLock::acquire(root).unwrap();
        assert!(RunLock::acquire(root).is_err());
    }

    #[test]
    fn dropping_the_lock_allows_reacquisition() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let first = RunLock::acquire(root).unwrap();
        drop(first);
        assert!(RunLock::acquire(root).is_ok());
    }
}
