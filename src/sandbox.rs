// Copyright 2021 - 2026 cvise-rs contributors

//! Scoped temporary working directories with guaranteed cleanup.
//!
//! Each speculative trial runs inside its own [Sandbox]: a fresh directory
//! under `TMPDIR` seeded with a copy of the file under reduction. Files that
//! the interestingness script creates alongside it remain inside, and are
//! swept away (or, with `--save-temps`, kept) when the trial finishes.

use std::fs;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use path_slash::PathExt;
use tempfile::TempDir;
use tracing::{debug, trace, warn};

use crate::Result;

/// A fresh directory seeded with a copy of the file under reduction.
pub struct Sandbox {
    path: Utf8PathBuf,
    fur_filename: String,
    temp_dir: Option<TempDir>,
}

impl Sandbox {
    /// Create a sandbox under `root`, holding a copy of `fur_bytes` named
    /// `fur_filename`.
    ///
    /// Directory-creation failure is fatal (io_error in the taxonomy):
    /// without a place to run the trial, nothing else can proceed.
    pub fn acquire(root: &Utf8Path, name_hint: &str, fur_filename: &str, fur_bytes: &[u8]) -> Result<Sandbox> {
        fs::create_dir_all(root.as_std_path())
            .with_context(|| format!("create sandbox root {root}"))?;
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("cvise-{name_hint}-"))
            .suffix(".tmp")
            .tempdir_in(root.as_std_path())
            .context("create sandbox directory")?;
        let path = Utf8PathBuf::try_from(temp_dir.path().to_owned())
            .context("sandbox path is not valid UTF-8")?;
        let fur_path = path.join(fur_filename);
        fs::write(fur_path.as_std_path(), fur_bytes)
            .with_context(|| format!("write {fur_path} into sandbox"))?;
        trace!(path = %path.as_std_path().to_slash_lossy(), "acquired sandbox");
        Ok(Sandbox {
            path,
            fur_filename: fur_filename.to_owned(),
            temp_dir: Some(temp_dir),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn fur_path(&self) -> Utf8PathBuf {
        self.path.join(&self.fur_filename)
    }

    /// Remove the sandbox directory unless `keep` is set, in which case the
    /// directory is deliberately leaked on disk for post-mortem debugging
    /// (`--save-temps`).
    ///
    /// Removal failure is logged but non-fatal: a stray temp directory does
    /// not threaten correctness, only disk usage.
    pub fn release(mut self, keep: bool) {
        if let Some(temp_dir) = self.temp_dir.take() {
            if keep {
                let path = temp_dir.into_path();
                debug!(path = %path.display(), "kept sandbox for debugging");
            } else if let Err(e) = temp_dir.close() {
                warn!(path = %self.path.as_std_path().to_slash_lossy(), error = %e, "failed to remove sandbox directory");
            }
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        // If `release` was never called (e.g. a cancelled trial dropped
        // without an explicit decision), fall back to deleting on drop:
        // `TempDir`'s own Drop impl does this for us once `self.temp_dir`
        // is still `Some`.
    }
}

/// Remove sandbox directories left behind under `root` by workers that were
/// killed before they could call [Sandbox::release] (`--tidy`).
///
/// A real run roots its sandboxes two levels below `root`:
/// `root/cvise-run-<pid>/sandboxes/cvise-<hint>-<counter>.tmp`. A worker
/// killed mid-trial leaves its `cvise-*.tmp` sandbox behind under that
/// `sandboxes` directory, not at the top level, so the sweep has to look in
/// both places: directly under `root` (for a sandbox acquired with `root`
/// itself as the sandbox root, as in tests and `--tidy`'s own direct-use
/// case) and under every `cvise-run-*` directory's `sandboxes` subdirectory.
/// The `cvise-run-<pid>` directory itself is left alone: it may still belong
/// to a live run, and only its leaked `cvise-*.tmp` children are reclaimed.
pub fn reap_stale(root: &Utf8Path) -> Result<usize> {
    if !root.exists() {
        return Ok(0);
    }
    let mut removed = reap_dir(root)?;
    for entry in fs::read_dir(root.as_std_path()).with_context(|| format!("list {root}"))? {
        let entry = entry.with_context(|| format!("list {root}"))?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with("cvise-run-") {
            let sandboxes = Utf8PathBuf::try_from(entry.path().join("sandboxes"))
                .context("sandboxes path is not valid UTF-8")?;
            if sandboxes.is_dir() {
                removed += reap_dir(&sandboxes)?;
            }
        }
    }
    Ok(removed)
}

/// Remove every direct child of `dir` matching the `cvise-*.tmp` sandbox
/// naming convention.
fn reap_dir(dir: &Utf8Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir.as_std_path()).with_context(|| format!("list {dir}"))? {
        let entry = entry.with_context(|| format!("list {dir}"))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("cvise-") && name.ends_with(".tmp") {
            let path = entry.path();
            match fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.to_slash_lossy(), error = %e, "failed to reap stale sandbox"),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        (dir, path)
    }

    #[test]
    fn acquire_writes_fur_and_release_removes_it() {
        let (_guard, root) = utf8_tempdir();
        let sandbox = Sandbox::acquire(&root, "t", "input.c", b"int x;\n").unwrap();
        let fur_path = sandbox.fur_path();
        assert!(fur_path.exists());
        assert_eq!(fs::read(fur_path.as_std_path()).unwrap(), b"int x;\n");
        let sandbox_path = sandbox.path().to_owned();
        sandbox.release(false);
        assert!(!sandbox_path.exists());
    }

    #[test]
    fn keep_on_release_leaks_directory() {
        let (_guard, root) = utf8_tempdir();
        let sandbox = Sandbox::acquire(&root, "t", "input.c", b"abc").unwrap();
        let sandbox_path = sandbox.path().to_owned();
        sandbox.release(true);
        assert!(sandbox_path.exists());
        fs::remove_dir_all(sandbox_path.as_std_path()).unwrap();
    }

    #[test]
    fn reap_stale_removes_only_cvise_prefixed_dirs() {
        let (_guard, root) = utf8_tempdir();
        let sandbox = Sandbox::acquire(&root, "t", "input.c", b"abc").unwrap();
        let sandbox_path = sandbox.path().to_owned();
        sandbox.release(true); // leak it so reap_stale has something to find

        let unrelated = root.join("not-ours");
        fs::create_dir(unrelated.as_std_path()).unwrap();

        let removed = reap_stale(&root).unwrap();
        assert_eq!(removed, 1);
        assert!(!sandbox_path.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn reap_stale_finds_sandboxes_leaked_by_a_killed_run() {
        let (_guard, root) = utf8_tempdir();
        let run_root = root.join("cvise-run-12345");
        let sandbox_root = run_root.join("sandboxes");
        let sandbox = Sandbox::acquire(&sandbox_root, "lines", "input.c", b"abc").unwrap();
        let sandbox_path = sandbox.path().to_owned();
        sandbox.release(true); // simulate a worker killed before it could release

        let removed = reap_stale(&root).unwrap();
        assert_eq!(removed, 1);
        assert!(!sandbox_path.exists());
        // The run-root itself is left alone; only its leaked sandbox is gone.
        assert!(run_root.exists());
    }
}
