// Copyright 2026 cvise-rs contributors

//! The File Under Reduction: a byte buffer plus a filename, persisted to a
//! canonical path between passes and mutated only by the scheduler, on
//! commit, via write-temp-then-rename.

use std::fs;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};

use crate::Result;

/// The single file being reduced. Its on-disk copy at `path` is the
/// canonical state between pass invocations; `bytes` mirrors it in memory so
/// passes and the hint engine can work without touching disk per-state.
pub struct Fur {
    path: Utf8PathBuf,
    bytes: Vec<u8>,
}

impl Fur {
    /// Load the initial file under reduction from disk.
    pub fn load(path: &Utf8Path) -> Result<Fur> {
        let bytes = fs::read(path.as_std_path()).with_context(|| format!("read {path}"))?;
        Ok(Fur {
            path: path.to_owned(),
            bytes,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        self.path.file_name().unwrap_or("fur")
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Replace the FUR with `new_bytes`, atomically: write to a sibling temp
    /// file, then rename over the canonical path. A crash or kill between
    /// commits therefore never leaves `path` partially written.
    ///
    /// Returns an error (io_error) if the write or rename fails; on success,
    /// the in-memory copy is updated to match.
    pub fn commit(&mut self, new_bytes: Vec<u8>) -> Result<()> {
        let tmp_path = self.path.with_extension(format!(
            "{}.cvise-tmp",
            self.path.extension().unwrap_or("")
        ));
        fs::write(tmp_path.as_std_path(), &new_bytes)
            .with_context(|| format!("write {tmp_path}"))?;
        fs::rename(tmp_path.as_std_path(), self.path.as_std_path())
            .with_context(|| format!("rename {tmp_path} to {}", self.path))?;
        self.bytes = new_bytes;
        Ok(())
    }
}
