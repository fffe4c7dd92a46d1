// Copyright 2021 - 2026 cvise-rs contributors

//! Manage per-trial log files, which contain output from the interestingness
//! script mixed with commentary from `cvise`.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::Result;

/// Text inserted in log files to make important sections more visible.
pub const LOG_MARKER: &str = "***";

/// A log file for the execution of a single trial (one pass state, or the
/// baseline check).
#[derive(Debug, Clone)]
pub struct LogFile {
    path: Utf8PathBuf,
}

impl LogFile {
    pub fn create_in(log_dir: &Utf8Path, trial_name: &str) -> Result<LogFile> {
        let basename = clean_filename(trial_name);
        for i in 0..1000 {
            let t = if i == 0 {
                format!("{basename}.log")
            } else {
                format!("{basename}_{i:03}.log")
            };
            let path = log_dir.join(t);
            match OpenOptions::new()
                .write(true)
                .read(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut write_to) => {
                    let started = OffsetDateTime::now_utc()
                        .format(&Rfc3339)
                        .unwrap_or_else(|_| "unknown".to_owned());
                    let _ = write!(write_to, "{LOG_MARKER} started {started} {LOG_MARKER}");
                    return Ok(LogFile { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(anyhow::Error::from(e).context("create trial log file")),
            }
        }
        unreachable!("couldn't create any trial log in {log_dir:?} for {trial_name:?}");
    }

    /// Return the full content of the log as a string.
    pub fn log_content(&self) -> Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        File::open(&self.path)
            .and_then(|mut f| f.read_to_end(&mut buf))
            .with_context(|| format!("read log file {}", self.path))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Open the log file to append more content, or to hand to a child
    /// process as its stdout/stderr.
    pub fn open_append(&self) -> Result<File> {
        OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {} for append", self.path))
    }

    /// Write a message, with a marker. Ignore errors: a log file is a
    /// diagnostic convenience, not load-bearing state.
    pub fn message(&self, message: &str) {
        if let Ok(mut f) = self.open_append() {
            let _ = write!(f, "\n{LOG_MARKER} {message}");
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

fn clean_filename(s: &str) -> String {
    let s = s.replace('/', "__");
    s.chars()
        .map(|c| match c {
            '\\' | ' ' | ':' | '<' | '>' | '?' | '*' | '|' | '"' => '_',
            c => c,
        })
        .collect::<String>()
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_and_append() {
        let dir = tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let log = LogFile::create_in(dir, "lines/arg=1").unwrap();
        log.message("hello");
        let content = log.log_content().unwrap();
        assert!(content.contains("started"));
        assert!(content.contains("hello"));
        assert!(log.path().as_str().ends_with(".log"));
    }

    #[test]
    fn disambiguates_repeated_names() {
        let dir = tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let a = LogFile::create_in(dir, "baseline").unwrap();
        let b = LogFile::create_in(dir, "baseline").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
