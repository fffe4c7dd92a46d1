// Copyright 2026 cvise-rs contributors

//! `.cvise.toml` configuration file, read from the working directory if
//! present and merged into [crate::options::Options] after CLI arguments.

use std::fs;

use anyhow::Context;
use camino::Utf8Path;
use serde::Deserialize;

use crate::Result;

/// Configuration read from a config file. Similar to
/// [crate::options::Options], and eventually merged into it, but kept
/// separate because it needs to be deserializable and every field
/// optional (so an absent file, or a file that only sets one field, is
/// valid).
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub n: Option<usize>,
    pub timeout: Option<u64>,
    pub pass_group: Option<String>,
    pub tmpdir: Option<String>,
}

impl Config {
    pub fn read_file(path: &Utf8Path) -> Result<Config> {
        let text = fs::read_to_string(path.as_std_path()).with_context(|| format!("read config {path}"))?;
        toml::de::from_str(&text).with_context(|| format!("parse toml from {path}"))
    }

    /// Read `.cvise.toml` from `dir` if it exists, otherwise an empty
    /// (all-`None`) config.
    pub fn read_dir_config(dir: &Utf8Path) -> Result<Config> {
        let path = dir.join(".cvise.toml");
        if path.exists() {
            Config::read_file(&path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_an_empty_default_config() {
        let dir = tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        assert_eq!(Config::read_dir_config(dir).unwrap(), Config::default());
    }

    #[test]
    fn reads_present_fields() {
        let dir = tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(dir.join(".cvise.toml").as_std_path(), "n = 8\ntimeout = 30\n").unwrap();
        let config = Config::read_dir_config(dir).unwrap();
        assert_eq!(config.n, Some(8));
        assert_eq!(config.timeout, Some(30));
        assert_eq!(config.pass_group, None);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(dir.join(".cvise.toml").as_std_path(), "bogus = true\n").unwrap();
        assert!(Config::read_dir_config(dir).is_err());
    }
}
