// Copyright 2026 cvise-rs contributors

//! Global in-process options for a reduction run: the result of merging
//! CLI [crate::cli::Args] with an optional [crate::config::Config] file.
//! Everything downstream of `main` reads this instead of re-deriving
//! defaults from the two upstream sources.

use std::thread::available_parallelism;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::cli::Args;
use crate::config::Config;

/// The default per-trial timeout, used when neither `--timeout` nor the
/// config file specify one. Generous, since a too-short default would
/// silently discard genuinely interesting but slow trials.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Options {
    pub script: Utf8PathBuf,
    pub file: Utf8PathBuf,
    pub workers: usize,
    pub timeout: Duration,
    pub pass_group: String,
    pub pass_group_file: Option<Utf8PathBuf>,
    pub skip_initial_passes: bool,
    pub skip_key_off: bool,
    pub save_temps: bool,
    pub tmpdir: Utf8PathBuf,
    pub verbose: bool,
}

impl Options {
    /// Merge `args` (highest priority) over `config` (fallback) into a
    /// fully-resolved `Options`. Only called once a non-`--tidy` run has
    /// confirmed both `script` and `file` are present.
    pub fn new(args: &Args, config: &Config) -> Options {
        let workers = args
            .n
            .or(config.n)
            .unwrap_or_else(|| available_parallelism().map(|n| n.get()).unwrap_or(1));
        let timeout = Duration::from_secs(args.timeout.or(config.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS));
        let pass_group = if args.pass_group_file.is_none() {
            args.pass_group.name().to_string()
        } else {
            config.pass_group.clone().unwrap_or_else(|| args.pass_group.name().to_string())
        };
        let tmpdir = args
            .tmpdir
            .clone()
            .or_else(|| config.tmpdir.clone().map(Utf8PathBuf::from))
            .unwrap_or_else(default_tmpdir);
        Options {
            script: args.script.clone().expect("script required outside --tidy"),
            file: args.file.clone().expect("file required outside --tidy"),
            workers: workers.max(1),
            timeout,
            pass_group,
            pass_group_file: args.pass_group_file.clone(),
            skip_initial_passes: args.skip_initial_passes,
            skip_key_off: args.skip_key_off,
            save_temps: args.save_temps,
            tmpdir,
            verbose: args.verbose,
        }
    }
}

fn default_tmpdir() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cli::PassGroupArg;

    fn base_args() -> Args {
        Args {
            script: Some(Utf8PathBuf::from("check.sh")),
            file: Some(Utf8PathBuf::from("input.c")),
            n: None,
            timeout: None,
            pass_group: PassGroupArg::All,
            pass_group_file: None,
            skip_initial_passes: false,
            skip_key_off: false,
            tidy: false,
            save_temps: false,
            tmpdir: None,
            verbose: false,
        }
    }

    #[test]
    fn cli_overrides_config() {
        let mut args = base_args();
        args.n = Some(2);
        let config = Config {
            n: Some(99),
            ..Config::default()
        };
        let options = Options::new(&args, &config);
        assert_eq!(options.workers, 2);
    }

    #[test]
    fn config_fills_absent_cli_value() {
        let args = base_args();
        let config = Config {
            timeout: Some(42),
            ..Config::default()
        };
        let options = Options::new(&args, &config);
        assert_eq!(options.timeout, Duration::from_secs(42));
    }

    #[test]
    fn defaults_apply_when_neither_source_sets_a_value() {
        let args = base_args();
        let options = Options::new(&args, &Config::default());
        assert_eq!(options.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(options.workers >= 1);
    }
}
