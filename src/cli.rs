// Copyright 2026 cvise-rs contributors

//! Command-line argument parsing, covering the essential CLI surface of
//! spec §6.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

/// Reduce a source file to a minimal variant that still satisfies an
/// interestingness test.
#[derive(Parser, Debug)]
#[command(name = "cvise", version, about)]
pub struct Args {
    /// The interestingness test: an executable exiting 0 iff the candidate
    /// is still interesting.
    #[arg(required_unless_present_any = ["tidy", "completions"])]
    pub script: Option<Utf8PathBuf>,

    /// The file to reduce, in place.
    #[arg(required_unless_present_any = ["tidy", "completions"])]
    pub file: Option<Utf8PathBuf>,

    /// Number of parallel workers. Defaults to available parallelism.
    #[arg(long = "n", env = "CVISE_N")]
    pub n: Option<usize>,

    /// Per-interestingness-test timeout, in seconds.
    #[arg(long, env = "CVISE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Which pass group to run.
    #[arg(long = "pass-group", value_enum, default_value_t = PassGroupArg::All)]
    pub pass_group: PassGroupArg,

    /// Load the pass group from a JSON file instead of a built-in name.
    #[arg(long = "pass-group-file", conflicts_with = "pass_group")]
    pub pass_group_file: Option<Utf8PathBuf>,

    /// Skip the `first`-phase (one-shot normalization/sanity) passes.
    #[arg(long)]
    pub skip_initial_passes: bool,

    /// Skip the `last`-phase (polish) passes.
    #[arg(long)]
    pub skip_key_off: bool,

    /// Remove residual sandbox directories under TMPDIR and exit.
    #[arg(long)]
    pub tidy: bool,

    /// Keep the sandbox of every interesting trial, for post-mortem
    /// debugging.
    #[arg(long)]
    pub save_temps: bool,

    /// Root directory for sandboxes and per-trial log files. Defaults to
    /// `$TMPDIR` or the platform temp directory.
    #[arg(long, env = "TMPDIR")]
    pub tmpdir: Option<Utf8PathBuf>,

    /// Print verbose per-trial logging to stderr as the run proceeds.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print a shell completion script for the given shell and exit.
    #[arg(long, value_enum, conflicts_with_all = ["script", "file"])]
    pub completions: Option<clap_complete::Shell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum PassGroupArg {
    All,
    Delta,
    Binary,
    Opencl120,
    NoInterleaving,
}

impl PassGroupArg {
    pub fn name(self) -> &'static str {
        match self {
            PassGroupArg::All => "all",
            PassGroupArg::Delta => "delta",
            PassGroupArg::Binary => "binary",
            PassGroupArg::Opencl120 => "opencl-120",
            PassGroupArg::NoInterleaving => "no-interleaving",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_essential_subset() {
        let args = Args::parse_from(["cvise", "./check.sh", "input.c", "--n", "4", "--timeout", "10"]);
        assert_eq!(args.script.unwrap().as_str(), "./check.sh");
        assert_eq!(args.file.unwrap().as_str(), "input.c");
        assert_eq!(args.n, Some(4));
        assert_eq!(args.timeout, Some(10));
        assert_eq!(args.pass_group, PassGroupArg::All);
    }

    #[test]
    fn tidy_does_not_require_script_and_file() {
        let args = Args::parse_from(["cvise", "--tidy"]);
        assert!(args.tidy);
        assert!(args.script.is_none());
    }

    #[test]
    fn pass_group_name_round_trips_cli_surface() {
        assert_eq!(PassGroupArg::Opencl120.name(), "opencl-120");
        assert_eq!(PassGroupArg::NoInterleaving.name(), "no-interleaving");
    }

    #[test]
    fn completions_does_not_require_script_and_file() {
        let args = Args::parse_from(["cvise", "--completions", "bash"]);
        assert!(args.script.is_none());
        assert!(args.completions.is_some());
    }
}
