// Copyright 2026 cvise-rs contributors

//! `cvise`: reduce a source file to a minimal variant that still satisfies
//! an interestingness test.

use std::process::exit;

use anyhow::Context;
use camino::Utf8Path;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cvise_rs::cli::Args;
use cvise_rs::config::Config;
use cvise_rs::console::Console;
use cvise_rs::fur::Fur;
use cvise_rs::log_file::LogFile;
use cvise_rs::options::Options;
use cvise_rs::run_lock::RunLock;
use cvise_rs::sandbox::{self, Sandbox};
use cvise_rs::scheduler::{resolve_group, PassScheduler};
use cvise_rs::test_manager::TestManager;
use cvise_rs::test_runner;
use cvise_rs::{exit_code, interrupt};

fn main() {
    let args = Args::parse();
    interrupt::install_handler();

    match run(args) {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("cvise: {e:#}");
            exit(exit_code::SOFTWARE);
        }
    }
}

/// Install the stderr diagnostic layer plus, once a log directory exists, a
/// non-blocking per-run trace log under it. Returns the
/// `tracing_appender` worker guard, which must stay alive for the duration
/// of the run: dropping it stops the background flush thread.
fn install_tracing(verbose: bool, log_dir: Option<&Utf8Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "cvise_rs=debug" } else { "cvise_rs=warn" }));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match log_dir {
        Some(log_dir) => {
            let appender = tracing_appender::rolling::never(log_dir.as_std_path(), "cvise-trace.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;
            let _ = tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).try_init();
            Some(guard)
        }
        None => {
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;
            let _ = tracing_subscriber::registry().with(filter).with(stderr_layer).try_init();
            None
        }
    }
}

/// The whole run, returning the process exit code rather than calling
/// `exit` directly so tests can drive it without tearing down the process.
fn run(args: Args) -> anyhow::Result<i32> {
    if let Some(shell) = args.completions {
        let mut cmd = Args::command();
        let name = cmd.get_name().to_owned();
        generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(exit_code::SUCCESS);
    }

    if args.tidy {
        let _tracing_guard = install_tracing(args.verbose, None);
        return run_tidy(&args);
    }

    let config_dir = std::env::current_dir().context("get current directory")?;
    let config_dir = camino::Utf8PathBuf::try_from(config_dir).context("cwd is not valid UTF-8")?;
    let config = Config::read_dir_config(&config_dir)?;
    let options = Options::new(&args, &config);

    let group = resolve_group(
        &options.pass_group,
        options.pass_group_file.as_ref(),
        options.skip_initial_passes,
        options.skip_key_off,
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    if let Err(e) = PassScheduler::check_prereqs(&group) {
        eprintln!("cvise: {e:#}");
        return Ok(exit_code::CONFIG_ERROR);
    }

    let run_root = options.tmpdir.join(format!("cvise-run-{}", std::process::id()));
    let sandbox_root = run_root.join("sandboxes");
    let log_dir = run_root.join("logs");
    std::fs::create_dir_all(log_dir.as_std_path()).with_context(|| format!("create {log_dir}"))?;

    let _tracing_guard = install_tracing(options.verbose, Some(&log_dir));

    let _run_lock = match RunLock::acquire(&run_root) {
        Ok(lock) => lock,
        Err(e) => {
            eprintln!("cvise: {e:#}");
            return Ok(exit_code::IO_ERROR);
        }
    };

    let mut fur = match Fur::load(&options.file) {
        Ok(fur) => fur,
        Err(e) => {
            eprintln!("cvise: {e:#}");
            return Ok(exit_code::IO_ERROR);
        }
    };

    if !check_baseline(&options, &fur, &sandbox_root, &log_dir)? {
        eprintln!(
            "cvise: the interestingness test does not pass on the unmodified input {}",
            options.file
        );
        return Ok(exit_code::BASELINE_NOT_INTERESTING);
    }

    let console = Console::new(options.verbose);
    let manager = TestManager::new(&options, sandbox_root, log_dir);
    let scheduler = PassScheduler::new(manager);

    let summary = scheduler.run(&group, &mut fur, &console);
    let summary = match summary {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cvise: {e:#}");
            return Ok(exit_code::SOFTWARE);
        }
    };

    console.run_summary(summary.commits, &summary.skipped_passes, fur.size());

    if interrupt::is_interrupted() {
        Ok(exit_code::INTERRUPTED)
    } else {
        Ok(exit_code::SUCCESS)
    }
}

/// Run the interestingness test once, unmodified, before spending any
/// effort reducing: a script that is never interesting on the original
/// input can never be satisfied by a smaller variant either.
fn check_baseline(options: &Options, fur: &Fur, sandbox_root: &Utf8Path, log_dir: &Utf8Path) -> anyhow::Result<bool> {
    let sandbox = Sandbox::acquire(sandbox_root, "baseline", fur.filename(), fur.bytes())
        .context("create baseline sandbox")?;
    let log_file = LogFile::create_in(log_dir, "baseline").context("create baseline log file")?;
    let verdict = test_runner::run(&options.script, &sandbox, &[], options.timeout, &log_file);
    sandbox.release(false);
    match verdict {
        Ok(v) => Ok(v.is_interesting()),
        Err(e) => Err(anyhow::anyhow!("{e}")).context("run baseline interestingness test"),
    }
}

fn run_tidy(args: &Args) -> anyhow::Result<i32> {
    let tmpdir = args
        .tmpdir
        .clone()
        .unwrap_or_else(|| camino::Utf8PathBuf::from_path_buf(std::env::temp_dir()).unwrap_or_else(|_| camino::Utf8PathBuf::from("/tmp")));
    let removed = sandbox::reap_stale(&tmpdir)?;
    Console::new(args.verbose).tidy_summary(removed);
    Ok(exit_code::SUCCESS)
}
