// Copyright 2026 cvise-rs contributors

//! Print progress and outcome messages on the terminal.
//!
//! Unlike the teacher's `indicatif`-based progress bars, this keeps to a
//! line-per-event style using only the `console` crate already in the
//! dependency tree, styled the same way (bold pass names, green/red/yellow
//! verdicts) but without pulling in a new dependency this crate does not
//! otherwise need.

use std::time::{Duration, Instant};

use console::style;

/// Truncate to millisecond resolution so `humantime::format_duration`
/// prints `"1.234s"`-style durations instead of spelling out nanoseconds.
fn round_to_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}

/// Top-level UI object threaded through the scheduler and test manager.
/// `verbose` widens what gets printed, matching the teacher's
/// `show_all_logs` flag.
pub struct Console {
    pub verbose: bool,
}

impl Console {
    pub fn new(verbose: bool) -> Console {
        Console { verbose }
    }

    pub fn start_pass(&self, pass_name: &str, phase: &str) -> PassActivity {
        let start = Instant::now();
        eprintln!("{} {} ({phase})", style("pass").bold(), style(pass_name).cyan());
        PassActivity {
            pass_name: pass_name.to_owned(),
            start,
            verbose: self.verbose,
        }
    }

    pub fn tidy_summary(&self, removed: usize) {
        println!("removed {removed} stale sandbox director{}", if removed == 1 { "y" } else { "ies" });
    }

    /// End-of-run summary: commit counts and any passes that were skipped
    /// due to error, per spec §7's propagation policy.
    pub fn run_summary(&self, commits: usize, skipped: &[String], final_size: usize) {
        println!(
            "{} {commits} commit{}, final size {final_size} bytes",
            style("done:").green().bold(),
            if commits == 1 { "" } else { "s" },
        );
        if !skipped.is_empty() {
            println!("{} {}", style("skipped passes:").yellow(), skipped.join(", "));
        }
    }
}

/// Tracks one pass invocation's wall-clock time and reports its trial
/// outcomes as they're decided.
pub struct PassActivity {
    pass_name: String,
    start: Instant,
    verbose: bool,
}

impl PassActivity {
    pub fn trial(&self, state_desc: &str, interesting: bool) {
        if !self.verbose && !interesting {
            return;
        }
        let verdict = if interesting {
            style("interesting").green()
        } else {
            style("uninteresting").red()
        };
        eprintln!("  {} {state_desc} ... {verdict}", style(&self.pass_name).dim());
    }

    pub fn finish(self, committed: usize, new_size: Option<usize>) {
        let elapsed = humantime::format_duration(round_to_millis(self.start.elapsed()));
        match new_size {
            Some(size) => eprintln!(
                "{} {} commits, now {size} bytes, in {elapsed}",
                style(&self.pass_name).cyan(),
                committed,
            ),
            None => eprintln!("{} no improvement, in {elapsed}", style(&self.pass_name).cyan()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn construct_and_drive_does_not_panic() {
        let console = Console::new(true);
        let activity = console.start_pass("lines", "main");
        activity.trial("chunk_size=4 index=0", false);
        activity.finish(0, None);
        console.run_summary(3, &[], 7);
    }
}
