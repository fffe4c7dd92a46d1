// Copyright 2026 cvise-rs contributors

//! The pass-group driver (spec §4.6): consumes a [crate::pass_group::PassGroup]
//! and repeatedly invokes the [crate::test_manager::TestManager] until a
//! full sweep of the `main` phase produces no further commit.
//!
//! `first` passes run once, in order, before the main loop starts;
//! `last` passes run once, in order, after it ends. A single pass reporting
//! a non-fatal error (`pass_bug`, `timeout`, `spawn_error`) is logged and
//! skipped — the scheduler never aborts the whole run over one misbehaving
//! pass (spec §7); a fatal category propagates and ends the run.

use camino::Utf8PathBuf;

use crate::console::Console;
use crate::errors::CategorizedError;
use crate::fur::Fur;
use crate::pass::PassAdapter;
use crate::pass_group::PassGroup;
use crate::test_manager::TestManager;
use crate::Result;

/// End-of-run tally: total commits across every pass invocation, and the
/// names of passes abandoned after a `pass_bug` (spec §7's "summary at
/// end-of-run listing skipped passes and commit counts").
#[derive(Debug, Default)]
pub struct RunSummary {
    pub commits: usize,
    pub skipped_passes: Vec<String>,
}

/// Drives a whole [PassGroup] against `fur` to completion.
pub struct PassScheduler {
    manager: TestManager,
}

impl PassScheduler {
    pub fn new(manager: TestManager) -> PassScheduler {
        PassScheduler { manager }
    }

    /// Check every pass's prerequisites once, up front. A missing tool is a
    /// `config_error`: fatal, reported before any trial runs rather than
    /// discovered mid-sweep.
    pub fn check_prereqs(group: &PassGroup) -> Result<()> {
        for pass in group.first.iter().chain(&group.main).chain(&group.last) {
            if let Some(tool) = pass
                .check_prereqs()
                .map_err(|e: CategorizedError| anyhow::anyhow!("{e}"))?
            {
                anyhow::bail!("pass {:?} requires missing tool {tool:?}", pass.name());
            }
        }
        Ok(())
    }

    /// Run `group`'s three phases against `fur`: `first` once, `main` to a
    /// fixpoint, `last` once. Returns once the whole group is exhausted.
    pub fn run(&self, group: &PassGroup, fur: &mut Fur, console: &Console) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        self.run_phase_once(&group.first, fur, console, "first", &mut summary)?;
        self.run_main_to_fixpoint(&group.main, fur, console, &mut summary)?;
        self.run_phase_once(&group.last, fur, console, "last", &mut summary)?;

        Ok(summary)
    }

    /// Run every pass in `passes` exactly once, in order, regardless of
    /// whether it commits.
    fn run_phase_once(
        &self,
        passes: &[Box<dyn PassAdapter>],
        fur: &mut Fur,
        console: &Console,
        phase_label: &str,
        summary: &mut RunSummary,
    ) -> Result<()> {
        for pass in passes {
            if crate::interrupt::is_interrupted() {
                break;
            }
            self.run_one_pass(pass.as_ref(), fur, console, phase_label, summary)?;
        }
        Ok(())
    }

    /// Loop over `passes` repeatedly; one full sweep that produces no
    /// commit in any pass ends the loop (spec §4.6's fixpoint definition).
    fn run_main_to_fixpoint(
        &self,
        passes: &[Box<dyn PassAdapter>],
        fur: &mut Fur,
        console: &Console,
        summary: &mut RunSummary,
    ) -> Result<()> {
        loop {
            if crate::interrupt::is_interrupted() || passes.is_empty() {
                return Ok(());
            }
            let commits_before = summary.commits;
            for pass in passes {
                if crate::interrupt::is_interrupted() {
                    return Ok(());
                }
                self.run_one_pass(pass.as_ref(), fur, console, "main", summary)?;
            }
            if summary.commits == commits_before {
                return Ok(());
            }
        }
    }

    /// Invoke one pass to its own fixpoint (a pass invocation may itself
    /// commit several times in a row, per spec §4.5, before exhausting).
    /// Non-fatal categories (`pass_bug`, `timeout`, `spawn_error`) are
    /// logged and the pass is skipped; fatal categories (`script_error`,
    /// `config_error`, `io_error`) abort the whole run (spec §7).
    fn run_one_pass(
        &self,
        pass: &dyn PassAdapter,
        fur: &mut Fur,
        console: &Console,
        phase_label: &str,
        summary: &mut RunSummary,
    ) -> Result<()> {
        match self.manager.run_pass(pass, fur, console, phase_label) {
            Ok(outcome) => summary.commits += outcome.commits,
            Err(e) if e.category.is_fatal() => {
                tracing::error!(pass = pass.name(), error = %e, "fatal error, aborting run");
                return Err(anyhow::anyhow!("{e}"));
            }
            Err(e) => {
                tracing::warn!(pass = pass.name(), error = %e, "pass failed, skipping");
                summary.skipped_passes.push(pass.name().to_owned());
            }
        }
        Ok(())
    }
}

/// Resolve `group_name`/`group_file` (at most one set, enforced by the CLI)
/// into the [PassGroup] to drive, honoring `skip_initial_passes` and
/// `skip_key_off` by emptying the corresponding phase after loading.
pub fn resolve_group(
    group_name: &str,
    group_file: Option<&Utf8PathBuf>,
    skip_initial_passes: bool,
    skip_key_off: bool,
) -> Result<PassGroup, CategorizedError> {
    let mut group = match group_file {
        Some(path) => PassGroup::from_file(path)?,
        None => PassGroup::named(group_name)?,
    };
    if skip_initial_passes {
        group.first.clear();
    }
    if skip_key_off {
        group.last.clear();
    }
    Ok(group)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::options::Options;
    use crate::passes::{CheckSanityPass, LinesPass, NormalizeLineMarkersPass};
    use camino::Utf8Path;
    use tempfile::tempdir;

    fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        (dir, path)
    }

    fn write_script(dir: &Utf8Path, name: &str, body: &str) -> Utf8PathBuf {
        let path = dir.join(name);
        std::fs::write(path.as_std_path(), body).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path.as_std_path()).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(path.as_std_path(), perms).unwrap();
        }
        path
    }

    fn scheduler_for(script: Utf8PathBuf, root: &Utf8Path) -> PassScheduler {
        let manager = TestManager::new(
            &Options {
                script,
                file: root.join("input.c"),
                workers: 2,
                timeout: std::time::Duration::from_secs(5),
                pass_group: "all".to_owned(),
                pass_group_file: None,
                skip_initial_passes: false,
                skip_key_off: false,
                save_temps: false,
                tmpdir: root.to_owned(),
                verbose: false,
            },
            root.join("sandboxes"),
            root.join("logs"),
        );
        PassScheduler::new(manager)
    }

    #[test]
    fn empty_main_phase_terminates_immediately() {
        let (_guard, root) = utf8_tempdir();
        let script = write_script(&root, "check.sh", "#!/bin/sh\nexit 0\n");
        let scheduler = scheduler_for(script, &root);
        let input = root.join("input.c");
        std::fs::write(input.as_std_path(), b"int x;\n").unwrap();
        let mut fur = Fur::load(&input).unwrap();
        let console = Console::new(false);
        let group = PassGroup {
            first: Vec::new(),
            main: Vec::new(),
            last: Vec::new(),
        };
        let summary = scheduler.run(&group, &mut fur, &console).unwrap();
        assert_eq!(summary.commits, 0);
    }

    #[test]
    fn s1_end_to_end_three_phase_run_reaches_fixpoint() {
        let (_guard, root) = utf8_tempdir();
        let script = write_script(&root, "check.sh", "#!/bin/sh\ngrep -q 'int y' input.c\n");
        let scheduler = scheduler_for(script, &root);
        let input = root.join("input.c");
        std::fs::write(input.as_std_path(), b"# 1 \"input.c\"\nint x;\nint y;\n").unwrap();
        let mut fur = Fur::load(&input).unwrap();
        let console = Console::new(false);
        let group = PassGroup {
            first: vec![Box::new(NormalizeLineMarkersPass::default())],
            main: vec![Box::new(LinesPass::default())],
            last: vec![Box::new(CheckSanityPass::default())],
        };
        let summary = scheduler.run(&group, &mut fur, &console).unwrap();
        assert!(summary.commits >= 1);
        assert!(summary.skipped_passes.is_empty());
        let text = String::from_utf8_lossy(fur.bytes());
        assert!(!text.contains("# 1"));
        assert!(text.contains("int y"));
        assert!(!text.contains("int x"));
    }

    #[test]
    fn main_loop_stops_after_a_sweep_with_no_commit() {
        let (_guard, root) = utf8_tempdir();
        // Nothing is ever interesting beyond the unmodified input, so every
        // main-phase trial fails and the loop must still terminate.
        let script = write_script(&root, "check.sh", "#!/bin/sh\nexit 1\n");
        let scheduler = scheduler_for(script, &root);
        let input = root.join("input.c");
        std::fs::write(input.as_std_path(), b"aaa\nbbb\n").unwrap();
        let mut fur = Fur::load(&input).unwrap();
        let console = Console::new(false);
        let group = PassGroup {
            first: Vec::new(),
            main: vec![Box::new(LinesPass::default())],
            last: Vec::new(),
        };
        let summary = scheduler.run(&group, &mut fur, &console).unwrap();
        assert_eq!(summary.commits, 0);
        assert_eq!(fur.bytes(), b"aaa\nbbb\n");
    }

    #[test]
    fn resolve_group_honors_skip_flags() {
        let group = resolve_group("all", None, true, true).unwrap();
        assert!(group.first.is_empty());
        assert!(group.last.is_empty());
        assert!(!group.main.is_empty());
    }
}
