// Copyright 2026 cvise-rs contributors

//! The parallel engine (spec §4.5): for one `(pass, file)` pair, speculatively
//! runs up to `P` trials concurrently, commits the earliest interesting one
//! **in state order** (not completion order), cancels every other in-flight
//! trial, and repeats until the pass is exhausted with no further win.
//!
//! The dispatch/cancellation/ordering machinery below is generic over two
//! concrete [TrialSource]s: [CursorSource] drives a plain `new_state`/
//! `advance`/`transform` pass, and [HintSource] drives the binary-search
//! chunk sequence of a hint-based pass. Both emit states speculatively,
//! ahead of any result being known, the same way the dispatcher in spec §4.5
//! "submits tasks until the pool is full".

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::console::{Console, PassActivity};
use crate::errors::{Category, CategorizedError, CategorizeExt};
use crate::fur::Fur;
use crate::hint::{apply_union, BinarySearchDriver, Hint};
use crate::interrupt::is_interrupted;
use crate::log_file::LogFile;
use crate::options::Options;
use crate::pass::{Cursor, PassAdapter, PassKind, StateResult, TransformResult};
use crate::sandbox::Sandbox;
use crate::test_runner::{self, Verdict};

/// A pass that returns `invalid` for this many consecutive dispatched
/// states is presumed broken for this file and the invocation is aborted
/// as a `pass_bug`, rather than spinning through its whole state space one
/// no-op at a time.
const MAX_CONSECUTIVE_INVALID: usize = 1000;

/// Spawn-failure retry policy (Open Question 2 in `DESIGN.md`): exponential
/// backoff starting at 50ms, doubling, capped at 5 attempts.
const SPAWN_RETRY_ATTEMPTS: u32 = 5;
const SPAWN_RETRY_BASE: Duration = Duration::from_millis(50);

/// One speculatively-dispatchable candidate: a position in the pass's state
/// sequence (`seq`, strictly increasing, assigned in dispatch order so it
/// doubles as the state-order key spec §4.5/§5 require), a human-readable
/// label for logging, and a thunk that materializes the candidate bytes
/// when a worker gets around to it.
pub struct PendingTrial {
    pub seq: u64,
    pub label: String,
    #[allow(clippy::type_complexity)]
    pub materialize: Box<dyn FnOnce(&dyn PassAdapter) -> Result<TransformResult, CategorizedError> + Send>,
}

/// Produces the sequence of trials a pass invocation offers, one at a time,
/// in state order, independent of whether earlier trials turn out
/// interesting (the whole point of speculative dispatch: we don't wait to
/// find out). `next()` returning `Ok(None)` means the pass has nothing
/// further to offer for this invocation (`advance`/the binary-search sweep
/// reached `stop`).
pub trait TrialSource {
    fn next(&mut self) -> Result<Option<PendingTrial>, CategorizedError>;
}

/// Drives a `new_state`/`advance`/`transform` pass. `advance` does not
/// depend on whether any trial was interesting, so the whole state spine
/// can be generated eagerly, one state ahead of the last dispatched one.
struct CursorSource<'p> {
    pass: &'p dyn PassAdapter,
    file: Vec<u8>,
    file_path: Utf8PathBuf,
    pending: Option<Cursor>,
    exhausted: bool,
    seq: u64,
}

impl<'p> TrialSource for CursorSource<'p> {
    fn next(&mut self) -> Result<Option<PendingTrial>, CategorizedError> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(cursor) = self.pending.take() else {
            return Ok(None);
        };
        match self.pass.advance(&self.file, cursor) {
            Ok(StateResult::State(s)) => self.pending = Some(s),
            Ok(StateResult::Stop) => self.exhausted = true,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        }
        let seq = self.seq;
        self.seq += 1;
        let label = format!("{} state={}", self.pass.name(), cursor.0);
        let file = self.file.clone();
        let file_path = self.file_path.clone();
        let materialize: Box<dyn FnOnce(&dyn PassAdapter) -> Result<TransformResult, CategorizedError> + Send> =
            Box::new(move |pass| pass.transform(&file, &file_path, cursor));
        Ok(Some(PendingTrial { seq, label, materialize }))
    }
}

/// Drives the binary-search chunk sequence of a hint-based pass (spec
/// §4.3). Each call to `next()` takes the driver's current trial and
/// immediately records it as (assumed) uninteresting, purely to keep
/// generating the next speculative trial; if the real result later turns
/// out interesting, [TestManager::drive] commits and discards this whole
/// source, so the assumption never needs correcting in place.
struct HintSource {
    driver: BinarySearchDriver,
    vocabulary: Vec<String>,
    file: Vec<u8>,
    seq: u64,
    pass_name: String,
}

impl TrialSource for HintSource {
    fn next(&mut self) -> Result<Option<PendingTrial>, CategorizedError> {
        if self.driver.is_done() {
            return Ok(None);
        }
        let trial = self.driver.current_trial();
        let selected: Vec<Hint> = self.driver.selected_hints(&trial).into_iter().cloned().collect();
        let label = format!(
            "{} chunk_size={} index={}",
            self.pass_name,
            self.driver.chunk_size(),
            self.driver.index()
        );
        self.driver.record(&trial, false);

        let seq = self.seq;
        self.seq += 1;
        let file = self.file.clone();
        let vocabulary = self.vocabulary.clone();
        let materialize: Box<dyn FnOnce(&dyn PassAdapter) -> Result<TransformResult, CategorizedError> + Send> =
            Box::new(move |_pass| {
                let refs: Vec<&Hint> = selected.iter().collect();
                apply_union(&file, &refs, &vocabulary).map(TransformResult::Ok)
            });
        Ok(Some(PendingTrial { seq, label, materialize }))
    }
}

enum TrialOutcome {
    Verdict(Verdict, Vec<u8>),
    Invalid,
    Bug(CategorizedError),
}

struct WorkerResult {
    seq: u64,
    label: String,
    outcome: TrialOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveOutcome {
    Committed,
    Exhausted,
}

/// Outcome of a full pass invocation: every commit the invocation made
/// before running out of states (spec: "the pass invocation ends
/// unsuccessfully" once `advance` reaches `stop` and the pool drains with
/// no win).
#[derive(Debug, Clone, Copy, Default)]
pub struct PassOutcome {
    pub commits: usize,
}

/// The parallel test manager: owns the worker pool size, timeout, and
/// sandbox/log locations, and drives one pass invocation at a time.
pub struct TestManager {
    workers: usize,
    timeout: Duration,
    script: Utf8PathBuf,
    sandbox_root: Utf8PathBuf,
    log_dir: Utf8PathBuf,
    save_temps: bool,
}

impl TestManager {
    pub fn new(options: &Options, sandbox_root: Utf8PathBuf, log_dir: Utf8PathBuf) -> TestManager {
        TestManager {
            workers: options.workers,
            timeout: options.timeout,
            script: options.script.clone(),
            sandbox_root,
            log_dir,
            save_temps: options.save_temps,
        }
    }

    /// Drive `pass` against `fur` to a fixpoint for this single invocation:
    /// loop committing and re-seeding until the pass is exhausted with no
    /// further improvement.
    pub fn run_pass(
        &self,
        pass: &dyn PassAdapter,
        fur: &mut Fur,
        console: &Console,
        phase_label: &str,
    ) -> Result<PassOutcome, CategorizedError> {
        let mut outcome = PassOutcome::default();
        loop {
            if is_interrupted() {
                break;
            }
            let activity = console.start_pass(pass.name(), phase_label);
            let Some(mut source) = self.build_source(pass, fur)? else {
                activity.finish(outcome.commits, None);
                break;
            };
            match self.drive(source.as_mut(), pass, fur, &activity)? {
                DriveOutcome::Committed => {
                    outcome.commits += 1;
                    activity.finish(outcome.commits, Some(fur.size()));
                }
                DriveOutcome::Exhausted => {
                    activity.finish(outcome.commits, None);
                    break;
                }
            }
        }
        Ok(outcome)
    }

    fn build_source<'p>(
        &self,
        pass: &'p dyn PassAdapter,
        fur: &Fur,
    ) -> Result<Option<Box<dyn TrialSource + 'p>>, CategorizedError> {
        if pass.kind() == PassKind::HintBased {
            let Some(mut bundle) = pass.new_hint(fur.bytes(), fur.path())? else {
                return Ok(None);
            };
            bundle.sort_and_dedup();
            let vocabulary = bundle.vocabulary;
            let hints = bundle.hints;
            let pass_name = pass.name().to_owned();
            let file = fur.bytes().to_vec();
            return Ok(BinarySearchDriver::new(hints).map(|driver| Box::new(HintSource {
                driver,
                vocabulary,
                file,
                seq: 0,
                pass_name,
            }) as Box<dyn TrialSource + 'p>));
        }
        match pass.new_state(fur.bytes())? {
            StateResult::Stop => Ok(None),
            StateResult::State(s) => Ok(Some(Box::new(CursorSource {
                pass,
                file: fur.bytes().to_vec(),
                file_path: fur.path().to_owned(),
                pending: Some(s),
                exhausted: false,
                seq: 0,
            }))),
        }
    }

    /// The dispatch/collect/commit loop. Ends either on the first
    /// interesting verdict in state order (a commit) or once the source is
    /// exhausted and every in-flight trial has reported uninteresting.
    fn drive(
        &self,
        source: &mut dyn TrialSource,
        pass: &dyn PassAdapter,
        fur: &mut Fur,
        activity: &PassActivity,
    ) -> Result<DriveOutcome, CategorizedError> {
        let (tx, rx) = mpsc::channel::<WorkerResult>();
        let mut in_flight: HashMap<u64, Arc<AtomicBool>> = HashMap::new();
        let mut buffered: BTreeMap<u64, WorkerResult> = BTreeMap::new();
        let mut next_to_handle: u64 = 0;
        let mut source_exhausted = false;
        let mut consecutive_invalid = 0usize;

        std::thread::scope(|scope| -> Result<DriveOutcome, CategorizedError> {
            loop {
                while !source_exhausted && in_flight.len() < self.workers && !is_interrupted() {
                    match source.next()? {
                        None => {
                            source_exhausted = true;
                        }
                        Some(trial) => {
                            let cancel = Arc::new(AtomicBool::new(false));
                            in_flight.insert(trial.seq, cancel.clone());
                            let tx = tx.clone();
                            let seq = trial.seq;
                            let label = trial.label;
                            let materialize = trial.materialize;
                            let sandbox_root = self.sandbox_root.clone();
                            let log_dir = self.log_dir.clone();
                            let script = self.script.clone();
                            let timeout = self.timeout;
                            let save_temps = self.save_temps;
                            let fur_filename = fur.filename().to_owned();
                            let label_for_worker = label.clone();
                            scope.spawn(move || {
                                let outcome = run_one_trial(
                                    pass,
                                    materialize,
                                    &sandbox_root,
                                    &fur_filename,
                                    &script,
                                    timeout,
                                    &log_dir,
                                    save_temps,
                                    &cancel,
                                    &label_for_worker,
                                );
                                let _ = tx.send(WorkerResult { seq, label, outcome });
                            });
                        }
                    }
                }

                if in_flight.is_empty() && buffered.is_empty() {
                    if source_exhausted || is_interrupted() {
                        return Ok(DriveOutcome::Exhausted);
                    }
                }

                if !buffered.contains_key(&next_to_handle) {
                    match rx.recv() {
                        Ok(result) => {
                            in_flight.remove(&result.seq);
                            buffered.insert(result.seq, result);
                        }
                        Err(_) => {
                            // No more senders: every in-flight worker has
                            // already reported.
                            if in_flight.is_empty() {
                                if buffered.contains_key(&next_to_handle) {
                                    // fall through to the handling loop below
                                } else {
                                    return Ok(DriveOutcome::Exhausted);
                                }
                            }
                        }
                    }
                }

                while let Some(result) = buffered.remove(&next_to_handle) {
                    match result.outcome {
                        TrialOutcome::Bug(e) => return Err(e),
                        TrialOutcome::Invalid => {
                            consecutive_invalid += 1;
                            activity.trial(&result.label, false);
                            if consecutive_invalid > MAX_CONSECUTIVE_INVALID {
                                return Err(CategorizedError {
                                    category: Category::PassBug,
                                    source: anyhow::anyhow!(
                                        "{} produced {} consecutive invalid states",
                                        pass.name(),
                                        consecutive_invalid
                                    ),
                                });
                            }
                            next_to_handle += 1;
                        }
                        TrialOutcome::Verdict(Verdict::Interesting, bytes) => {
                            // Strict-decrease invariant (spec §5, ordering
                            // guarantee 3): a same-size "commit" never
                            // counts as one. This is what keeps
                            // check-sanity read-only without a special
                            // case (Open Question 1 in DESIGN.md).
                            if bytes.len() < fur.size() {
                                activity.trial(&result.label, true);
                                for cancel in in_flight.values() {
                                    cancel.store(true, Ordering::Relaxed);
                                }
                                fur.commit(bytes).categorize(Category::IoError)?;
                                return Ok(DriveOutcome::Committed);
                            } else {
                                consecutive_invalid = 0;
                                activity.trial(&result.label, false);
                                next_to_handle += 1;
                            }
                        }
                        TrialOutcome::Verdict(_, _) => {
                            consecutive_invalid = 0;
                            activity.trial(&result.label, false);
                            next_to_handle += 1;
                        }
                    }
                }
            }
        })
    }
}

/// Runs in a worker thread: materialize the candidate, sandbox it, run the
/// interestingness test (with spawn-failure retry), and release the
/// sandbox. Never panics; every failure mode is folded into
/// [TrialOutcome::Bug].
#[allow(clippy::too_many_arguments)]
fn run_one_trial(
    pass: &dyn PassAdapter,
    materialize: Box<dyn FnOnce(&dyn PassAdapter) -> Result<TransformResult, CategorizedError> + Send>,
    sandbox_root: &Utf8Path,
    fur_filename: &str,
    script: &Utf8Path,
    timeout: Duration,
    log_dir: &Utf8Path,
    save_temps: bool,
    cancel: &AtomicBool,
    label: &str,
) -> TrialOutcome {
    let bytes = match materialize(pass) {
        Ok(TransformResult::Ok(bytes)) => bytes,
        Ok(TransformResult::Stop) | Ok(TransformResult::Invalid) => return TrialOutcome::Invalid,
        Err(e) => return TrialOutcome::Bug(e),
    };

    let sandbox = match Sandbox::acquire(sandbox_root, &sanitize(label), fur_filename, &bytes) {
        Ok(s) => s,
        Err(e) => {
            return TrialOutcome::Bug(CategorizedError {
                category: Category::IoError,
                source: e,
            })
        }
    };

    let log_file = match LogFile::create_in(log_dir, label) {
        Ok(l) => l,
        Err(e) => {
            sandbox.release(false);
            return TrialOutcome::Bug(CategorizedError {
                category: Category::IoError,
                source: e,
            });
        }
    };

    match run_with_spawn_retry(script, &sandbox, timeout, &log_file, cancel) {
        Ok(verdict) => {
            let keep = save_temps && verdict.is_interesting();
            sandbox.release(keep);
            TrialOutcome::Verdict(verdict, bytes)
        }
        Err(e) => {
            sandbox.release(false);
            TrialOutcome::Bug(e)
        }
    }
}

/// Retries a `spawn_error` with exponential backoff before escalating to
/// `pass_bug` (Open Question 2).
fn run_with_spawn_retry(
    script: &Utf8Path,
    sandbox: &Sandbox,
    timeout: Duration,
    log_file: &LogFile,
    cancel: &AtomicBool,
) -> Result<Verdict, CategorizedError> {
    let mut delay = SPAWN_RETRY_BASE;
    let mut last_err = None;
    for attempt in 0..SPAWN_RETRY_ATTEMPTS {
        if cancel.load(Ordering::Relaxed) {
            return Ok(Verdict::Cancelled);
        }
        match test_runner::run_cancelable(script, sandbox, &[], timeout, log_file, cancel) {
            Ok(verdict) => return Ok(verdict),
            Err(e) if e.category == Category::SpawnError => {
                last_err = Some(e);
                if attempt + 1 < SPAWN_RETRY_ATTEMPTS {
                    std::thread::sleep(delay);
                    delay *= 2;
                }
            }
            Err(e) => return Err(e),
        }
    }
    let e = last_err.expect("loop runs at least once");
    Err(CategorizedError {
        category: Category::PassBug,
        source: e.source,
    })
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::options::Options;
    use crate::passes::{CheckSanityPass, LinesPass};
    use camino::Utf8PathBuf;
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

    fn manager_for(script: Utf8PathBuf, root: &Utf8Path, workers: usize) -> TestManager {
        TestManager {
            workers,
            timeout: Duration::from_secs(5),
            script,
            sandbox_root: root.join("sandboxes"),
            log_dir: root.join("logs"),
            save_temps: false,
        }
    }

    #[test]
    fn s1_lines_pass_commits_the_line_deletion() {
        let (_guard, root) = utf8_tempdir();
        let script = write_script(&root, "check.sh", "#!/bin/sh\ngrep -q 'int y' \"$1\" 2>/dev/null || grep -q 'int y' input.c\n");
        let manager = manager_for(script, &root, 2);
        let input = root.join("input.c");
        std::fs::write(input.as_std_path(), b"int x;\nint y;\n").unwrap();
        let mut fur = Fur::load(&input).unwrap();
        let console = Console::new(false);
        let pass = LinesPass::default();
        let outcome = manager.run_pass(&pass, &mut fur, &console, "main").unwrap();
        assert!(outcome.commits >= 1);
        assert!(fur.size() < 14);
        assert!(String::from_utf8_lossy(fur.bytes()).contains("int y"));
    }

    #[test]
    fn check_sanity_never_commits_same_size_result() {
        let (_guard, root) = utf8_tempdir();
        let script = write_script(&root, "check.sh", "#!/bin/sh\nexit 0\n");
        let manager = manager_for(script, &root, 1);
        let input = root.join("input.c");
        std::fs::write(input.as_std_path(), b"int x;\n").unwrap();
        let mut fur = Fur::load(&input).unwrap();
        let console = Console::new(false);
        let pass = CheckSanityPass::default();
        let outcome = manager.run_pass(&pass, &mut fur, &console, "last").unwrap();
        assert_eq!(outcome.commits, 0);
        assert_eq!(fur.bytes(), b"int x;\n");
    }

    #[test]
    fn s5_parallel_commit_order_picks_the_earliest_interesting_state() {
        // Every physical line is a candidate deletion (lines pass); the
        // script is interesting for any variant missing line 3 ("ccc").
        // With several lines all individually droppable-looking to a
        // worker pool, the manager must still commit in state order: line
        // 1 here is the first whose removal keeps the file interesting.
        let (_guard, root) = utf8_tempdir();
        let script = write_script(
            &root,
            "check.sh",
            "#!/bin/sh\n! grep -q '^ccc$' input.c\n",
        );
        let manager = manager_for(script, &root, 4);
        let input = root.join("input.c");
        std::fs::write(input.as_std_path(), b"aaa\nbbb\nccc\nddd\n").unwrap();
        let mut fur = Fur::load(&input).unwrap();
        let console = Console::new(false);
        let pass = LinesPass::default();
        let outcome = manager.run_pass(&pass, &mut fur, &console, "main").unwrap();
        assert!(outcome.commits >= 1);
        assert!(!String::from_utf8_lossy(fur.bytes()).contains("ccc"));
    }

    #[test]
    fn sanitize_strips_unsafe_filename_characters() {
        assert_eq!(sanitize("lines chunk_size=4 index=0"), "lines_chunk_size_4_index_0");
    }
}
