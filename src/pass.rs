// Copyright 2026 cvise-rs contributors

//! The uniform interface wrapping every concrete pass, external or
//! internal, and the opaque state it advances through its transform space.

use camino::Utf8Path;

use crate::errors::CategorizedError;
use crate::hint::HintBundle;

/// Which of the three scheduler phases a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Sanity or one-shot normalization; run once, never iterated.
    Transform,
    /// Read-only re-validation of the interestingness predicate.
    CheckSanity,
    /// Contributes a [HintBundle] rather than enumerating states itself;
    /// the binary-search driver in [crate::hint::chunk] owns the state
    /// machine.
    HintBased,
}

/// How a pass is realized.
pub enum PassExec {
    /// A helper executable invoked as `<helper> <args...> <input-path>`,
    /// per the pass-helper invocation convention.
    External { helper: String, args: Vec<String> },
    /// Implemented in-process against the FUR's byte buffer.
    Internal,
}

/// The next thing to try, or a reason there is nothing more to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateResult<S> {
    State(S),
    Stop,
}

/// The outcome of materializing a state's candidate variant.
#[derive(Debug)]
pub enum TransformResult {
    Ok(Vec<u8>),
    Stop,
    /// The state slot turned out to have no effect (nothing matched); the
    /// manager advances and retries without counting it as a trial.
    Invalid,
}

/// An opaque cursor into a pass's transform space. Non-hint-based passes
/// use an internal integer-like counter; hint-based passes never construct
/// one directly — the binary-search driver manufactures states for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(pub u64);

/// The uniform interface every concrete pass implements.
///
/// Byte-range offsets a pass hands back (through [HintBundle]s) are always
/// relative to the exact FUR contents passed to the method that produced
/// them; callers must not reuse a cursor or bundle across a commit.
pub trait PassAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> PassKind;

    /// Inspect once at startup whether required external tools exist.
    /// `Ok(None)` means all prerequisites are satisfied; `Ok(Some(tool))`
    /// names the first missing tool.
    fn check_prereqs(&self) -> Result<Option<String>, CategorizedError>;

    /// Initialize a cursor for `file`. `Ok(None)` means the pass has
    /// nothing to offer for this file.
    fn new_state(&self, file: &[u8]) -> Result<StateResult<Cursor>, CategorizedError>;

    /// Produce the next state without materializing a variant.
    fn advance(&self, file: &[u8], state: Cursor) -> Result<StateResult<Cursor>, CategorizedError>;

    /// Write the candidate variant for `state` into a fresh buffer.
    fn transform(
        &self,
        file: &[u8],
        file_path: &Utf8Path,
        state: Cursor,
    ) -> Result<TransformResult, CategorizedError>;

    /// For hint-producing passes, build the bundle the binary-search
    /// driver will iterate over. Passes that return `Some` here must never
    /// be driven through `new_state`/`advance`/`transform` directly.
    fn new_hint(&self, _file: &[u8], _file_path: &Utf8Path) -> Result<Option<HintBundle>, CategorizedError> {
        Ok(None)
    }
}
