// Copyright 2021 - 2026 cvise-rs contributors

//! Exit codes from `cvise`.
//!
//! These are assigned so that CI or other automation (or this crate's own
//! test suite) can distinguish different terminal outcomes of a run.

/// The reduction ran to completion (a fixpoint was reached, or there was
/// nothing to do).
pub const SUCCESS: i32 = 0;

/// Bad arguments, missing file, or similar usage error.
///
/// (1 is also the value clap itself returns for a parse error.)
pub const USAGE: i32 = 1;

/// A required helper tool or the interestingness script itself could not be
/// spawned. Corresponds to `script_error`/`config_error` in the error
/// taxonomy.
pub const CONFIG_ERROR: i32 = 2;

/// The interestingness script did not return 0 (interesting) on the
/// unmodified input, so there was nothing to reduce.
pub const BASELINE_NOT_INTERESTING: i32 = 3;

/// Reading or writing the file under reduction failed.
pub const IO_ERROR: i32 = 4;

/// The run was interrupted (e.g. Ctrl-C) before reaching a fixpoint.
pub const INTERRUPTED: i32 = 5;

/// An internal software error.
pub const SOFTWARE: i32 = 70;
