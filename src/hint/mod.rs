// Copyright 2026 cvise-rs contributors

//! The hint engine: a pass-independent representation of edits as
//! byte-range patches with a shared vocabulary, plus the binary-search
//! machinery used to commit them in bulk.

pub mod bundle;
pub mod chunk;
pub mod patch;

pub use bundle::{BundleStats, HintBundle};
pub use chunk::{BinarySearchDriver, ChunkTrial};
pub use patch::{apply_one, apply_union, Hint, Patch};
