// Copyright 2026 cvise-rs contributors

//! A [Patch] is a half-open byte range replaced (or deleted) in the file
//! under reduction. A [Hint] bundles the patches of one candidate edit.

use anyhow::anyhow;

use crate::errors::{Category, CategorizedError};

/// One half-open byte range `[left, right)`, replaced by the vocabulary
/// string at `vocab` (or deleted, if `vocab` is `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Patch {
    pub left: usize,
    pub right: usize,
    pub vocab: Option<u32>,
    /// Index into a file-list prefix of the vocabulary, for passes that
    /// operate over multiple files. Unused by this single-file engine, but
    /// round-tripped so bundles that carry it are not rejected.
    pub file: Option<u32>,
}

impl Patch {
    pub fn new(left: usize, right: usize, vocab: Option<u32>) -> Patch {
        Patch {
            left,
            right,
            vocab,
            file: None,
        }
    }

    fn is_well_formed(&self) -> bool {
        self.left <= self.right
    }
}

/// A single candidate edit: an ordered, disjoint list of patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub type_id: Option<u32>,
    pub patches: Vec<Patch>,
}

impl Hint {
    pub fn new(patches: Vec<Patch>) -> Hint {
        Hint {
            type_id: None,
            patches,
        }
    }

    /// The leftmost and rightmost bound touched by any patch, used for
    /// sorting a bundle (spec: hints sorted by `(first_patch.left,
    /// first_patch.right)`).
    pub fn sort_key(&self) -> (usize, usize) {
        match self.patches.first() {
            Some(p) => (p.left, p.right),
            None => (0, 0),
        }
    }

    /// Patches within a hint must be sorted by `left` and pairwise disjoint.
    /// Violations are a malformed bundle: `pass_bug`, never fatal.
    pub fn validate(&self, buf_len: usize) -> Result<(), CategorizedError> {
        let mut prev_right: Option<usize> = None;
        for p in &self.patches {
            if !p.is_well_formed() || p.right > buf_len {
                return Err(bug(format!(
                    "patch [{}, {}) is out of range for a {}-byte file",
                    p.left, p.right, buf_len
                )));
            }
            if let Some(prev_right) = prev_right {
                if p.left < prev_right {
                    return Err(bug(format!(
                        "hint patches overlap or are out of order: {prev_right} > {}",
                        p.left
                    )));
                }
            }
            prev_right = Some(p.right);
        }
        Ok(())
    }
}

fn bug(message: String) -> CategorizedError {
    CategorizedError {
        category: Category::PassBug,
        source: anyhow!(message),
    }
}

/// Apply the set-union of patches from `hints` to `buf`, replacing each
/// range with its vocabulary text (or removing it). `hints` need not be
/// pre-sorted; the union is sorted internally. Overlap across the union
/// (including between separate hints) is a caller bug: it means an
/// overlap-safe selection was skipped, so this returns an error rather than
/// silently picking a winner.
pub fn apply_union(buf: &[u8], hints: &[&Hint], vocabulary: &[String]) -> Result<Vec<u8>, CategorizedError> {
    let mut patches: Vec<&Patch> = hints.iter().flat_map(|h| h.patches.iter()).collect();
    patches.sort_by_key(|p| (p.left, p.right));

    let mut out = Vec::with_capacity(buf.len());
    let mut cursor = 0usize;
    for p in patches {
        if p.right > buf.len() {
            return Err(bug(format!(
                "patch [{}, {}) is out of range for a {}-byte file",
                p.left,
                p.right,
                buf.len()
            )));
        }
        if p.left < cursor {
            return Err(bug(format!(
                "overlapping patches in union at offset {}",
                p.left
            )));
        }
        out.extend_from_slice(&buf[cursor..p.left]);
        if let Some(vocab_id) = p.vocab {
            let text = vocabulary.get(vocab_id as usize).ok_or_else(|| {
                bug(format!("vocabulary index {vocab_id} out of range"))
            })?;
            out.extend_from_slice(text.as_bytes());
        }
        cursor = p.right;
    }
    out.extend_from_slice(&buf[cursor..]);
    Ok(out)
}

/// Apply a single hint in isolation (a convenience over [apply_union] for
/// the common one-hint-per-trial case).
pub fn apply_one(buf: &[u8], hint: &Hint, vocabulary: &[String]) -> Result<Vec<u8>, CategorizedError> {
    apply_union(buf, &[hint], vocabulary)
}
