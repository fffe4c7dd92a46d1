// Copyright 2026 cvise-rs contributors

//! The hint bundle wire format (spec §6): one JSON array of vocabulary
//! strings on the first line, followed by one compact JSON object per hint.

use anyhow::{anyhow, Context};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::errors::{Category, CategorizedError};
use crate::hint::patch::{Hint, Patch};

/// The full output of one pass invocation: a shared vocabulary plus the
/// hints that reference it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintBundle {
    pub vocabulary: Vec<String>,
    pub hints: Vec<Hint>,
}

#[derive(Serialize, Deserialize)]
struct WirePatch {
    l: usize,
    r: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    v: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    f: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct WireHint {
    #[serde(skip_serializing_if = "Option::is_none")]
    t: Option<u32>,
    p: Vec<WirePatch>,
}

impl HintBundle {
    /// Parse the line-oriented wire format described in the external
    /// interfaces section: vocabulary array, then one hint object per line.
    /// Blank lines are tolerated and skipped (helpers sometimes emit a
    /// trailing newline).
    ///
    /// Malformed input (bad JSON, non-monotonic or out-of-range patches) is
    /// reported as `pass_bug`: the producing pass is skipped, never fatal.
    pub fn parse(text: &str, buf_len: usize) -> Result<HintBundle, CategorizedError> {
        let mut lines = text.lines();
        let vocab_line = lines.next().unwrap_or("");
        let vocabulary: Vec<String> = serde_json::from_str(vocab_line)
            .map_err(|e| bug(format!("invalid vocabulary line: {e}")))?;

        let mut hints = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let wire: WireHint =
                serde_json::from_str(line).map_err(|e| bug(format!("invalid hint line {line:?}: {e}")))?;
            let patches = wire
                .p
                .into_iter()
                .map(|wp| Patch {
                    left: wp.l,
                    right: wp.r,
                    vocab: wp.v,
                    file: wp.f,
                })
                .collect();
            let hint = Hint {
                type_id: wire.t,
                patches,
            };
            hint.validate(buf_len)?;
            hints.push(hint);
        }
        Ok(HintBundle { vocabulary, hints })
    }

    /// Serialize back to the wire format. Used by internal (in-process)
    /// pass producers so they can share the same parsing/validation path as
    /// external helpers, and by tests.
    pub fn to_wire(&self) -> anyhow::Result<String> {
        let mut out = serde_json::to_string(&self.vocabulary).context("serialize vocabulary")?;
        out.push('\n');
        for hint in &self.hints {
            let wire = WireHint {
                t: hint.type_id,
                p: hint
                    .patches
                    .iter()
                    .map(|p| WirePatch {
                        l: p.left,
                        r: p.right,
                        v: p.vocab,
                        f: p.file,
                    })
                    .collect(),
            };
            out.push_str(&serde_json::to_string(&wire).context("serialize hint")?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Sort hints by `(first_patch.left, first_patch.right)` and collapse
    /// hints with identical patch lists, per spec's sort-and-dedup
    /// operation.
    pub fn sort_and_dedup(&mut self) {
        self.hints = std::mem::take(&mut self.hints)
            .into_iter()
            .sorted_by_key(|h| h.sort_key())
            .dedup_by(|a, b| a.patches == b.patches)
            .collect();
    }

    pub fn stats(&self) -> BundleStats {
        let mut deleted_bytes = 0usize;
        let mut inserted_bytes = 0usize;
        for hint in &self.hints {
            for p in &hint.patches {
                deleted_bytes += p.right - p.left;
                if let Some(v) = p.vocab {
                    if let Some(text) = self.vocabulary.get(v as usize) {
                        inserted_bytes += text.len();
                    }
                }
            }
        }
        BundleStats {
            hint_count: self.hints.len(),
            deleted_bytes,
            inserted_bytes,
        }
    }
}

fn bug(message: String) -> CategorizedError {
    CategorizedError {
        category: Category::PassBug,
        source: anyhow!(message),
    }
}

/// Summary counters surfaced by `--list`-style diagnostics and the
/// scheduler's end-of-run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BundleStats {
    pub hint_count: usize,
    pub deleted_bytes: usize,
    pub inserted_bytes: usize,
}
