// Copyright 2026 cvise-rs contributors

//! The binary-search driver: turns a flat bundle of hints into the
//! `(chunk_size, instance_index)` state sequence a hint-based pass is
//! driven through, including the overlap-safe union used to pick which
//! hints in a window can actually be tried together.

use crate::hint::patch::Hint;

/// One trial: the hints selected from the current window (mutually
/// non-overlapping, first-come-first-kept) plus the indices that were
/// dropped from this trial because they overlapped an earlier one. Dropped
/// hints are not lost — they remain in the driver's remaining list and get
/// another chance in a later, smaller sub-chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkTrial {
    pub selected: Vec<usize>,
    pub dropped: Vec<usize>,
}

/// Drives the `(chunk_size, i)` state machine of §4.3 over a bundle's
/// hints. Starts at `chunk_size = hints.len()` and halves on a sweep with
/// no commit; a commit removes the committed hints from the remaining list
/// and keeps `(chunk_size, i)` unchanged, since the list just got shorter.
pub struct BinarySearchDriver {
    remaining: Vec<Hint>,
    chunk_size: usize,
    index: usize,
}

impl BinarySearchDriver {
    /// Returns `None` for an empty bundle: there is nothing to drive.
    pub fn new(hints: Vec<Hint>) -> Option<BinarySearchDriver> {
        if hints.is_empty() {
            return None;
        }
        let chunk_size = hints.len();
        Some(BinarySearchDriver {
            remaining: hints,
            chunk_size,
            index: 0,
        })
    }

    pub fn is_done(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> &[Hint] {
        &self.remaining
    }

    /// The overlap-safe selection for the current `(chunk_size, index)`.
    pub fn current_trial(&self) -> ChunkTrial {
        let end = (self.index + self.chunk_size).min(self.remaining.len());
        let window = &self.remaining[self.index..end];
        let (kept, dropped) = select_overlap_safe(window);
        ChunkTrial {
            selected: kept.into_iter().map(|i| self.index + i).collect(),
            dropped: dropped.into_iter().map(|i| self.index + i).collect(),
        }
    }

    pub fn selected_hints<'a>(&'a self, trial: &ChunkTrial) -> Vec<&'a Hint> {
        trial.selected.iter().map(|&i| &self.remaining[i]).collect()
    }

    /// Record the trial's outcome and move the state machine forward.
    pub fn record(&mut self, trial: &ChunkTrial, interesting: bool) {
        if interesting {
            let mut selected = trial.selected.clone();
            selected.sort_unstable();
            for &i in selected.iter().rev() {
                self.remaining.remove(i);
            }
        } else {
            self.index += self.chunk_size;
        }
        self.finish_window_if_needed();
    }

    fn finish_window_if_needed(&mut self) {
        if self.remaining.is_empty() {
            return;
        }
        if self.index >= self.remaining.len() {
            if self.chunk_size <= 1 {
                self.remaining.clear();
            } else {
                self.chunk_size = (self.chunk_size / 2).max(1);
                self.index = 0;
            }
        }
    }
}

/// Given a window of hints in source order, keep the maximal
/// non-overlapping prefix-greedy subset: a hint is kept iff none of its
/// patches overlaps any patch of an already-kept hint. Deterministic,
/// first-come-first-kept.
fn select_overlap_safe(hints: &[Hint]) -> (Vec<usize>, Vec<usize>) {
    let mut kept_ranges: Vec<(usize, usize)> = Vec::new();
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    'hints: for (i, h) in hints.iter().enumerate() {
        for p in &h.patches {
            for &(l, r) in &kept_ranges {
                if p.left < r && l < p.right {
                    dropped.push(i);
                    continue 'hints;
                }
            }
        }
        for p in &h.patches {
            kept_ranges.push((p.left, p.right));
        }
        kept.push(i);
    }
    (kept, dropped)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hint::patch::Patch;

    fn del(left: usize, right: usize) -> Hint {
        Hint::new(vec![Patch::new(left, right, None)])
    }

    #[test]
    fn empty_bundle_has_no_driver() {
        assert!(BinarySearchDriver::new(vec![]).is_none());
    }

    #[test]
    fn s3_binary_search_commits_whole_bundle_at_chunk_size_4() {
        // Four disjoint delete hints over "AABBCCDD"; the script is
        // interesting only once the whole buffer is empty, so the first
        // (and only) chunk, covering all four hints, commits immediately.
        let hints = vec![del(0, 2), del(2, 4), del(4, 6), del(6, 8)];
        let mut driver = BinarySearchDriver::new(hints).unwrap();
        assert_eq!(driver.chunk_size(), 4);

        let trial = driver.current_trial();
        assert_eq!(trial.selected, vec![0, 1, 2, 3]);
        assert!(trial.dropped.is_empty());

        driver.record(&trial, true);
        assert!(driver.is_done());
    }

    #[test]
    fn s4_overlap_within_a_chunk_keeps_first_and_retries_second() {
        // Patches [0,3) and [2,5) overlap; only the first should be
        // selected for this trial, the second deferred.
        let hints = vec![del(0, 3), del(2, 5)];
        let driver = BinarySearchDriver::new(hints).unwrap();
        let trial = driver.current_trial();
        assert_eq!(trial.selected, vec![0]);
        assert_eq!(trial.dropped, vec![1]);
    }

    #[test]
    fn dropped_overlap_hint_survives_a_commit_of_the_rest() {
        let hints = vec![del(0, 3), del(2, 5)];
        let mut driver = BinarySearchDriver::new(hints).unwrap();
        let trial = driver.current_trial();
        driver.record(&trial, true); // commits hint 0 only
        assert!(!driver.is_done());
        assert_eq!(driver.remaining().len(), 1);
        assert_eq!(driver.remaining()[0], del(2, 5));
    }

    #[test]
    fn binary_search_visits_every_singleton_when_nothing_commits() {
        // Property 7: with no trial ever interesting, every hint must be
        // tried alone (chunk_size == 1) at least once before the driver
        // finishes.
        let hints: Vec<Hint> = (0..5).map(|i| del(i * 2, i * 2 + 1)).collect();
        let mut driver = BinarySearchDriver::new(hints).unwrap();
        let mut visited_as_singleton = std::collections::HashSet::new();

        let mut iterations = 0;
        while !driver.is_done() {
            iterations += 1;
            assert!(iterations < 1000, "binary search did not terminate");
            let trial = driver.current_trial();
            if driver.chunk_size() == 1 {
                if let Some(&i) = trial.selected.first() {
                    visited_as_singleton.insert(driver.remaining()[i].clone());
                }
            }
            driver.record(&trial, false);
        }
        assert_eq!(visited_as_singleton.len(), 5);
    }
}
