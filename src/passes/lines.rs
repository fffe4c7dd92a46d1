// Copyright 2026 cvise-rs contributors

//! Hint-based pass proposing the deletion of each physical line.

use camino::Utf8Path;

use crate::errors::CategorizedError;
use crate::hint::{Hint, HintBundle, Patch};
use crate::pass::{Cursor, PassAdapter, PassKind, StateResult, TransformResult};

#[derive(Default)]
pub struct LinesPass;

impl PassAdapter for LinesPass {
    fn name(&self) -> &str {
        "lines"
    }

    fn kind(&self) -> PassKind {
        PassKind::HintBased
    }

    fn check_prereqs(&self) -> Result<Option<String>, CategorizedError> {
        Ok(None)
    }

    fn new_state(&self, _file: &[u8]) -> Result<StateResult<Cursor>, CategorizedError> {
        Ok(StateResult::Stop)
    }

    fn advance(&self, _file: &[u8], _state: Cursor) -> Result<StateResult<Cursor>, CategorizedError> {
        Ok(StateResult::Stop)
    }

    fn transform(
        &self,
        _file: &[u8],
        _file_path: &Utf8Path,
        _state: Cursor,
    ) -> Result<TransformResult, CategorizedError> {
        Ok(TransformResult::Stop)
    }

    fn new_hint(&self, file: &[u8], _file_path: &Utf8Path) -> Result<Option<HintBundle>, CategorizedError> {
        Ok(line_hints(file))
    }
}

/// One deletion hint per physical line, including its trailing newline.
/// Shared by [LinesPass] and tested directly since it's the simplest
/// demonstration of the hint machinery end to end.
pub fn line_hints(file: &[u8]) -> Option<HintBundle> {
    let mut hints = Vec::new();
    let mut start = 0usize;
    for (i, &b) in file.iter().enumerate() {
        if b == b'\n' {
            hints.push(Hint::new(vec![Patch::new(start, i + 1, None)]));
            start = i + 1;
        }
    }
    if start < file.len() {
        hints.push(Hint::new(vec![Patch::new(start, file.len(), None)]));
    }
    if hints.is_empty() {
        return None;
    }
    let mut bundle = HintBundle {
        vocabulary: Vec::new(),
        hints,
    };
    bundle.sort_and_dedup();
    Some(bundle)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s1_one_hint_per_line() {
        let bundle = line_hints(b"int x;\nint y;\n").unwrap();
        assert_eq!(bundle.hints.len(), 2);
        let deleted = crate::hint::apply_one(b"int x;\nint y;\n", &bundle.hints[0], &bundle.vocabulary).unwrap();
        assert_eq!(deleted, b"int y;\n");
    }

    #[test]
    fn no_trailing_newline_still_gets_a_hint() {
        let bundle = line_hints(b"only line").unwrap();
        assert_eq!(bundle.hints.len(), 1);
    }

    #[test]
    fn empty_file_has_no_hints() {
        assert!(line_hints(b"").is_none());
    }
}
