// Copyright 2026 cvise-rs contributors

//! Hint-based pass proposing the deletion of whitespace-only lines.

use camino::Utf8Path;

use crate::errors::CategorizedError;
use crate::hint::{Hint, HintBundle, Patch};
use crate::pass::{Cursor, PassAdapter, PassKind, StateResult, TransformResult};

#[derive(Default)]
pub struct BlankLinesPass;

impl PassAdapter for BlankLinesPass {
    fn name(&self) -> &str {
        "blank-lines"
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
        Ok(blank_line_hints(file))
    }
}

fn blank_line_hints(file: &[u8]) -> Option<HintBundle> {
    let mut hints = Vec::new();
    let mut start = 0usize;
    for (i, &b) in file.iter().enumerate() {
        if b == b'\n' {
            if file[start..i].iter().all(|&c| c == b' ' || c == b'\t' || c == b'\r') {
                hints.push(Hint::new(vec![Patch::new(start, i + 1, None)]));
            }
            start = i + 1;
        }
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
    fn only_whitespace_lines_get_hints() {
        let bundle = blank_line_hints(b"int x;\n   \nint y;\n").unwrap();
        assert_eq!(bundle.hints.len(), 1);
        assert_eq!(bundle.hints[0].patches[0].left, 7);
    }

    #[test]
    fn no_blank_lines_yields_no_bundle() {
        assert!(blank_line_hints(b"int x;\nint y;\n").is_none());
    }
}
