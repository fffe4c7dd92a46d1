// Copyright 2026 cvise-rs contributors

//! Transform-kind, single-shot `first`-phase pass: strips GNU-cpp-style
//! `# <n> "file" [flags]` line markers, which clutter output without
//! affecting interestingness and only get in the way of later passes.

use camino::Utf8Path;
use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::errors::CategorizedError;
use crate::hint::HintBundle;
use crate::pass::{Cursor, PassAdapter, PassKind, StateResult, TransformResult};

lazy_static! {
    static ref LINE_MARKER: Regex =
        Regex::new(r#"(?m)^[ \t]*#[ \t]*[0-9]+[ \t]+"[^"\n]*"[^\n]*\n?"#).expect("valid regex");
}

#[derive(Default)]
pub struct NormalizeLineMarkersPass;

impl PassAdapter for NormalizeLineMarkersPass {
    fn name(&self) -> &str {
        "normalize-line-markers"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transform
    }

    fn check_prereqs(&self) -> Result<Option<String>, CategorizedError> {
        Ok(None)
    }

    fn new_state(&self, file: &[u8]) -> Result<StateResult<Cursor>, CategorizedError> {
        if LINE_MARKER.is_match(file) {
            Ok(StateResult::State(Cursor(0)))
        } else {
            Ok(StateResult::Stop)
        }
    }

    fn advance(&self, _file: &[u8], _state: Cursor) -> Result<StateResult<Cursor>, CategorizedError> {
        // Single-shot: there is exactly one state, which strips every
        // marker in the file at once.
        Ok(StateResult::Stop)
    }

    fn transform(
        &self,
        file: &[u8],
        _file_path: &Utf8Path,
        state: Cursor,
    ) -> Result<TransformResult, CategorizedError> {
        if state.0 != 0 {
            return Ok(TransformResult::Invalid);
        }
        let out = LINE_MARKER.replace_all(file, &b""[..]).into_owned();
        if out == file {
            Ok(TransformResult::Invalid)
        } else {
            Ok(TransformResult::Ok(out))
        }
    }

    fn new_hint(&self, _file: &[u8], _file_path: &Utf8Path) -> Result<Option<HintBundle>, CategorizedError> {
        Ok(None)
    }
}
