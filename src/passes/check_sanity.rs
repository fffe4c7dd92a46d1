// Copyright 2026 cvise-rs contributors

//! Read-only re-validation pass: its `transform` always writes back the
//! unmodified input. It exists to let a pass-group re-run the
//! interestingness predicate out of band (for example after a long
//! main-phase sweep) and surface a `pass_bug` if the file somehow stopped
//! being interesting without going through a commit. It can never itself
//! commit: a same-size result can never win against the strict
//! size-decrease required between commits.

use camino::Utf8Path;

use crate::errors::CategorizedError;
use crate::hint::HintBundle;
use crate::pass::{Cursor, PassAdapter, PassKind, StateResult, TransformResult};

#[derive(Default)]
pub struct CheckSanityPass;

impl PassAdapter for CheckSanityPass {
    fn name(&self) -> &str {
        "check-sanity"
    }

    fn kind(&self) -> PassKind {
        PassKind::CheckSanity
    }

    fn check_prereqs(&self) -> Result<Option<String>, CategorizedError> {
        Ok(None)
    }

    fn new_state(&self, _file: &[u8]) -> Result<StateResult<Cursor>, CategorizedError> {
        Ok(StateResult::State(Cursor(0)))
    }

    fn advance(&self, _file: &[u8], _state: Cursor) -> Result<StateResult<Cursor>, CategorizedError> {
        Ok(StateResult::Stop)
    }

    fn transform(
        &self,
        file: &[u8],
        _file_path: &Utf8Path,
        _state: Cursor,
    ) -> Result<TransformResult, CategorizedError> {
        Ok(TransformResult::Ok(file.to_vec()))
    }

    fn new_hint(&self, _file: &[u8], _file_path: &Utf8Path) -> Result<Option<HintBundle>, CategorizedError> {
        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transform_is_the_identity() {
        let pass = CheckSanityPass::default();
        let state = match pass.new_state(b"anything").unwrap() {
            StateResult::State(s) => s,
            StateResult::Stop => panic!("expected a state"),
        };
        match pass.transform(b"anything", Utf8Path::new("f"), state).unwrap() {
            TransformResult::Ok(bytes) => assert_eq!(bytes, b"anything"),
            other => panic!("expected Ok, got {other:?}"),
        }
    }
}
