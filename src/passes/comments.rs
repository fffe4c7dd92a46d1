// Copyright 2026 cvise-rs contributors

//! Hint-based pass proposing the deletion of `/* ... */` and `// ...`
//! comment spans.
//!
//! This is a best-effort, text-level scanner: it does not track string or
//! character literals, so a `//` or `/*` inside a string is (rarely)
//! mistaken for a comment opener. A real tokenizer is out of scope here;
//! the interestingness test is the backstop that rejects any edit that
//! breaks the input.

use camino::Utf8Path;

use crate::errors::CategorizedError;
use crate::hint::{Hint, HintBundle, Patch};
use crate::pass::{Cursor, PassAdapter, PassKind, StateResult, TransformResult};

#[derive(Default)]
pub struct CommentsPass;

impl PassAdapter for CommentsPass {
    fn name(&self) -> &str {
        "comments"
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
        Ok(comment_hints(file))
    }
}

fn comment_hints(file: &[u8]) -> Option<HintBundle> {
    let mut hints = Vec::new();
    let mut i = 0usize;
    let len = file.len();
    while i < len {
        if i + 1 < len && file[i] == b'/' && file[i + 1] == b'*' {
            let end = find(file, i + 2, b"*/").map(|p| p + 2).unwrap_or(len);
            hints.push(Hint::new(vec![Patch::new(i, end, None)]));
            i = end;
        } else if i + 1 < len && file[i] == b'/' && file[i + 1] == b'/' {
            let end = file[i..].iter().position(|&b| b == b'\n').map(|p| i + p).unwrap_or(len);
            hints.push(Hint::new(vec![Patch::new(i, end, None)]));
            i = end;
        } else {
            i += 1;
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

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hint::apply_union;

    #[test]
    fn s2_strips_block_and_line_comments() {
        let input = b"/* keep */ int x; // drop\n";
        let bundle = comment_hints(input).unwrap();
        assert_eq!(bundle.hints.len(), 2);
        let refs: Vec<&Hint> = bundle.hints.iter().collect();
        let out = apply_union(input, &refs, &bundle.vocabulary).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("int x;"));
        assert!(!out.contains("/*"));
        assert!(!out.contains("//"));
    }

    #[test]
    fn unterminated_block_comment_runs_to_eof() {
        let bundle = comment_hints(b"int x; /* oops").unwrap();
        assert_eq!(bundle.hints.len(), 1);
        assert_eq!(bundle.hints[0].patches[0].right, 14);
    }

    #[test]
    fn no_comments_yields_no_bundle() {
        assert!(comment_hints(b"int x;\n").is_none());
    }
}
