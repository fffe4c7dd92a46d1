// Copyright 2026 cvise-rs contributors

//! Built-in passes exercising the adapter machinery end to end, plus a
//! generic adapter for out-of-process pass helpers. Concrete
//! clang_delta/tree-sitter/clex passes are out of scope; [external::ExternalPass]
//! is how they would plug in.

pub mod blank_lines;
pub mod check_sanity;
pub mod comments;
pub mod external;
pub mod lines;
pub mod normalize_line_markers;

pub use blank_lines::BlankLinesPass;
pub use check_sanity::CheckSanityPass;
pub use comments::CommentsPass;
pub use external::ExternalPass;
pub use lines::LinesPass;
pub use normalize_line_markers::NormalizeLineMarkersPass;

use crate::pass::PassAdapter;

/// The full set of built-in passes, in the order the `all` pass group
/// exercises them.
pub fn built_ins() -> Vec<Box<dyn PassAdapter>> {
    vec![
        Box::new(NormalizeLineMarkersPass::default()),
        Box::new(CommentsPass::default()),
        Box::new(BlankLinesPass::default()),
        Box::new(LinesPass::default()),
        Box::new(CheckSanityPass::default()),
    ]
}
