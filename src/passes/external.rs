// Copyright 2026 cvise-rs contributors

//! Generic adapter for an out-of-process pass helper, conforming to the
//! "pass helper invocation" convention: spawned as
//! `<helper> <transformation-name> [--state N] <input-path>`, stdout
//! carries either the raw transformed text or (for hint-based helpers) a
//! hint bundle in the wire format. This crate ships no concrete
//! clang_delta/clex/tree-sitter helpers — those binaries are genuinely
//! out of scope — but anything conforming to the convention can be
//! plugged in through this adapter.

use std::process::Command;

use anyhow::{anyhow, Context};
use camino::Utf8Path;

use crate::errors::{Category, CategorizedError, CategorizeExt};
use crate::hint::HintBundle;
use crate::pass::{Cursor, PassAdapter, PassExec, PassKind, StateResult, TransformResult};

pub struct ExternalPass {
    name: String,
    transformation_name: String,
    kind: PassKind,
    /// How many discrete states this invocation of the helper offers.
    /// Real clang_delta-style helpers answer this themselves; since none
    /// ship here, it's supplied by the caller (typically from a
    /// pass-group config entry).
    state_count: u64,
    exec: PassExec,
}

impl ExternalPass {
    pub fn new(name: &str, helper: &str, transformation_name: &str, kind: PassKind, state_count: u64) -> ExternalPass {
        ExternalPass {
            name: name.to_owned(),
            transformation_name: transformation_name.to_owned(),
            kind,
            state_count,
            exec: PassExec::External {
                helper: helper.to_owned(),
                args: vec![transformation_name.to_owned()],
            },
        }
    }

    fn helper_path(&self) -> &str {
        match &self.exec {
            PassExec::External { helper, .. } => helper,
            PassExec::Internal => unreachable!("ExternalPass always carries PassExec::External"),
        }
    }

    fn run(&self, args: &[String]) -> Result<Vec<u8>, CategorizedError> {
        let output = Command::new(self.helper_path())
            .args(args)
            .output()
            .with_context(|| format!("spawn helper {}", self.helper_path()))
            .categorize(Category::SpawnError)?;
        if !output.status.success() {
            return Err(CategorizedError {
                category: Category::PassBug,
                source: anyhow!(
                    "helper {} exited with {}: {}",
                    self.helper_path(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }
        Ok(output.stdout)
    }
}

impl PassAdapter for ExternalPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PassKind {
        self.kind
    }

    fn check_prereqs(&self) -> Result<Option<String>, CategorizedError> {
        if find_in_path(self.helper_path()) {
            Ok(None)
        } else {
            Ok(Some(self.helper_path().to_owned()))
        }
    }

    fn new_state(&self, _file: &[u8]) -> Result<StateResult<Cursor>, CategorizedError> {
        if self.state_count == 0 {
            Ok(StateResult::Stop)
        } else {
            Ok(StateResult::State(Cursor(0)))
        }
    }

    fn advance(&self, _file: &[u8], state: Cursor) -> Result<StateResult<Cursor>, CategorizedError> {
        if state.0 + 1 < self.state_count {
            Ok(StateResult::State(Cursor(state.0 + 1)))
        } else {
            Ok(StateResult::Stop)
        }
    }

    fn transform(
        &self,
        _file: &[u8],
        file_path: &Utf8Path,
        state: Cursor,
    ) -> Result<TransformResult, CategorizedError> {
        let args = vec![
            self.transformation_name.clone(),
            "--counter".to_string(),
            state.0.to_string(),
            file_path.to_string(),
        ];
        let stdout = self.run(&args)?;
        if stdout.is_empty() {
            Ok(TransformResult::Invalid)
        } else {
            Ok(TransformResult::Ok(stdout))
        }
    }

    fn new_hint(&self, file: &[u8], file_path: &Utf8Path) -> Result<Option<HintBundle>, CategorizedError> {
        if self.kind != PassKind::HintBased {
            return Ok(None);
        }
        let args = vec![self.transformation_name.clone(), file_path.to_string()];
        let stdout = self.run(&args)?;
        if stdout.is_empty() {
            return Ok(None);
        }
        let text = String::from_utf8(stdout).map_err(|e| CategorizedError {
            category: Category::PassBug,
            source: anyhow!("helper produced non-UTF-8 bundle: {e}"),
        })?;
        let bundle = HintBundle::parse(&text, file.len())?;
        Ok(Some(bundle))
    }
}

fn find_in_path(bin: &str) -> bool {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        return std::path::Path::new(bin).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join(bin).is_file())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_helper_is_reported_by_check_prereqs() {
        let pass = ExternalPass::new("custom", "cvise-definitely-not-a-real-helper", "arg", PassKind::Transform, 1);
        assert_eq!(pass.check_prereqs().unwrap(), Some("cvise-definitely-not-a-real-helper".to_string()));
    }

    #[test]
    fn state_count_bounds_advance() {
        let pass = ExternalPass::new("custom", "true", "arg", PassKind::Transform, 2);
        let s0 = match pass.new_state(b"x").unwrap() {
            StateResult::State(s) => s,
            StateResult::Stop => panic!("expected a state"),
        };
        assert_eq!(pass.advance(b"x", s0).unwrap(), StateResult::State(Cursor(1)));
        assert_eq!(pass.advance(b"x", Cursor(1)).unwrap(), StateResult::Stop);
    }
}
