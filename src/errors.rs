// Copyright 2026 cvise-rs contributors

//! The error taxonomy used to decide whether a failure is fatal to the whole
//! run, or only to the current pass invocation.

use std::fmt;

/// Coarse categorization of a failure, matching the taxonomy in the design
/// notes: most categories are recoverable at the pass-invocation level, a
/// few are fatal to the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// The interestingness script itself could not be executed.
    ScriptError,
    /// Missing required helper tool, or an invalid pass-group reference.
    ConfigError,
    /// A pass produced malformed output, crashed, or proposed an invalid
    /// edit. Not fatal: the pass invocation is abandoned and the scheduler
    /// continues with the next pass.
    PassBug,
    /// The interestingness test exceeded its time budget.
    Timeout,
    /// Transient OS failure spawning a worker process.
    SpawnError,
    /// Reading or writing the file under reduction failed.
    IoError,
}

impl Category {
    /// Whether a failure of this category should abort the whole run rather
    /// than just the current pass invocation.
    pub fn is_fatal(self) -> bool {
        matches!(self, Category::ScriptError | Category::ConfigError | Category::IoError)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::ScriptError => "script_error",
            Category::ConfigError => "config_error",
            Category::PassBug => "pass_bug",
            Category::Timeout => "timeout",
            Category::SpawnError => "spawn_error",
            Category::IoError => "io_error",
        };
        f.write_str(s)
    }
}

/// An error tagged with its [Category], so callers further up the stack
/// (the scheduler) can decide escalation without re-deriving it from the
/// error text.
#[derive(Debug)]
pub struct CategorizedError {
    pub category: Category,
    pub source: anyhow::Error,
}

impl fmt::Display for CategorizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.source)
    }
}

impl std::error::Error for CategorizedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.source()
    }
}

pub trait CategorizeExt<T> {
    fn categorize(self, category: Category) -> Result<T, CategorizedError>;
}

impl<T, E> CategorizeExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn categorize(self, category: Category) -> Result<T, CategorizedError> {
        self.map_err(|e| CategorizedError {
            category,
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fatal_categories() {
        assert!(Category::IoError.is_fatal());
        assert!(Category::ConfigError.is_fatal());
        assert!(Category::ScriptError.is_fatal());
        assert!(!Category::PassBug.is_fatal());
        assert!(!Category::Timeout.is_fatal());
        assert!(!Category::SpawnError.is_fatal());
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(Category::PassBug.to_string(), "pass_bug");
    }
}
