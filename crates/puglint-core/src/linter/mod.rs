//! Linter abstraction
//!
//! The linting engine itself lives in the user's project. [`LinterLoader`]
//! turns a located module into a [`Linter`]; everything downstream only
//! sees the trait.

mod node;

pub use node::{NodeLinter, NodeLoader, NodeRuntime};

use crate::config::LinterOptions;
use crate::locator::ModulePath;
use crate::result::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A problem reported by the linter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// 1-based line
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub code: String,
    pub msg: ProblemMessage,
}

/// Linter messages are either one string or a list of fragments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProblemMessage {
    Text(String),
    Parts(Vec<String>),
}

impl ProblemMessage {
    /// Fragments joined with a single space
    pub fn joined(&self) -> String {
        match self {
            ProblemMessage::Text(text) => text.clone(),
            ProblemMessage::Parts(parts) => parts.join(" "),
        }
    }
}

impl From<&str> for ProblemMessage {
    fn from(text: &str) -> Self {
        ProblemMessage::Text(text.to_string())
    }
}

/// A loaded linting engine
///
/// One instance serves every document: callers configure it and then check
/// a document, and must not interleave another configure in between.
#[async_trait]
pub trait Linter: Send + Sync {
    /// Replace the active configuration
    fn configure(&mut self, options: LinterOptions);

    /// Check `text`, using `path` as the file name for the linter's context
    async fn check(&self, text: &str, path: &Path) -> Result<Vec<Problem>>;
}

/// Turns a located module into a linter instance
pub trait LinterLoader: Send + Sync {
    fn load(&self, module: &ModulePath) -> Result<Box<dyn Linter>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_with_single_message() {
        let problem: Problem = serde_json::from_str(
            r#"{"line": 3, "column": 5, "code": "PUG:LINT_DISALLOWIDLITERALS", "msg": "Id literals must not be used"}"#,
        )
        .unwrap();
        assert_eq!(problem.line, 3);
        assert_eq!(problem.msg.joined(), "Id literals must not be used");
    }

    #[test]
    fn test_problem_with_message_parts() {
        let problem: Problem = serde_json::from_str(
            r#"{"line": 1, "code": "PUG:SYNTAX", "msg": ["Unexpected", "token"]}"#,
        )
        .unwrap();
        assert_eq!(problem.column, 0);
        assert_eq!(problem.msg.joined(), "Unexpected token");
    }
}
