//! Conversion of linter problems into LSP diagnostics

use puglint_core::Problem;
use regex::Regex;
use std::sync::LazyLock;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

/// Diagnostic source shown by editors
pub const DIAGNOSTIC_SOURCE: &str = "puglint";

static CODE_PREFIXES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("PUG:|LINT_").expect("valid code prefix pattern"));

/// Strip the `PUG:` and `LINT_` tokens pug-lint puts in its codes
pub fn short_code(code: &str) -> String {
    CODE_PREFIXES.replace_all(code, "").into_owned()
}

/// Translate one problem into a diagnostic
///
/// Every problem is an error; the linter has no warning tier. The 1-based
/// line becomes 0-based, the column is kept, and the range is zero-width.
pub fn to_diagnostic(problem: &Problem) -> Diagnostic {
    let code = short_code(&problem.code);
    let message: String = problem
        .msg
        .joined()
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect();

    let position = Position::new(problem.line.saturating_sub(1), problem.column);

    Diagnostic {
        range: Range::new(position, position),
        severity: Some(DiagnosticSeverity::ERROR),
        code: (!code.is_empty()).then(|| NumberOrString::String(code.clone())),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: format!("{message} [{code}]"),
        ..Default::default()
    }
}
