//! Output formatting for `puglint check`

use crate::OutputFormat;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use tower_lsp::lsp_types::Diagnostic;

/// Diagnostics produced for one template
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

/// Print reports to stdout in the requested format
pub fn print_reports(reports: &[FileReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => print!("{}", render_human(reports)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(reports)?),
    }
    Ok(())
}

/// `path:line:column: message` per problem, positions as the linter reports them
fn render_human(reports: &[FileReport]) -> String {
    let mut out = String::new();
    let mut problems = 0;

    for report in reports {
        for diagnostic in &report.diagnostics {
            let start = diagnostic.range.start;
            out.push_str(&format!(
                "{}:{}:{}: {}\n",
                report.path.display(),
                start.line + 1,
                start.character,
                diagnostic.message
            ));
            problems += 1;
        }
    }

    let files = reports.len();
    out.push_str(&format!(
        "{} problem{} in {} file{}\n",
        problems,
        if problems == 1 { "" } else { "s" },
        files,
        if files == 1 { "" } else { "s" },
    ));
    out
}
