//! Command implementations

use crate::output::{self, FileReport};
use crate::{GlobalOptions, OutputFormat};
use anyhow::{Context, Result, anyhow};
use puglint_core::{
    ConfigLoader, ConfigResolver, Linter, LinterLoader, ModuleLocator, NodeLoader, NodeRuntime,
    PUG_LINT_PACKAGE,
};
use puglint_lsp::SessionConfig;
use puglint_lsp::diagnostics::to_diagnostic;
use puglint_lsp::documents::TEMPLATE_EXTENSIONS;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const INSTALL_HINT: &str =
    "install it in the project with `npm i pug-lint` or globally with `npm i -g pug-lint`";

/// Serve LSP on stdin/stdout
pub async fn lsp_command(globals: &GlobalOptions) -> Result<i32> {
    tracing::info!("Starting puglint language server v{}", puglint_lsp::VERSION);
    puglint_lsp::serve_stdio(session_config(globals)).await;
    Ok(0)
}

/// Lint templates; exits 1 when problems are found, 2 when a file could not be checked
pub async fn check_command(
    globals: &GlobalOptions,
    paths: Vec<PathBuf>,
    workspace: Option<PathBuf>,
    format: OutputFormat,
) -> Result<i32> {
    let workspace = workspace_root(workspace)?;
    let module = locator(globals)
        .require(PUG_LINT_PACKAGE, &workspace)
        .map_err(|e| anyhow!("{e}; {INSTALL_HINT}"))?;
    let mut linter = NodeLoader::new(globals.node.clone()).load(&module)?;
    let resolver = resolver(globals);

    let files = collect_templates(&paths)?;
    tracing::debug!("Checking {} template(s)", files.len());

    let mut reports = Vec::new();
    let mut failed = false;
    for file in files {
        let text = tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let document_dir = file.parent().unwrap_or(&workspace);

        let resolution = resolver.resolve(&workspace, document_dir, None).await;
        for warning in &resolution.warnings {
            tracing::warn!("{}", warning);
        }

        linter.configure(resolution.options);
        match linter.check(&text, &file).await {
            Ok(problems) => reports.push(FileReport {
                path: file,
                diagnostics: problems.iter().map(to_diagnostic).collect(),
            }),
            Err(e) => {
                eprintln!("{}: {}", file.display(), e);
                failed = true;
            }
        }
    }

    output::print_reports(&reports, format)?;

    let problems: usize = reports.iter().map(|r| r.diagnostics.len()).sum();
    Ok(if failed {
        2
    } else if problems > 0 {
        1
    } else {
        0
    })
}

/// Print the configuration that applies to `path`
pub async fn config_command(
    globals: &GlobalOptions,
    path: Option<PathBuf>,
    workspace: Option<PathBuf>,
) -> Result<i32> {
    let workspace = workspace_root(workspace)?;
    let target = match path {
        Some(path) => absolute(&path)?,
        None => workspace.clone(),
    };
    let document_dir = if target.is_dir() {
        target
    } else {
        target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workspace.clone())
    };

    let resolution = resolver(globals)
        .resolve(&workspace, &document_dir, None)
        .await;
    let report = json!({
        "source": resolution.source,
        "options": resolution.options,
        "warnings": resolution
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(0)
}

/// Collaborators for the language server
pub fn session_config(globals: &GlobalOptions) -> SessionConfig {
    SessionConfig {
        locator: locator(globals),
        loader: Arc::new(NodeLoader::new(globals.node.clone())),
        resolver: resolver(globals),
    }
}

fn locator(globals: &GlobalOptions) -> ModuleLocator {
    ModuleLocator::new().with_global_search(globals.search_global)
}

fn resolver(globals: &GlobalOptions) -> ConfigResolver {
    let loader = match NodeRuntime::locate(globals.node.as_deref()) {
        Ok(node) => ConfigLoader::with_node(node),
        Err(e) => {
            tracing::debug!("JavaScript config files unavailable: {}", e);
            ConfigLoader::new()
        }
    };
    ConfigResolver::new(loader)
}

fn workspace_root(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => absolute(&path),
        None => absolute(&std::env::current_dir().context("Failed to resolve current directory")?),
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Invalid path: {}", path.display()))
}

fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Explicit files are always kept; directories contribute their templates,
/// skipping `node_modules` and hidden directories
fn collect_templates(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let roots = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    };

    let mut files = Vec::new();
    for root in roots {
        let root = absolute(&root)?;
        if root.is_file() {
            files.push(root);
            continue;
        }

        let walker = WalkDir::new(&root).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !(name == "node_modules" || name.starts_with('.'))
        });
        for entry in walker.filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && is_template(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}
