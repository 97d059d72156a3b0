//! puglint CLI
//!
//! Runs the pug-lint language server, and exposes the same configuration
//! and linting pipeline on the command line.

mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use puglint_core::init_tracing;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "puglint")]
#[command(about = "pug-lint diagnostics for editors and terminals")]
#[command(version = puglint_core::VERSION)]
#[command(
    long_about = "puglint wraps the pug-lint package installed in your project.\n\
It serves diagnostics over the Language Server Protocol and can lint or\n\
explain configuration from the command line.\n\
\n\
Examples:\n  \
puglint lsp                  # Serve LSP on stdin/stdout\n  \
puglint check views/         # Lint templates under views/\n  \
puglint config views/a.pug   # Show the configuration applied to a file"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// node executable used to run pug-lint
    #[arg(long, global = true, env = "PUGLINT_NODE", help = "Path to the node executable")]
    node: Option<PathBuf>,

    /// Only look for pug-lint in the project's node_modules
    #[arg(long, global = true, help = "Skip NODE_PATH and global installs")]
    no_global: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the language server on stdin/stdout (default)
    Lsp {
        /// Accepted for editor clients that always pass it
        #[arg(long, hide = true)]
        stdio: bool,
    },

    /// Lint pug/jade templates
    #[command(alias = "lint")]
    Check {
        /// Files or directories to lint
        #[arg(help = "Files or directories to process (default: current directory)")]
        paths: Vec<PathBuf>,

        /// Project root used for configuration and module lookup
        #[arg(short, long, help = "Workspace root (default: current directory)")]
        workspace: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "human", help = "Output format for diagnostics")]
        format: OutputFormat,
    },

    /// Show the effective linter configuration for a file or directory
    Config {
        /// File or directory the configuration applies to
        path: Option<PathBuf>,

        /// Project root used for configuration lookup
        #[arg(short, long, help = "Workspace root (default: current directory)")]
        workspace: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Options shared by every command
pub struct GlobalOptions {
    pub node: Option<PathBuf>,
    pub search_global: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity; an explicit RUST_LOG wins at -v0
    let log_level = match cli.verbose {
        0 => "puglint=info",
        1 => "puglint=debug",
        _ => "puglint=trace",
    };
    if std::env::var_os("RUST_LOG").is_none() || cli.verbose > 0 {
        // no other threads exist yet
        unsafe {
            std::env::set_var("RUST_LOG", log_level);
        }
    }
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    let code = runtime.block_on(run_command(cli));
    std::process::exit(code);
}

async fn run_command(cli: Cli) -> i32 {
    let globals = GlobalOptions {
        node: cli.node,
        search_global: !cli.no_global,
    };

    let result = match cli.command.unwrap_or(Commands::Lsp { stdio: true }) {
        Commands::Lsp { .. } => commands::lsp_command(&globals).await,
        Commands::Check {
            paths,
            workspace,
            format,
        } => commands::check_command(&globals, paths, workspace, format).await,
        Commands::Config { path, workspace } => {
            commands::config_command(&globals, path, workspace).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("puglint failed: {:#}", e);
            eprintln!("error: {e:#}");
            2
        }
    }
}
