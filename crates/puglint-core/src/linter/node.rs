//! Node-backed linter
//!
//! pug-lint is a JavaScript package, so checks run in a `node` child
//! process that loads `<module>/lib/linter.js`. The request (configuration,
//! text, file name) goes in on stdin as JSON; the problem list comes back on
//! stdout. A failing check exits non-zero with the error message on stderr.

use super::{Linter, LinterLoader, Problem};
use crate::config::LinterOptions;
use crate::error::PuglintError;
use crate::locator::ModulePath;
use crate::result::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const CHECK_SCRIPT: &str = r#"
const path = require('path');
const moduleRoot = process.argv[1];
const chunks = [];
process.stdin.on('data', (chunk) => chunks.push(chunk));
process.stdin.on('end', () => {
  try {
    const request = JSON.parse(Buffer.concat(chunks).toString('utf8'));
    const Linter = require(path.join(moduleRoot, 'lib', 'linter.js'));
    const linter = new Linter();
    linter.configure(request.config);
    const problems = linter.checkString(request.text, request.filename).map((error) => ({
      line: error.line,
      column: error.column,
      code: error.code,
      msg: error.msg,
    }));
    process.stdout.write(JSON.stringify(problems));
  } catch (err) {
    process.stderr.write(err && typeof err.message === 'string' ? err.message : '');
    process.exitCode = 1;
  }
});
"#;

/// A node executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRuntime {
    binary: PathBuf,
}

impl NodeRuntime {
    /// Environment variable overriding the node executable
    pub const ENV_VAR: &'static str = "PUGLINT_NODE";

    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Find node: an explicit path, then `PUGLINT_NODE`, then `PATH`
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        if let Some(path) = std::env::var_os(Self::ENV_VAR).filter(|v| !v.is_empty()) {
            return Ok(Self::new(path));
        }
        which::which("node")
            .map(Self::new)
            .map_err(|e| PuglintError::internal_error(format!("node not found in PATH: {e}")))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run an inline script and return its stdout
    ///
    /// A non-zero exit status is reported as a linter runtime error carrying
    /// stderr.
    pub async fn run_script(
        &self,
        script: &str,
        args: &[&OsStr],
        stdin: Option<&[u8]>,
        cwd: &Path,
    ) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .arg("-e")
            .arg(script)
            .args(args)
            .current_dir(cwd)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PuglintError::io_error(&self.binary, e))?;

        if let Some(input) = stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(input)
                .await
                .map_err(|e| PuglintError::io_error(&self.binary, e))?;
            // closing stdin lets the script see 'end'
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PuglintError::io_error(&self.binary, e))?;

        if !output.status.success() {
            return Err(PuglintError::linter_runtime(
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    config: &'a LinterOptions,
    text: &'a str,
    filename: String,
}

/// pug-lint running in node
#[derive(Debug, Clone)]
pub struct NodeLinter {
    module: ModulePath,
    node: NodeRuntime,
    options: LinterOptions,
}

impl NodeLinter {
    pub fn new(module: ModulePath, node: NodeRuntime) -> Self {
        Self {
            module,
            node,
            options: LinterOptions::new(),
        }
    }

    pub fn module(&self) -> &ModulePath {
        &self.module
    }
}

#[async_trait]
impl Linter for NodeLinter {
    fn configure(&mut self, options: LinterOptions) {
        self.options = options;
    }

    async fn check(&self, text: &str, path: &Path) -> Result<Vec<Problem>> {
        let request = CheckRequest {
            config: &self.options,
            text,
            filename: path.to_string_lossy().into_owned(),
        };
        let input = serde_json::to_vec(&request)
            .map_err(|e| PuglintError::internal_error(e.to_string()))?;

        let cwd = path
            .parent()
            .filter(|dir| dir.is_dir())
            .unwrap_or_else(|| self.module.root());

        let stdout = self
            .node
            .run_script(
                CHECK_SCRIPT,
                &[self.module.root().as_os_str()],
                Some(&input),
                cwd,
            )
            .await?;

        serde_json::from_str(&stdout).map_err(|e| {
            PuglintError::linter_runtime(format!("Unreadable linter output: {e}"))
        })
    }
}

/// Loads [`NodeLinter`] instances
#[derive(Debug, Clone, Default)]
pub struct NodeLoader {
    node_override: Option<PathBuf>,
}

impl NodeLoader {
    pub fn new(node_override: Option<PathBuf>) -> Self {
        Self { node_override }
    }
}

impl LinterLoader for NodeLoader {
    fn load(&self, module: &ModulePath) -> Result<Box<dyn Linter>> {
        let entry = module.root().join("lib").join("linter.js");
        if !entry.is_file() {
            return Err(PuglintError::internal_error(format!(
                "{} does not look like a pug-lint installation (missing {})",
                module.root().display(),
                entry.display()
            )));
        }

        let node = NodeRuntime::locate(self.node_override.as_deref())?;
        tracing::info!(
            "Loaded pug-lint from {} using {}",
            module.root().display(),
            node.binary().display()
        );
        Ok(Box::new(NodeLinter::new(module.clone(), node)))
    }
}
