//! Error types for configuration discovery, module location and linting

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pug-lint integration operations
#[derive(Debug, Error)]
pub enum PuglintError {
    /// A config file that was asked for does not exist
    #[error("Config file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// A config file exists but is not a valid linter configuration
    #[error("Failed to parse config file '{}': {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// The linter package is not installed anywhere we looked
    #[error("Module '{package}' not found from '{}'", start_dir.display())]
    ModuleNotFound { package: String, start_dir: PathBuf },

    /// The linter failed while checking a document
    #[error("{message}")]
    LinterRuntime { message: String },

    /// The linter failed without saying why
    #[error("Unknown linter failure")]
    Unknown,

    /// File system I/O errors
    #[error("IO error for path '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigNotFound,
    ConfigParse,
    ModuleNotFound,
    LinterRuntime,
    Unknown,
    Io,
    Internal,
}

impl PuglintError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PuglintError::ConfigNotFound { .. } => ErrorKind::ConfigNotFound,
            PuglintError::ConfigParse { .. } => ErrorKind::ConfigParse,
            PuglintError::ModuleNotFound { .. } => ErrorKind::ModuleNotFound,
            PuglintError::LinterRuntime { .. } => ErrorKind::LinterRuntime,
            PuglintError::Unknown => ErrorKind::Unknown,
            PuglintError::IoError { .. } => ErrorKind::Io,
            PuglintError::InternalError { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error is recoverable (processing of other sources or
    /// documents can continue)
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }

    /// Create a config parse error
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a module-not-found error
    pub fn module_not_found(package: impl Into<String>, start_dir: impl Into<PathBuf>) -> Self {
        Self::ModuleNotFound {
            package: package.into(),
            start_dir: start_dir.into(),
        }
    }

    /// Create a linter runtime error; an empty message means the linter
    /// gave us nothing to report
    pub fn linter_runtime(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Unknown
        } else {
            Self::LinterRuntime { message }
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
