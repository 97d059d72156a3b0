//! Result type alias for pug-lint integration operations

use crate::error::PuglintError;

/// Standard Result type for pug-lint integration operations
pub type Result<T> = std::result::Result<T, PuglintError>;

/// Extension trait for Result to provide additional convenience methods
pub trait ResultExt<T> {
    /// Log the error and continue with None if recoverable
    fn log_and_continue(self) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn log_and_continue(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) if err.is_recoverable() => {
                tracing::debug!("Skipping after recoverable error: {}", err);
                None
            }
            Err(err) => {
                tracing::error!("{}", err);
                None
            }
        }
    }
}
