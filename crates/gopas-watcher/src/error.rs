//! Error types for the watcher crate.

use std::path::PathBuf;

use gopas_runner::RunnerError;
use thiserror::Error;

/// Boxed error returned by runner factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that end a watch session.
#[derive(Debug, Error)]
pub enum WatchError {
    /// An ignore pattern is not a valid glob.
    #[error("invalid ignore pattern '{pattern}': {source}")]
    Pattern {
        /// The pattern as given.
        pattern: String,
        /// Parser error.
        #[source]
        source: glob::PatternError,
    },

    /// A watched tree could not be read.
    #[error("cannot walk {}: {source}", .path.display())]
    Walk {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The factory could not produce a new process.
    #[error("cannot start process: {0}")]
    Factory(#[source] BoxError),

    /// The previous process could not be stopped.
    #[error("cannot stop process: {0}")]
    Kill(#[from] RunnerError),

    /// Internal channel failure.
    #[error("channel error: {0}")]
    Channel(String),
}

impl WatchError {
    /// Returns true when the underlying kill failure is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WatchError::Kill(e) if e.is_fatal())
    }
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_display() {
        let source = glob::Pattern::new("[").unwrap_err();
        let err = WatchError::Pattern {
            pattern: "[".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("invalid ignore pattern '['"));
    }

    #[test]
    fn test_fatal_kill() {
        let err = WatchError::from(RunnerError::ForcedKill {
            pid: 1,
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert!(err.is_fatal());

        let err = WatchError::Factory("boom".into());
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "cannot start process: boom");
    }
}
