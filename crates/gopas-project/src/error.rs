//! Error types for the project crate.

use std::path::PathBuf;

use gopas_runner::RunnerError;
use thiserror::Error;

/// Errors that can occur while preparing or driving a project.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Filesystem error on a specific path.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        /// What was being done (`read`, `copy`, `remove`, ...).
        action: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// `gopas.yml` could not be parsed.
    #[error("invalid config {}: {message}", .path.display())]
    Config {
        /// Config file path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A `pre-build` entry is an empty command.
    #[error("pre-build command #{index} is empty")]
    EmptyPreBuild {
        /// Zero-based position in the list.
        index: usize,
    },

    /// The toolchain binary is not on `PATH`.
    #[error("please install {0}")]
    ToolchainNotFound(String),

    /// A toolchain or project command failed.
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

impl ProjectError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProjectError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Returns true when a process could not be stopped and the tool must exit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProjectError::Runner(e) if e.is_fatal())
    }
}

/// Result type for project operations.
pub type Result<T> = std::result::Result<T, ProjectError>;
