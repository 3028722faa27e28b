//! Error types for the runner crate.

use std::process::ExitStatus;

use thiserror::Error;

/// Errors that can occur while launching, waiting on or stopping a process.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The command descriptor has no executable name.
    #[error("launch error: executable name is empty")]
    EmptyExecutable,

    /// A standard stream could not be attached to the child.
    #[error("launch error: cannot attach {stream} of '{name}'")]
    StreamUnavailable {
        /// Executable name.
        name: String,
        /// Which stream failed (`stdout` or `stderr`).
        stream: &'static str,
    },

    /// The OS refused to create the process.
    #[error("launch error: cannot start '{name}': {source}")]
    Spawn {
        /// Executable name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The process ended with a non-zero status or was killed by a signal.
    #[error("'{name}' exited unsuccessfully ({status})")]
    Exit {
        /// Executable name.
        name: String,
        /// Final status reported by the OS.
        status: ExitStatus,
    },

    /// The exit status could not be collected.
    #[error("cannot wait for '{name}': {message}")]
    Wait {
        /// Executable name.
        name: String,
        /// Reason reported by the reaper.
        message: String,
    },

    /// Delivering the graceful interrupt failed.
    #[error("cannot interrupt process {pid}: {reason}")]
    Signal {
        /// Target process id.
        pid: u32,
        /// Why delivery failed.
        reason: String,
    },

    /// Escalated forced termination failed.
    #[error("cannot force kill process {pid}: {source}")]
    ForcedKill {
        /// Target process id.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Returns true for errors raised before the process was running.
    pub fn is_launch_error(&self) -> bool {
        matches!(
            self,
            RunnerError::EmptyExecutable
                | RunnerError::StreamUnavailable { .. }
                | RunnerError::Spawn { .. }
        )
    }

    /// Returns true when the process table entry may be unreclaimable and the
    /// tool must not keep running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunnerError::ForcedKill { .. })
    }

    /// Returns the exit code carried by an [`RunnerError::Exit`] error, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunnerError::Exit { status, .. } => status.code(),
            _ => None,
        }
    }
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_error_classification() {
        assert!(RunnerError::EmptyExecutable.is_launch_error());
        assert!(RunnerError::StreamUnavailable {
            name: "go".to_string(),
            stream: "stdout",
        }
        .is_launch_error());

        let signal = RunnerError::Signal {
            pid: 42,
            reason: "no such process".to_string(),
        };
        assert!(!signal.is_launch_error());
        assert!(!signal.is_fatal());
    }

    #[test]
    fn test_forced_kill_is_fatal() {
        let err = RunnerError::ForcedKill {
            pid: 7,
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("process 7"));
    }

    #[test]
    fn test_error_display_empty_executable() {
        assert_eq!(
            RunnerError::EmptyExecutable.to_string(),
            "launch error: executable name is empty"
        );
    }
}
