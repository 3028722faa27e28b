//! Watch session events.

use std::fmt;
use std::path::PathBuf;

/// Why a restart was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartTrigger {
    /// First start of the session.
    Initial,
    /// A watched file changed.
    FileChanged(PathBuf),
    /// `rs` was entered on the control input.
    Manual,
}

impl fmt::Display for RestartTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartTrigger::Initial => write!(f, "initial start"),
            RestartTrigger::FileChanged(path) => write!(f, "{} modified", path.display()),
            RestartTrigger::Manual => write!(f, "manual restart"),
        }
    }
}

/// Events broadcast by a [`ChangeWatcher`](crate::ChangeWatcher).
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// The session has begun.
    SessionStarted {
        /// Roots being polled.
        roots: Vec<PathBuf>,
    },
    /// A watched file is newer than the watermark.
    FileChanged {
        /// Path as produced by the walk.
        path: PathBuf,
    },
    /// The current process is about to be replaced.
    Restarting {
        /// What asked for the restart.
        trigger: RestartTrigger,
    },
    /// A new process is running.
    Restarted {
        /// What asked for the restart.
        trigger: RestartTrigger,
        /// Process id, when known.
        pid: Option<u32>,
    },
    /// A restart failed; the session is ending.
    RestartFailed {
        /// Error message.
        error: String,
    },
    /// The session has ended.
    Stopped {
        /// Error message if the session ended with an error.
        error: Option<String>,
    },
}

impl WatchEvent {
    /// Returns true if this is an error event.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            WatchEvent::RestartFailed { .. } | WatchEvent::Stopped { error: Some(_) }
        )
    }
}
