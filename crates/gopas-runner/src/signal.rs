//! Cooperative interrupt delivery.
//!
//! Whether a target can ask a child to stop (as opposed to killing it
//! outright) is decided once, through [`Interrupt::for_target`], and carried
//! in [`RunnerConfig`](crate::RunnerConfig).

use std::io;

use tracing::trace;

/// Interrupt capability of the current target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The target can deliver SIGINT; kills try it before forcing.
    Cooperative,
    /// No cooperative signal; kills terminate the process directly.
    Unsupported,
}

impl Interrupt {
    /// Capability of the platform this binary was built for.
    pub const fn for_target() -> Self {
        if cfg!(unix) {
            Interrupt::Cooperative
        } else {
            Interrupt::Unsupported
        }
    }

    /// Returns true if a graceful interrupt can be attempted.
    pub fn is_cooperative(self) -> bool {
        self == Interrupt::Cooperative
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::for_target()
    }
}

/// What a signal is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// A single process.
    Process(u32),
    /// Every member of the process group led by this pid.
    Group(u32),
}

impl Target {
    #[cfg(unix)]
    fn arg(self) -> String {
        match self {
            Target::Process(pid) => pid.to_string(),
            Target::Group(pgid) => format!("-{}", pgid),
        }
    }
}

/// Send `signal` (a name such as `INT`) to `target`.
#[cfg(unix)]
async fn send(signal: &str, target: Target) -> io::Result<()> {
    use std::process::Stdio;
    use tokio::process::Command;

    trace!(?target, signal, "sending signal");
    let status = Command::new("kill")
        .args(["-s", signal, "--", &target.arg()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "kill -s {} {} failed ({})",
            signal,
            target.arg(),
            status
        )))
    }
}

#[cfg(not(unix))]
async fn send(signal: &str, target: Target) -> io::Result<()> {
    trace!(?target, signal, "signals unavailable");
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "signals are not available on this target",
    ))
}

/// Send SIGINT to `target`.
pub(crate) async fn interrupt(target: Target) -> io::Result<()> {
    send("INT", target).await
}

/// Send SIGKILL to every process in the group led by `pgid`.
pub(crate) async fn kill_group(pgid: u32) -> io::Result<()> {
    send("KILL", Target::Group(pgid)).await
}

/// Resolves when this process receives SIGINT or SIGTERM (ctrl-c elsewhere),
/// returning the signal name.
pub async fn shutdown_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_target() {
        assert_eq!(Interrupt::default(), Interrupt::for_target());
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_is_cooperative() {
        assert!(Interrupt::for_target().is_cooperative());
    }

    #[cfg(unix)]
    #[test]
    fn test_target_argument() {
        assert_eq!(Target::Process(42).arg(), "42");
        assert_eq!(Target::Group(42).arg(), "-42");
    }

    #[test]
    fn test_unsupported_is_not_cooperative() {
        assert!(!Interrupt::Unsupported.is_cooperative());
    }
}
