//! Ownership of the supervised process.
//!
//! The [`Supervisor`] is the only place where the current process is replaced.
//! Every restart kills the live process and waits until it is gone before the
//! factory is asked for a new one.

use std::future::Future;

use async_trait::async_trait;
use gopas_runner::{ProcessRunner, RunnerError, Termination};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{BoxError, Result, WatchError};
use crate::event::{RestartTrigger, WatchEvent};

/// A process the watcher can stop.
#[async_trait]
pub trait Supervised: Send + 'static {
    /// Returns true once the process has terminated.
    fn is_exited(&self) -> bool;

    /// Process id, if there is one.
    fn pid(&self) -> Option<u32> {
        None
    }

    /// Stops the process and waits until it is gone.
    async fn kill(&mut self) -> std::result::Result<Termination, RunnerError>;
}

#[async_trait]
impl Supervised for ProcessRunner {
    fn is_exited(&self) -> bool {
        ProcessRunner::is_exited(self)
    }

    fn pid(&self) -> Option<u32> {
        ProcessRunner::pid(self)
    }

    async fn kill(&mut self) -> std::result::Result<Termination, RunnerError> {
        ProcessRunner::kill(self).await
    }
}

/// Produces a fresh, already started process on every call.
///
/// Implemented for any `FnMut() -> impl Future<Output = Result<R, BoxError>>`.
#[async_trait]
pub trait RunnerFactory: Send {
    /// The process type produced.
    type Runner: Supervised;

    /// Starts a new process.
    async fn spawn(&mut self) -> std::result::Result<Self::Runner, BoxError>;
}

#[async_trait]
impl<F, Fut, R> RunnerFactory for F
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = std::result::Result<R, BoxError>> + Send + 'static,
    R: Supervised,
{
    type Runner = R;

    async fn spawn(&mut self) -> std::result::Result<R, BoxError> {
        (self)().await
    }
}

/// Owns the current process and serializes restarts.
pub struct Supervisor<F: RunnerFactory> {
    factory: F,
    current: Option<F::Runner>,
    events: broadcast::Sender<WatchEvent>,
    starts: u64,
}

impl<F: RunnerFactory> Supervisor<F> {
    /// Creates a supervisor with no process.
    pub fn new(factory: F, events: broadcast::Sender<WatchEvent>) -> Self {
        Self {
            factory,
            current: None,
            events,
            starts: 0,
        }
    }

    /// The current process, if one was started.
    pub fn current(&self) -> Option<&F::Runner> {
        self.current.as_ref()
    }

    /// Number of processes started so far.
    pub fn starts(&self) -> u64 {
        self.starts
    }

    /// Kills the live process, if any, then starts a new one.
    pub async fn restart(&mut self, trigger: RestartTrigger) -> Result<()> {
        self.emit(WatchEvent::Restarting {
            trigger: trigger.clone(),
        });

        if let Some(runner) = self.current.as_mut() {
            if !runner.is_exited() {
                info!(pid = ?runner.pid(), "killing last process");
                match runner.kill().await {
                    Ok(termination) => debug!(?termination, "last process stopped"),
                    Err(e) => {
                        self.emit(WatchEvent::RestartFailed {
                            error: e.to_string(),
                        });
                        return Err(WatchError::Kill(e));
                    }
                }
            }
        }
        self.current = None;

        info!(%trigger, "starting process");
        match self.factory.spawn().await {
            Ok(runner) => {
                self.starts += 1;
                self.emit(WatchEvent::Restarted {
                    trigger,
                    pid: runner.pid(),
                });
                self.current = Some(runner);
                Ok(())
            }
            Err(e) => {
                self.emit(WatchEvent::RestartFailed {
                    error: e.to_string(),
                });
                Err(WatchError::Factory(e))
            }
        }
    }

    /// Kills the live process, if any.
    pub async fn shutdown(&mut self) -> Result<()> {
        let Some(mut runner) = self.current.take() else {
            return Ok(());
        };
        if runner.is_exited() {
            return Ok(());
        }

        debug!(pid = ?runner.pid(), "stopping supervised process");
        runner.kill().await.map_err(|e| {
            warn!(error = %e, "failed to stop supervised process");
            WatchError::Kill(e)
        })?;
        Ok(())
    }

    fn emit(&self, event: WatchEvent) {
        // Ignore send errors (no receivers)
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct MockRunner {
        id: u32,
        exited: bool,
        fail_kill: bool,
        journal: Journal,
    }

    #[async_trait]
    impl Supervised for MockRunner {
        fn is_exited(&self) -> bool {
            self.exited
        }

        fn pid(&self) -> Option<u32> {
            Some(self.id)
        }

        async fn kill(&mut self) -> std::result::Result<Termination, RunnerError> {
            if self.fail_kill {
                return Err(RunnerError::Signal {
                    pid: self.id,
                    reason: "refused".to_string(),
                });
            }
            self.journal.push(format!("kill {}", self.id));
            self.exited = true;
            Ok(Termination::Graceful)
        }
    }

    fn factory(
        journal: Journal,
        fail_kill: bool,
    ) -> impl FnMut() -> std::future::Ready<std::result::Result<MockRunner, BoxError>> + Send {
        let mut next = 0;
        move || {
            next += 1;
            journal.push(format!("start {}", next));
            std::future::ready(Ok(MockRunner {
                id: next,
                exited: false,
                fail_kill,
                journal: journal.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn test_restart_kills_before_starting() {
        let journal = Journal::default();
        let (events, _) = broadcast::channel(16);
        let mut supervisor = Supervisor::new(factory(journal.clone(), false), events);

        supervisor.restart(RestartTrigger::Initial).await.unwrap();
        supervisor.restart(RestartTrigger::Manual).await.unwrap();

        assert_eq!(journal.entries(), ["start 1", "kill 1", "start 2"]);
        assert_eq!(supervisor.starts(), 2);
        assert_eq!(supervisor.current().and_then(Supervised::pid), Some(2));
    }

    #[tokio::test]
    async fn test_exited_process_is_not_killed() {
        let journal = Journal::default();
        let (events, _) = broadcast::channel(16);
        let mut supervisor = Supervisor::new(factory(journal.clone(), false), events);

        supervisor.restart(RestartTrigger::Initial).await.unwrap();
        supervisor.current.as_mut().unwrap().exited = true;
        supervisor.restart(RestartTrigger::Manual).await.unwrap();

        assert_eq!(journal.entries(), ["start 1", "start 2"]);
    }

    #[tokio::test]
    async fn test_factory_failure() {
        let (events, mut rx) = broadcast::channel(16);
        let failing = || async { Err::<MockRunner, BoxError>("no binary".into()) };
        let mut supervisor = Supervisor::new(failing, events);

        let err = supervisor.restart(RestartTrigger::Initial).await.unwrap_err();

        assert!(matches!(err, WatchError::Factory(_)));
        assert!(matches!(rx.recv().await.unwrap(), WatchEvent::Restarting { .. }));
        assert!(rx.recv().await.unwrap().is_error());
    }

    #[tokio::test]
    async fn test_kill_failure_keeps_process() {
        let journal = Journal::default();
        let (events, _) = broadcast::channel(16);
        let mut supervisor = Supervisor::new(factory(journal.clone(), true), events);

        supervisor.restart(RestartTrigger::Initial).await.unwrap();
        let err = supervisor.restart(RestartTrigger::Manual).await.unwrap_err();

        assert!(matches!(err, WatchError::Kill(_)));
        assert_eq!(journal.entries(), ["start 1"]);
        assert!(supervisor.current().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_kills_current() {
        let journal = Journal::default();
        let (events, _) = broadcast::channel(16);
        let mut supervisor = Supervisor::new(factory(journal.clone(), false), events);

        supervisor.shutdown().await.unwrap();
        supervisor.restart(RestartTrigger::Initial).await.unwrap();
        supervisor.shutdown().await.unwrap();

        assert_eq!(journal.entries(), ["start 1", "kill 1"]);
        assert!(supervisor.current().is_none());
    }
}
