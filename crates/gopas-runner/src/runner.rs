//! Process runner.
//!
//! A [`ProcessRunner`] owns at most one live child. Each child gets a reaper
//! task that collects its exit status and copies its stdout/stderr into the
//! configured sinks; the runner observes the reaper through a watch channel
//! and asks it to force-terminate the child over an mpsc channel.

use std::io;
use std::process::{ExitStatus, Stdio};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::command::CommandDescriptor;
use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};
use crate::signal::{self, Target};
use crate::sink::Sink;

/// How a [`ProcessRunner::kill`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// There was no live process to stop.
    NotRunning,
    /// The process exited within the graceful window after the interrupt.
    Graceful,
    /// The process had to be terminated forcibly.
    Forced,
}

#[derive(Debug, Clone)]
enum Exit {
    Status(ExitStatus),
    Failed(String),
}

#[derive(Debug, Clone)]
enum Lifecycle {
    Running,
    /// The child has exited; output may still be draining.
    Exited(Exit),
    /// The child has exited and both output pumps are finished.
    Drained(Exit),
}

impl Lifecycle {
    fn exit(&self) -> Option<&Exit> {
        match self {
            Lifecycle::Running => None,
            Lifecycle::Exited(exit) | Lifecycle::Drained(exit) => Some(exit),
        }
    }

    fn is_drained(&self) -> bool {
        matches!(self, Lifecycle::Drained(_))
    }
}

type KillReply = oneshot::Sender<io::Result<()>>;

#[derive(Debug)]
struct ProcessHandle {
    pid: Option<u32>,
    /// Process group led by the child, when it was started in its own.
    group: Option<u32>,
    started_at: DateTime<Utc>,
    lifecycle: watch::Receiver<Lifecycle>,
    kill_tx: mpsc::Sender<KillReply>,
}

impl ProcessHandle {
    fn is_exited(&self) -> bool {
        self.lifecycle.borrow().exit().is_some()
    }

    fn exit_status(&self) -> Option<ExitStatus> {
        match self.lifecycle.borrow().exit() {
            Some(Exit::Status(status)) => Some(*status),
            _ => None,
        }
    }

    /// Resolves once the child has exited.
    async fn exited(&self) {
        let mut lifecycle = self.lifecycle.clone();
        let _ = lifecycle.wait_for(|state| state.exit().is_some()).await;
    }

    /// Resolves once the child has exited and its output is fully copied.
    async fn drained(&self) -> std::result::Result<Exit, String> {
        let mut lifecycle = self.lifecycle.clone();
        let state = lifecycle
            .wait_for(Lifecycle::is_drained)
            .await
            .map(|state| state.exit().cloned());

        match state {
            Ok(Some(exit)) => Ok(exit),
            Ok(None) => Err("process state lost".to_string()),
            Err(_) => Err("reaper task ended unexpectedly".to_string()),
        }
    }
}

/// Launches one external command and supervises it.
///
/// The runner is reusable: once the child has exited (or been killed),
/// [`start`](Self::start) launches a fresh one.
#[derive(Debug)]
pub struct ProcessRunner {
    command: CommandDescriptor,
    stdout: Sink,
    stderr: Sink,
    config: RunnerConfig,
    handle: Option<ProcessHandle>,
}

impl ProcessRunner {
    /// Creates a runner for `command`, forwarding output to this process's
    /// stdout and stderr.
    pub fn new(command: CommandDescriptor) -> Self {
        Self {
            command,
            stdout: Sink::Stdout,
            stderr: Sink::Stderr,
            config: RunnerConfig::default(),
            handle: None,
        }
    }

    /// Creates a runner and starts it immediately.
    pub fn spawn(command: CommandDescriptor) -> Result<Self> {
        let mut runner = Self::new(command);
        runner.start()?;
        Ok(runner)
    }

    /// Sets where the child's stdout goes.
    pub fn with_output(mut self, sink: impl Into<Sink>) -> Self {
        self.stdout = sink.into();
        self
    }

    /// Sets where the child's stderr goes.
    pub fn with_error(mut self, sink: impl Into<Sink>) -> Self {
        self.stderr = sink.into();
        self
    }

    /// Replaces the runner configuration.
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The command this runner launches.
    pub fn command(&self) -> &CommandDescriptor {
        &self.command
    }

    /// Process id of the current child, if one was launched.
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().and_then(|h| h.pid)
    }

    /// When the current child was launched.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.handle.as_ref().map(|h| h.started_at)
    }

    /// Final status of the current child, once it has exited.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.handle.as_ref().and_then(ProcessHandle::exit_status)
    }

    /// Returns true if a child was launched and has not exited yet.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_exited())
    }

    /// Returns true if a child was launched and has exited, for any reason.
    pub fn is_exited(&self) -> bool {
        self.handle.as_ref().is_some_and(ProcessHandle::is_exited)
    }

    /// Launches the command without waiting for it.
    ///
    /// Does nothing if a child is already running. Must be called from
    /// within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            debug!(command = %self.command, "already running, start ignored");
            return Ok(());
        }

        let name = self.command.name();
        if name.is_empty() {
            return Err(RunnerError::EmptyExecutable);
        }

        let mut cmd = Command::new(name);
        cmd.args(self.command.args())
            .env_clear()
            .envs(self.command.resolve_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = self.command.dir() {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            if self.config.process_group {
                cmd.process_group(0);
            }
        }

        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            name: name.to_string(),
            source,
        })?;
        let pid = child.id();
        let group = pid.filter(|_| cfg!(unix) && self.config.process_group);

        let Some(stdout) = child.stdout.take() else {
            let _ = child.start_kill();
            return Err(RunnerError::StreamUnavailable {
                name: name.to_string(),
                stream: "stdout",
            });
        };
        let Some(stderr) = child.stderr.take() else {
            let _ = child.start_kill();
            return Err(RunnerError::StreamUnavailable {
                name: name.to_string(),
                stream: "stderr",
            });
        };

        let pumps = vec![pump(stdout, &self.stdout), pump(stderr, &self.stderr)];
        let (state_tx, state_rx) = watch::channel(Lifecycle::Running);
        let (kill_tx, kill_rx) = mpsc::channel(1);

        tokio::spawn(reap(child, group, kill_rx, pumps, state_tx, name.to_string()));

        info!(pid = ?pid, group = ?group, command = %self.command, "process started");
        self.handle = Some(ProcessHandle {
            pid,
            group,
            started_at: Utc::now(),
            lifecycle: state_rx,
            kill_tx,
        });
        Ok(())
    }

    /// Waits for the current child to exit and its output to be copied.
    ///
    /// Returns immediately if nothing was launched. A non-zero exit or a
    /// death by signal is reported as [`RunnerError::Exit`].
    pub async fn wait(&self) -> Result<()> {
        let Some(handle) = &self.handle else {
            return Ok(());
        };

        match handle.drained().await {
            Ok(Exit::Status(status)) if status.success() => Ok(()),
            Ok(Exit::Status(status)) => Err(RunnerError::Exit {
                name: self.command.name().to_string(),
                status,
            }),
            Ok(Exit::Failed(message)) | Err(message) => Err(RunnerError::Wait {
                name: self.command.name().to_string(),
                message,
            }),
        }
    }

    /// Starts the command and waits for it to finish.
    pub async fn run(&mut self) -> Result<()> {
        self.start()?;
        self.wait().await
    }

    /// Stops the current child.
    ///
    /// Where supported the child first receives an interrupt and gets the
    /// configured graceful window to exit; after that it is terminated
    /// forcibly. A failure of the forced termination is fatal, see
    /// [`RunnerError::is_fatal`].
    ///
    /// With [`RunnerConfig::process_group`] the interrupt and the forced
    /// termination go to the child's whole process group, and members still
    /// alive once the child is gone are killed too.
    pub async fn kill(&mut self) -> Result<Termination> {
        let Some(handle) = &self.handle else {
            return Ok(Termination::NotRunning);
        };
        let termination = if handle.is_exited() {
            Termination::NotRunning
        } else {
            self.stop(handle).await?
        };

        if let Some(pgid) = handle.group {
            match signal::kill_group(pgid).await {
                Ok(()) => debug!(pgid, "killed leftover group members"),
                Err(e) => trace!(pgid, error = %e, "process group already gone"),
            }
        }

        self.handle = None;
        Ok(termination)
    }

    async fn stop(&self, handle: &ProcessHandle) -> Result<Termination> {
        let pid = handle.pid.unwrap_or_default();
        let target = match handle.group {
            Some(pgid) => Target::Group(pgid),
            None => Target::Process(pid),
        };

        if self.config.interrupt.is_cooperative() && handle.pid.is_some() {
            if let Err(e) = signal::interrupt(target).await {
                if handle.is_exited() {
                    return Ok(Termination::NotRunning);
                }
                return Err(RunnerError::Signal {
                    pid,
                    reason: e.to_string(),
                });
            }

            let timeout = self.config.graceful_timeout;
            if tokio::time::timeout(timeout, handle.exited()).await.is_ok() {
                info!(pid, "process stopped");
                return Ok(Termination::Graceful);
            }
            warn!(
                pid,
                timeout_ms = timeout.as_millis() as u64,
                "process ignored interrupt, forcing"
            );
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if handle.kill_tx.send(reply_tx).await.is_ok() {
            if let Ok(Err(source)) = reply_rx.await {
                if !handle.is_exited() {
                    return Err(RunnerError::ForcedKill { pid, source });
                }
            }
        }
        handle.exited().await;
        info!(pid, "process killed");
        Ok(Termination::Forced)
    }
}

fn pump<R>(mut reader: R, sink: &Sink) -> JoinHandle<io::Result<u64>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut writer = sink.writer();
    tokio::spawn(async move {
        let copied = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.flush().await?;
        Ok(copied)
    })
}

async fn reap(
    mut child: Child,
    group: Option<u32>,
    mut kill_rx: mpsc::Receiver<KillReply>,
    pumps: Vec<JoinHandle<io::Result<u64>>>,
    state: watch::Sender<Lifecycle>,
    name: String,
) {
    let exit = loop {
        tokio::select! {
            status = child.wait() => {
                break match status {
                    Ok(status) => Exit::Status(status),
                    Err(e) => Exit::Failed(e.to_string()),
                };
            }
            Some(reply) = kill_rx.recv() => {
                let killed = match group {
                    Some(pgid) => signal::kill_group(pgid).await,
                    None => child.start_kill(),
                };
                let _ = reply.send(killed);
            }
        }
    };
    // Pending kill requests see a closed channel instead of waiting on the pumps.
    drop(kill_rx);

    debug!(command = %name, exit = ?exit, "process exited");
    state.send_replace(Lifecycle::Exited(exit.clone()));

    for pump in pumps {
        match pump.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(command = %name, error = %e, "output copy failed"),
            Err(e) => warn!(command = %name, error = %e, "output task failed"),
        }
    }
    state.send_replace(Lifecycle::Drained(exit));
}
