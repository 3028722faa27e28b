//! Watch sessions.
//!
//! A session runs three things concurrently:
//! - the poll loop, which walks the watched trees on every tick
//! - the control loop, which reads `rs` / `q` lines from the control input
//! - the supervisor loop, which owns the current process
//!
//! The first two only send requests to the third, so at most one restart is
//! in progress at any time. An optional shutdown future ends the session the
//! same way `q` does.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::WatcherConfig;
use crate::error::{Result, WatchError};
use crate::event::{RestartTrigger, WatchEvent};
use crate::scan::{TreeWalk, WatchedFile};
use crate::supervisor::{RunnerFactory, Supervisor};
use crate::watch_spec::WatchSpec;

enum Request {
    Restart {
        trigger: RestartTrigger,
        done: oneshot::Sender<()>,
    },
    Quit,
    Fail(WatchError),
}

/// Restarts a supervised process whenever watched files change.
pub struct ChangeWatcher {
    spec: WatchSpec,
    config: WatcherConfig,
    events: broadcast::Sender<WatchEvent>,
}

impl ChangeWatcher {
    /// Creates a watcher with the default configuration.
    pub fn new(spec: WatchSpec) -> Self {
        Self::with_config(spec, WatcherConfig::default())
    }

    /// Creates a watcher with the given configuration.
    pub fn with_config(spec: WatchSpec, config: WatcherConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            spec,
            config,
            events,
        }
    }

    /// What this watcher looks at.
    pub fn spec(&self) -> &WatchSpec {
        &self.spec
    }

    /// Get the configuration.
    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    /// Runs one watch session.
    ///
    /// Starts a process through `factory`, then restarts it on file changes
    /// and on `rs`. Returns `Ok(())` after `q`, or the first restart or walk
    /// error. End of the control input only stops the control loop. The
    /// supervised process is killed before this returns.
    pub async fn watch<F, C>(&self, factory: F, control: C) -> Result<()>
    where
        F: RunnerFactory,
        C: AsyncBufRead + Unpin + Send + 'static,
    {
        self.watch_until(factory, control, std::future::pending())
            .await
    }

    /// Like [`watch`](Self::watch), but also ends the session successfully
    /// when `shutdown` resolves.
    pub async fn watch_until<F, C, S>(&self, factory: F, control: C, shutdown: S) -> Result<()>
    where
        F: RunnerFactory,
        C: AsyncBufRead + Unpin + Send + 'static,
        S: Future<Output = ()> + Send + 'static,
    {
        if self.spec.roots().is_empty() {
            warn!("no directories to watch");
        }
        info!(
            roots = ?self.spec.roots(),
            extensions = ?self.spec.extensions(),
            "watching for changes"
        );
        self.emit(WatchEvent::SessionStarted {
            roots: self.spec.roots().to_vec(),
        });

        let watermark = SystemTime::now();
        let mut supervisor = Supervisor::new(factory, self.events.clone());

        let mut outcome = supervisor.restart(RestartTrigger::Initial).await;
        if outcome.is_ok() {
            outcome = self
                .supervise(&mut supervisor, watermark, control, shutdown)
                .await;
        }

        if let Err(e) = supervisor.shutdown().await {
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }

        match &outcome {
            Ok(()) => info!("watch session ended"),
            Err(e) => warn!(error = %e, "watch session failed"),
        }
        self.emit(WatchEvent::Stopped {
            error: outcome.as_ref().err().map(ToString::to_string),
        });
        outcome
    }

    async fn supervise<F, C, S>(
        &self,
        supervisor: &mut Supervisor<F>,
        watermark: SystemTime,
        control: C,
        shutdown: S,
    ) -> Result<()>
    where
        F: RunnerFactory,
        C: AsyncBufRead + Unpin + Send + 'static,
        S: Future<Output = ()> + Send + 'static,
    {
        let (request_tx, mut request_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let poller = PollLoop {
            spec: self.spec.clone(),
            watermark,
            poll_interval: self.config.poll_interval,
            requests: request_tx.clone(),
            events: self.events.clone(),
            shutdown: shutdown_rx,
        };
        let quit_tx = request_tx.clone();
        let tasks: Vec<JoinHandle<()>> = vec![
            tokio::spawn(poller.run()),
            tokio::spawn(read_control(control, request_tx)),
            tokio::spawn(async move {
                shutdown.await;
                let _ = quit_tx.send(Request::Quit).await;
            }),
        ];

        let outcome = loop {
            let Some(request) = request_rx.recv().await else {
                break Err(WatchError::Channel("all triggers stopped".to_string()));
            };
            match request {
                Request::Restart { trigger, done } => {
                    if let Err(e) = supervisor.restart(trigger).await {
                        break Err(e);
                    }
                    let _ = done.send(());
                }
                Request::Quit => {
                    debug!("quit requested");
                    break Ok(());
                }
                Request::Fail(e) => break Err(e),
            }
        };

        let _ = shutdown_tx.send(true);
        for task in tasks {
            task.abort();
            let _ = task.await;
        }
        outcome
    }

    fn emit(&self, event: WatchEvent) {
        // Ignore send errors (no receivers)
        let _ = self.events.send(event);
    }
}

struct PollLoop {
    spec: WatchSpec,
    watermark: SystemTime,
    poll_interval: Duration,
    requests: mpsc::Sender<Request>,
    events: broadcast::Sender<WatchEvent>,
    shutdown: watch::Receiver<bool>,
}

impl PollLoop {
    async fn run(mut self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "starting poll loop"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.poll_once().await.is_break() {
                        break;
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("poll loop stopped");
    }

    /// Walks every root once. A newer file advances the watermark and
    /// restarts the process before the walk continues.
    ///
    /// The walk itself runs on the blocking pool and hands over one entry at
    /// a time.
    async fn poll_once(&mut self) -> ControlFlow<()> {
        let (entry_tx, mut entries) = mpsc::channel(1);
        let spec = self.spec.clone();
        let walk = tokio::task::spawn_blocking(move || {
            for entry in TreeWalk::new(&spec) {
                if entry_tx.blocking_send(entry).is_err() {
                    break;
                }
            }
        });

        let flow = self.consume(&mut entries).await;
        drop(entries);
        if let Err(e) = walk.await {
            warn!(error = %e, "tree walk task failed");
        }
        flow
    }

    async fn consume(
        &mut self,
        entries: &mut mpsc::Receiver<Result<WatchedFile>>,
    ) -> ControlFlow<()> {
        while let Some(entry) = entries.recv().await {
            let file = match entry {
                Ok(file) => file,
                Err(e) => {
                    let _ = self.requests.send(Request::Fail(e)).await;
                    return ControlFlow::Break(());
                }
            };
            if file.modified <= self.watermark {
                continue;
            }

            info!(path = %file.path.display(), "file modified");
            let _ = self.events.send(WatchEvent::FileChanged {
                path: file.path.clone(),
            });
            self.watermark = SystemTime::now();

            let (done, restarted) = oneshot::channel();
            let request = Request::Restart {
                trigger: RestartTrigger::FileChanged(file.path),
                done,
            };
            if self.requests.send(request).await.is_err() || restarted.await.is_err() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

async fn read_control<C>(control: C, requests: mpsc::Sender<Request>)
where
    C: AsyncBufRead + Unpin,
{
    let mut lines = control.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("control input closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "cannot read control input");
                break;
            }
        };

        match line.trim() {
            "rs" => {
                let (done, restarted) = oneshot::channel();
                let request = Request::Restart {
                    trigger: RestartTrigger::Manual,
                    done,
                };
                if requests.send(request).await.is_err() || restarted.await.is_err() {
                    break;
                }
            }
            "q" => {
                let _ = requests.send(Request::Quit).await;
                break;
            }
            "" => {}
            other => debug!(input = other, "unknown control command"),
        }
    }
}
