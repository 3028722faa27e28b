//! End-to-end watch sessions with a counting factory.

use std::future::{ready, Ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gopas_runner::{RunnerError, Termination};
use gopas_watcher::{
    BoxError, ChangeWatcher, RestartTrigger, Supervised, WatchError, WatchEvent, WatchSpec,
    WatcherConfig,
};
use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

#[derive(Default)]
struct Counters {
    starts: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

struct Instance {
    counters: Arc<Counters>,
    exited: bool,
}

#[async_trait]
impl Supervised for Instance {
    fn is_exited(&self) -> bool {
        self.exited
    }

    async fn kill(&mut self) -> Result<Termination, RunnerError> {
        // Give overlapping restarts a chance to show up.
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
        self.exited = true;
        Ok(Termination::Graceful)
    }
}

fn factory(
    counters: Arc<Counters>,
    fail_after: Option<usize>,
) -> impl FnMut() -> Ready<Result<Instance, BoxError>> + Send {
    move || {
        let started = counters.starts.load(Ordering::SeqCst);
        if fail_after.is_some_and(|limit| started >= limit) {
            return ready(Err("factory exhausted".into()));
        }
        counters.starts.fetch_add(1, Ordering::SeqCst);
        let live = counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_live.fetch_max(live, Ordering::SeqCst);
        ready(Ok(Instance {
            counters: counters.clone(),
            exited: false,
        }))
    }
}

fn watcher(dir: &TempDir) -> ChangeWatcher {
    let spec = WatchSpec::new()
        .with_root(dir.path())
        .with_ignores([".git", ".gopath"])
        .unwrap()
        .with_extensions("go");
    ChangeWatcher::with_config(
        spec,
        WatcherConfig::new().with_poll_interval(Duration::from_millis(20)),
    )
}

fn start_session(
    watcher: ChangeWatcher,
    counters: &Arc<Counters>,
    fail_after: Option<usize>,
) -> (JoinHandle<gopas_watcher::Result<()>>, DuplexStream) {
    let (client, server) = tokio::io::duplex(64);
    let factory = factory(counters.clone(), fail_after);
    let session =
        tokio::spawn(async move { watcher.watch(factory, BufReader::new(server)).await });
    (session, client)
}

async fn until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn settle_mtime() {
    // File timestamps come from a coarse clock; stay clear of the watermark.
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_new_file_restarts_and_quit_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let (session, mut control) = start_session(watcher(&dir), &counters, None);

    until(|| counters.starts.load(Ordering::SeqCst) == 1).await;
    settle_mtime().await;
    std::fs::write(dir.path().join("main.go"), "package main\n").unwrap();

    until(|| counters.starts.load(Ordering::SeqCst) == 2).await;
    control.write_all(b"q\n").await.unwrap();

    session.await.unwrap().unwrap();
    assert_eq!(counters.max_live.load(Ordering::SeqCst), 1);
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_manual_restart() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let (session, mut control) = start_session(watcher(&dir), &counters, None);

    until(|| counters.starts.load(Ordering::SeqCst) == 1).await;
    control.write_all(b"  rs \n").await.unwrap();
    until(|| counters.starts.load(Ordering::SeqCst) == 2).await;
    control.write_all(b"unknown\nq\n").await.unwrap();

    session.await.unwrap().unwrap();
    assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_burst_never_overlaps() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let (session, mut control) = start_session(watcher(&dir), &counters, None);

    until(|| counters.starts.load(Ordering::SeqCst) == 1).await;
    settle_mtime().await;
    for i in 0..10 {
        std::fs::write(dir.path().join(format!("file{}.go", i)), "package main\n").unwrap();
        control.write_all(b"rs\n").await.unwrap();
    }

    until(|| counters.starts.load(Ordering::SeqCst) >= 11).await;
    control.write_all(b"q\n").await.unwrap();

    session.await.unwrap().unwrap();
    assert_eq!(counters.max_live.load(Ordering::SeqCst), 1);
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ignored_and_foreign_files_do_not_restart() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".gopath/src")).unwrap();
    let counters = Arc::new(Counters::default());
    let (session, mut control) = start_session(watcher(&dir), &counters, None);

    until(|| counters.starts.load(Ordering::SeqCst) == 1).await;
    settle_mtime().await;
    std::fs::write(dir.path().join(".gopath/src/dep.go"), "package dep\n").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "todo\n").unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    control.write_all(b"q\n").await.unwrap();

    session.await.unwrap().unwrap();
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_factory_failure_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let (session, mut control) = start_session(watcher(&dir), &counters, Some(1));

    until(|| counters.starts.load(Ordering::SeqCst) == 1).await;
    control.write_all(b"rs\n").await.unwrap();

    let err = session.await.unwrap().unwrap_err();
    assert!(matches!(err, WatchError::Factory(_)));
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_initial_failure_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let (session, _control) = start_session(watcher(&dir), &counters, Some(0));

    let err = session.await.unwrap().unwrap_err();
    assert!(matches!(err, WatchError::Factory(_)));
}

#[tokio::test]
async fn test_missing_root_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let spec = WatchSpec::new()
        .with_root(dir.path().join("missing"))
        .with_extensions("go");
    let watcher = ChangeWatcher::with_config(
        spec,
        WatcherConfig::new().with_poll_interval(Duration::from_millis(20)),
    );
    let counters = Arc::new(Counters::default());
    let (session, _control) = start_session(watcher, &counters, None);

    let err = session.await.unwrap().unwrap_err();
    assert!(matches!(err, WatchError::Walk { .. }));
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_closed_control_input_keeps_watching() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let (session, control) = start_session(watcher(&dir), &counters, None);

    until(|| counters.starts.load(Ordering::SeqCst) == 1).await;
    drop(control);
    settle_mtime().await;
    std::fs::write(dir.path().join("main.go"), "package main\n").unwrap();

    until(|| counters.starts.load(Ordering::SeqCst) == 2).await;
    assert!(!session.is_finished());
    session.abort();
}

#[tokio::test]
async fn test_events_follow_session() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let watcher = watcher(&dir);
    let mut events = watcher.subscribe();
    let (session, mut control) = start_session(watcher, &counters, None);

    until(|| counters.starts.load(Ordering::SeqCst) == 1).await;
    control.write_all(b"q\n").await.unwrap();
    session.await.unwrap().unwrap();

    assert!(matches!(
        events.recv().await.unwrap(),
        WatchEvent::SessionStarted { .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        WatchEvent::Restarting {
            trigger: RestartTrigger::Initial
        }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        WatchEvent::Restarted {
            trigger: RestartTrigger::Initial,
            pid: None
        }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        WatchEvent::Stopped { error: None }
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_process_is_killed_when_session_ends() {
    use gopas_runner::{CommandDescriptor, ProcessRunner};

    let dir = tempfile::tempdir().unwrap();
    let watcher = watcher(&dir);
    let mut events = watcher.subscribe();
    let (client, server) = tokio::io::duplex(64);
    let mut control = client;

    let command = CommandDescriptor::new("sleep").with_arg("30");
    fn process_factory(
        command: CommandDescriptor,
    ) -> impl FnMut() -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<ProcessRunner, BoxError>> + Send>,
    > + Send {
        move || {
            let command = command.clone();
            Box::pin(async move { ProcessRunner::spawn(command).map_err(BoxError::from) })
        }
    }
    let factory = process_factory(command);
    let session =
        tokio::spawn(async move { watcher.watch(factory, BufReader::new(server)).await });

    let pid = loop {
        if let WatchEvent::Restarted { pid, .. } = events.recv().await.unwrap() {
            break pid.unwrap();
        }
    };
    control.write_all(b"q\n").await.unwrap();
    session.await.unwrap().unwrap();

    let alive = std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .unwrap()
        .success();
    assert!(!alive);
}

#[tokio::test]
async fn test_shutdown_future_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let watcher = watcher(&dir);
    let mut events = watcher.subscribe();
    let factory = factory(counters.clone(), None);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    // Control input stays open and silent.
    let (_control, server) = tokio::io::duplex(64);

    let session = tokio::spawn(async move {
        watcher
            .watch_until(factory, BufReader::new(server), async move {
                let _ = stop_rx.await;
            })
            .await
    });

    until(|| counters.starts.load(Ordering::SeqCst) == 1).await;
    stop_tx.send(()).unwrap();

    session.await.unwrap().unwrap();
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);

    let mut stopped = None;
    while let Ok(event) = events.try_recv() {
        if let WatchEvent::Stopped { error } = event {
            stopped = Some(error);
        }
    }
    assert_eq!(stopped, Some(None));
}
