//! End-to-end behavior of the run loop against real shell processes.
#![cfg(unix)]

use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use reloadvisor::{
    BackoffPolicy, ChildProcess, Config, Event, EventKind, GroupTerminator, JitterPolicy, Output,
    ProcessError, RuntimeError, ShellExecutor, Spawn, Subscribe, Terminate, Worker, WorkerBuilder,
    WorkerState,
};

const WAIT: Duration = Duration::from_secs(10);

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Event>>>);

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.0.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

impl Recorder {
    fn count(&self, kind: EventKind) -> usize {
        self.0.lock().unwrap().iter().filter(|e| e.kind == kind).count()
    }

    fn find(&self, pred: impl Fn(&Event) -> bool) -> Option<Event> {
        self.0.lock().unwrap().iter().find(|e| pred(e)).cloned()
    }

    /// Polls until `pred` holds for some recorded event.
    async fn wait_for(&self, what: &str, pred: impl Fn(&Event) -> bool) -> Event {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            if let Some(ev) = self.find(&pred) {
                return ev;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for {what}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Recorded events in publish order.
    fn ordered(&self) -> Vec<Event> {
        let mut events = self.0.lock().unwrap().clone();
        events.sort_by_key(|e| e.seq);
        events
    }

    async fn wait_spawned(&self, generation: u64) -> Event {
        self.wait_for("ProcessSpawned", |e| {
            e.kind == EventKind::ProcessSpawned && e.generation == Some(generation)
        })
        .await
    }
}

fn config(program: &str, subcommand: &str) -> Config {
    Config {
        program: program.into(),
        subcommand: subcommand.into(),
        debounce: Duration::from_millis(50),
        spawn_backoff: BackoffPolicy {
            first: Duration::from_millis(20),
            max: Duration::from_millis(20),
            factor: 1.0,
            jitter: JitterPolicy::None,
        },
        drain_timeout: Duration::from_millis(500),
        exit_on_fatal: false,
        ..Config::default()
    }
}

fn builder(cfg: Config, rec: &Recorder) -> WorkerBuilder {
    Worker::builder(std::env::temp_dir(), Vec::new())
        .with_config(cfg)
        .with_subscribers(vec![Arc::new(rec.clone())])
        .with_output(Output::discard())
}

fn sleeper(rec: &Recorder) -> Arc<Worker> {
    builder(config("sleep", "30"), rec).build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reload_kills_current_generation_and_respawns() {
    let rec = Recorder::default();
    let worker = sleeper(&rec);
    worker.run().unwrap();

    let first = rec.wait_spawned(1).await;
    assert_eq!(first.command.as_deref(), Some("sleep"));
    assert_eq!(first.args.as_deref(), Some(&["30".to_string()][..]));

    worker.reload();
    let second = rec.wait_spawned(2).await;
    assert_ne!(first.pid, second.pid);

    let done = rec
        .wait_for("TerminationCompleted", |e| {
            e.kind == EventKind::TerminationCompleted
        })
        .await;
    assert_eq!(done.generation, Some(1));
    assert_eq!(done.pid, first.pid);
    assert_eq!(worker.generation(), 2);
    assert_eq!(rec.count(EventKind::TerminationFailed), 0);

    worker.shutdown();
    worker.wait().await.unwrap();
}

fn is_alive(pid: u32) -> bool {
    use nix::{sys::signal::kill, unistd::Pid};
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn each_reload_tears_down_before_the_next_spawn() {
    let rec = Recorder::default();
    let worker = sleeper(&rec);
    worker.run().unwrap();

    let mut pid = rec.wait_spawned(1).await.pid.unwrap();
    for generation in 2..=4 {
        worker.reload();
        let next = rec.wait_spawned(generation).await;
        assert!(!is_alive(pid), "generation {} outlived its reload", generation - 1);
        pid = next.pid.unwrap();
    }

    let teardown_or_spawn: Vec<(EventKind, Option<u64>)> = rec
        .ordered()
        .into_iter()
        .filter(|e| {
            matches!(
                e.kind,
                EventKind::ProcessSpawned
                    | EventKind::TerminationStarted
                    | EventKind::TerminationCompleted
            )
        })
        .map(|e| (e.kind, e.generation))
        .collect();

    let mut expected = vec![(EventKind::ProcessSpawned, Some(1))];
    for generation in 1..=3 {
        expected.push((EventKind::TerminationStarted, Some(generation)));
        expected.push((EventKind::TerminationCompleted, Some(generation)));
        expected.push((EventKind::ProcessSpawned, Some(generation + 1)));
    }
    assert_eq!(teardown_or_spawn, expected);

    worker.shutdown();
    worker.wait().await.unwrap();
    assert!(!is_alive(pid));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn natural_exit_respawns_without_teardown() {
    let rec = Recorder::default();
    let worker = builder(config("true", ""), &rec).build();
    worker.run().unwrap();

    rec.wait_spawned(3).await;
    let exited = rec
        .wait_for("ProcessExited", |e| e.kind == EventKind::ProcessExited)
        .await;
    assert_eq!(exited.exit_code, Some(0));
    assert_eq!(rec.count(EventKind::TerminationStarted), 0);

    worker.shutdown();
    worker.wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reload_before_run_applies_to_first_generation() {
    let rec = Recorder::default();
    let worker = sleeper(&rec);
    worker.reload();
    worker.run().unwrap();

    rec.wait_spawned(2).await;
    let done = rec
        .wait_for("TerminationCompleted", |e| {
            e.kind == EventKind::TerminationCompleted
        })
        .await;
    assert_eq!(done.generation, Some(1));

    worker.shutdown();
    worker.wait().await.unwrap();
}

/// Sleeps before delegating, so reloads can pile up during teardown.
struct SlowTerminator(Duration);

#[async_trait]
impl Terminate for SlowTerminator {
    async fn terminate(&self, child: &mut ChildProcess) -> Result<u32, ProcessError> {
        tokio::time::sleep(self.0).await;
        GroupTerminator.terminate(child).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reloads_during_teardown_coalesce() {
    let rec = Recorder::default();
    let worker = builder(config("sleep", "30"), &rec)
        .with_terminator(SlowTerminator(Duration::from_millis(300)))
        .build();
    worker.run().unwrap();
    rec.wait_spawned(1).await;

    worker.reload();
    rec.wait_for("TerminationStarted", |e| {
        e.kind == EventKind::TerminationStarted
    })
    .await;
    for _ in 0..3 {
        worker.reload();
    }

    rec.wait_spawned(2).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(worker.generation(), 2);
    assert_eq!(rec.count(EventKind::TerminationCompleted), 1);
    assert_eq!(rec.count(EventKind::ReloadRequested), 4);
    assert_eq!(worker.state(), WorkerState::Running);

    worker.shutdown();
    worker.wait().await.unwrap();
}

/// Kills and reaps the child itself, then reports a failure.
struct ReapThenFail;

#[async_trait]
impl Terminate for ReapThenFail {
    async fn terminate(&self, child: &mut ChildProcess) -> Result<u32, ProcessError> {
        let _ = child.start_kill();
        let _ = child.wait().await;
        Err(ProcessError::Termination {
            pid: child.pid(),
            reason: "No such process".into(),
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failure_on_exited_child_is_not_fatal() {
    let rec = Recorder::default();
    let worker = builder(config("sleep", "30"), &rec)
        .with_terminator(ReapThenFail)
        .build();
    worker.run().unwrap();
    rec.wait_spawned(1).await;

    worker.reload();
    rec.wait_spawned(2).await;

    let done = rec
        .wait_for("TerminationCompleted", |e| {
            e.kind == EventKind::TerminationCompleted
        })
        .await;
    assert!(done.reason.as_deref().unwrap().starts_with("already exited"));
    assert_eq!(rec.count(EventKind::TerminationFailed), 0);

    worker.shutdown();
    worker.wait().await.unwrap();
}

/// Reports a failure and leaves the child running.
struct FailAlways;

#[async_trait]
impl Terminate for FailAlways {
    async fn terminate(&self, child: &mut ChildProcess) -> Result<u32, ProcessError> {
        Err(ProcessError::Termination {
            pid: child.pid(),
            reason: "Operation not permitted".into(),
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failure_on_live_child_stops_the_loop() {
    let rec = Recorder::default();
    let worker = builder(config("sleep", "30"), &rec)
        .with_terminator(FailAlways)
        .build();
    worker.run().unwrap();
    rec.wait_spawned(1).await;

    worker.reload();
    let res = tokio::time::timeout(WAIT, worker.wait()).await.unwrap();
    match &res {
        Err(RuntimeError::Termination { generation, .. }) => assert_eq!(*generation, 1),
        other => panic!("expected termination failure, got {other:?}"),
    }
    assert!(res.as_ref().unwrap_err().is_fatal());
    assert_eq!(worker.state(), WorkerState::Stopped);

    rec.wait_for("WorkerStopped", |e| e.kind == EventKind::WorkerStopped)
        .await;
    assert_eq!(rec.count(EventKind::TerminationFailed), 1);
    assert_eq!(rec.count(EventKind::ProcessSpawned), 1);
    assert_eq!(worker.generation(), 1);
}

#[tokio::test]
async fn missing_tool_is_reported_before_spawning() {
    let rec = Recorder::default();
    let worker = builder(config("reloadvisor-no-such-tool", "dev"), &rec).build();

    let err = worker.run().unwrap_err();
    assert!(matches!(err, RuntimeError::ToolNotFound { ref program, .. } if program == "reloadvisor-no-such-tool"));
    assert_eq!(worker.state(), WorkerState::Idle);
    assert_eq!(worker.generation(), 0);
    worker.wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_run_is_rejected() {
    let rec = Recorder::default();
    let worker = sleeper(&rec);
    worker.run().unwrap();

    let err = worker.run().unwrap_err();
    assert_eq!(err.as_label(), "runtime_already_running");

    worker.shutdown();
    worker.wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_kills_group_and_stops() {
    let rec = Recorder::default();
    let worker = sleeper(&rec);
    worker.run().unwrap();
    rec.wait_spawned(1).await;

    worker.shutdown();
    tokio::time::timeout(WAIT, worker.wait())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(worker.state(), WorkerState::Stopped);

    rec.wait_for("WorkerStopped", |e| e.kind == EventKind::WorkerStopped)
        .await;
    assert_eq!(rec.count(EventKind::TerminationCompleted), 1);
    assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    assert_eq!(worker.generation(), 1);
}

/// Fails the first `fail` spawns, then delegates to the shell executor.
struct Flaky {
    fail: u32,
    calls: AtomicU32,
    inner: ShellExecutor,
}

impl Spawn for Flaky {
    fn spawn(
        &self,
        command: &str,
        args: Option<&[String]>,
        workdir: &Path,
    ) -> Result<ChildProcess, ProcessError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail {
            return Err(ProcessError::Spawn {
                command: command.into(),
                reason: "Resource temporarily unavailable".into(),
            });
        }
        self.inner.spawn(command, args, workdir)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawn_failures_are_retried() {
    let rec = Recorder::default();
    let worker = builder(config("sleep", "30"), &rec)
        .with_spawner(Flaky {
            fail: 2,
            calls: AtomicU32::new(0),
            inner: ShellExecutor::default(),
        })
        .build();
    worker.run().unwrap();

    rec.wait_spawned(1).await;
    assert_eq!(rec.count(EventKind::SpawnFailed), 2);
    let second = rec
        .wait_for("second SpawnFailed", |e| {
            e.kind == EventKind::SpawnFailed && e.attempt == Some(2)
        })
        .await;
    assert_eq!(second.generation, Some(1));
    assert_eq!(second.delay_ms, Some(20));

    worker.shutdown();
    worker.wait().await.unwrap();
}

/// Rejects every command as malformed.
struct Rejecting(Arc<AtomicU32>);

impl Spawn for Rejecting {
    fn spawn(
        &self,
        _command: &str,
        _args: Option<&[String]>,
        _workdir: &Path,
    ) -> Result<ChildProcess, ProcessError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(ProcessError::InvalidArgument {
            reason: "no command to execute".into(),
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_command_stops_the_loop_without_retrying() {
    let rec = Recorder::default();
    let calls = Arc::new(AtomicU32::new(0));
    let worker = builder(config("sleep", "30"), &rec)
        .with_spawner(Rejecting(Arc::clone(&calls)))
        .build();
    worker.run().unwrap();

    let res = tokio::time::timeout(WAIT, worker.wait()).await.unwrap();
    match &res {
        Err(RuntimeError::InvalidSpawn { generation, source }) => {
            assert_eq!(*generation, 1);
            assert!(!source.is_retryable());
        }
        other => panic!("expected rejected spawn, got {other:?}"),
    }
    assert_eq!(worker.state(), WorkerState::Stopped);
    assert_eq!(worker.generation(), 0);

    rec.wait_for("WorkerStopped", |e| e.kind == EventKind::WorkerStopped)
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(rec.count(EventKind::SpawnFailed), 1);
    assert_eq!(rec.count(EventKind::ProcessSpawned), 0);
}
