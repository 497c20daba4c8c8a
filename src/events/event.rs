//! # Status events emitted by the worker and its run loop.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Worker events**: loop start/stop, reload and shutdown requests
//! - **Generation events**: spawn, spawn failure, natural exit, teardown
//! - **Subscriber events**: overflow and panic reports from the fan-out workers
//!
//! The [`Event`] struct carries the metadata an operator needs to tell
//! generations apart: generation number, pid, command line, exit status.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use reloadvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TerminationStarted)
//!     .with_generation(3)
//!     .with_pid(4242);
//!
//! assert_eq!(ev.kind, EventKind::TerminationStarted);
//! assert_eq!(ev.generation, Some(3));
//! assert_eq!(ev.pid, Some(4242));
//! ```

use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of status events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (subscriber name and panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (subscriber name and "full"/"closed").
    SubscriberOverflow,

    // === Worker events ===
    /// Run loop started.
    ///
    /// Sets: `command`, `args` (base invocation).
    WorkerStarted,

    /// `Worker::reload()` was called.
    ///
    /// Sets: `generation` (generation alive or last spawned at call time).
    ReloadRequested,

    /// `Worker::shutdown()` was called or an OS termination signal arrived.
    ShutdownRequested,

    /// Run loop ended.
    ///
    /// Sets: `generation` (last spawned), `reason` on fatal exit.
    WorkerStopped,

    // === Generation events ===
    /// A child process was spawned.
    ///
    /// Sets: `generation`, `pid`, `command`, `args`.
    ProcessSpawned,

    /// Spawning failed; the loop retries after a delay.
    ///
    /// Sets: `generation` (the one being started), `attempt`, `delay_ms`, `reason`.
    SpawnFailed,

    /// The child exited on its own.
    ///
    /// Sets: `generation`, `pid`, `exit_code` (if any), `reason` (status text).
    ProcessExited,

    /// Teardown of the child's process group started.
    ///
    /// Sets: `generation`, `pid`.
    TerminationStarted,

    /// Teardown finished and the child was reaped.
    ///
    /// Sets: `generation`, `pid`, `reason` when the child had already exited.
    TerminationCompleted,

    /// Teardown failed while the child was still alive.
    ///
    /// Sets: `generation`, `pid`, `reason`.
    TerminationFailed,
}

/// Status event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Generation the event belongs to.
    pub generation: Option<u64>,
    /// Child process (and process-group) identifier.
    pub pid: Option<u32>,
    /// Command being run.
    pub command: Option<Arc<str>>,
    /// Arguments passed to the command.
    pub args: Option<Arc<[String]>>,
    /// Exit code of a naturally exited child.
    pub exit_code: Option<i32>,
    /// Retry delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Spawn attempt count within one `Starting` phase (starting from 1).
    pub attempt: Option<u32>,
    /// Human-readable reason (errors, exit status, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            generation: None,
            pid: None,
            command: None,
            args: None,
            exit_code: None,
            delay_ms: None,
            attempt: None,
            reason: None,
        }
    }

    /// Attaches a generation number.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a process identifier.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches the command line.
    #[inline]
    pub fn with_command(mut self, command: &str, args: &[String]) -> Self {
        self.command = Some(command.into());
        self.args = Some(args.into());
        self
    }

    /// Attaches an exit status (code, plus its display form as the reason).
    #[inline]
    pub fn with_exit(mut self, status: ExitStatus) -> Self {
        self.exit_code = status.code();
        self.reason = Some(status.to_string().into());
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }
}
