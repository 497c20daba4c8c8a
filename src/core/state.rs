//! # Worker lifecycle state shared between the handle and its run loop.
//!
//! ```text
//! Idle ──run()──► Starting ──spawn ok──► Running ──reload──► Stopping ──┐
//!                    ▲  │                   │                           │
//!                    │  └─spawn err (backoff, retry)                    │
//!                    ├────────── natural exit (debounce) ◄──────────────┤
//!                    └──────────────────────── killed ◄─────────────────┘
//! any state ──shutdown()──► Stopped;  Stopping ──teardown failed──► Stopped
//! ```
//!
//! The run loop is the only writer of the state and the generation counter;
//! callers read them through atomics.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use crate::reload::ReloadSignal;

/// Lifecycle state of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Built, `run()` not called yet.
    Idle = 0,
    /// Spawning the next generation (or backing off after a spawn failure).
    Starting = 1,
    /// A child is alive and its output is being forwarded.
    Running = 2,
    /// The child's process group is being killed.
    Stopping = 3,
    /// The run loop ended.
    Stopped = 4,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkerState::Starting,
            2 => WorkerState::Running,
            3 => WorkerState::Stopping,
            4 => WorkerState::Stopped,
            _ => WorkerState::Idle,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
            WorkerState::Stopped => "stopped",
        }
    }
}

/// State owned by one worker and observed by its handle.
#[derive(Debug)]
pub(crate) struct Shared {
    /// Reload broadcast.
    pub(crate) reload: ReloadSignal,
    /// Cancelled to move the worker to `Stopped`.
    pub(crate) shutdown: CancellationToken,
    generation: AtomicU64,
    state: AtomicU8,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            reload: ReloadSignal::new(),
            shutdown: CancellationToken::new(),
            generation: AtomicU64::new(0),
            state: AtomicU8::new(WorkerState::Idle as u8),
        }
    }

    /// Last spawned generation (`0` before the first spawn).
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Advances the counter for a freshly spawned child and returns the new generation.
    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}
