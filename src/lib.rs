//! # reloadvisor
//!
//! **Reloadvisor** is a development-mode process supervisor for Rust programs.
//!
//! It runs a long-lived build/serve command (by default `task dev`), streams its
//! output live, and restarts it whenever [`Worker::reload`] is called, killing the
//! child's whole process group first so no orphaned descendant survives a restart.
//! What triggers a reload (file watcher, signal, HTTP hook) is up to the caller.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   file watcher / SIGHUP / ...
//!              │ Worker::reload()
//!              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Worker (handle)                                                  │
//! │  - ReloadSignal (armed token + epoch, re-armed on every trigger)  │
//! │  - generation counter / WorkerState (atomics)                     │
//! │  - Bus (broadcast status events)                                  │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼ tokio::spawn
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  WorkerLoop (single owner of the current child)                   │
//! │    Starting ──► Running ──► Stopping ──► Starting ...             │
//! └──────┬─────────────────┬─────────────────┬────────────────────────┘
//!        ▼                 ▼                 ▼
//!   Spawn (shell,     Forwarders        Terminate (killpg SIGKILL,
//!   new process      stdout/stderr      reap leader)
//!   group)           copy tasks
//! ```
//!
//! ### Lifecycle
//! ```text
//! Worker::run() ── which(program)? ──► WorkerLoop::run()
//!
//! loop {
//!   ├─► spawn `<program> <args..> dev`   (SpawnFailed → backoff → retry)
//!   ├─► generation += 1, publish ProcessSpawned
//!   ├─► race: shutdown | reload | natural exit
//!   │       ├─ exit     ─► ProcessExited, debounce, respawn
//!   │       ├─ reload   ─► kill group ─► TerminationCompleted, respawn
//!   │       │               └─ kill failed & child alive ─► fatal, exit(1)
//!   │       └─ shutdown ─► kill group ─► WorkerStopped
//!   └─► join output forwarding before the next spawn
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                     |
//! |-------------------|---------------------------------------------------------------|----------------------------------------|
//! | **Supervision**   | Run, reload and stop the development command.                 | [`Worker`], [`WorkerBuilder`]          |
//! | **Processes**     | Spawn in a new process group, kill the whole group.           | [`Spawn`], [`Terminate`]               |
//! | **Reload**        | Broadcast primitive with no missed wakeups.                   | [`ReloadSignal`]                       |
//! | **Subscriber API**| Hook into status events (logging, browser refresh, ...).      | [`Subscribe`], [`Event`]               |
//! | **Errors**        | Typed errors for process primitives and the runtime.          | [`ProcessError`], [`RuntimeError`]     |
//! | **Configuration** | Program, subcommand, debounce, spawn backoff, fatal policy.   | [`Config`], [`BackoffPolicy`]          |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which renders events through `tracing`.
//!
//! ## Example
//! ```no_run
//! use reloadvisor::{Config, Worker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         program: "cargo".into(),
//!         subcommand: "run".into(),
//!         ..Config::default()
//!     };
//!     let worker = Worker::builder(".", vec![]).with_config(cfg).build();
//!
//!     let w = worker.clone();
//!     tokio::spawn(async move {
//!         loop {
//!             tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!             w.reload();
//!         }
//!     });
//!
//!     worker.serve().await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod policies;
mod process;
mod reload;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    Config, DEFAULT_PROGRAM, DEFAULT_SUBCOMMAND, Output, Sink, SinkFactory, Worker,
    WorkerBuilder, WorkerState,
};
pub use error::{ProcessError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use process::{ChildProcess, DEFAULT_SHELL, GroupTerminator, ShellExecutor, Spawn, Terminate};
pub use reload::{ReloadSignal, ReloadToken};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: a built-in subscriber that logs status events through `tracing`.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
