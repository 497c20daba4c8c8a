//! # Worker: handle to one supervised development command.
//!
//! The [`Worker`] owns the reload signal, the generation counter and the run
//! loop's join handle. Callers interact with it through a handful of
//! operations:
//!
//! - [`Worker::run`] resolves the build tool and starts the loop (non-blocking)
//! - [`Worker::reload`] kills the current generation's process group and respawns
//! - [`Worker::shutdown`] / [`Worker::wait`] stop the loop and collect its result
//! - [`Worker::serve`] runs until an OS termination signal
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use reloadvisor::{Config, Worker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = Worker::builder(".", vec![])
//!         .with_config(Config::default())
//!         .build();
//!     worker.run()?;
//!
//!     // Somewhere in a file watcher:
//!     worker.reload();
//!
//!     worker.shutdown();
//!     worker.wait().await?;
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use super::{
    actor::WorkerLoop,
    builder::WorkerBuilder,
    config::Config,
    output::Output,
    shutdown,
    state::{Shared, WorkerState},
};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    process::{Spawn, Terminate},
};

type LoopHandle = JoinHandle<Result<(), RuntimeError>>;

/// Supervisor of one development command.
///
/// Created once per working directory and kept for the program's lifetime.
pub struct Worker {
    pub(super) workdir: PathBuf,
    pub(super) args: Vec<String>,
    pub(super) cfg: Config,
    pub(super) shared: Arc<Shared>,
    pub(super) bus: Bus,
    pub(super) spawner: Arc<dyn Spawn>,
    pub(super) terminator: Arc<dyn Terminate>,
    pub(super) output: Output,
    /// `None` before `run()` and after `wait()` took it.
    pub(super) handle: Mutex<Option<LoopHandle>>,
}

impl Worker {
    /// Returns a builder for a worker running in `workdir` with base `args`.
    pub fn builder(workdir: impl Into<PathBuf>, args: Vec<String>) -> WorkerBuilder {
        WorkerBuilder::new(workdir, args)
    }

    /// Creates a worker with the default configuration.
    ///
    /// With the `logging` feature, status events go to [`LogWriter`](crate::LogWriter).
    pub fn new(workdir: impl Into<PathBuf>, args: Vec<String>) -> Arc<Self> {
        let builder = WorkerBuilder::new(workdir, args);
        #[cfg(feature = "logging")]
        let builder = builder.with_subscribers(vec![Arc::new(crate::subscribers::LogWriter)]);
        builder.build()
    }

    /// Starts the run loop and returns immediately.
    ///
    /// ### Errors
    /// - [`RuntimeError::ToolNotFound`] if `Config::program` is not on `PATH` (not retried)
    /// - [`RuntimeError::AlreadyRunning`] if the loop was already started
    ///
    /// A teardown failure later on ends the program with `Config::fatal_exit_code`
    /// unless `Config::exit_on_fatal` is disabled.
    pub fn run(&self) -> Result<(), RuntimeError> {
        let mut handle = self.lock_handle();
        if handle.is_some() || self.shared.state() != WorkerState::Idle {
            return Err(RuntimeError::AlreadyRunning {
                workdir: self.workdir.clone(),
            });
        }

        which::which(&self.cfg.program).map_err(|e| RuntimeError::ToolNotFound {
            program: self.cfg.program.clone(),
            reason: e.to_string(),
        })?;

        self.shared.set_state(WorkerState::Starting);
        let wl = WorkerLoop {
            cfg: self.cfg.clone(),
            workdir: self.workdir.clone(),
            args: self.args.clone(),
            shared: Arc::clone(&self.shared),
            bus: self.bus.clone(),
            spawner: Arc::clone(&self.spawner),
            terminator: Arc::clone(&self.terminator),
            output: self.output.clone(),
        };
        let (exit_on_fatal, code) = (self.cfg.exit_on_fatal, self.cfg.fatal_exit_code);

        *handle = Some(tokio::spawn(async move {
            let res = wl.run().await;
            if let Err(e) = &res {
                if exit_on_fatal && e.is_fatal() {
                    tracing::error!(
                        target: "reloadvisor",
                        err = %e,
                        label = e.as_label(),
                        "process group state unknown, exiting"
                    );
                    std::process::exit(code);
                }
            }
            res
        }));
        Ok(())
    }

    /// Interrupts the current generation: its process group is killed and a new
    /// generation is spawned.
    ///
    /// Never blocks and never fails. A reload requested before the first spawn
    /// (or between generations) applies to the next child that comes up.
    pub fn reload(&self) {
        self.shared.reload.trigger();
        self.bus
            .publish(Event::new(EventKind::ReloadRequested).with_generation(self.generation()));
    }

    /// Requests the `Stopped` state: the current process group is killed and
    /// no further generation is spawned.
    pub fn shutdown(&self) {
        if !self.shared.shutdown.is_cancelled() {
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
            self.shared.shutdown.cancel();
        }
    }

    /// Waits for the run loop to end and returns its result.
    ///
    /// The loop ends with [`RuntimeError::InvalidSpawn`] if the executor rejects
    /// the command, and with [`RuntimeError::Termination`] if a teardown failed.
    ///
    /// Returns `Ok(())` immediately if the loop was never started or was already joined.
    pub async fn wait(&self) -> Result<(), RuntimeError> {
        let handle = self.lock_handle().take();
        match handle {
            Some(handle) => join(handle).await,
            None => Ok(()),
        }
    }

    /// Runs the worker until an OS termination signal (or the loop's own end),
    /// then shuts it down.
    pub async fn serve(&self) -> Result<(), RuntimeError> {
        self.run()?;
        let Some(mut handle) = self.lock_handle().take() else {
            return Ok(());
        };

        let signal = async {
            if shutdown::termination_signal().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            res = &mut handle => return flatten(res),
            _ = signal => self.shutdown(),
        }
        join(handle).await
    }

    /// Last spawned generation (`0` before the first spawn).
    pub fn generation(&self) -> u64 {
        self.shared.generation()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Working directory of the supervised command.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Base arguments passed before the subcommand.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Event bus of this worker (to attach extra receivers).
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<LoopHandle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn join(handle: LoopHandle) -> Result<(), RuntimeError> {
    flatten(handle.await)
}

fn flatten(
    res: Result<Result<(), RuntimeError>, tokio::task::JoinError>,
) -> Result<(), RuntimeError> {
    match res {
        Ok(res) => res,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_cancelled) => Ok(()),
    }
}
