use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;

use super::{config::Config, output::Output, state::Shared, worker::Worker};
use crate::{
    events::Bus,
    process::{GroupTerminator, ShellExecutor, Spawn, Terminate},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Worker`] with optional collaborators.
pub struct WorkerBuilder {
    workdir: PathBuf,
    args: Vec<String>,
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    spawner: Option<Arc<dyn Spawn>>,
    terminator: Arc<dyn Terminate>,
    output: Output,
}

impl WorkerBuilder {
    /// Creates a builder for a worker running in `workdir` with base `args`.
    pub fn new(workdir: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            workdir: workdir.into(),
            args,
            cfg: Config::default(),
            subscribers: Vec::new(),
            spawner: None,
            terminator: Arc::new(GroupTerminator),
            output: Output::default(),
        }
    }

    /// Replaces the default configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for status output.
    ///
    /// Subscribers receive events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the command executor (default: [`ShellExecutor`] with `Config::shell`).
    pub fn with_spawner(mut self, spawner: impl Spawn) -> Self {
        self.spawner = Some(Arc::new(spawner));
        self
    }

    /// Replaces the process terminator (default: [`GroupTerminator`]).
    pub fn with_terminator(mut self, terminator: impl Terminate) -> Self {
        self.terminator = Arc::new(terminator);
        self
    }

    /// Replaces where child output goes (default: own stdout/stderr).
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Builds the worker and starts its event listener.
    ///
    /// Must be called from within a tokio runtime. The run loop itself only
    /// starts with [`Worker::run`].
    pub fn build(self) -> Arc<Worker> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());

        // Subscribe before anything can publish, so early reloads are reported.
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            subs.shutdown().await;
        });

        let spawner = self
            .spawner
            .unwrap_or_else(|| Arc::new(ShellExecutor::new(&self.cfg.shell)));

        Arc::new(Worker {
            workdir: self.workdir,
            args: self.args,
            cfg: self.cfg,
            shared: Arc::new(Shared::new()),
            bus,
            spawner,
            terminator: self.terminator,
            output: self.output,
            handle: Mutex::new(None),
        })
    }
}
