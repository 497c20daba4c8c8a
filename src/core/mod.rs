//! Runtime core: the worker and its supervising loop.
//!
//! Public API from this module: [`Worker`], [`WorkerBuilder`], [`Config`],
//! [`WorkerState`] and the output types.
//!
//! Internal modules:
//! - [`actor`]: the run loop (spawn with backoff, debounce, respawn);
//! - [`runner`]: supervises one generation (race exit vs reload, teardown);
//! - [`output`]: per-generation output forwarding;
//! - [`state`]: lifecycle state and generation counter shared with the handle;
//! - [`shutdown`]: OS termination signals for `Worker::serve`.

mod actor;
mod builder;
mod config;
mod output;
mod runner;
mod shutdown;
mod state;
mod worker;

pub use builder::WorkerBuilder;
pub use config::{Config, DEFAULT_PROGRAM, DEFAULT_SUBCOMMAND};
pub use output::{Output, Sink, SinkFactory};
pub use state::WorkerState;
pub use worker::Worker;
