//! Spawn retry policies.
//!
//! This module groups the knobs that control **how long** the run loop waits
//! before retrying a failed spawn.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization applied to each delay
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=500ms, factor=1.0 (constant), max=5s, jitter=None.
//! - `JitterPolicy::None` by default.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
