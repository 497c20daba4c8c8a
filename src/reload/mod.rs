//! Reload signalling.
//!
//! - [`ReloadSignal`] broadcast-once-per-trigger primitive owned by a worker
//! - [`ReloadToken`] one subscription to the currently armed broadcast

mod signal;

pub use signal::{ReloadSignal, ReloadToken};
