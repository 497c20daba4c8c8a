//! Child process primitives.
//!
//! This module groups the OS-facing half of the runtime:
//! - [`ChildProcess`] one spawned process group leader with its output streams;
//! - [`Spawn`] / [`ShellExecutor`] start a command through a shell in a new process group;
//! - [`Terminate`] / [`GroupTerminator`] kill the whole group and reap the leader.
//!
//! ## Quick wiring
//! ```text
//! core::runner ──► Spawn::spawn(program, args, workdir) ──► ChildProcess
//!                                                              │
//!              ◄── Terminate::terminate(&mut child) ◄──────────┘ (on reload/shutdown)
//! ```

mod child;
mod executor;
mod terminator;

pub use child::ChildProcess;
pub use executor::{DEFAULT_SHELL, ShellExecutor, Spawn};
pub use terminator::{GroupTerminator, Terminate};
