//! # Event subscribers for the reloadvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the built-in [`LogWriter`] (feature `logging`).
//!
//! ## Architecture
//! ```text
//! run loop ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                                         │
//!                                              ┌──────────┼──────────┐
//!                                              ▼          ▼          ▼
//!                                          LogWriter   Recorder   Custom ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use reloadvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct Notifier;
//!
//! #[async_trait]
//! impl Subscribe for Notifier {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ProcessSpawned {
//!             // ping the browser to refresh...
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "notifier"
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
