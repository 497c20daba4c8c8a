//! # Fan-out of status events to subscribers.
//!
//! The worker's bus listener hands every event to [`SubscriberSet::emit`], which
//! queues it for each subscriber without waiting. One task per subscriber drains
//! its queue and calls [`Subscribe::on_event`].
//!
//! ```text
//! Bus ──► listener ──► emit(ev) ──try_send──► route "log"      ──► LogWriter
//!                                 ├─────────► route "notifier" ──► ...
//!                                 └─ full ──► Bus(SubscriberOverflow)
//! ```
//!
//! ## Rules
//! - A full or closed queue drops the event for that subscriber only and
//!   reports `SubscriberOverflow` (overflow reports themselves are never re-reported).
//! - A panicking handler is reported as `SubscriberPanicked`; its task keeps going.
//! - Each subscriber sees events in the order they were emitted.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Queue and delivery task of one subscriber.
struct Route {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
    task: JoinHandle<()>,
}

impl Route {
    fn open(sub: Arc<dyn Subscribe>, bus: Bus) -> Self {
        let name = sub.name();
        let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
        let task = tokio::spawn(deliver(sub, rx, bus));
        Self { name, queue, task }
    }
}

/// Delivers queued events to one subscriber until its queue is closed.
async fn deliver(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let handled = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
        if let Err(payload) = handled {
            bus.publish(Event::subscriber_panicked(sub.name(), panic_message(&*payload)));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Subscribers of one worker, each behind its own bounded queue.
pub struct SubscriberSet {
    routes: Vec<Route>,
    bus: Bus,
}

impl SubscriberSet {
    /// Opens one queue and delivery task per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let routes = subs
            .into_iter()
            .map(|sub| Route::open(sub, bus.clone()))
            .collect();
        Self { routes, bus }
    }

    /// Queues `event` for every subscriber; never waits.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for route in &self.routes {
            let reason = match route.queue.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            if shared.kind != EventKind::SubscriberOverflow {
                self.bus
                    .publish(Event::subscriber_overflow(route.name, reason));
            }
        }
    }

    /// Closes every queue and waits until already queued events are delivered.
    pub async fn shutdown(self) {
        for Route { queue, task, .. } in self.routes {
            drop(queue);
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind);
        }
    }

    struct Boom;

    #[async_trait]
    impl Subscribe for Boom {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "boom"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_drains_on_shutdown() {
        let collect = Arc::new(Collect::default());
        let set = SubscriberSet::new(vec![collect.clone()], Bus::new(8));

        set.emit(&Event::new(EventKind::WorkerStarted));
        set.emit(&Event::new(EventKind::ProcessSpawned));
        set.shutdown().await;

        assert_eq!(
            *collect.0.lock().unwrap(),
            vec![EventKind::WorkerStarted, EventKind::ProcessSpawned]
        );
    }

    struct Stalled;

    #[async_trait]
    impl Subscribe for Stalled {
        async fn on_event(&self, _event: &Event) {
            std::future::pending::<()>().await;
        }

        fn name(&self) -> &'static str {
            "stalled"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn full_queue_reports_overflow_once_per_dropped_event() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Stalled)], bus);

        // First event is taken by the handler, second fills the queue.
        set.emit(&Event::new(EventKind::ProcessSpawned));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        set.emit(&Event::new(EventKind::ReloadRequested));
        set.emit(&Event::new(EventKind::ReloadRequested));
        set.emit(&Event::subscriber_overflow("stalled", "full"));

        let ev = rx.recv().await.expect("overflow report");
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert!(ev.reason.as_deref().unwrap_or_default().contains("stalled"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn panics_are_reported_on_the_bus() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Boom)], bus);

        set.emit(&Event::new(EventKind::ReloadRequested));
        let ev = rx.recv().await.expect("panic report");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert!(ev.reason.as_deref().unwrap_or_default().contains("boom"));
    }
}
