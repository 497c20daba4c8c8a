//! # Single-shot broadcast with re-arming.
//!
//! [`ReloadSignal`] holds an *armed* [`CancellationToken`] plus an epoch counter.
//! Waiters clone the armed token; [`ReloadSignal::trigger`] fires it, arms a fresh
//! one and bumps the epoch in a single critical section, so a late subscriber can
//! never attach to an already-fired token.
//!
//! ```text
//! subscribe() ──► ReloadToken{epoch=0, token=T0}
//! trigger()   ──► T0.cancel(); armed = T1; epoch = 1
//! subscribe() ──► ReloadToken{epoch=1, token=T1}   (not fired)
//! subscribe_since(0) ──► already fired              (epoch 1 > 0)
//! ```
//!
//! ## Rules
//! - A trigger with no waiter is not lost: [`ReloadSignal::subscribe_since`] with the
//!   last epoch the caller consumed returns a fired token.
//! - Several triggers before a waiter resolves coalesce into one observed event.
//! - Every waiter attached to the armed token is released by the next trigger.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Armed broadcast state guarded by the signal mutex.
#[derive(Debug)]
struct Armed {
    /// Number of triggers so far.
    epoch: u64,
    /// Token released by the next trigger.
    token: CancellationToken,
}

/// Broadcast primitive used to interrupt the current generation.
///
/// Cheap to trigger from any thread; waiters suspend on [`ReloadToken::fired`].
#[derive(Debug)]
pub struct ReloadSignal {
    armed: Mutex<Armed>,
}

/// Subscription to one armed broadcast.
#[derive(Clone, Debug)]
pub struct ReloadToken {
    epoch: u64,
    token: CancellationToken,
}

impl Default for ReloadSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadSignal {
    /// Creates an armed signal with epoch `0`.
    pub fn new() -> Self {
        Self {
            armed: Mutex::new(Armed {
                epoch: 0,
                token: CancellationToken::new(),
            }),
        }
    }

    /// Releases all current waiters and re-arms the signal.
    ///
    /// Returns the epoch after this trigger.
    pub fn trigger(&self) -> u64 {
        let mut armed = self.lock();
        armed.token.cancel();
        armed.token = CancellationToken::new();
        armed.epoch += 1;
        armed.epoch
    }

    /// Number of triggers observed so far.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Subscribes to the next trigger.
    pub fn subscribe(&self) -> ReloadToken {
        let armed = self.lock();
        ReloadToken {
            epoch: armed.epoch,
            token: armed.token.clone(),
        }
    }

    /// Subscribes to the first trigger after epoch `seen`.
    ///
    /// If a trigger already happened after `seen`, the returned token is fired.
    pub fn subscribe_since(&self, seen: u64) -> ReloadToken {
        let armed = self.lock();
        if armed.epoch > seen {
            let token = CancellationToken::new();
            token.cancel();
            return ReloadToken {
                epoch: armed.epoch,
                token,
            };
        }
        ReloadToken {
            epoch: armed.epoch,
            token: armed.token.clone(),
        }
    }

    /// Suspends until the next trigger after this call; returns the epoch at wake-up.
    pub async fn wait(&self) -> u64 {
        self.subscribe().fired().await;
        self.epoch()
    }

    fn lock(&self) -> MutexGuard<'_, Armed> {
        // The critical sections never panic, the state is always consistent.
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReloadToken {
    /// Epoch of the signal when this token was handed out.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns `true` once the broadcast this token is attached to has fired.
    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the broadcast fires (immediately if it already has).
    pub async fn fired(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn trigger_rearms_with_fresh_token() {
        let signal = ReloadSignal::new();
        let before = signal.subscribe();
        assert_eq!(signal.trigger(), 1);

        assert!(before.is_fired());
        let after = signal.subscribe();
        assert!(!after.is_fired());
        assert_eq!(after.epoch(), 1);
    }

    #[test]
    fn trigger_without_waiter_is_seen_by_next_subscriber() {
        let signal = ReloadSignal::new();
        signal.trigger();

        assert!(signal.subscribe_since(0).is_fired());
        assert!(!signal.subscribe_since(1).is_fired());
    }

    #[test]
    fn rapid_triggers_coalesce() {
        let signal = ReloadSignal::new();
        let token = signal.subscribe();
        signal.trigger();
        signal.trigger();
        signal.trigger();

        assert!(token.is_fired());
        assert_eq!(signal.epoch(), 3);
        let pending = signal.subscribe_since(0);
        assert!(pending.is_fired());
        assert_eq!(pending.epoch(), 3);
    }

    #[tokio::test]
    async fn trigger_releases_every_waiter() {
        let signal = Arc::new(ReloadSignal::new());
        let mut waiters = Vec::new();
        for _ in 0..4 {
            let token = signal.subscribe();
            waiters.push(tokio::spawn(async move { token.fired().await }));
        }

        signal.trigger();
        for w in waiters {
            tokio::time::timeout(Duration::from_secs(1), w)
                .await
                .expect("waiter released")
                .expect("waiter joined");
        }
    }

    #[tokio::test]
    async fn wait_returns_after_concurrent_trigger() {
        let signal = Arc::new(ReloadSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.trigger();

        let epoch = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("no missed wakeup")
            .expect("waiter joined");
        assert_eq!(epoch, 1);
    }
}
