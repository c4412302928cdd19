//! Cooperative cancellation shared by every long-lived loop in a run.
//!
//! A single flag plus a `Notify`: loops check the flag between units of work
//! and park on [`ShutdownSignal::sleep`] instead of plain sleeps, so a trigger
//! is observed within one polling interval at the latest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Clonable handle; every clone observes the same trigger.
///
/// ```rust
/// use std::time::Duration;
/// use sweep_core::orchestration::ShutdownSignal;
///
/// # tokio_test::block_on(async {
/// let signal = ShutdownSignal::new();
/// let observer = signal.clone();
///
/// assert!(signal.trigger());
/// assert!(observer.is_triggered());
/// // A triggered signal cuts every sleep short
/// assert!(!observer.sleep(Duration::from_secs(60)).await);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<SignalState>,
}

#[derive(Debug, Default)]
struct SignalState {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns `true` only for the call that flipped the flag.
    pub fn trigger(&self) -> bool {
        let first = !self.inner.triggered.swap(true, Ordering::AcqRel);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a trigger in between is not lost
            notified.as_mut().enable();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `duration` unless shutdown arrives first.
    /// Returns `true` when the full duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_triggered() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.wait() => false,
        }
    }
}
