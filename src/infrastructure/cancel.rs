//! Cooperative cancellation token.
//!
//! Cloned across every stage of the scan. Cancellation is observed at
//! suspension points: producers stop emitting, in-flight calls finish or
//! abort at the next await, and opportunities accepted before the signal
//! remain valid.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Clonable cancellation token.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    canceled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Creates a fresh, un-canceled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// True once cancellation has been signaled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::SeqCst)
    }

    /// Suspends until cancellation is signaled. Returns immediately when
    /// already canceled.
    pub async fn canceled(&self) {
        while !self.is_canceled() {
            let notified = self.inner.notify.notified();
            if self.is_canceled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_uncanceled() {
        let token = CancelToken::new();
        assert!(!token.is_canceled());
    }

    #[tokio::test]
    async fn cancel_is_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_canceled());
    }

    #[tokio::test]
    async fn canceled_future_resolves_after_signal() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let task = tokio::spawn(async move { waiter.canceled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("cancellation should resolve the waiter")
            .unwrap();
    }

    #[tokio::test]
    async fn canceled_future_resolves_immediately_when_already_canceled() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.canceled())
            .await
            .expect("already-canceled token should not block");
    }
}
