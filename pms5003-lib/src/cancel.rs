use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// One-shot cancellation flag shared between async callers and the blocking
/// acquisition worker.
///
/// Clones observe the same flag. Once raised it stays raised.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
    notify: Notify,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.inner.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cancel(&self) {
        *self.flag() = true;
        self.inner.condvar.notify_all();
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag()
    }

    /// Block the current thread for up to `timeout`, waking early on cancel.
    ///
    /// Returns `true` if the signal was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.flag();
        let (guard, _) = self
            .inner
            .condvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Resolves once the signal is raised.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the check so a concurrent cancel() cannot be missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
