//! User interrupts.
//!
//! The signal handler runs on its own thread and only calls
//! [`Interrupt::trigger`]. The session observes it either by polling
//! [`Interrupt::is_triggered`] between turns or by awaiting
//! [`Interrupt::triggered`] alongside an in-flight request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A latch that is set once and wakes every task waiting on it.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latch. Safe to call from any thread, any number of times.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Completes once the latch is set; immediately if it already is.
    pub async fn triggered(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a trigger in between is not lost.
            notified.as_mut().enable();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}
