//! Single-slot, latest-wins hand-off between a producer and one worker.
//!
//! Posting never blocks and never queues: a value that has not been picked
//! up yet is overwritten by the next one. The worker always sees the most
//! recent value available when it wakes. Scans badged in a burst while the
//! worker is busy therefore collapse to the last of them.
//!
//! # Example
//!
//! ```
//! use latchkey_daemon::mailbox::Mailbox;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mailbox = Mailbox::new();
//! mailbox.post(1);
//! mailbox.post(2);
//!
//! assert_eq!(mailbox.recv().await, 2);
//! assert!(mailbox.take().is_none());
//! # }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::trace;

/// Size-one overwrite buffer with an async wake-up.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value`, replacing any value not yet received, and wake the
    /// worker.
    ///
    /// Returns `true` if an unreceived value was superseded.
    pub fn post(&self, value: T) -> bool {
        let superseded = self.slot().replace(value).is_some();
        if superseded {
            trace!("Pending mailbox item superseded");
        }
        self.notify.notify_one();
        superseded
    }

    /// Take the pending value without waiting.
    pub fn take(&self) -> Option<T> {
        self.slot().take()
    }

    /// Wait for a value and take it.
    ///
    /// A post made between the slot check and the wait leaves a stored
    /// permit on the notifier, so no wake-up is lost.
    pub async fn recv(&self) -> T {
        loop {
            if let Some(value) = self.take() {
                return value;
            }
            self.notify.notified().await;
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
