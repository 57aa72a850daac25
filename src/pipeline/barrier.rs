//! Counting join barrier between the archive producer and the message consumer.
//!
//! The producer calls [`CompletionBarrier::add`] before each dispatch, the consumer calls
//! [`CompletionBarrier::done`] once for every message it receives (whether or not its own
//! downstream work succeeded), and the producer calls [`CompletionBarrier::wait`] before
//! closing the queue. A consumer that skips `done` leaves the producer blocked in `wait`
//! forever; nothing here detects that.
//!
//! `add` must happen-before the matching dispatch and must not run concurrently with `wait`.

use log::warn;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    pending: Mutex<usize>,
    zero: Condvar,
}

/// Cloneable handle; all clones share one counter.
#[derive(Clone, Debug, Default)]
pub struct CompletionBarrier {
    state: Arc<State>,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.state.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add(&self, n: usize) {
        *self.lock() += n;
    }

    /// Mark one message handled. Calling this with nothing pending is a consumer bug; it is
    /// logged and ignored.
    pub fn done(&self) {
        let mut pending = self.lock();
        match *pending {
            0 => warn!("barrier done() called with nothing pending"),
            1 => {
                *pending = 0;
                self.state.zero.notify_all();
            }
            _ => *pending -= 1,
        }
    }

    /// Block until every added message has been marked done.
    pub fn wait(&self) {
        let pending = self.lock();
        let _guard = self
            .state
            .zero
            .wait_while(pending, |n| *n > 0)
            .unwrap_or_else(|e| e.into_inner());
    }

    /// Like [`Self::wait`] but gives up after `timeout`. Returns true when the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let pending = self.lock();
        let (guard, _) = self
            .state
            .zero
            .wait_timeout_while(pending, timeout, |n| *n > 0)
            .unwrap_or_else(|e| e.into_inner());
        *guard == 0
    }

    pub fn pending(&self) -> usize {
        *self.lock()
    }
}
