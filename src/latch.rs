//! One-shot latch for a single blocked reader.
//!
//! Built by the thread that will wait; released by whichever thread runs
//! the completion callback. The wait is deadline-aware so a blocking read
//! can give up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

pub(crate) struct Latch {
    released: AtomicBool,
    waiter: Thread,
}

impl Latch {
    /// Creates a latch whose waiter is the calling thread.
    pub(crate) fn new() -> Self {
        Latch {
            released: AtomicBool::new(false),
            waiter: thread::current(),
        }
    }

    /// Releases the latch and wakes the waiter. Idempotent.
    pub(crate) fn release(&self) {
        self.released.store(true, Ordering::Release);
        self.waiter.unpark();
    }

    /// Parks the waiter until released or the timeout elapses.
    ///
    /// Returns whether the latch was released. Must be called on the thread
    /// that created the latch; unparks from unrelated wakeups are absorbed
    /// by re-checking the flag.
    pub(crate) fn wait_for(&self, timeout: Duration) -> bool {
        if self.released.load(Ordering::Acquire) {
            return true;
        }
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            // Timeout too large to represent: wait unbounded.
            None => loop {
                thread::park();
                if self.released.load(Ordering::Acquire) {
                    return true;
                }
            },
        };
        loop {
            if self.released.load(Ordering::Acquire) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return self.released.load(Ordering::Acquire);
            }
            thread::park_timeout(deadline - now);
        }
    }
}
