//! The ambient monitor: where failures of monitored callbacks land.
//!
//! A monitored continuation that panics does not take the dispatching thread
//! down; the panic is caught, converted to a [`Failure`], and handed to the
//! current monitor, after which dispatch continues with the next callback.
//! Unmonitored continuations let the panic propagate to whatever is running
//! the scheduler's work.
//!
//! The current monitor is thread-scoped: [`with_monitor`] installs one for
//! the duration of a closure. With nothing installed, failures go to a
//! default that logs them.

use std::cell::RefCell;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::outcome::Failure;

/// Handler of last resort for failures escaping monitored callbacks.
pub trait Monitor: Send + Sync {
    /// Receives one escaped failure.
    fn handle(&self, failure: &Failure);
}

struct LogMonitor;

impl Monitor for LogMonitor {
    fn handle(&self, failure: &Failure) {
        log::error!("uncaught callback failure: {}", failure);
    }
}

static DEFAULT: Lazy<Arc<dyn Monitor>> = Lazy::new(|| Arc::new(LogMonitor));

thread_local! {
    static CURRENT: RefCell<Option<Arc<dyn Monitor>>> = const { RefCell::new(None) };
}

/// The monitor in effect on the calling thread.
pub fn current() -> Arc<dyn Monitor> {
    CURRENT
        .with(|m| m.borrow().clone())
        .unwrap_or_else(|| DEFAULT.clone())
}

/// Runs `f` with `monitor` installed on the calling thread, restoring the
/// previous monitor afterwards, on all exit paths.
pub fn with_monitor<R>(monitor: Arc<dyn Monitor>, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Arc<dyn Monitor>>);
    impl Drop for Restore {
        fn drop(&mut self) {
            CURRENT.with(|m| *m.borrow_mut() = self.0.take());
        }
    }

    let prev = CURRENT.with(|m| m.borrow_mut().replace(monitor));
    let _restore = Restore(prev);
    f()
}

/// Delivers `failure` to the current monitor.
pub(crate) fn handle(failure: &Failure) {
    current().handle(failure);
}
