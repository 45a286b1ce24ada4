//! The promise's tagged state and its immutable wait queue.
//!
//! A promise is a single atomically-replaced `State` value. States are
//! never mutated in place: every transition allocates a fresh variant and
//! installs it with a compare-and-swap, so readers always see a consistent
//! snapshot and retries rebuild from whatever they observe next.
//!
//! Legal transitions:
//!
//! - `Waiting` -> `Waiting` | `Interruptible` | `Interrupted` | `Done` | `Linked`
//! - `Interruptible` -> `Interruptible` (handler swap) | `Interrupted` | `Done` | `Linked`
//! - `Interrupted` -> `Interrupted` (newer signal) | `Done` | `Linked`
//! - `Done` -> (terminal)
//! - `Linked` -> `Linked` (path compression only)

use std::sync::Arc;

use crate::cont::Continuation;
use crate::outcome::{Failure, Try};
use crate::promise::{InterruptHandler, Promise};

struct Entry<A> {
    k: Arc<Continuation<A>>,
    next: Option<Arc<Entry<A>>>,
}

// Queues can grow as deep as the chain-depth limit allows; dropping a list
// that long link-by-recursive-link would exhaust the stack. Unlink
// iteratively instead, stopping at the first tail another queue still
// shares.
impl<A> Drop for WaitQueue<A> {
    fn drop(&mut self) {
        let mut cursor = self.head.take();
        while let Some(entry) = cursor {
            match Arc::try_unwrap(entry) {
                Ok(mut entry) => cursor = entry.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// Persistent stack of registered continuations.
///
/// `prepend` shares the tail with the queue it came from, so a failed CAS
/// retry only pays for one new cell and callback bodies are never cloned.
pub(crate) struct WaitQueue<A> {
    head: Option<Arc<Entry<A>>>,
}

impl<A> Clone for WaitQueue<A> {
    fn clone(&self) -> Self {
        WaitQueue {
            head: self.head.clone(),
        }
    }
}

impl<A> WaitQueue<A> {
    pub(crate) fn empty() -> Self {
        WaitQueue { head: None }
    }

    pub(crate) fn prepend(&self, k: Arc<Continuation<A>>) -> Self {
        WaitQueue {
            head: Some(Arc::new(Entry {
                k,
                next: self.head.clone(),
            })),
        }
    }

    /// Snapshots the queue, most recently registered first.
    pub(crate) fn collect(&self) -> Vec<Arc<Continuation<A>>> {
        let mut out = Vec::new();
        let mut cursor = self.head.as_ref();
        while let Some(entry) = cursor {
            out.push(entry.k.clone());
            cursor = entry.next.as_ref();
        }
        out
    }
}

pub(crate) enum State<A: Clone + Send + Sync + 'static> {
    /// No result yet, no interrupt handler. `first` is the fast slot for
    /// the single-callback common case.
    Waiting {
        first: Option<Arc<Continuation<A>>>,
        rest: WaitQueue<A>,
    },
    /// No result yet; an interrupt handler is installed.
    Interruptible {
        waitq: WaitQueue<A>,
        handler: InterruptHandler,
    },
    /// No result yet, but an interrupt has been delivered and recorded.
    Interrupted {
        waitq: WaitQueue<A>,
        signal: Failure,
    },
    /// Terminal: the result is immutable.
    Done { result: Try<A> },
    /// This promise has been merged; everything forwards to `target`.
    Linked { target: Promise<A> },
}

impl<A: Clone + Send + Sync + 'static> State<A> {
    pub(crate) fn tag(&self) -> &'static str {
        match self {
            State::Waiting { .. } => "waiting",
            State::Interruptible { .. } => "interruptible",
            State::Interrupted { .. } => "interrupted",
            State::Done { .. } => "done",
            State::Linked { .. } => "linked",
        }
    }
}
