//! Continuations: the callbacks a promise runs on completion, bundled with
//! everything their invocation needs.
//!
//! A continuation captures the registrar's local context, an optional trace
//! tag, a dispatch depth, and whether its failures are monitored. The
//! callback body itself is a `FnOnce` consumed exactly once, even though the
//! continuation may appear in several wait-queue snapshots while promises
//! are merged: consumption is guarded by an atomic claim.

use std::cell::UnsafeCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::context::{self, Snapshot};
use crate::monitor;
use crate::outcome::{self, Try};
use crate::trace::{self, TraceCtx};

/// Highest dispatch depth a continuation may carry.
///
/// Chained observation handles hand out strictly increasing depths; a chain
/// that would exceed this fails loudly when it is built.
pub const MAX_DEPTH: u16 = 32_766;

type Body<A> = Box<dyn FnOnce(Try<A>) + Send + 'static>;

/// A registered callback plus its invocation environment.
pub struct Continuation<A> {
    saved: Snapshot,
    trace: Option<TraceCtx>,
    depth: u16,
    monitored: bool,
    claimed: AtomicBool,
    body: UnsafeCell<Option<Body<A>>>,
}

// SAFETY: `body` is the only non-Sync field. It is written once at
// construction and read exactly once, by the thread that wins the `claimed`
// swap in `run`; every other thread that touches a shared `Continuation`
// only reads the immutable metadata fields. The winning claim (AcqRel)
// orders the take after construction and excludes a second taker.
unsafe impl<A> Send for Continuation<A> {}
unsafe impl<A> Sync for Continuation<A> {}

impl<A> Continuation<A> {
    /// A continuation whose failures are caught and delivered to the
    /// ambient monitor.
    pub fn monitored(
        depth: u16,
        trace: Option<TraceCtx>,
        f: impl FnOnce(Try<A>) + Send + 'static,
    ) -> Self {
        Self::build(depth, trace, true, f)
    }

    /// A continuation whose failures propagate to whatever runs it.
    pub fn unmonitored(
        depth: u16,
        trace: Option<TraceCtx>,
        f: impl FnOnce(Try<A>) + Send + 'static,
    ) -> Self {
        Self::build(depth, trace, false, f)
    }

    fn build(
        depth: u16,
        trace: Option<TraceCtx>,
        monitored: bool,
        f: impl FnOnce(Try<A>) + Send + 'static,
    ) -> Self {
        assert!(
            depth <= MAX_DEPTH,
            "continuation depth {depth} exceeds the maximum of {MAX_DEPTH}"
        );
        Continuation {
            saved: context::save(),
            trace,
            depth,
            monitored,
            claimed: AtomicBool::new(false),
            body: UnsafeCell::new(Some(Box::new(f))),
        }
    }

    /// This continuation's dispatch depth.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Runs the callback with `result`.
    ///
    /// Records the trace tag, restores the registrar's context around the
    /// body (including on unwinding), and routes a monitored body's panic to
    /// the ambient monitor. A continuation runs at most once; later calls
    /// are no-ops. Custom [`Async`](crate::Async) implementations call this
    /// to deliver their result to a registered continuation.
    pub fn run(&self, result: Try<A>) {
        if self.claimed.swap(true, Ordering::AcqRel) {
            return;
        }
        // SAFETY: the swap above admits exactly one caller, and shared
        // readers never touch `body` (see the Send/Sync comment).
        let body = unsafe { (*self.body.get()).take() };
        let Some(body) = body else { return };

        if let Some(ctx) = self.trace {
            trace::record(ctx);
        }
        let _ctx = context::swap_in(&self.saved);
        if self.monitored {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || body(result))) {
                monitor::handle(&outcome::panic_failure(payload));
            }
        } else {
            body(result);
        }
    }
}

impl<A> fmt::Debug for Continuation<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("depth", &self.depth)
            .field("monitored", &self.monitored)
            .field("claimed", &self.claimed.load(Ordering::Relaxed))
            .finish()
    }
}
