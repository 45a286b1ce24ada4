//! The observation handle returned by `respond`.
//!
//! A `Chained<A>` is "the same promise, observed one registration later":
//! a thin pair of the root promise and a depth. Registering through it tags
//! continuations with strictly larger depths, which is how dispatch
//! preserves user-visible causality — a callback registered on the handle
//! returned by `respond` runs after the one `respond` registered, even
//! though both live in the root's wait queue.

use std::sync::Arc;
use std::time::Duration;

use crate::cont::{Continuation, MAX_DEPTH};
use crate::error::PromiseError;
use crate::future::{Async, AsyncObj, InterruptSink};
use crate::outcome::{Failure, Try};
use crate::promise::Promise;
use crate::trace::TraceCtx;

/// A promise observed at a fixed dispatch depth.
///
/// All queries forward to the root; only registration depth differs.
pub struct Chained<A: Clone + Send + Sync + 'static> {
    root: Promise<A>,
    depth: u16,
}

impl<A: Clone + Send + Sync + 'static> Clone for Chained<A> {
    fn clone(&self) -> Self {
        Chained {
            root: self.root.clone(),
            depth: self.depth,
        }
    }
}

impl<A: Clone + Send + Sync + 'static> Chained<A> {
    pub(crate) fn new(root: Promise<A>, depth: u16) -> Self {
        assert!(
            depth <= MAX_DEPTH,
            "callback chain exceeds the maximum depth of {MAX_DEPTH}"
        );
        Chained { root, depth }
    }

    /// This handle's dispatch depth.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Registers a monitored callback at this handle's depth; returns the
    /// next handle down. Fails loudly once the chain would pass
    /// [`MAX_DEPTH`].
    pub fn respond(
        &self,
        trace: TraceCtx,
        f: impl FnOnce(Try<A>) + Send + 'static,
    ) -> Chained<A> {
        self.root.respond_at(self.depth, Some(trace), f)
    }

    /// As [`Promise::transform`], registered at this handle's depth.
    pub fn transform<B, F>(&self, trace: TraceCtx, f: F) -> Promise<B>
    where
        B: Clone + PartialEq + Send + Sync + 'static,
        F: FnOnce(Try<A>) -> AsyncObj<B> + Send + 'static,
    {
        self.root.transform_at(self.depth, Some(trace), f)
    }

    /// See [`Promise::poll`].
    pub fn poll(&self) -> Option<Try<A>> {
        self.root.poll()
    }

    /// See [`Promise::get`].
    pub fn get(&self, timeout: Duration) -> Result<Try<A>, PromiseError> {
        self.root.get(timeout)
    }

    /// See [`Promise::is_interrupted`].
    pub fn is_interrupted(&self) -> Option<Failure> {
        self.root.is_interrupted()
    }

    /// See [`Promise::raise`].
    pub fn raise(&self, signal: &Failure) {
        self.root.raise(signal);
    }
}

impl<A: Clone + Send + Sync + 'static> InterruptSink for Chained<A> {
    fn raise(&self, signal: &Failure) {
        Chained::raise(self, signal);
    }
}

impl<A: Clone + Send + Sync + 'static> Async<A> for Chained<A> {
    fn register(&self, k: Continuation<A>) {
        self.root.enqueue(Arc::new(k));
    }

    fn poll_result(&self) -> Option<Try<A>> {
        self.root.poll()
    }

    fn as_promise(&self) -> Option<&Promise<A>> {
        Some(&self.root)
    }
}
