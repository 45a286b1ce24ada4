//! The minimal surface a deferred value exposes to the combinator layer.
//!
//! [`Async`] is what a promise needs from "some other future" to merge with
//! it: register a continuation, read a settled result, deliver an
//! interrupt, and a downcast seam so promise-to-promise merges can take the
//! link/compress fast path. [`InterruptSink`] is the raise-only half,
//! type-erased over the payload so interrupts can be forwarded across
//! differently-typed futures.

use std::sync::Arc;

use crate::cont::Continuation;
use crate::outcome::{Failure, Try};
use crate::promise::Promise;

/// Anything that can receive an out-of-band interrupt signal.
///
/// Interrupts are advisory: delivering one never completes the receiver.
pub trait InterruptSink: Send + Sync {
    /// Delivers `signal` to the receiver.
    fn raise(&self, signal: &Failure);
}

/// A deferred value, as seen by the promise core and combinators.
pub trait Async<A: Clone + Send + Sync + 'static>: InterruptSink {
    /// Registers `k` to run once the value is available.
    fn register(&self, k: Continuation<A>);

    /// The settled result, if there is one.
    fn poll_result(&self) -> Option<Try<A>>;

    /// Downcast seam: a promise returns itself here so merges can link
    /// instead of proxying.
    fn as_promise(&self) -> Option<&Promise<A>> {
        None
    }
}

/// A shareable handle to any deferred value.
pub type AsyncObj<A> = Arc<dyn Async<A>>;
