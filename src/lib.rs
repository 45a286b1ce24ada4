//! Vaat: a lock-free write-once promise cell.
//!
//! A [`Promise<A>`] carries either a value of `A` or a [`Failure`];
//! consumers attach callbacks that run exactly once after completion. The
//! cell is a single atomically-replaced state — no locks anywhere — with
//! three properties doing the heavy lifting:
//!
//! - **Depth-ordered dispatch**: callbacks registered through chained
//!   handles carry increasing depths, and one completion work unit runs
//!   them in depth order, so `a.respond(f); a.respond(g).respond(h)` runs
//!   `f`, `g`, `h` in that order.
//! - **Merge (`become_`)**: two promises can be fused into one; link chains
//!   are path-compressed so tail-position composition runs in constant
//!   space.
//! - **Interrupts**: out-of-band signals reach an installed handler without
//!   completing the cell; completion supersedes interruption.
//!
//! Callbacks run with the registrar's local [`context`] restored, their
//! trace tag recorded, and — when monitored — their failures delivered to
//! the ambient [`monitor`] instead of unwinding the dispatching thread.
//!
//! # Example
//!
//! ```rust
//! use vaat::{Promise, TraceCtx, Try};
//!
//! let p: Promise<u32> = Promise::new();
//!
//! // Chained registration: "seen" runs before "after".
//! let q = p.respond(TraceCtx::new("seen"), |r| {
//!     assert!(matches!(r, Try::Return(42)));
//! });
//! q.respond(TraceCtx::new("after"), |r| {
//!     assert!(r.is_return());
//! });
//!
//! p.set_value(42).unwrap();
//! assert_eq!(p.poll().unwrap().value(), Some(&42));
//! ```

#![warn(missing_docs)]

mod chained;
mod cont;
pub mod context;
mod error;
mod future;
mod latch;
pub mod monitor;
mod outcome;
mod promise;
pub mod sched;
mod state;
pub mod trace;

pub use chained::Chained;
pub use cont::{Continuation, MAX_DEPTH};
pub use error::PromiseError;
pub use future::{Async, AsyncObj, InterruptSink};
pub use outcome::{failure, panic_failure, Failure, MessageError, Try};
pub use promise::{InterruptHandler, Promise};
pub use trace::TraceCtx;
