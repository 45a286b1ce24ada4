//! `Promise<A>` — a lock-free write-once cell for a deferred result.
//!
//! The promise is one atomically-replaced state value; every operation
//! is a compare-and-swap loop with no locks anywhere. Completion hands the
//! registered continuations to the scheduler as a single work unit that
//! runs them in depth order, and the link/compress merge collapses chains
//! of promises built by tail-position composition into a single root.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crossbeam_epoch::{self as epoch, Atomic, Owned};
use crossbeam_utils::Backoff;

use crate::chained::Chained;
use crate::cont::Continuation;
use crate::error::PromiseError;
use crate::future::{Async, AsyncObj, InterruptSink};
use crate::latch::Latch;
use crate::outcome::{self, Failure, Try};
use crate::sched;
use crate::state::{State, WaitQueue};
use crate::trace::TraceCtx;

/// Handler invoked when an interrupt signal reaches a promise.
///
/// Handlers are total over the signals they care about; one that does not
/// recognize a signal simply does nothing — the signal is recorded either
/// way.
pub type InterruptHandler = Arc<dyn Fn(&Failure) + Send + Sync + 'static>;

/// A write-once cell carrying either a value of `A` or a failure.
///
/// `Promise` is a cheap-clone handle; clones observe and mutate the same
/// cell. Consumers attach callbacks with [`respond`](Promise::respond) or
/// [`transform`](Promise::transform); producers complete the cell with
/// [`set_value`](Promise::set_value) / [`set_exception`](Promise::set_exception)
/// exactly once. Out-of-band signals ([`raise`](Promise::raise)) reach the
/// installed interrupt handler without completing the cell.
///
/// # Examples
///
/// ```rust
/// use vaat::{Promise, TraceCtx, Try};
///
/// let p: Promise<u32> = Promise::new();
/// p.respond(TraceCtx::new("check"), |r| {
///     assert!(matches!(r, Try::Return(21)));
/// });
/// p.set_value(21).unwrap();
/// assert_eq!(p.poll().unwrap().value(), Some(&21));
/// ```
pub struct Promise<A: Clone + Send + Sync + 'static> {
    inner: Arc<Inner<A>>,
}

struct Inner<A: Clone + Send + Sync + 'static> {
    state: Atomic<State<A>>,
}

impl<A: Clone + Send + Sync + 'static> Clone for Promise<A> {
    fn clone(&self) -> Self {
        Promise {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Clone + Send + Sync + 'static> Drop for Inner<A> {
    fn drop(&mut self) {
        // Exclusive access: no handle remains, so no guard can still
        // reference this cell. States replaced earlier were deferred to the
        // collector when their CAS retired them; only the current one is
        // ours to free.
        unsafe {
            let state = self.state.load(Ordering::Relaxed, epoch::unprotected());
            if !state.is_null() {
                drop(state.into_owned());
            }
        }
    }
}

impl<A: Clone + Send + Sync + 'static> Promise<A> {
    // ---- Construction ----

    /// Creates an empty promise.
    pub fn new() -> Self {
        Self::from_state(State::Waiting {
            first: None,
            rest: WaitQueue::empty(),
        })
    }

    /// Creates a promise already completed with `result`.
    pub fn done(result: Try<A>) -> Self {
        Self::from_state(State::Done { result })
    }

    /// Creates a promise already completed with a value.
    pub fn value(value: A) -> Self {
        Self::done(Try::Return(value))
    }

    /// Creates a promise already completed with a failure.
    pub fn exception(cause: Failure) -> Self {
        Self::done(Try::Throw(cause))
    }

    /// Creates an empty promise with `handler` already installed.
    pub fn with_interrupt_handler(handler: InterruptHandler) -> Self {
        Self::from_state(State::Interruptible {
            waitq: WaitQueue::empty(),
            handler,
        })
    }

    /// Creates an empty promise whose interrupt handler forwards every
    /// signal to each of `sinks`.
    pub fn interrupts<I>(sinks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn InterruptSink>>,
    {
        let sinks: Vec<Arc<dyn InterruptSink>> = sinks.into_iter().collect();
        Self::with_interrupt_handler(Arc::new(move |signal: &Failure| {
            for sink in &sinks {
                sink.raise(signal);
            }
        }))
    }

    fn from_state(state: State<A>) -> Self {
        Promise {
            inner: Arc::new(Inner {
                state: Atomic::new(state),
            }),
        }
    }

    /// This promise as a shareable [`Async`] handle.
    pub fn to_async(&self) -> AsyncObj<A> {
        Arc::new(self.clone())
    }

    fn same_as(&self, other: &Promise<A>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ---- Registration ----

    /// Registers a monitored callback and returns the chained observation
    /// handle, one depth further down.
    ///
    /// The callback runs exactly once, after the promise completes, through
    /// the scheduler, with the registrar's local context restored around
    /// it. `trace` is recorded immediately before the callback body runs.
    pub fn respond(
        &self,
        trace: TraceCtx,
        f: impl FnOnce(Try<A>) + Send + 'static,
    ) -> Chained<A> {
        self.respond_at(0, Some(trace), f)
    }

    pub(crate) fn respond_at(
        &self,
        depth: u16,
        trace: Option<TraceCtx>,
        f: impl FnOnce(Try<A>) + Send + 'static,
    ) -> Chained<A> {
        self.enqueue(Arc::new(Continuation::monitored(depth, trace, f)));
        Chained::new(self.clone(), depth + 1)
    }

    /// Registers a continuation.
    ///
    /// On a completed promise the callback still goes through the
    /// scheduler; it is never run inline, so a callback registering further
    /// callbacks cannot grow the stack.
    pub(crate) fn enqueue(&self, k: Arc<Continuation<A>>) {
        let backoff = Backoff::new();
        let mut at = self.clone();
        loop {
            let guard = epoch::pin();
            let shared = at.inner.state.load(Ordering::Acquire, &guard);
            // SAFETY: the state pointer is never null and stays valid for
            // the lifetime of `guard`.
            let state = unsafe { shared.deref() };
            match state {
                State::Linked { target } => {
                    let target = target.clone();
                    drop(guard);
                    at = target;
                    continue;
                }
                State::Done { result } => {
                    let result = result.clone();
                    let k = Arc::clone(&k);
                    drop(guard);
                    sched::submit(Box::new(move || k.run(result)));
                    return;
                }
                _ => {}
            }
            let next = match state {
                State::Waiting { first: None, rest } => State::Waiting {
                    first: Some(k.clone()),
                    rest: rest.clone(),
                },
                State::Waiting {
                    first: Some(first),
                    rest,
                } => State::Waiting {
                    first: Some(first.clone()),
                    rest: rest.prepend(k.clone()),
                },
                State::Interruptible { waitq, handler } => State::Interruptible {
                    waitq: waitq.prepend(k.clone()),
                    handler: handler.clone(),
                },
                // The interrupt is advisory; the continuation still queues.
                State::Interrupted { waitq, signal } => State::Interrupted {
                    waitq: waitq.prepend(k.clone()),
                    signal: signal.clone(),
                },
                State::Done { .. } | State::Linked { .. } => unreachable!(),
            };
            match at.inner.state.compare_exchange(
                shared,
                Owned::new(next),
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(_) => {
                    // SAFETY: the CAS unlinked the old state; it is freed
                    // once current readers unpin.
                    unsafe { guard.defer_destroy(shared) };
                    return;
                }
                Err(_) => backoff.spin(),
            }
        }
    }

    // ---- Completion ----

    /// Completes the promise with `result` unless it already holds one.
    ///
    /// Returns whether this call completed it. On success, a single work
    /// unit dispatching every queued continuation in depth order is
    /// submitted to the scheduler; any installed handler or recorded
    /// interrupt signal is discarded — completion supersedes interruption.
    pub fn update_if_empty(&self, result: Try<A>) -> bool {
        let backoff = Backoff::new();
        let mut at = self.clone();
        loop {
            let guard = epoch::pin();
            let shared = at.inner.state.load(Ordering::Acquire, &guard);
            // SAFETY: as in `enqueue`.
            let state = unsafe { shared.deref() };
            let (first, rest) = match state {
                State::Done { .. } => return false,
                State::Linked { target } => {
                    let target = target.clone();
                    drop(guard);
                    at = target;
                    continue;
                }
                State::Waiting { first, rest } => (first.clone(), rest.collect()),
                State::Interruptible { waitq, .. } | State::Interrupted { waitq, .. } => {
                    (None, waitq.collect())
                }
            };
            match at.inner.state.compare_exchange(
                shared,
                Owned::new(State::Done {
                    result: result.clone(),
                }),
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(_) => {
                    // SAFETY: as in `enqueue`.
                    unsafe { guard.defer_destroy(shared) };
                    drop(guard);
                    dispatch(result, first, rest);
                    return true;
                }
                Err(_) => backoff.spin(),
            }
        }
    }

    /// Completes the promise with `result`.
    ///
    /// Fails with [`PromiseError::ImmutableResult`] if it was already
    /// completed.
    pub fn update(&self, result: Try<A>) -> Result<(), PromiseError> {
        if self.update_if_empty(result) {
            Ok(())
        } else {
            Err(PromiseError::ImmutableResult)
        }
    }

    /// Completes the promise with a value. See [`update`](Promise::update).
    pub fn set_value(&self, value: A) -> Result<(), PromiseError> {
        self.update(Try::Return(value))
    }

    /// Completes the promise with a failure. See [`update`](Promise::update).
    pub fn set_exception(&self, cause: Failure) -> Result<(), PromiseError> {
        self.update(Try::Throw(cause))
    }

    // ---- Interrupts ----

    /// Installs `handler`, replacing any previous one; at most one handler
    /// is active at a time.
    ///
    /// If a signal was already recorded, the handler is not stored — it is
    /// invoked with that signal synchronously on the calling thread (the
    /// install-after-raise race). Callers holding locks here inherit the
    /// usual reentrancy hazards of running the handler inline. After
    /// completion this is a no-op.
    pub fn set_interrupt_handler(&self, handler: InterruptHandler) {
        let backoff = Backoff::new();
        let mut at = self.clone();
        loop {
            let guard = epoch::pin();
            let shared = at.inner.state.load(Ordering::Acquire, &guard);
            // SAFETY: as in `enqueue`.
            let state = unsafe { shared.deref() };
            let next = match state {
                State::Done { .. } => return,
                State::Linked { target } => {
                    let target = target.clone();
                    drop(guard);
                    at = target;
                    continue;
                }
                State::Interrupted { signal, .. } => {
                    let signal = signal.clone();
                    drop(guard);
                    handler(&signal);
                    return;
                }
                State::Waiting { first, rest } => State::Interruptible {
                    waitq: consolidated(first, rest),
                    handler: handler.clone(),
                },
                State::Interruptible { waitq, .. } => State::Interruptible {
                    waitq: waitq.clone(),
                    handler: handler.clone(),
                },
            };
            match at.inner.state.compare_exchange(
                shared,
                Owned::new(next),
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(_) => {
                    // SAFETY: as in `enqueue`.
                    unsafe { guard.defer_destroy(shared) };
                    return;
                }
                Err(_) => backoff.spin(),
            }
        }
    }

    /// Forwards every interrupt raised on this promise to `other`.
    pub fn forward_interrupts_to(&self, other: Arc<dyn InterruptSink>) {
        self.set_interrupt_handler(Arc::new(move |signal| other.raise(signal)));
    }

    /// Delivers an out-of-band signal.
    ///
    /// The signal is recorded and any installed handler runs synchronously
    /// on the calling thread, at most once per promise: a later `raise`
    /// replaces the recorded signal without re-running a handler. Raising
    /// never completes the promise and is ignored after completion.
    pub fn raise(&self, signal: &Failure) {
        let backoff = Backoff::new();
        let mut at = self.clone();
        loop {
            let guard = epoch::pin();
            let shared = at.inner.state.load(Ordering::Acquire, &guard);
            // SAFETY: as in `enqueue`.
            let state = unsafe { shared.deref() };
            let (next, pending) = match state {
                State::Done { .. } => return,
                State::Linked { target } => {
                    let target = target.clone();
                    drop(guard);
                    at = target;
                    continue;
                }
                State::Waiting { first, rest } => (
                    State::Interrupted {
                        waitq: consolidated(first, rest),
                        signal: signal.clone(),
                    },
                    None,
                ),
                State::Interruptible { waitq, handler } => (
                    State::Interrupted {
                        waitq: waitq.clone(),
                        signal: signal.clone(),
                    },
                    Some(handler.clone()),
                ),
                State::Interrupted { waitq, .. } => (
                    State::Interrupted {
                        waitq: waitq.clone(),
                        signal: signal.clone(),
                    },
                    None,
                ),
            };
            match at.inner.state.compare_exchange(
                shared,
                Owned::new(next),
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(_) => {
                    // SAFETY: as in `enqueue`.
                    unsafe { guard.defer_destroy(shared) };
                    drop(guard);
                    if let Some(handler) = pending {
                        handler(signal);
                    }
                    return;
                }
                Err(_) => backoff.spin(),
            }
        }
    }

    /// The recorded interrupt signal, if one was delivered and the promise
    /// has not completed since.
    pub fn is_interrupted(&self) -> Option<Failure> {
        let mut at = self.clone();
        loop {
            let guard = epoch::pin();
            let shared = at.inner.state.load(Ordering::Acquire, &guard);
            // SAFETY: as in `enqueue`.
            let state = unsafe { shared.deref() };
            match state {
                State::Interrupted { signal, .. } => return Some(signal.clone()),
                State::Linked { target } => {
                    let target = target.clone();
                    drop(guard);
                    at = target;
                }
                _ => return None,
            }
        }
    }

    // ---- Merge ----

    /// Declares this promise and `other` observationally equivalent: both
    /// see the same eventual result, and interrupts raised on either reach
    /// the same handler.
    ///
    /// This promise becomes the canonical cell. A promise `other` is linked
    /// into it — its queued continuations, handler, and any recorded signal
    /// are transferred, and it forwards everything here from then on. A
    /// non-promise `other` instead proxies its completion here, and
    /// interrupts raised here are forwarded to it.
    ///
    /// Callers must not race this with completion of `self`, and
    /// `a.become_(b)` racing `b.become_(a)` is undefined. Merging two
    /// already-completed promises with unequal results panics.
    pub fn become_(&self, other: AsyncObj<A>)
    where
        A: PartialEq,
    {
        if let Some(p) = other.as_promise() {
            let root = self.compress();
            p.link(&root);
        } else {
            let me = self.clone();
            other.register(Continuation::unmonitored(0, None, move |result| {
                let _ = me.update_if_empty(result);
            }));
            let fwd = other.clone();
            self.set_interrupt_handler(Arc::new(move |signal| fwd.raise(signal)));
        }
    }

    /// Walks the link chain to its terminal promise, rewriting pointers on
    /// the way back so later accesses are O(1).
    fn compress(&self) -> Promise<A> {
        let guard = epoch::pin();
        let shared = self.inner.state.load(Ordering::Acquire, &guard);
        // SAFETY: as in `enqueue`.
        let state = unsafe { shared.deref() };
        let State::Linked { target } = state else {
            return self.clone();
        };
        let target = target.clone();
        let root = target.compress();
        if !target.same_as(&root) {
            // A failed swap means a concurrent compression already rewrote
            // the pointer; any reachable target is a valid forwarding
            // target, so the failure is tolerated.
            if self
                .inner
                .state
                .compare_exchange(
                    shared,
                    Owned::new(State::Linked {
                        target: root.clone(),
                    }),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    &guard,
                )
                .is_ok()
            {
                // SAFETY: as in `enqueue`.
                unsafe { guard.defer_destroy(shared) };
            }
        }
        root
    }

    /// Merges this promise into `target`: the queue is replayed there, the
    /// handler or recorded signal is delivered there, and this cell becomes
    /// a forwarding link.
    fn link(&self, target: &Promise<A>)
    where
        A: PartialEq,
    {
        if self.same_as(target) {
            return;
        }
        let backoff = Backoff::new();
        loop {
            let guard = epoch::pin();
            let shared = self.inner.state.load(Ordering::Acquire, &guard);
            // SAFETY: as in `enqueue`.
            let state = unsafe { shared.deref() };
            match state {
                State::Linked { target: current } => {
                    let current = current.clone();
                    if current.same_as(target) {
                        return;
                    }
                    match self.inner.state.compare_exchange(
                        shared,
                        Owned::new(State::Linked {
                            target: target.clone(),
                        }),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        &guard,
                    ) {
                        Ok(_) => {
                            // SAFETY: as in `enqueue`.
                            unsafe { guard.defer_destroy(shared) };
                            drop(guard);
                            // Collapse the chain behind the old pointer.
                            current.link(target);
                            return;
                        }
                        Err(_) => backoff.spin(),
                    }
                }
                State::Done { result } => {
                    let result = result.clone();
                    drop(guard);
                    if !target.update_if_empty(result.clone()) {
                        let existing = target.poll();
                        assert!(
                            existing.as_ref() == Some(&result),
                            "cannot link promises completed with conflicting results"
                        );
                    }
                    return;
                }
                State::Waiting { first, rest } => {
                    let mut replay = rest.collect();
                    if let Some(first) = first {
                        replay.push(first.clone());
                    }
                    match self.inner.state.compare_exchange(
                        shared,
                        Owned::new(State::Linked {
                            target: target.clone(),
                        }),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        &guard,
                    ) {
                        Ok(_) => {
                            // SAFETY: as in `enqueue`.
                            unsafe { guard.defer_destroy(shared) };
                            drop(guard);
                            // Oldest first, so an empty target keeps the
                            // original fast-slot occupant.
                            for k in replay.into_iter().rev() {
                                target.enqueue(k);
                            }
                            return;
                        }
                        Err(_) => backoff.spin(),
                    }
                }
                State::Interruptible { waitq, handler } => {
                    let replay = waitq.collect();
                    let handler = handler.clone();
                    match self.inner.state.compare_exchange(
                        shared,
                        Owned::new(State::Linked {
                            target: target.clone(),
                        }),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        &guard,
                    ) {
                        Ok(_) => {
                            // SAFETY: as in `enqueue`.
                            unsafe { guard.defer_destroy(shared) };
                            drop(guard);
                            for k in replay.into_iter().rev() {
                                target.enqueue(k);
                            }
                            target.set_interrupt_handler(handler);
                            return;
                        }
                        Err(_) => backoff.spin(),
                    }
                }
                State::Interrupted { waitq, signal } => {
                    let replay = waitq.collect();
                    let signal = signal.clone();
                    match self.inner.state.compare_exchange(
                        shared,
                        Owned::new(State::Linked {
                            target: target.clone(),
                        }),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        &guard,
                    ) {
                        Ok(_) => {
                            // SAFETY: as in `enqueue`.
                            unsafe { guard.defer_destroy(shared) };
                            drop(guard);
                            for k in replay.into_iter().rev() {
                                target.enqueue(k);
                            }
                            target.raise(&signal);
                            return;
                        }
                        Err(_) => backoff.spin(),
                    }
                }
            }
        }
    }

    // ---- Transformation ----

    /// Applies `f` to the eventual result, returning the promise of
    /// whatever future `f` produces.
    ///
    /// The returned promise forwards interrupts raised on it back to this
    /// one. `f` runs unmonitored: a panic inside it is folded into the
    /// returned promise as a failure and never reaches the ambient monitor.
    pub fn transform<B, F>(&self, trace: TraceCtx, f: F) -> Promise<B>
    where
        B: Clone + PartialEq + Send + Sync + 'static,
        F: FnOnce(Try<A>) -> AsyncObj<B> + Send + 'static,
    {
        self.transform_at(0, Some(trace), f)
    }

    pub(crate) fn transform_at<B, F>(
        &self,
        depth: u16,
        trace: Option<TraceCtx>,
        f: F,
    ) -> Promise<B>
    where
        B: Clone + PartialEq + Send + Sync + 'static,
        F: FnOnce(Try<A>) -> AsyncObj<B> + Send + 'static,
    {
        let sink: Arc<dyn InterruptSink> = Arc::new(self.clone());
        let p = Promise::<B>::interrupts([sink]);
        let target = p.clone();
        self.enqueue(Arc::new(Continuation::unmonitored(
            depth,
            trace,
            move |result| match panic::catch_unwind(AssertUnwindSafe(move || f(result))) {
                Ok(future) => target.become_(future),
                Err(payload) => {
                    let _ = target.update_if_empty(Try::Throw(outcome::panic_failure(payload)));
                }
            },
        )));
        p
    }

    // ---- Observation ----

    /// The result, if the promise (followed through any links) completed.
    pub fn poll(&self) -> Option<Try<A>> {
        let mut at = self.clone();
        loop {
            let guard = epoch::pin();
            let shared = at.inner.state.load(Ordering::Acquire, &guard);
            // SAFETY: as in `enqueue`.
            let state = unsafe { shared.deref() };
            match state {
                State::Done { result } => return Some(result.clone()),
                State::Linked { target } => {
                    let target = target.clone();
                    drop(guard);
                    at = target;
                }
                _ => return None,
            }
        }
    }

    /// Blocks the calling thread until the promise completes, up to
    /// `timeout`.
    ///
    /// Work already submitted on this thread is drained before parking, so
    /// a caller that doubles as the scheduler's only worker cannot deadlock
    /// against its own pending completions.
    pub fn get(&self, timeout: Duration) -> Result<Try<A>, PromiseError> {
        if let Some(result) = self.poll() {
            return Ok(result);
        }
        let latch = Arc::new(Latch::new());
        let released = latch.clone();
        self.enqueue(Arc::new(Continuation::unmonitored(0, None, move |_| {
            released.release()
        })));
        sched::flush();
        if latch.wait_for(timeout) {
            Ok(self
                .poll()
                .expect("latch released before the promise was completed"))
        } else {
            Err(PromiseError::Timeout { waited: timeout })
        }
    }
}

impl<A: Clone + Send + Sync + 'static> Default for Promise<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Clone + Send + Sync + 'static> InterruptSink for Promise<A> {
    fn raise(&self, signal: &Failure) {
        Promise::raise(self, signal);
    }
}

impl<A: Clone + Send + Sync + 'static> Async<A> for Promise<A> {
    fn register(&self, k: Continuation<A>) {
        self.enqueue(Arc::new(k));
    }

    fn poll_result(&self) -> Option<Try<A>> {
        self.poll()
    }

    fn as_promise(&self) -> Option<&Promise<A>> {
        Some(self)
    }
}

impl<A: Clone + Send + Sync + 'static> fmt::Debug for Promise<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = epoch::pin();
        let shared = self.inner.state.load(Ordering::Acquire, &guard);
        // SAFETY: as in `enqueue`.
        let state = unsafe { shared.deref() };
        f.debug_struct("Promise")
            .field("state", &state.tag())
            .finish()
    }
}

fn consolidated<A>(
    first: &Option<Arc<Continuation<A>>>,
    rest: &WaitQueue<A>,
) -> WaitQueue<A>
where
    A: Clone + Send + Sync + 'static,
{
    match first {
        Some(first) => rest.prepend(first.clone()),
        None => rest.clone(),
    }
}

/// Submits the single dispatch work unit for a completion.
fn dispatch<A: Clone + Send + Sync + 'static>(
    result: Try<A>,
    first: Option<Arc<Continuation<A>>>,
    rest: Vec<Arc<Continuation<A>>>,
) {
    if first.is_none() && rest.is_empty() {
        return;
    }
    sched::submit(Box::new(move || run_in_depth_order(result, first, rest)));
}

/// Runs a completed promise's continuations in depth-nondecreasing order.
///
/// Three-pass layout: the fast slot, then everything at depth 0, then
/// everything at depth 1, and only then a sort buffer for the rare
/// deeper-than-1 remainder — so the common case never allocates.
fn run_in_depth_order<A: Clone + Send + Sync + 'static>(
    result: Try<A>,
    first: Option<Arc<Continuation<A>>>,
    rest: Vec<Arc<Continuation<A>>>,
) {
    let mut deep: Vec<Arc<Continuation<A>>> = Vec::new();
    if let Some(first) = first {
        // The fast slot is populated by the earliest registration and all
        // but always holds depth 0. When a chained registration got there
        // first, depth order is the harder guarantee: fold it into the
        // ordered passes instead of running it early.
        if first.depth() == 0 {
            first.run(result.clone());
        } else {
            deep.push(first);
        }
    }
    for k in &rest {
        if k.depth() == 0 {
            k.run(result.clone());
        }
    }
    for k in &rest {
        if k.depth() == 1 {
            k.run(result.clone());
        }
    }
    deep.extend(rest.iter().filter(|k| k.depth() > 1).cloned());
    if deep.is_empty() {
        return;
    }
    deep.sort_by_key(|k| k.depth());
    for k in &deep {
        k.run(result.clone());
    }
}
