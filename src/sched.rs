//! The scheduler seam: where completed promises hand off callback work.
//!
//! The promise core needs exactly two operations from a scheduler — submit a
//! unit of work, and drain work already submitted on the calling thread.
//! The shipped [`LocalScheduler`] is a per-thread trampoline: a top-level
//! `submit` runs the task at once and then drains anything the task
//! enqueued, while a `submit` from *inside* running work only enqueues.
//! Callbacks that register further callbacks therefore never grow the
//! stack; they grow the queue.
//!
//! A different scheduler can be installed process-wide with [`install`]
//! before the first submission.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use once_cell::sync::OnceCell;

/// A unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The two operations the promise core requires.
pub trait Scheduler: Send + Sync {
    /// Enqueues `task` for execution; returns promptly.
    fn submit(&self, task: Task);

    /// On the calling thread, drains work already submitted. Used by
    /// blocking reads to make progress when the caller is also the only
    /// thread running work.
    fn flush(&self);
}

thread_local! {
    static RUN_QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

// Clears the draining flag even when a task panics, so the thread's queue
// is drainable again afterwards. Tasks the panicking drain left behind stay
// queued for the next submit or flush.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|d| d.set(false));
    }
}

fn drain() {
    loop {
        let task = RUN_QUEUE.with(|q| q.borrow_mut().pop_front());
        match task {
            Some(task) => task(),
            None => return,
        }
    }
}

/// Per-thread trampolining scheduler.
///
/// Work runs on the thread that submits it. Nested submissions are
/// flattened into a FIFO drained by the outermost submission, so the depth
/// of the call stack is independent of how callbacks chain.
#[derive(Debug, Default)]
pub struct LocalScheduler;

impl LocalScheduler {
    /// Creates the scheduler.
    pub fn new() -> Self {
        LocalScheduler
    }
}

impl Scheduler for LocalScheduler {
    fn submit(&self, task: Task) {
        if DRAINING.with(|d| d.get()) {
            RUN_QUEUE.with(|q| q.borrow_mut().push_back(task));
            return;
        }
        DRAINING.with(|d| d.set(true));
        let _guard = DrainGuard;
        task();
        drain();
    }

    fn flush(&self) {
        if DRAINING.with(|d| d.get()) {
            // Already inside a drain higher up the stack; it owns the queue.
            return;
        }
        DRAINING.with(|d| d.set(true));
        let _guard = DrainGuard;
        drain();
    }
}

static GLOBAL: OnceCell<Box<dyn Scheduler>> = OnceCell::new();

/// Installs the process-wide scheduler.
///
/// Only the first installation wins; later calls (and any default already
/// materialized by a submission) reject the scheduler and hand it back.
pub fn install(scheduler: Box<dyn Scheduler>) -> Result<(), Box<dyn Scheduler>> {
    let installed = GLOBAL.set(scheduler);
    if installed.is_ok() {
        log::debug!("promise scheduler installed");
    }
    installed
}

fn global() -> &'static dyn Scheduler {
    GLOBAL.get_or_init(|| Box::new(LocalScheduler::new())).as_ref()
}

/// Submits `task` to the process-wide scheduler.
pub fn submit(task: Task) {
    global().submit(task);
}

/// Drains pending work on the calling thread.
pub fn flush() {
    global().flush();
}
