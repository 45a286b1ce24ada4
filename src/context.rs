//! Per-thread local context with cheap snapshot and restore.
//!
//! A continuation must observe the context of the thread that *registered*
//! it, not the thread that happens to complete the promise. To make the
//! capture affordable on every registration, the context is copy-on-write:
//! the thread's current context is an `Arc` over an immutable slot vector,
//! [`save`] clones the handle, and [`Local::set`] builds a fresh vector.
//!
//! # Examples
//!
//! ```rust
//! use vaat::context::Local;
//!
//! let user: Local<String> = Local::new();
//! user.set(String::from("alice"));
//! assert_eq!(user.get().as_deref().map(String::as_str), Some("alice"));
//!
//! user.bind(String::from("bob"), || {
//!     assert_eq!(user.get().as_deref().map(String::as_str), Some("bob"));
//! });
//! assert_eq!(user.get().as_deref().map(String::as_str), Some("alice"));
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Slot = Option<Arc<dyn Any + Send + Sync>>;

/// An immutable capture of a thread's local context.
///
/// Cloning is an `Arc` clone; snapshots taken on one thread may be restored
/// on any other.
#[derive(Clone)]
pub struct Snapshot {
    slots: Arc<Vec<Slot>>,
}

impl Snapshot {
    fn empty() -> Self {
        Snapshot {
            slots: Arc::new(Vec::new()),
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Snapshot> = RefCell::new(Snapshot::empty());
}

/// Captures the calling thread's current context.
pub fn save() -> Snapshot {
    CURRENT.with(|c| c.borrow().clone())
}

/// Replaces the calling thread's context with `snapshot`.
pub fn restore(snapshot: &Snapshot) {
    CURRENT.with(|c| *c.borrow_mut() = snapshot.clone());
}

/// RAII guard that restores the previous context on drop.
///
/// Dropping runs during unwinding too, so a panicking callback cannot leak
/// its registrar's context into the completing thread.
pub(crate) struct ContextGuard {
    prev: Snapshot,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        restore(&self.prev);
    }
}

/// Swaps `snapshot` in as the current context, returning a guard that swaps
/// the previous context back when dropped.
pub(crate) fn swap_in(snapshot: &Snapshot) -> ContextGuard {
    let prev = save();
    restore(snapshot);
    ContextGuard { prev }
}

static NEXT_KEY: AtomicUsize = AtomicUsize::new(0);

/// A typed slot in the thread context.
///
/// Each `Local` owns a distinct index for the life of the process; values
/// written through it travel with snapshots across threads.
pub struct Local<T> {
    key: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Local<T> {
    /// Allocates a fresh context slot.
    pub fn new() -> Self {
        Local {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            _marker: PhantomData,
        }
    }

    /// Sets this slot in the calling thread's context.
    pub fn set(&self, value: T) {
        self.put(Some(Arc::new(value)));
    }

    /// Clears this slot in the calling thread's context.
    pub fn clear(&self) {
        self.put(None);
    }

    /// Reads this slot from the calling thread's context.
    pub fn get(&self) -> Option<Arc<T>> {
        CURRENT.with(|c| {
            let current = c.borrow();
            let slot = current.slots.get(self.key)?.clone()?;
            slot.downcast::<T>().ok()
        })
    }

    /// Runs `f` with this slot bound to `value`, restoring the whole context
    /// afterwards, on all exit paths.
    pub fn bind<R>(&self, value: T, f: impl FnOnce() -> R) -> R {
        let prev = save();
        self.set(value);
        let _guard = ContextGuard { prev };
        f()
    }

    fn put(&self, slot: Slot) {
        CURRENT.with(|c| {
            let mut current = c.borrow_mut();
            let mut slots: Vec<Slot> = current.slots.as_ref().clone();
            if slots.len() <= self.key {
                slots.resize(self.key + 1, None);
            }
            slots[self.key] = slot;
            *current = Snapshot {
                slots: Arc::new(slots),
            };
        });
    }
}

impl<T: Send + Sync + 'static> Default for Local<T> {
    fn default() -> Self {
        Self::new()
    }
}
