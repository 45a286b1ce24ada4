//! Dispatch ordering: depth passes, fast slot, chain depth bounds.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use vaat::{Promise, TraceCtx, MAX_DEPTH};

fn log() -> Arc<Mutex<Vec<&'static str>>> {
    Arc::new(Mutex::new(Vec::new()))
}

// ============================================================================
// Depth ordering
// ============================================================================

#[test]
fn chained_callbacks_run_in_causal_order() {
    let log = log();
    let p: Promise<()> = Promise::new();

    let l0 = log.clone();
    let q = p.respond(TraceCtx::new("r0"), move |_| l0.lock().unwrap().push("r0"));
    let l1 = log.clone();
    let r = q.respond(TraceCtx::new("r1"), move |_| l1.lock().unwrap().push("r1"));
    let l2 = log.clone();
    r.respond(TraceCtx::new("r2"), move |_| l2.lock().unwrap().push("r2"));

    assert_eq!(q.depth(), 1);
    assert_eq!(r.depth(), 2);

    p.set_value(()).unwrap();
    assert_eq!(log.lock().unwrap().as_slice(), ["r0", "r1", "r2"]);
}

#[test]
fn fast_slot_runs_before_same_depth_rest() {
    let log = log();
    let p: Promise<u32> = Promise::new();

    let la = log.clone();
    p.respond(TraceCtx::new("a"), move |_| la.lock().unwrap().push("a"));
    let lb = log.clone();
    p.respond(TraceCtx::new("b"), move |_| lb.lock().unwrap().push("b"));

    p.set_value(0).unwrap();
    assert_eq!(log.lock().unwrap().as_slice(), ["a", "b"]);
}

#[test]
fn interleaved_registration_still_dispatches_by_depth() {
    let log = log();
    let p: Promise<u32> = Promise::new();

    let l = log.clone();
    let q = p.respond(TraceCtx::new("a0"), move |_| l.lock().unwrap().push("a0"));
    let l = log.clone();
    let r = q.respond(TraceCtx::new("c1"), move |_| l.lock().unwrap().push("c1"));
    // Depth-0 registration arriving after deeper ones.
    let l = log.clone();
    p.respond(TraceCtx::new("b0"), move |_| l.lock().unwrap().push("b0"));
    let l = log.clone();
    r.respond(TraceCtx::new("d2"), move |_| l.lock().unwrap().push("d2"));

    p.set_value(0).unwrap();
    assert_eq!(log.lock().unwrap().as_slice(), ["a0", "b0", "c1", "d2"]);
}

#[test]
fn deep_chain_runs_strictly_ascending() {
    const DEPTHS: u16 = 50;

    let order = Arc::new(Mutex::new(Vec::new()));
    let p: Promise<u32> = Promise::new();

    let mut handle = {
        let order = order.clone();
        p.respond(TraceCtx::new("chain"), move |_| order.lock().unwrap().push(0u16))
    };
    for depth in 1..DEPTHS {
        let order = order.clone();
        handle = handle.respond(TraceCtx::new("chain"), move |_| {
            order.lock().unwrap().push(depth)
        });
    }

    p.set_value(0).unwrap();

    let ran = order.lock().unwrap();
    assert_eq!(ran.len(), DEPTHS as usize);
    assert!(ran.windows(2).all(|w| w[0] < w[1]), "out of order: {:?}", *ran);
}

// ============================================================================
// Chain depth bounds
// ============================================================================

#[test]
fn chain_to_the_depth_limit_succeeds_one_past_fails() {
    let p: Promise<u32> = Promise::new();

    let mut handle = p.respond(TraceCtx::new("link"), |_| {});
    for _ in 1..MAX_DEPTH {
        handle = handle.respond(TraceCtx::new("link"), |_| {});
    }
    assert_eq!(handle.depth(), MAX_DEPTH);

    // One more registration would need a handle past the limit.
    let overflow = catch_unwind(AssertUnwindSafe(|| {
        handle.respond(TraceCtx::new("link"), |_| {});
    }));
    assert!(overflow.is_err());
}
