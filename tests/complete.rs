//! Completion semantics: write-once, callback delivery, constructors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vaat::{failure, Promise, PromiseError, TraceCtx, Try};

fn log() -> Arc<Mutex<Vec<&'static str>>> {
    Arc::new(Mutex::new(Vec::new()))
}

// ============================================================================
// Basic completion
// ============================================================================

#[test]
fn single_callback_runs_once() {
    let log = log();
    let p: Promise<u32> = Promise::new();

    let l = log.clone();
    p.respond(TraceCtx::new("a"), move |_| l.lock().unwrap().push("a"));

    p.set_value(1).unwrap();

    assert_eq!(log.lock().unwrap().as_slice(), ["a"]);
    assert_eq!(p.poll().unwrap().value(), Some(&1));
}

#[test]
fn double_set_value_is_immutable_result() {
    let p: Promise<u32> = Promise::new();
    p.set_value(1).unwrap();
    assert_eq!(p.set_value(2), Err(PromiseError::ImmutableResult));
    // The original result stands.
    assert_eq!(p.poll().unwrap().value(), Some(&1));
}

#[test]
fn update_if_empty_reports_who_won() {
    let p: Promise<u32> = Promise::new();
    assert!(p.update_if_empty(Try::Return(1)));
    assert!(!p.update_if_empty(Try::Return(2)));
    assert_eq!(p.poll().unwrap().value(), Some(&1));
}

#[test]
fn set_exception_delivers_failure() {
    let p: Promise<u32> = Promise::new();
    let seen = log();

    let s = seen.clone();
    p.respond(TraceCtx::new("err"), move |r| {
        assert!(r.is_throw());
        s.lock().unwrap().push("err");
    });

    p.set_exception(failure("broken")).unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), ["err"]);
    assert_eq!(p.poll().unwrap().cause().unwrap().to_string(), "broken");
}

// ============================================================================
// Registration after completion
// ============================================================================

#[test]
fn late_registration_still_runs_through_scheduler() {
    let log = log();
    let p = Promise::value(9u32);

    let l = log.clone();
    p.respond(TraceCtx::new("late"), move |r| {
        assert_eq!(r.value(), Some(&9));
        l.lock().unwrap().push("late");
    });

    assert_eq!(log.lock().unwrap().as_slice(), ["late"]);
}

#[test]
fn every_callback_runs_exactly_once() {
    const CALLBACKS: usize = 64;

    let p: Promise<u64> = Promise::new();
    let runs = Arc::new(AtomicUsize::new(0));

    for _ in 0..CALLBACKS {
        let runs = runs.clone();
        p.respond(TraceCtx::new("count"), move |_| {
            runs.fetch_add(1, Ordering::SeqCst);
        });
    }

    p.set_value(7).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), CALLBACKS);

    // Completing again must not re-run anything.
    assert!(p.set_value(8).is_err());
    assert_eq!(runs.load(Ordering::SeqCst), CALLBACKS);
}

// ============================================================================
// Constructors and observation
// ============================================================================

#[test]
fn pre_completed_constructors() {
    assert_eq!(Promise::value(5u32).poll().unwrap().value(), Some(&5));

    let failed: Promise<u32> = Promise::exception(failure("seeded"));
    assert_eq!(failed.poll().unwrap().cause().unwrap().to_string(), "seeded");

    let done: Promise<u32> = Promise::done(Try::Return(3));
    assert_eq!(done.poll().unwrap().value(), Some(&3));
}

#[test]
fn poll_is_none_until_done() {
    let p: Promise<u32> = Promise::new();
    assert!(p.poll().is_none());
    p.set_value(1).unwrap();
    assert!(p.poll().is_some());
}

#[test]
fn default_is_empty() {
    let p: Promise<u32> = Promise::default();
    assert!(p.poll().is_none());
}

#[test]
fn debug_shows_state() {
    let p: Promise<u32> = Promise::new();
    assert!(format!("{:?}", p).contains("waiting"));
    p.set_value(1).unwrap();
    assert!(format!("{:?}", p).contains("done"));
}

#[test]
fn clones_share_the_cell() {
    let p: Promise<u32> = Promise::new();
    let q = p.clone();
    p.set_value(11).unwrap();
    assert_eq!(q.poll().unwrap().value(), Some(&11));
    assert!(q.set_value(12).is_err());
}
