//! Context capture: callbacks observe the registrar's local context, not
//! the completer's.

use std::sync::{Arc, Mutex};
use std::thread;

use vaat::context::{self, Local};
use vaat::{Promise, TraceCtx};

#[test]
fn callback_sees_registration_time_context() {
    let who: Arc<Local<&'static str>> = Arc::new(Local::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let p: Promise<u32> = Promise::new();

    who.set("registrar");
    let w = who.clone();
    let s = seen.clone();
    p.respond(TraceCtx::new("observe"), move |_| {
        s.lock().unwrap().push(*w.get().unwrap());
    });

    // The completing thread's context has moved on by completion time.
    who.set("completer");
    p.set_value(1).unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), ["registrar"]);
    // And the dispatch restored the completer's own context afterwards.
    assert_eq!(*who.get().unwrap(), "completer");
}

#[test]
fn context_travels_across_threads() {
    let who: Arc<Local<&'static str>> = Arc::new(Local::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let p: Promise<u32> = Promise::new();

    who.set("origin");
    let w = who.clone();
    let s = seen.clone();
    p.respond(TraceCtx::new("cross"), move |_| {
        s.lock().unwrap().push(w.get().map(|v| *v));
    });

    // Complete from a thread that never set the local at all.
    let completer = p.clone();
    thread::spawn(move || completer.set_value(1).unwrap())
        .join()
        .unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), [Some("origin")]);
}

#[test]
fn context_restored_even_when_callback_panics() {
    let who: Arc<Local<&'static str>> = Arc::new(Local::new());

    let p: Promise<u32> = Promise::new();

    who.set("registrar");
    p.respond(TraceCtx::new("explode"), move |_| panic!("inside callback"));

    who.set("completer");
    // The callback is monitored: its panic is contained and the completing
    // thread keeps its own context.
    p.set_value(1).unwrap();
    assert_eq!(*who.get().unwrap(), "completer");
}

#[test]
fn snapshots_restore_exactly() {
    let tag: Local<u32> = Local::new();
    tag.set(1);
    let snap = context::save();

    tag.set(2);
    assert_eq!(tag.get().as_deref(), Some(&2));

    context::restore(&snap);
    assert_eq!(tag.get().as_deref(), Some(&1));
}
