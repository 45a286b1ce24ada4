//! Trace recording: tags are recorded as continuations are invoked.
//!
//! The recorder is process-global and installable once, so everything that
//! exercises it lives in this one binary.

use std::sync::Mutex;

use once_cell::sync::Lazy;

use vaat::trace::{self, TraceRecorder};
use vaat::{Promise, TraceCtx};

static RECORDED: Lazy<Mutex<Vec<&'static str>>> = Lazy::new(|| Mutex::new(Vec::new()));

struct Remembering;

impl TraceRecorder for Remembering {
    fn record(&self, ctx: TraceCtx) {
        RECORDED.lock().unwrap().push(ctx.name());
    }
}

#[test]
fn tags_recorded_in_dispatch_order() {
    trace::install_recorder(Box::new(Remembering)).ok();

    let p: Promise<u32> = Promise::new();
    let q = p.respond(TraceCtx::new("outer"), |_| {});
    q.respond(TraceCtx::new("inner"), |_| {});

    p.set_value(1).unwrap();

    let recorded = RECORDED.lock().unwrap();
    assert_eq!(recorded.as_slice(), ["outer", "inner"]);
}
