//! Invocation tracing for continuations.
//!
//! Every traced continuation records its tag with the installed
//! [`TraceRecorder`] immediately before its body runs. The recorder is
//! process-global and installable once; with none installed, recording is
//! free.

use once_cell::sync::OnceCell;
use std::fmt;

/// An opaque tag identifying where a continuation was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceCtx {
    name: &'static str,
}

impl TraceCtx {
    /// Creates a tag.
    pub const fn new(name: &'static str) -> Self {
        TraceCtx { name }
    }

    /// The tag's name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TraceCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Sink for continuation invocation tags.
pub trait TraceRecorder: Send + Sync {
    /// Called before a traced continuation body runs.
    fn record(&self, ctx: TraceCtx);
}

static RECORDER: OnceCell<Box<dyn TraceRecorder>> = OnceCell::new();

/// Installs the process-wide recorder.
///
/// Only the first installation wins; the rejected recorder is handed back.
pub fn install_recorder(
    recorder: Box<dyn TraceRecorder>,
) -> Result<(), Box<dyn TraceRecorder>> {
    RECORDER.set(recorder)
}

/// Records `ctx` with the installed recorder, if any.
pub fn record(ctx: TraceCtx) {
    if let Some(recorder) = RECORDER.get() {
        recorder.record(ctx);
    }
}
