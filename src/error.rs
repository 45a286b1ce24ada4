use std::fmt;
use std::time::Duration;

/// Typed errors for promise operations.
///
/// Protocol violations that indicate caller bugs — building a callback chain
/// past the depth limit, merging two promises satisfied with conflicting
/// results — panic instead of returning one of these; they are not
/// recoverable conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromiseError {
    /// A completion was attempted on a promise that already holds a result.
    ImmutableResult,
    /// A blocking read gave up before the promise was completed.
    Timeout {
        /// How long the reader waited.
        waited: Duration,
    },
}

impl fmt::Display for PromiseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromiseError::ImmutableResult => {
                write!(f, "promise already completed; result is immutable")
            }
            PromiseError::Timeout { waited } => {
                write!(f, "promise not completed within {:?}", waited)
            }
        }
    }
}

impl std::error::Error for PromiseError {}
