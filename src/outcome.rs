//! `Try<A>` — the value a promise is completed with — and `Failure`, the
//! shared error handle carried by failed results and interrupt signals.
//!
//! A single completion is observed by every continuation registered on a
//! promise, so the failure side must be cheaply shareable: `Failure` is an
//! `Arc` over a boxed error, and cloning a `Try` never copies the error.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// A shared, cloneable error handle.
///
/// One failure value is handed to every continuation of a completed promise
/// and to every interrupt handler a signal reaches; `Arc` makes that sharing
/// free.
pub type Failure = Arc<dyn Error + Send + Sync + 'static>;

/// The result of a completed promise: either a value or a failure.
///
/// # Examples
///
/// ```rust
/// use vaat::Try;
///
/// let ok: Try<u32> = Try::Return(7);
/// assert!(ok.is_return());
/// assert_eq!(ok.value(), Some(&7));
///
/// let err: Try<u32> = Try::Throw(vaat::failure("boom"));
/// assert!(err.is_throw());
/// assert_eq!(err.cause().unwrap().to_string(), "boom");
/// ```
#[derive(Clone, Debug)]
pub enum Try<A> {
    /// Successful completion.
    Return(A),
    /// Failed completion.
    Throw(Failure),
}

impl<A> Try<A> {
    /// Returns `true` for `Return`.
    pub fn is_return(&self) -> bool {
        matches!(self, Try::Return(_))
    }

    /// Returns `true` for `Throw`.
    pub fn is_throw(&self) -> bool {
        matches!(self, Try::Throw(_))
    }

    /// The success value, if any.
    pub fn value(&self) -> Option<&A> {
        match self {
            Try::Return(a) => Some(a),
            Try::Throw(_) => None,
        }
    }

    /// The failure, if any.
    pub fn cause(&self) -> Option<&Failure> {
        match self {
            Try::Return(_) => None,
            Try::Throw(e) => Some(e),
        }
    }

    /// Converts into a plain `Result`.
    pub fn into_result(self) -> Result<A, Failure> {
        match self {
            Try::Return(a) => Ok(a),
            Try::Throw(e) => Err(e),
        }
    }
}

impl<A> From<Result<A, Failure>> for Try<A> {
    fn from(r: Result<A, Failure>) -> Self {
        match r {
            Ok(a) => Try::Return(a),
            Err(e) => Try::Throw(e),
        }
    }
}

// Failures compare by identity: two promises independently satisfied with
// the *same* failure object agree, distinct failure objects never do.
impl<A: PartialEq> PartialEq for Try<A> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Try::Return(a), Try::Return(b)) => a == b,
            (Try::Throw(e), Try::Throw(f)) => Arc::ptr_eq(e, f),
            _ => false,
        }
    }
}

/// A failure carrying only a human-readable message.
#[derive(Debug)]
pub struct MessageError {
    message: String,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for MessageError {}

/// Builds a [`Failure`] from a message.
///
/// This is the convenient way to produce interrupt signals and ad-hoc
/// failed results.
pub fn failure(message: impl Into<String>) -> Failure {
    Arc::new(MessageError {
        message: message.into(),
    })
}

/// Converts a caught panic payload into a [`Failure`].
///
/// Panics raised with a string payload (the overwhelmingly common case)
/// keep their message; anything else collapses to a generic description.
pub fn panic_failure(payload: Box<dyn Any + Send + 'static>) -> Failure {
    let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("callback panicked")
    };
    failure(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_eq_by_value() {
        assert_eq!(Try::Return(3u32), Try::Return(3u32));
        assert_ne!(Try::Return(3u32), Try::Return(4u32));
    }

    #[test]
    fn throw_eq_by_identity() {
        let e = failure("x");
        assert_eq!(Try::<u32>::Throw(e.clone()), Try::<u32>::Throw(e.clone()));
        assert_ne!(Try::<u32>::Throw(e), Try::<u32>::Throw(failure("x")));
    }

    #[test]
    fn return_never_equals_throw() {
        assert_ne!(Try::Return(1u32), Try::Throw(failure("1")));
    }

    #[test]
    fn panic_payload_keeps_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_failure(payload).to_string(), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("kapow"));
        assert_eq!(panic_failure(payload).to_string(), "kapow");

        let payload: Box<dyn Any + Send> = Box::new(17u64);
        assert_eq!(panic_failure(payload).to_string(), "callback panicked");
    }
}
