//! Boundary around caller-supplied functions.
//!
//! Predicates, update functions and transaction bodies are user code running
//! on a collection actor. A failure or panic inside one must fail only the
//! request that carried it, never the actor.

use crate::error::{CoreError, CoreResult};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Result type returned by caller-supplied functions.
pub type CallbackResult<T> = Result<T, CallbackError>;

/// Error raised by a caller-supplied function.
///
/// Converts from [`CoreError`] so transaction bodies can use `?` on overlay
/// operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    /// Creates an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CoreError> for CallbackError {
    fn from(err: CoreError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Runs a caller-supplied function, turning errors and panics into
/// [`CoreError::Callback`].
pub(crate) fn guarded<T>(
    operation: &'static str,
    f: impl FnOnce() -> CallbackResult<T>,
) -> CoreResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CoreError::callback(operation, err.message)),
        Err(payload) => Err(CoreError::callback(operation, panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
