//! Error types for tasks and bridges.

use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// Failure observed when consuming a task's result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task body panicked; the payload message is kept.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The result was already taken by an earlier observer.
    #[error("task result already consumed")]
    Consumed,
}

impl TaskError {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

/// Failure of a callback bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A second operation was started before the first one completed.
    #[error("bridge already has an operation in flight")]
    Busy,

    /// `wait` was called on a bridge that never started an operation.
    #[error("bridge has no operation to wait on")]
    Idle,

    /// The completion handle was dropped without ever being invoked.
    #[error("completion dropped before the operation reported")]
    Dropped,
}

/// Returned by [`crate::timeout`] when the deadline fires first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} elapsed")]
pub struct Elapsed(pub Duration);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payload_str_is_kept() {
        let err = TaskError::from_panic(Box::new("boom"));
        assert_eq!(err, TaskError::Panicked("boom".to_string()));
    }

    #[test]
    fn panic_payload_string_is_kept() {
        let err = TaskError::from_panic(Box::new(String::from("formatted 7")));
        assert_eq!(err, TaskError::Panicked("formatted 7".to_string()));
    }

    #[test]
    fn panic_payload_other_is_described() {
        let err = TaskError::from_panic(Box::new(7u32));
        assert!(matches!(err, TaskError::Panicked(msg) if msg.contains("non-string")));
    }
}
