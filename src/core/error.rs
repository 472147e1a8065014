//! Error types for queue operations and task outcomes.

use thiserror::Error;

/// Errors produced by queue operations at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue is stopping or stopped and does not accept new work.
    #[error("acceptance closed: queue `{0}` is not accepting new tasks")]
    AcceptanceClosed(String),
    /// The requested lifecycle transition is not valid in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl QueueError {
    /// Returns a short stable label for logs and metrics.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::AcceptanceClosed(_) => "acceptance_closed",
            Self::InvalidState(_) => "invalid_state",
        }
    }
}

/// Failure outcome of a submitted task, delivered through its handle.
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// The task ran and returned an error.
    #[error("task failed: {0}")]
    Failed(E),
    /// The task panicked while being invoked or polled.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The outcome could not be delivered (the runtime dropped the task).
    #[error("task abandoned before completion")]
    Abandoned,
}

impl<E> TaskError<E> {
    /// Returns the task's own error, if that is what this failure carries.
    pub fn into_failed(self) -> Option<E> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Panicked(_) | Self::Abandoned => None,
        }
    }

    /// True when the failure came from a panic rather than an `Err` outcome.
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}
