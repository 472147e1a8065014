//! Handles returned to submitters.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};

use crate::core::TaskError;

/// Identifier assigned to each submission, unique per queue.
pub type TaskId = u64;

/// How a submission was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// A slot was free; the task was invoked inside `submit`.
    Immediate,
    /// No slot was free but there was room to queue; the task starts later in
    /// FIFO order.
    Deferred,
    /// The queue was saturated; the submitter waited for a slot and then
    /// invoked the task.
    AfterBackpressure,
}

pub(crate) type Outcome<T, E> = Result<T, TaskError<E>>;

/// Handle to an admitted task.
///
/// Awaiting the handle yields the task's outcome. Dropping it does not cancel
/// the task; the queue still runs it to completion.
#[must_use = "dropping a handle discards the task outcome"]
pub struct TaskHandle<T, E> {
    id: TaskId,
    admission: Admission,
    rx: oneshot::Receiver<Outcome<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) const fn new(
        id: TaskId,
        admission: Admission,
        rx: oneshot::Receiver<Outcome<T, E>>,
    ) -> Self {
        Self { id, admission, rx }
    }

    /// Identifier of the task.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// How the task was admitted.
    pub const fn admission(&self) -> Admission {
        self.admission
    }

    /// Check for an outcome without waiting.
    ///
    /// Returns `None` while the task is still queued or running.
    pub fn try_outcome(&mut self) -> Option<Outcome<T, E>> {
        match self.rx.try_recv() {
            Ok(Some(outcome)) => Some(outcome),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(TaskError::Abandoned)),
        }
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Outcome<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| match res {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Err(TaskError::Abandoned),
        })
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("admission", &self.admission)
            .finish_non_exhaustive()
    }
}
