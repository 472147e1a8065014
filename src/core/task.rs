//! Task abstraction consumed by the admission queue.

use std::any::Any;
use std::future::{ready, Future, Ready};

/// A unit of work the queue can admit.
///
/// `invoke` is called exactly once, synchronously, when the task is granted an
/// execution slot. The returned future is then driven to completion on the
/// queue's spawner and its outcome delivered through the task handle.
///
/// Any `FnOnce() -> impl Future<Output = Result<T, E>>` is a task:
///
/// ```rust,ignore
/// let handle = queue.submit(|| async { Ok::<_, std::io::Error>(42) }).await?;
/// assert_eq!(handle.await?, 42);
/// ```
///
/// Synchronous work can be wrapped with [`SyncTask`].
pub trait Task: Send + 'static {
    /// Value produced on success.
    type Output: Send + 'static;
    /// Error produced on failure.
    type Error: Send + 'static;
    /// Future driving the task to its outcome.
    type Future: Future<Output = Result<Self::Output, Self::Error>> + Send + 'static;

    /// Start the task.
    fn invoke(self) -> Self::Future;
}

impl<F, Fut, T, E> Task for F
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;
    type Future = Fut;

    fn invoke(self) -> Self::Future {
        self()
    }
}

/// Adapter running a synchronous closure as a task.
///
/// The closure runs at invocation time; its result is available to the queue
/// without yielding.
pub struct SyncTask<F>(F);

impl<F> SyncTask<F> {
    /// Wrap a synchronous closure.
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, T, E> Task for SyncTask<F>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;
    type Future = Ready<Result<T, E>>;

    fn invoke(self) -> Self::Future {
        ready((self.0)())
    }
}

/// Render a panic payload as a message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
