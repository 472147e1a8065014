//! Tokio runtime spawner implementation.

use std::future::Future;

use crate::core::Spawn;

/// Spawner running queue tasks on tokio.
///
/// The default spawner uses the runtime current at spawn time; one built with
/// [`TokioSpawner::new`] always targets the given runtime.
#[derive(Clone, Debug, Default)]
pub struct TokioSpawner {
    handle: Option<tokio::runtime::Handle>,
}

impl TokioSpawner {
    /// Spawner bound to a specific runtime.
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Spawner bound to the runtime of the calling context, if there is one.
    pub fn try_current() -> Result<Self, tokio::runtime::TryCurrentError> {
        tokio::runtime::Handle::try_current().map(Self::new)
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match &self.handle {
            Some(handle) => {
                handle.spawn(fut);
            }
            None => {
                tokio::spawn(fut);
            }
        }
    }
}
