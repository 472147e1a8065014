//! Fluent queue construction and queue-set building.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ConfigError, QueueConfig, QueueSetConfig};
use crate::core::{AdmissionQueue, DiagnosticsSink, Spawn};

/// Builder for a single [`AdmissionQueue`].
///
/// ```rust,ignore
/// let queue = QueueBuilder::new(16)
///     .concurrency_limit(4)
///     .label("db-writes")
///     .diagnostics(Arc::new(TracingDiagnosticsSink))
///     .build()?;
/// ```
pub struct QueueBuilder<S> {
    config: QueueConfig,
    spawner: S,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

#[cfg(feature = "tokio-runtime")]
impl QueueBuilder<crate::runtime::TokioSpawner> {
    /// Start a builder with the given capacity, running on the ambient tokio runtime.
    pub fn new(capacity: usize) -> Self {
        Self::from_config(QueueConfig::new(capacity))
    }

    /// Start a builder from an existing configuration.
    pub fn from_config(config: QueueConfig) -> Self {
        Self::with_spawner(config, crate::runtime::TokioSpawner::default())
    }
}

impl<S> QueueBuilder<S> {
    /// Start a builder with an explicit spawner.
    pub const fn with_spawner(config: QueueConfig, spawner: S) -> Self {
        Self {
            config,
            spawner,
            diagnostics: None,
        }
    }

    /// Set the concurrency limit.
    #[must_use]
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.config.concurrency_limit = Some(limit);
        self
    }

    /// Set the diagnostics label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = Some(label.into());
        self
    }

    /// Attach a diagnostics sink.
    #[must_use]
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Replace the spawner.
    pub fn spawner<S2>(self, spawner: S2) -> QueueBuilder<S2> {
        QueueBuilder {
            config: self.config,
            spawner,
            diagnostics: self.diagnostics,
        }
    }

    /// Configuration accumulated so far.
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Validate the configuration and build the queue.
    pub fn build(self) -> Result<AdmissionQueue<S>, ConfigError>
    where
        S: Spawn + Send + Sync + 'static,
    {
        AdmissionQueue::from_parts(self.config, self.spawner, self.diagnostics)
    }
}

/// Build one queue per entry of a queue set.
///
/// Queues without a label are labelled with their key. All queues share the
/// spawner and the diagnostics sink.
pub fn build_queues<S>(
    cfg: &QueueSetConfig,
    spawner: &S,
    diagnostics: Option<&Arc<dyn DiagnosticsSink>>,
) -> Result<HashMap<String, AdmissionQueue<S>>, ConfigError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate()?;

    let mut queues = HashMap::with_capacity(cfg.queues.len());
    for (name, queue_cfg) in &cfg.queues {
        let mut queue_cfg = queue_cfg.clone();
        if queue_cfg.label.is_none() {
            queue_cfg.label = Some(name.clone());
        }
        let queue = AdmissionQueue::from_parts(queue_cfg, spawner.clone(), diagnostics.cloned())?;
        tracing::debug!(queue = %name, "built queue from set");
        queues.insert(name.clone(), queue);
    }

    Ok(queues)
}
