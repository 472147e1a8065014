//! Tests for builder modules

use std::collections::HashMap;
use std::sync::Arc;

use prometheus_admission_queue::builders::{build_queues, QueueBuilder};
use prometheus_admission_queue::config::{ConfigError, QueueConfig, QueueSetConfig};
use prometheus_admission_queue::core::{DiagnosticsSink, InMemoryDiagnosticsSink};
use prometheus_admission_queue::runtime::TokioSpawner;

#[test]
fn test_queue_builder_accumulates_config() {
    let builder = QueueBuilder::new(16).concurrency_limit(4).label("db-writes");
    assert_eq!(builder.config().capacity, 16);
    assert_eq!(builder.config().concurrency_limit, Some(4));
    assert_eq!(builder.config().label.as_deref(), Some("db-writes"));
}

#[test]
fn test_queue_builder_rejects_invalid_config() {
    let err = QueueBuilder::new(0).build().unwrap_err();
    assert_eq!(err, ConfigError::ZeroCapacity);
}

#[tokio::test]
async fn test_queue_builder_wires_diagnostics() {
    let sink = Arc::new(InMemoryDiagnosticsSink::new(16));
    let queue = QueueBuilder::new(2)
        .label("built")
        .diagnostics(sink.clone())
        .spawner(TokioSpawner::new(tokio::runtime::Handle::current()))
        .build()
        .unwrap();

    assert_eq!(queue.name(), "built");
    let handle = queue.submit(|| async { Ok::<_, anyhow::Error>(1) }).await.unwrap();
    handle.await.unwrap();

    let messages: Vec<_> = sink.events().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, vec!["task started", "task finished"]);
}

#[tokio::test]
async fn test_build_queues_labels_from_keys() {
    let mut queues = HashMap::new();
    queues.insert("db".to_string(), QueueConfig::new(4));
    queues.insert(
        "gpu".to_string(),
        QueueConfig::new(2).with_concurrency_limit(1).with_label("gpu-vram"),
    );
    let cfg = QueueSetConfig { queues };
    let sink: Arc<dyn DiagnosticsSink> = Arc::new(InMemoryDiagnosticsSink::new(8));

    let built = build_queues(&cfg, &TokioSpawner::default(), Some(&sink)).unwrap();
    assert_eq!(built.len(), 2);
    assert_eq!(built["db"].name(), "db");
    assert_eq!(built["gpu"].name(), "gpu-vram");
    assert_eq!(built["gpu"].stats().concurrency_limit, 1);
}

#[test]
fn test_build_queues_rejects_empty_set() {
    let cfg = QueueSetConfig {
        queues: HashMap::new(),
    };
    let result = build_queues(&cfg, &TokioSpawner::default(), None);
    assert!(matches!(result, Err(ConfigError::NoQueues)));
}
