//! Tests for error types

use prometheus_admission_queue::config::ConfigError;
use prometheus_admission_queue::core::{QueueError, TaskError};

#[test]
fn test_acceptance_closed_error() {
    let err = QueueError::AcceptanceClosed("db".to_string());
    assert_eq!(
        format!("{}", err),
        "acceptance closed: queue `db` is not accepting new tasks"
    );
}

#[test]
fn test_invalid_state_error() {
    let err = QueueError::InvalidState("queue `db` cannot start while stopping".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid state: queue `db` cannot start while stopping"
    );
}

#[test]
fn test_task_error_display() {
    let err: TaskError<String> = TaskError::Failed("timeout talking to db".to_string());
    assert_eq!(format!("{}", err), "task failed: timeout talking to db");

    let err: TaskError<String> = TaskError::Panicked("index out of bounds".to_string());
    assert_eq!(format!("{}", err), "task panicked: index out of bounds");

    let err: TaskError<String> = TaskError::Abandoned;
    assert_eq!(format!("{}", err), "task abandoned before completion");
}

#[test]
fn test_config_error_display() {
    assert_eq!(
        format!("{}", ConfigError::ZeroCapacity),
        "capacity must be greater than 0"
    );
    let nested = ConfigError::InvalidQueue {
        name: "db".to_string(),
        source: Box::new(ConfigError::ZeroConcurrencyLimit),
    };
    assert_eq!(
        format!("{}", nested),
        "queue `db` invalid: concurrency_limit must be greater than 0"
    );
}
