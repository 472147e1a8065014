//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_admission_queue::config::{ConfigError, QueueConfig, QueueSetConfig};

#[test]
fn test_queue_config_validation() {
    let valid = QueueConfig::new(10).with_concurrency_limit(4).with_label("db");
    assert!(valid.validate().is_ok());
    assert_eq!(valid.concurrency_limit(), 4);
    assert_eq!(valid.effective_concurrency(), 4);
}

#[test]
fn test_queue_config_default_concurrency() {
    let cfg = QueueConfig::new(7);
    assert_eq!(cfg.concurrency_limit, None);
    assert_eq!(cfg.concurrency_limit(), 7);
}

#[test]
fn test_queue_config_invalid_capacity() {
    assert_eq!(QueueConfig::new(0).validate(), Err(ConfigError::ZeroCapacity));
}

#[test]
fn test_queue_config_invalid_concurrency_limit() {
    let invalid = QueueConfig::new(5).with_concurrency_limit(0);
    assert_eq!(invalid.validate(), Err(ConfigError::ZeroConcurrencyLimit));
}

#[test]
fn test_queue_config_from_json() {
    let cfg = QueueConfig::from_json_str(r#"{ "capacity": 8, "concurrency_limit": 2 }"#).unwrap();
    assert_eq!(cfg.capacity, 8);
    assert_eq!(cfg.concurrency_limit, Some(2));
    assert_eq!(cfg.label, None);

    assert_eq!(
        QueueConfig::from_json_str(r#"{ "capacity": 0 }"#),
        Err(ConfigError::ZeroCapacity)
    );
    assert!(matches!(
        QueueConfig::from_json_str(r#"{ "concurrency_limit": 2 }"#),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_queue_config_json_omits_unset_fields() {
    let json = serde_json::to_string(&QueueConfig::new(3)).unwrap();
    assert_eq!(json, r#"{"capacity":3}"#);
}

#[test]
fn test_queue_config_from_env() {
    std::env::set_var("UNIT_CFG_QUEUE_CAPACITY", "12");
    std::env::set_var("UNIT_CFG_QUEUE_CONCURRENCY_LIMIT", "3");
    std::env::set_var("UNIT_CFG_QUEUE_LABEL", "uploads");

    let cfg = QueueConfig::from_env("UNIT_CFG_QUEUE").unwrap();
    assert_eq!(cfg.capacity, 12);
    assert_eq!(cfg.concurrency_limit, Some(3));
    assert_eq!(cfg.label.as_deref(), Some("uploads"));
}

#[test]
fn test_queue_config_from_env_missing_capacity() {
    let err = QueueConfig::from_env("UNIT_CFG_ABSENT").unwrap_err();
    assert!(matches!(err, ConfigError::Env { ref var, .. } if var == "UNIT_CFG_ABSENT_CAPACITY"));
}

#[test]
fn test_queue_set_validation() {
    let mut queues = HashMap::new();
    queues.insert("db".to_string(), QueueConfig::new(10));
    queues.insert("gpu".to_string(), QueueConfig::new(2).with_concurrency_limit(1));
    assert!(QueueSetConfig { queues }.validate().is_ok());
}

#[test]
fn test_queue_set_empty() {
    let cfg = QueueSetConfig {
        queues: HashMap::new(),
    };
    assert_eq!(cfg.validate(), Err(ConfigError::NoQueues));
}

#[test]
fn test_queue_set_reports_invalid_member() {
    let json = r#"{
        "queues": {
            "db": { "capacity": 0 }
        }
    }"#;
    match QueueSetConfig::from_json_str(json) {
        Err(ConfigError::InvalidQueue { name, source }) => {
            assert_eq!(name, "db");
            assert_eq!(*source, ConfigError::ZeroCapacity);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
