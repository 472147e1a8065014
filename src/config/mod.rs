//! Configuration models for queues and queue sets.

pub mod queue;

pub use queue::{ConfigError, QueueConfig, QueueSetConfig};
