//! # Prometheus Admission Queue
//!
//! An in-process admission-control primitive for fan-out work.
//!
//! The queue bounds how many tasks execute at once and how many requests may
//! be outstanding, protecting a shared resource (a connection pool, a memory
//! budget, a GPU) from being overrun. Submitters get backpressure instead of
//! unbounded buffering.
//!
//! ## Admission
//!
//! Every submission takes one of three paths:
//!
//! - **Immediate**: a slot is free, the task is invoked inside `submit`.
//! - **Deferred**: all slots are busy but `running + deferred < capacity`;
//!   the task is recorded and `submit` returns at once.
//! - **Backpressure**: the queue is saturated; `submit` waits until a
//!   completion hands the submitter a slot.
//!
//! Deferred starts and blocked submitters share one FIFO list, and each
//! completion wakes exactly one of them, oldest first.
//!
//! ```rust,ignore
//! use prometheus_admission_queue::config::QueueConfig;
//! use prometheus_admission_queue::core::AdmissionQueue;
//!
//! let queue = AdmissionQueue::new(QueueConfig::new(8).with_concurrency_limit(2))?;
//!
//! let handle = queue.submit(|| async { Ok::<_, std::io::Error>(fetch().await) }).await?;
//! let value = handle.await?;
//!
//! // Drain and close.
//! queue.stop().await;
//! ```
//!
//! ## Lifecycle
//!
//! Queues accept work immediately. `stop()` rejects new submissions, waits for
//! running work to drain and closes the queue; `start()` reopens it. `wait()`
//! resolves whenever the running count reaches zero.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission algorithm, task abstraction and diagnostics.
pub mod core;
/// Configuration models for queues and queue sets.
pub mod config;
/// Builders to construct queues from configuration.
pub mod builders;
/// Runtime adapters executing admitted task futures.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::config::{ConfigError, QueueConfig};
pub use crate::core::{
    Admission, AdmissionQueue, QueueError, QueueStats, SyncTask, Task, TaskError, TaskHandle,
};
