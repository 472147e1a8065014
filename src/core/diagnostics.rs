//! Diagnostics sinks.
//!
//! A queue reports task starts, task finishes and accounting defects to an
//! optional [`DiagnosticsSink`]. Sinks are called outside the queue's state
//! lock, and a panicking sink is contained so it cannot disturb admission.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::task::panic_message;
use crate::core::TaskId;
use crate::util::clock::now_ms;

/// Severity of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine lifecycle event.
    Info,
    /// Accounting defect or other bug indicator.
    Error,
}

/// Structured event emitted by a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// Human-readable message (`task started`, `task finished`, ...).
    pub message: String,
    /// Name of the emitting queue.
    pub name: String,
    /// Running count observed when the event was produced.
    pub running_count: usize,
    /// Event severity.
    pub severity: Severity,
    /// Task the event refers to, when there is one.
    pub task_id: Option<TaskId>,
    /// Timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
}

/// Receiver of queue diagnostics.
pub trait DiagnosticsSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &DiagnosticEvent);

    /// Whether the sink wants events at all. Disabled sinks are never called.
    fn enabled(&self) -> bool {
        true
    }
}

/// In-memory sink keeping the most recent events, for tests and dev.
pub struct InMemoryDiagnosticsSink {
    events: Mutex<VecDeque<DiagnosticEvent>>,
    max_events: usize,
}

impl InMemoryDiagnosticsSink {
    /// Create a sink holding at most `max_events` events.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Stored events with the given severity.
    pub fn events_with(&self, severity: Severity) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.severity == severity)
            .cloned()
            .collect()
    }
}

impl DiagnosticsSink for InMemoryDiagnosticsSink {
    fn record(&self, event: &DiagnosticEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Sink forwarding events into `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnosticsSink;

impl DiagnosticsSink for TracingDiagnosticsSink {
    fn record(&self, event: &DiagnosticEvent) {
        match event.severity {
            Severity::Info => tracing::info!(
                queue = %event.name,
                running = event.running_count,
                task_id = ?event.task_id,
                "{}",
                event.message
            ),
            Severity::Error => tracing::error!(
                queue = %event.name,
                running = event.running_count,
                task_id = ?event.task_id,
                "{}",
                event.message
            ),
        }
    }
}

/// Helper to build a diagnostic event stamped with the current time.
pub fn build_diagnostic_event(
    message: impl Into<String>,
    name: impl Into<String>,
    running_count: usize,
    severity: Severity,
    task_id: Option<TaskId>,
) -> DiagnosticEvent {
    DiagnosticEvent {
        message: message.into(),
        name: name.into(),
        running_count,
        severity,
        task_id,
        created_at_ms: now_ms(),
    }
}

/// Deliver an event, containing any panic raised by the sink.
pub(crate) fn emit(sink: &dyn DiagnosticsSink, event: &DiagnosticEvent) {
    if !sink.enabled() {
        return;
    }
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sink.record(event))) {
        tracing::warn!(
            queue = %event.name,
            "diagnostics sink panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}
