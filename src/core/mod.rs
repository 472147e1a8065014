//! Core admission algorithm, task abstraction and diagnostics.

pub mod admission_queue;
pub mod diagnostics;
pub mod error;
pub mod handle;
pub mod stats;
pub mod task;

pub use admission_queue::{AdmissionQueue, Spawn};
pub use diagnostics::{
    build_diagnostic_event, DiagnosticEvent, DiagnosticsSink, InMemoryDiagnosticsSink, Severity,
    TracingDiagnosticsSink,
};
pub use error::{QueueError, TaskError};
pub use handle::{Admission, TaskHandle, TaskId};
pub use stats::{Lifecycle, QueueStats};
pub use task::{SyncTask, Task};
