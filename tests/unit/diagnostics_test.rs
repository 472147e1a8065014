//! Tests for diagnostics sinks

use prometheus_admission_queue::core::{
    build_diagnostic_event, DiagnosticsSink, InMemoryDiagnosticsSink, Severity,
    TracingDiagnosticsSink,
};

#[test]
fn test_in_memory_sink() {
    let sink = InMemoryDiagnosticsSink::new(10);

    let event = build_diagnostic_event("task started", "db", 1, Severity::Info, Some(7));
    sink.record(&event);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "task started");
    assert_eq!(events[0].name, "db");
    assert_eq!(events[0].running_count, 1);
    assert_eq!(events[0].task_id, Some(7));
    assert!(events[0].created_at_ms > 0);
}

#[test]
fn test_in_memory_sink_overflow() {
    let sink = InMemoryDiagnosticsSink::new(2);

    sink.record(&build_diagnostic_event("a", "db", 1, Severity::Info, None));
    sink.record(&build_diagnostic_event("b", "db", 0, Severity::Info, None));
    sink.record(&build_diagnostic_event("c", "db", 0, Severity::Error, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message, "b"); // First one popped
    assert_eq!(events[1].message, "c");
    assert_eq!(sink.events_with(Severity::Error).len(), 1);
}

#[test]
fn test_tracing_sink_accepts_both_severities() {
    let sink = TracingDiagnosticsSink;
    assert!(sink.enabled());
    sink.record(&build_diagnostic_event("task finished", "db", 0, Severity::Info, Some(1)));
    sink.record(&build_diagnostic_event(
        "running count underflow",
        "db",
        0,
        Severity::Error,
        None,
    ));
}

#[test]
fn test_event_serializes_severity_snake_case() {
    let event = build_diagnostic_event("task started", "db", 1, Severity::Error, None);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["severity"], "error");
    assert_eq!(json["running_count"], 1);
}
