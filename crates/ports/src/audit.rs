//! The audit sink port: a durable, append-only trail of labeled events.
//!
//! Kept deliberately narrow — a single `record` call — so every caller
//! (webhook handler, processor, handlers) can fire-and-forget without
//! taking on the sink's own error handling.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// One audited occurrence: a webhook validated, a container command run, a
/// file written, a plan generated or executed.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEvent {
    pub label: String,
    pub correlation_id: String,
    pub occurred_at: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub metadata: JsonValue,
}

impl AuditEvent {
    pub fn new(label: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            correlation_id: correlation_id.into(),
            occurred_at: Utc::now(),
            duration_ms: None,
            metadata: JsonValue::Null,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Discards every event. Useful as a default when no sink is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}
