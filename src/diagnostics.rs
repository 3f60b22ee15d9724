// 📣 Diagnostics - Structured pipeline events
// Replaces ad-hoc progress printing with a sink the core emits to

use crate::schemas::DocumentType;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

// ============================================================================
// PIPELINE EVENTS
// ============================================================================

/// Observable side effects of the pipeline stages. Emitting an event never
/// changes control flow; sinks decide what to do with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Identifier did not follow the naming convention or used an
    /// unrecognized document type; the file is skipped.
    IdentitySkipped { identifier: String, reason: String },

    /// Payload could not be loaded (wrong extension, parse failure,
    /// non-object content); the document is skipped.
    DocumentSkipped { file_name: String, reason: String },

    /// Payload successfully loaded into an extraction record.
    PayloadLoaded {
        file_name: String,
        document_type: DocumentType,
        confidence: f64,
    },

    /// One record finished validation.
    RecordValidated {
        record_id: String,
        is_valid: bool,
        issue_count: usize,
    },
}

// ============================================================================
// SINKS
// ============================================================================

/// Where pipeline events go. The core only depends on this trait.
pub trait DiagnosticSink {
    fn emit(&self, event: PipelineEvent);
}

/// Tagged console output, one line per event.
pub struct StdoutSink;

impl DiagnosticSink for StdoutSink {
    fn emit(&self, event: PipelineEvent) {
        let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        match event {
            PipelineEvent::IdentitySkipped { identifier, reason } => {
                println!("{ts} [INGEST] Skipping {identifier}: {reason}");
            }
            PipelineEvent::DocumentSkipped { file_name, reason } => {
                println!("{ts} [EXTRACT] Skipping {file_name}: {reason}");
            }
            PipelineEvent::PayloadLoaded {
                file_name,
                document_type,
                confidence,
            } => {
                println!(
                    "{ts} [EXTRACT] Loaded payload for {file_name} | type={} | confidence={confidence:.2}",
                    document_type.as_str()
                );
            }
            PipelineEvent::RecordValidated {
                record_id,
                is_valid,
                issue_count,
            } => {
                let status = if is_valid { "OK" } else { "FAILED" };
                println!("{ts} [VALIDATE] {record_id} -> {status} (issues={issue_count})");
            }
        }
    }
}

/// Captures events for inspection; used by tests.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().expect("sink poisoned").clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().expect("sink poisoned").push(event);
    }
}

/// Discards everything.
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _event: PipelineEvent) {}
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_captures_in_order() {
        let sink = MemorySink::new();
        sink.emit(PipelineEvent::IdentitySkipped {
            identifier: "badname".to_string(),
            reason: "fewer than 2 tokens".to_string(),
        });
        sink.emit(PipelineEvent::RecordValidated {
            record_id: "r1".to_string(),
            is_valid: true,
            issue_count: 0,
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], PipelineEvent::IdentitySkipped { .. }));
        assert!(matches!(
            events[1],
            PipelineEvent::RecordValidated { is_valid: true, .. }
        ));
    }

    #[test]
    fn test_null_sink_accepts_events() {
        // Just needs to not panic
        NullSink.emit(PipelineEvent::DocumentSkipped {
            file_name: "x.pdf".to_string(),
            reason: "not JSON".to_string(),
        });
    }
}
