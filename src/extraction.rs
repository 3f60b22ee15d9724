// 📄 Payload Loader - Raw documents to extraction records
// Simulated Document AI step: content is already OCR'd JSON

use crate::diagnostics::{DiagnosticSink, PipelineEvent};
use crate::schemas::{DocumentIdentity, ExtractionRecord, Payload};
use serde_json::Value;

/// Confidence assumed when the payload does not carry one.
pub const DEFAULT_CONFIDENCE: f64 = 0.9;

/// Payload field holding the extraction confidence.
const CONFIDENCE_FIELD: &str = "confidence_score";

// ============================================================================
// RAW DOCUMENT
// ============================================================================

/// A document whose identity has been resolved but whose content has not yet
/// been parsed. The content is whatever landed in the storage area.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Original file name, extension included.
    pub file_name: String,

    pub identity: DocumentIdentity,

    /// Raw file content.
    pub content: String,
}

// ============================================================================
// PAYLOAD LOADER
// ============================================================================

/// Turns raw documents into typed extraction records.
///
/// Anything that is not well-formed JSON object content is skipped with a
/// diagnostic; this stage never fails the batch.
pub struct PayloadLoader;

impl PayloadLoader {
    pub fn new() -> Self {
        PayloadLoader
    }

    /// Load one document. Returns None (after emitting a diagnostic) when the
    /// file is not JSON, does not parse, or is not a JSON object.
    pub fn load(&self, doc: &RawDocument, sink: &dyn DiagnosticSink) -> Option<ExtractionRecord> {
        if !doc.file_name.to_lowercase().ends_with(".json") {
            sink.emit(PipelineEvent::DocumentSkipped {
                file_name: doc.file_name.clone(),
                reason: "not a JSON document".to_string(),
            });
            return None;
        }

        let value: Value = match serde_json::from_str(&doc.content) {
            Ok(v) => v,
            Err(err) => {
                sink.emit(PipelineEvent::DocumentSkipped {
                    file_name: doc.file_name.clone(),
                    reason: format!("JSON parse failed: {err}"),
                });
                return None;
            }
        };

        let payload: Payload = match value {
            Value::Object(map) => map,
            _ => {
                sink.emit(PipelineEvent::DocumentSkipped {
                    file_name: doc.file_name.clone(),
                    reason: "top-level content is not a JSON object".to_string(),
                });
                return None;
            }
        };

        let confidence = payload
            .get(CONFIDENCE_FIELD)
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_CONFIDENCE);

        sink.emit(PipelineEvent::PayloadLoaded {
            file_name: doc.file_name.clone(),
            document_type: doc.identity.document_type,
            confidence,
        });

        Some(ExtractionRecord::new(
            doc.identity.clone(),
            payload,
            confidence,
        ))
    }

    /// Load a batch, preserving input order of the surviving records.
    pub fn load_batch(
        &self,
        docs: &[RawDocument],
        sink: &dyn DiagnosticSink,
    ) -> Vec<ExtractionRecord> {
        docs.iter().filter_map(|doc| self.load(doc, sink)).collect()
    }
}

impl Default for PayloadLoader {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::schemas::DocumentType;

    fn bank_identity() -> DocumentIdentity {
        DocumentIdentity {
            customer_id: "CUST00123".to_string(),
            document_type: DocumentType::BankStatement,
            region: "APAC".to_string(),
            source_channel: "portal".to_string(),
        }
    }

    fn raw(file_name: &str, content: &str) -> RawDocument {
        RawDocument {
            file_name: file_name.to_string(),
            identity: bank_identity(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_load_reads_confidence_from_payload() {
        let loader = PayloadLoader::new();
        let sink = MemorySink::new();
        let doc = raw(
            "CUST00123__bank_statement__APAC.json",
            r#"{"customer_id": "CUST00123", "confidence_score": 0.97}"#,
        );

        let record = loader.load(&doc, &sink).expect("should load");
        assert_eq!(record.confidence, 0.97);
        assert_eq!(record.identity.customer_id, "CUST00123");
        assert_eq!(
            record.payload.get("customer_id").and_then(|v| v.as_str()),
            Some("CUST00123")
        );
    }

    #[test]
    fn test_load_defaults_confidence() {
        let loader = PayloadLoader::new();
        let sink = MemorySink::new();
        let doc = raw(
            "CUST00123__bank_statement__APAC.json",
            r#"{"customer_id": "CUST00123"}"#,
        );

        let record = loader.load(&doc, &sink).expect("should load");
        assert_eq!(record.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_load_skips_non_json_extension() {
        let loader = PayloadLoader::new();
        let sink = MemorySink::new();
        let doc = raw("CUST00123__bank_statement__APAC.pdf", "{}");

        assert!(loader.load(&doc, &sink).is_none());
        assert!(matches!(
            &sink.events()[0],
            PipelineEvent::DocumentSkipped { .. }
        ));
    }

    #[test]
    fn test_load_skips_unparseable_content() {
        let loader = PayloadLoader::new();
        let sink = MemorySink::new();
        let doc = raw("CUST00123__bank_statement__APAC.json", "{not json");

        assert!(loader.load(&doc, &sink).is_none());
    }

    #[test]
    fn test_load_skips_non_object_content() {
        let loader = PayloadLoader::new();
        let sink = MemorySink::new();
        let doc = raw("CUST00123__bank_statement__APAC.json", "[1, 2, 3]");

        assert!(loader.load(&doc, &sink).is_none());
    }

    #[test]
    fn test_load_batch_preserves_order_and_drops_skips() {
        let loader = PayloadLoader::new();
        let sink = MemorySink::new();
        let docs = vec![
            raw("a__bank_statement.json", r#"{"n": 1}"#),
            raw("b__bank_statement.pdf", "binary"),
            raw("c__bank_statement.json", r#"{"n": 3}"#),
        ];

        let records = loader.load_batch(&docs, &sink);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payload.get("n"), Some(&serde_json::json!(1)));
        assert_eq!(records[1].payload.get("n"), Some(&serde_json::json!(3)));
    }
}
