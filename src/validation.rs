// ✅ Validation Engine - Data quality checks per document type
// Fixed rule catalog, routed by DocumentType; issues collected in rule order

use crate::diagnostics::{DiagnosticSink, PipelineEvent};
use crate::schemas::{
    DocumentType, ExtractionRecord, IssueCollector, Payload, ValidationResult,
};
use serde_json::Value;

// ============================================================================
// FIELD PREDICATES
// ============================================================================

/// A value-level field is "missing" when the key is absent, null, or an
/// empty string.
fn is_blank(payload: &Payload, field: &str) -> bool {
    match payload.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Numeric negativity; a non-numeric or null value is not negative.
fn is_negative(value: &Value) -> bool {
    value.as_f64().map(|v| v < 0.0).unwrap_or(false)
}

// ============================================================================
// VALIDATION ENGINE
// ============================================================================

/// Routes each record to the rule catalog for its document type.
///
/// Not a generic rules engine: the catalog is fixed per type and every
/// applicable check runs to completion, so a record collects all of its
/// issues in one pass.
pub struct ValidationEngine;

impl ValidationEngine {
    pub fn new() -> Self {
        ValidationEngine
    }

    /// Validate a single record. Dispatch is an exhaustive match over the
    /// closed document-type enum; unrecognized types never reach this point
    /// because identity resolution rejects them.
    pub fn validate(&self, record: &ExtractionRecord) -> ValidationResult {
        match record.identity.document_type {
            DocumentType::BankStatement => validate_bank_statement(&record.payload),
            DocumentType::LoanApplication => validate_loan_application(&record.payload),
            DocumentType::OnboardingForm => validate_onboarding_form(&record.payload),
        }
    }

    /// Validate an ordered batch. Output is positionally aligned with the
    /// input and always the same length; a per-record event reports the
    /// verdict and issue count.
    pub fn validate_batch(
        &self,
        records: &[ExtractionRecord],
        sink: &dyn DiagnosticSink,
    ) -> Vec<ValidationResult> {
        records
            .iter()
            .map(|record| {
                let result = self.validate(record);
                sink.emit(PipelineEvent::RecordValidated {
                    record_id: record.id.clone(),
                    is_valid: result.is_valid,
                    issue_count: result.issues.len(),
                });
                result
            })
            .collect()
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// RULE CATALOGS
// ============================================================================

fn validate_bank_statement(payload: &Payload) -> ValidationResult {
    let mut issues = IssueCollector::new();

    if is_blank(payload, "customer_id") {
        issues.error("customer_id", "Missing customer_id");
    }

    // Balance checks are alternatives: the negativity rule only applies when
    // both balance fields are present, otherwise the pair is reported missing.
    if payload.contains_key("closing_balance") && payload.contains_key("opening_balance") {
        if payload.get("closing_balance").is_some_and(is_negative) {
            issues.error("closing_balance", "Closing balance cannot be negative");
        }
    } else {
        issues.warning("closing_balance", "Missing balance fields");
    }

    if is_blank(payload, "currency") {
        issues.warning("currency", "Currency not provided");
    }

    issues.finish()
}

fn validate_loan_application(payload: &Payload) -> ValidationResult {
    let mut issues = IssueCollector::new();

    if is_blank(payload, "application_id") {
        issues.error("application_id", "Missing application_id");
    }

    for field in ["requested_amount", "tenor_months", "income"] {
        // Absence short-circuits the negativity check for the same field
        match payload.get(field) {
            None => issues.error(field, format!("Missing {field}")),
            Some(value) if is_negative(value) => {
                issues.error(field, format!("{field} cannot be negative"));
            }
            Some(_) => {}
        }
    }

    issues.finish()
}

fn validate_onboarding_form(payload: &Payload) -> ValidationResult {
    let mut issues = IssueCollector::new();

    if is_blank(payload, "full_name") {
        issues.error("full_name", "Missing full_name");
    }

    if is_blank(payload, "dob") {
        issues.warning("dob", "Missing date of birth");
    }

    if is_blank(payload, "region") {
        issues.error("region", "Missing region");
    }

    issues.finish()
}

// ============================================================================
// TESTS
// ============================================================================
