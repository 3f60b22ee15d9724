// 📋 Shared Schemas - Document pipeline data structures
// Identity, extraction records, validation issues and results

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload shape for every extracted document: free-form JSON object.
pub type Payload = Map<String, Value>;

// ============================================================================
// DOCUMENT TYPE
// ============================================================================

/// Closed set of document types handled by the pipeline.
/// Anything else is a parse failure at identity resolution, never a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BankStatement,
    LoanApplication,
    OnboardingForm,
}

impl DocumentType {
    /// Parse the wire/filename form ("bank_statement", ...). Unknown => None.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "bank_statement" => Some(DocumentType::BankStatement),
            "loan_application" => Some(DocumentType::LoanApplication),
            "onboarding_form" => Some(DocumentType::OnboardingForm),
            _ => None,
        }
    }

    /// Wire name, matching the filename convention and payload `document_type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::BankStatement => "bank_statement",
            DocumentType::LoanApplication => "loan_application",
            DocumentType::OnboardingForm => "onboarding_form",
        }
    }
}

// ============================================================================
// DOCUMENT IDENTITY
// ============================================================================

/// Resolved customer/document-type/region triple for a single document.
///
/// This is what we persist alongside a file the moment it enters the
/// landing area; it never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentIdentity {
    pub customer_id: String,
    pub document_type: DocumentType,
    pub region: String,

    /// Intake channel, e.g. "portal". Fixed per pipeline deployment.
    pub source_channel: String,
}

// ============================================================================
// EXTRACTION RECORD
// ============================================================================

/// Structured output of the document extraction step: one payload paired with
/// its resolved identity and an extraction confidence.
///
/// Immutable once validated; downstream stages only read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Stable record id for audit trails (UUID v4).
    #[serde(default = "default_record_id")]
    pub id: String,

    pub identity: DocumentIdentity,

    /// Normalized extraction payload, keyed by field name.
    pub payload: Payload,

    /// Extraction confidence in [0, 1].
    pub confidence: f64,
}

fn default_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ExtractionRecord {
    pub fn new(identity: DocumentIdentity, payload: Payload, confidence: f64) -> Self {
        ExtractionRecord {
            id: default_record_id(),
            identity,
            payload,
            confidence,
        }
    }
}

// ============================================================================
// VALIDATION ISSUES
// ============================================================================

/// Issue severity. Only `Error` invalidates a record; the rest are advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single validation rule finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

/// Result of running the rule catalog against one record.
///
/// Invariant: `is_valid == issues contain no Error severity`. Results are
/// only produced through [`IssueCollector::finish`], so the flag is computed
/// exactly once and can never be observed half-updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Count of issues at a given severity.
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

// ============================================================================
// ISSUE COLLECTOR
// ============================================================================

/// Accumulates issues in check-declaration order, then freezes them into a
/// [`ValidationResult`]. Validity is derived in one step at the end rather
/// than mutated alongside each append.
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: Vec<ValidationIssue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        IssueCollector { issues: Vec::new() }
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.push(field, message, Severity::Error);
    }

    pub fn warning(&mut self, field: &str, message: impl Into<String>) {
        self.push(field, message, Severity::Warning);
    }

    pub fn info(&mut self, field: &str, message: impl Into<String>) {
        self.push(field, message, Severity::Info);
    }

    fn push(&mut self, field: &str, message: impl Into<String>, severity: Severity) {
        self.issues.push(ValidationIssue {
            field: field.to_string(),
            message: message.into(),
            severity,
        });
    }

    /// Freeze into a result. A record is valid iff no Error-severity issue
    /// was collected.
    pub fn finish(self) -> ValidationResult {
        let is_valid = !self.issues.iter().any(|i| i.severity == Severity::Error);
        ValidationResult {
            is_valid,
            issues: self.issues,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
