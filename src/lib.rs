// Document Intake Pipeline - Core Library
// Exposes all modules for use in the CLI and tests

pub mod schemas;
pub mod diagnostics;
pub mod identity;
pub mod extraction;
pub mod validation;
pub mod table;
pub mod features;

// Re-export commonly used types
pub use schemas::{
    DocumentIdentity, DocumentType, ExtractionRecord, IssueCollector, Payload, Severity,
    ValidationIssue, ValidationResult,
};
pub use diagnostics::{DiagnosticSink, MemorySink, NullSink, PipelineEvent, StdoutSink};
pub use identity::{IdentityResolver, IDENTITY_DELIMITER, SOURCE_CHANNEL};
pub use extraction::{PayloadLoader, RawDocument, DEFAULT_CONFIDENCE};
pub use validation::ValidationEngine;
pub use table::FeatureTable;
pub use features::FeatureAssembler;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
