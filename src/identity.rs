// 🪪 Identity Resolver - Filename convention parsing
// <customer_id>__<document_type>__<region> -> DocumentIdentity

use crate::diagnostics::{DiagnosticSink, PipelineEvent};
use crate::schemas::{DocumentIdentity, DocumentType};

/// Token delimiter in document identifiers.
pub const IDENTITY_DELIMITER: &str = "__";

/// Every document in this pipeline arrives through the portal channel.
pub const SOURCE_CHANNEL: &str = "portal";

// ============================================================================
// IDENTITY RESOLVER
// ============================================================================

/// Parses file-name-like identifiers following the convention:
///
/// ```text
/// <customer_id>__<document_type>__<region>
///
/// CUST00123__bank_statement__APAC
/// CUST00999__loan_application__EMEA
/// ```
///
/// The region token is optional; a configured default fills in when absent.
/// Identifiers that do not follow the convention resolve to no identity:
/// that is a skip, not an error.
pub struct IdentityResolver {
    default_region: String,
}

impl IdentityResolver {
    pub fn new(default_region: &str) -> Self {
        IdentityResolver {
            default_region: default_region.to_string(),
        }
    }

    /// Resolve an identifier stem (file name without extension).
    ///
    /// Pure and deterministic: same input, same output, no side effects.
    pub fn resolve(&self, identifier: &str) -> Option<DocumentIdentity> {
        let tokens: Vec<&str> = identifier.split(IDENTITY_DELIMITER).collect();
        if tokens.len() < 2 {
            // Not following the convention
            return None;
        }

        let customer_id = tokens[0];
        let document_type = DocumentType::parse(tokens[1])?;
        let region = tokens.get(2).copied().unwrap_or(&self.default_region);

        Some(DocumentIdentity {
            customer_id: customer_id.to_string(),
            document_type,
            region: region.to_string(),
            source_channel: SOURCE_CHANNEL.to_string(),
        })
    }

    /// Same as [`resolve`](Self::resolve), emitting a diagnostic on skip.
    pub fn resolve_with_diagnostics(
        &self,
        identifier: &str,
        sink: &dyn DiagnosticSink,
    ) -> Option<DocumentIdentity> {
        let identity = self.resolve(identifier);
        if identity.is_none() {
            sink.emit(PipelineEvent::IdentitySkipped {
                identifier: identifier.to_string(),
                reason: "identifier does not match <customer_id>__<document_type>__<region>"
                    .to_string(),
            });
        }
        identity
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;

    #[test]
    fn test_resolve_full_identifier() {
        let resolver = IdentityResolver::new("APAC");
        let identity = resolver
            .resolve("CUST00123__bank_statement__APAC")
            .expect("should resolve");

        assert_eq!(identity.customer_id, "CUST00123");
        assert_eq!(identity.document_type, DocumentType::BankStatement);
        assert_eq!(identity.region, "APAC");
        assert_eq!(identity.source_channel, SOURCE_CHANNEL);
    }

    #[test]
    fn test_resolve_region_defaulted() {
        let resolver = IdentityResolver::new("EMEA");
        let identity = resolver
            .resolve("CUST00999__loan_application")
            .expect("should resolve");

        assert_eq!(identity.region, "EMEA");
        assert_eq!(identity.document_type, DocumentType::LoanApplication);
    }

    #[test]
    fn test_resolve_single_token_is_skip() {
        let resolver = IdentityResolver::new("APAC");
        assert!(resolver.resolve("CUST00123").is_none());
    }

    #[test]
    fn test_resolve_unknown_type_is_skip() {
        let resolver = IdentityResolver::new("APAC");
        assert!(resolver.resolve("CUST00123__unknown_type__APAC").is_none());
    }

    #[test]
    fn test_resolve_extra_tokens_ignored() {
        let resolver = IdentityResolver::new("APAC");
        let identity = resolver
            .resolve("CUST00001__onboarding_form__AMER__v2")
            .expect("should resolve");

        assert_eq!(identity.region, "AMER");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let resolver = IdentityResolver::new("APAC");
        let a = resolver.resolve("CUST00123__bank_statement__APAC");
        let b = resolver.resolve("CUST00123__bank_statement__APAC");
        assert_eq!(a, b);
    }

    #[test]
    fn test_skip_emits_diagnostic() {
        let resolver = IdentityResolver::new("APAC");
        let sink = MemorySink::new();

        assert!(resolver
            .resolve_with_diagnostics("notes.txt", &sink)
            .is_none());
        assert!(resolver
            .resolve_with_diagnostics("CUST00123__bank_statement", &sink)
            .is_some());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            crate::diagnostics::PipelineEvent::IdentitySkipped { identifier, .. }
                if identifier == "notes.txt"
        ));
    }
}
