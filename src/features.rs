// 🏗️ Feature Assembler - Churn and loan-risk feature views
// Joins the three validated document tables into two flat scoring inputs

use crate::schemas::Payload;
use crate::table::FeatureTable;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::HashMap;

// ============================================================================
// COLUMN CONTRACTS
// ============================================================================

/// Bank-statement columns feeding the churn view.
const BANK_CHURN_COLUMNS: [&str; 7] = [
    "customer_id",
    "region",
    "segment",
    "income_estimate",
    "relationship_tenure_months",
    "digital_channel_index",
    "risk_segment",
];

/// Onboarding columns feeding the churn view.
const ONBOARD_CHURN_COLUMNS: [&str; 5] = [
    "customer_id",
    "annual_income",
    "pep_flag",
    "risk_rating_initial",
    "segment",
];

/// Loan columns required for the per-customer aggregation.
const LOAN_AGG_COLUMNS: [&str; 5] = [
    "customer_id",
    "application_id",
    "requested_amount",
    "risk_score_internal",
    "early_delinquency_flag",
];

/// Core loan-application columns in the loan-risk view. Includes
/// `early_delinquency_flag`, the target column the scoring collaborator
/// depends on; its absence aborts the view.
const LOAN_CORE_COLUMNS: [&str; 14] = [
    "application_id",
    "customer_id",
    "product_type",
    "requested_amount",
    "tenor_months",
    "income",
    "liabilities",
    "dti_ratio",
    "credit_score",
    "existing_loans_total_amount",
    "risk_score_internal",
    "early_delinquency_flag",
    "region",
    "segment",
];

/// Per-customer bank columns enriching the loan-risk view.
const BANK_CUSTOMER_COLUMNS: [&str; 5] = [
    "customer_id",
    "relationship_tenure_months",
    "risk_segment",
    "income_estimate",
    "digital_channel_index",
];

/// Months below which a relationship counts as short.
const SHORT_RELATIONSHIP_MONTHS: f64 = 12.0;

/// Digital channel index below which engagement counts as low.
const LOW_DIGITAL_ENGAGEMENT_INDEX: f64 = 0.6;

// ============================================================================
// FEATURE ASSEMBLER
// ============================================================================

/// Builds the two feature views from validated document tables.
///
/// Both views run a single synchronous pass over a closed batch; rows are
/// derived outputs, never merged across runs. The assembler assumes upstream
/// validation already guaranteed record shape, so a missing source column is a
/// contract breach and aborts the affected view.
pub struct FeatureAssembler;

impl FeatureAssembler {
    pub fn new() -> Self {
        FeatureAssembler
    }

    /// Customer-level churn view: one row per distinct bank-statement
    /// customer, enriched with loan aggregates and onboarding attributes,
    /// plus derived flags and the deterministic rule-based churn label.
    pub fn build_churn_view(
        &self,
        bank: &FeatureTable,
        loan: &FeatureTable,
        onboard: &FeatureTable,
    ) -> Result<FeatureTable> {
        let bank_features = bank
            .select(&BANK_CHURN_COLUMNS)
            .context("building churn view from bank statements")?
            .dedup_by("customer_id");

        let loan_agg = aggregate_loans_by_customer(loan)
            .context("building churn view from loan applications")?;

        let onboard_features = onboard
            .select(&ONBOARD_CHURN_COLUMNS)
            .context("building churn view from onboarding forms")?
            .dedup_by("customer_id");

        // Onboarding attributes join on (customer_id, segment), not
        // customer_id alone. When the two sources disagree on segment the
        // onboarding columns silently fail to match and fall back to the
        // fills below even though the customer exists in both tables.
        // Carried as-is from the source system; see DESIGN.md open question 1.
        let mut churn = bank_features
            .left_join(&loan_agg, &["customer_id"])
            .left_join(&onboard_features, &["customer_id", "segment"])
            .renamed("churn_features");

        churn.fill_missing("has_loans_with_bank", json!(false));
        churn.fill_missing("any_early_delinquency", json!(false));
        churn.fill_missing("total_loans_amount", json!(0.0));
        churn.fill_missing("avg_internal_risk_score", json!(0.0));

        churn.add_column("risk_segment_encoded", |row| {
            Some(json!(encode_risk_segment(row.get("risk_segment"))))
        });
        churn.add_column("short_relationship_flag", |row| {
            Some(json!(numeric_below(
                row,
                "relationship_tenure_months",
                SHORT_RELATIONSHIP_MONTHS
            )))
        });
        churn.add_column("low_digital_engagement_flag", |row| {
            Some(json!(numeric_below(
                row,
                "digital_channel_index",
                LOW_DIGITAL_ENGAGEMENT_INDEX
            )))
        });
        churn.add_column("churn_flag", |row| Some(json!(churn_flag(row))));

        Ok(churn)
    }

    /// Application-level loan-risk view: loan core columns, two derived
    /// ratios, and per-customer bank-statement enrichment. The bank join is
    /// on `customer_id` only, deliberately asymmetric with the churn view.
    pub fn build_loan_risk_view(
        &self,
        loan: &FeatureTable,
        bank: &FeatureTable,
    ) -> Result<FeatureTable> {
        let mut core = loan
            .select(&LOAN_CORE_COLUMNS)
            .context("building loan risk view from loan applications")?;

        core.add_column("loan_to_income_ratio", |row| {
            let amount = row.get("requested_amount")?.as_f64()?;
            let income = row.get("income")?.as_f64()?;
            // Denominator floored at 1 so zero/negative income cannot blow up
            Some(json!(amount / income.max(1.0)))
        });

        core.add_column("loan_to_existing_loans_ratio", |row| {
            let amount = row.get("requested_amount")?.as_f64()?;
            let existing = row.get("existing_loans_total_amount")?.as_f64()?;
            let denominator = if existing == 0.0 { 1.0 } else { existing };
            Some(json!(amount / denominator))
        });

        let bank_customers = bank
            .select(&BANK_CUSTOMER_COLUMNS)
            .context("building loan risk view from bank statements")?
            .dedup_by("customer_id");

        Ok(core
            .left_join(&bank_customers, &["customer_id"])
            .renamed("loan_risk_features"))
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// LOAN AGGREGATION
// ============================================================================

/// Per-customer loan aggregates:
/// - `has_loans_with_bank`: at least one application
/// - `total_loans_amount`: sum of requested_amount
/// - `avg_internal_risk_score`: mean of risk_score_internal (absent when no
///   application carries a score)
/// - `any_early_delinquency`: OR across early_delinquency_flag
///
/// Rows without a customer_id are excluded from grouping.
fn aggregate_loans_by_customer(loan: &FeatureTable) -> Result<FeatureTable> {
    loan.require_columns(&LOAN_AGG_COLUMNS)?;

    // First-seen group order keeps the output deterministic
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Value, Vec<&Payload>)> = HashMap::new();

    for row in loan.rows() {
        let Some(key_value) = row.get("customer_id") else {
            continue;
        };
        if key_value.is_null() {
            continue;
        }
        let slot = key_value.to_string();
        groups
            .entry(slot.clone())
            .or_insert_with(|| {
                order.push(slot.clone());
                (key_value.clone(), Vec::new())
            })
            .1
            .push(row);
    }

    let rows = order
        .iter()
        .map(|slot| {
            let (key_value, members) = &groups[slot];

            let total: f64 = members
                .iter()
                .filter_map(|row| row.get("requested_amount").and_then(Value::as_f64))
                .sum();

            let scores: Vec<f64> = members
                .iter()
                .filter_map(|row| row.get("risk_score_internal").and_then(Value::as_f64))
                .collect();

            let any_delinquency = members.iter().any(|row| {
                row.get("early_delinquency_flag")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            });

            let mut aggregate = Payload::new();
            aggregate.insert("customer_id".to_string(), key_value.clone());
            aggregate.insert("has_loans_with_bank".to_string(), json!(!members.is_empty()));
            aggregate.insert("total_loans_amount".to_string(), json!(total));
            if !scores.is_empty() {
                let mean = scores.iter().sum::<f64>() / scores.len() as f64;
                aggregate.insert("avg_internal_risk_score".to_string(), json!(mean));
            }
            aggregate.insert("any_early_delinquency".to_string(), json!(any_delinquency));
            aggregate
        })
        .collect();

    Ok(FeatureTable::from_rows("loan_aggregates", rows))
}

// ============================================================================
// DERIVED COLUMNS
// ============================================================================

/// Ordinal risk segment: LOW=0, MEDIUM=1, HIGH=2; anything else (absent,
/// null, unmapped) defaults to 1.
fn encode_risk_segment(value: Option<&Value>) -> i64 {
    match value.and_then(Value::as_str) {
        Some("LOW") => 0,
        Some("MEDIUM") => 1,
        Some("HIGH") => 2,
        _ => 1,
    }
}

/// Numeric threshold flag; an absent or non-numeric cell compares false.
fn numeric_below(row: &Payload, column: &str, threshold: f64) -> bool {
    row.get(column)
        .and_then(Value::as_f64)
        .map(|v| v < threshold)
        .unwrap_or(false)
}

/// Rule-based churn label: risky segment AND (short relationship OR low
/// digital engagement). Fully determined by its three inputs.
fn churn_flag(row: &Payload) -> i64 {
    let encoded = row
        .get("risk_segment_encoded")
        .and_then(Value::as_i64)
        .unwrap_or(1);
    let short = row
        .get("short_relationship_flag")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let low_digital = row
        .get("low_digital_engagement_flag")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if encoded >= 1 && (short || low_digital) {
        1
    } else {
        0
    }
}

// ============================================================================
// TESTS
// ============================================================================
