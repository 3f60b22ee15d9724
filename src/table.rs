// 🧮 Feature Table - Row-oriented tabular substrate
// Select / dedup / left-join / fill primitives for feature assembly

use crate::schemas::{ExtractionRecord, Payload};
use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::Write;

/// Join/dedup slot for rows that do not carry the key field. Pandas would
/// group these under NaN; here they share one explicit null slot.
const NULL_KEY: &str = "\u{1}null";

// ============================================================================
// FEATURE TABLE
// ============================================================================

/// A named collection of JSON-object rows.
///
/// A column "exists" when at least one row carries the key; individual rows
/// may still lack it, and that absence survives selection until an explicit
/// fill. This mirrors how sparse extraction payloads behave upstream.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    name: String,
    rows: Vec<Payload>,
}

impl FeatureTable {
    pub fn new(name: &str) -> Self {
        FeatureTable {
            name: name.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: &str, rows: Vec<Payload>) -> Self {
        FeatureTable {
            name: name.to_string(),
            rows,
        }
    }

    /// Lift validated extraction-record payloads into a table, in batch order.
    pub fn from_records(name: &str, records: &[ExtractionRecord]) -> Self {
        FeatureTable {
            name: name.to_string(),
            rows: records.iter().map(|r| r.payload.clone()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename, e.g. when an assembled view stops being its left input.
    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Payload] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Payload> {
        self.rows.get(index)
    }

    /// Whether any row carries the column.
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(column))
    }

    /// Schema contract check: every listed column must exist somewhere in the
    /// table. A miss is fatal: it means an upstream collaborator broke the
    /// shape the assembler was promised.
    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        for column in columns {
            if !self.has_column(column) {
                bail!(
                    "required column `{}` missing from table `{}`",
                    column,
                    self.name
                );
            }
        }
        Ok(())
    }

    /// Project onto a fixed column set. Per-row absence is preserved;
    /// a column absent from the whole table aborts.
    pub fn select(&self, columns: &[&str]) -> Result<FeatureTable> {
        self.require_columns(columns)?;

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut projected = Payload::new();
                for column in columns {
                    if let Some(value) = row.get(*column) {
                        projected.insert(column.to_string(), value.clone());
                    }
                }
                projected
            })
            .collect();

        Ok(FeatureTable {
            name: self.name.clone(),
            rows,
        })
    }

    /// Keep one row per distinct key value: the first occurrence in table
    /// order wins, later rows are discarded (not merged).
    pub fn dedup_by(&self, key: &str) -> FeatureTable {
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| seen.insert(key_slot(row, key)))
            .cloned()
            .collect();

        FeatureTable {
            name: self.name.clone(),
            rows,
        }
    }

    /// Left join: every left row is preserved. Right columns (minus the join
    /// keys) are copied in on a key match; unmatched rows simply stay without
    /// them. Rows missing a key value on either side never match. If a
    /// non-key column already exists on the left, the left value wins.
    pub fn left_join(&self, right: &FeatureTable, keys: &[&str]) -> FeatureTable {
        let mut lookup: HashMap<Vec<String>, &Payload> = HashMap::new();
        for row in &right.rows {
            if let Some(slot) = compound_key(row, keys) {
                // First occurrence wins on the right as well
                lookup.entry(slot).or_insert(row);
            }
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut joined = row.clone();
                if let Some(slot) = compound_key(row, keys) {
                    if let Some(matched) = lookup.get(&slot) {
                        for (column, value) in matched.iter() {
                            if keys.contains(&column.as_str()) {
                                continue;
                            }
                            joined
                                .entry(column.clone())
                                .or_insert_with(|| value.clone());
                        }
                    }
                }
                joined
            })
            .collect();

        FeatureTable {
            name: self.name.clone(),
            rows,
        }
    }

    /// Fill absent or null cells of one column with a default.
    pub fn fill_missing(&mut self, column: &str, default: Value) {
        for row in &mut self.rows {
            let cell = row.entry(column.to_string()).or_insert(Value::Null);
            if cell.is_null() {
                *cell = default.clone();
            }
        }
    }

    /// Append a derived column. The closure sees each row and returns the new
    /// cell value; `None` leaves the cell absent.
    pub fn add_column<F>(&mut self, column: &str, derive: F)
    where
        F: Fn(&Payload) -> Option<Value>,
    {
        for row in &mut self.rows {
            if let Some(value) = derive(row) {
                row.insert(column.to_string(), value);
            }
        }
    }

    /// Column values in row order; absent cells come back as None.
    pub fn column_values(&self, column: &str) -> Vec<Option<Value>> {
        self.rows
            .iter()
            .map(|row| row.get(column).cloned())
            .collect()
    }

    // ========================================================================
    // CSV EXPORT
    // ========================================================================

    /// Write the table as CSV. The header is the union of row keys in the
    /// order they are first encountered while scanning rows; absent and null
    /// cells become empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut columns: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for row in &self.rows {
            for key in row.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&columns)?;

        for row in &self.rows {
            let record: Vec<String> = columns
                .iter()
                .map(|column| match row.get(column) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(value) => value.to_string(),
                })
                .collect();
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

/// Dedup slot for a single key.
fn key_slot(row: &Payload, key: &str) -> String {
    match row.get(key) {
        None | Some(Value::Null) => NULL_KEY.to_string(),
        Some(value) => value.to_string(),
    }
}

/// Compound join key; None when any component is absent or null (such rows
/// never participate in a join match).
fn compound_key(row: &Payload, keys: &[&str]) -> Option<Vec<String>> {
    keys.iter()
        .map(|key| match row.get(*key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.to_string()),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Payload {
        let Value::Object(map) = value else {
            panic!("row must be an object");
        };
        map
    }

    fn table(name: &str, rows: Vec<Value>) -> FeatureTable {
        FeatureTable::from_rows(name, rows.into_iter().map(row).collect())
    }

    #[test]
    fn test_select_missing_column_is_fatal() {
        let t = table("bank", vec![json!({"customer_id": "C1"})]);
        let err = t.select(&["customer_id", "segment"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("segment"), "unexpected error: {msg}");
        assert!(msg.contains("bank"));
    }

    #[test]
    fn test_select_preserves_per_row_absence() {
        let t = table(
            "bank",
            vec![
                json!({"customer_id": "C1", "segment": "MASS"}),
                json!({"customer_id": "C2"}),
            ],
        );
        let selected = t.select(&["customer_id", "segment"]).unwrap();

        assert_eq!(selected.len(), 2);
        assert_eq!(selected.row(1).unwrap().get("segment"), None);
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let t = table(
            "bank",
            vec![
                json!({"customer_id": "C1", "segment": "MASS"}),
                json!({"customer_id": "C1", "segment": "AFFLUENT"}),
                json!({"customer_id": "C2", "segment": "HNI"}),
            ],
        );
        let deduped = t.dedup_by("customer_id");

        assert_eq!(deduped.len(), 2);
        // The second C1 row is discarded, not merged
        assert_eq!(
            deduped.row(0).unwrap().get("segment"),
            Some(&json!("MASS"))
        );
    }

    #[test]
    fn test_dedup_null_keys_share_one_slot() {
        let t = table(
            "bank",
            vec![
                json!({"segment": "MASS"}),
                json!({"customer_id": null, "segment": "HNI"}),
                json!({"customer_id": "C1"}),
            ],
        );
        let deduped = t.dedup_by("customer_id");
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn test_left_join_preserves_unmatched_rows() {
        let left = table(
            "bank",
            vec![json!({"customer_id": "C1"}), json!({"customer_id": "C2"})],
        );
        let right = table(
            "loan_agg",
            vec![json!({"customer_id": "C1", "total_loans_amount": 250000.0})],
        );

        let joined = left.left_join(&right, &["customer_id"]);

        assert_eq!(joined.len(), 2);
        assert_eq!(
            joined.row(0).unwrap().get("total_loans_amount"),
            Some(&json!(250000.0))
        );
        // Unmatched fields stay absent, not null
        assert_eq!(joined.row(1).unwrap().get("total_loans_amount"), None);
    }

    #[test]
    fn test_left_join_on_compound_key() {
        let left = table(
            "bank",
            vec![json!({"customer_id": "C1", "segment": "MASS"})],
        );
        let right = table(
            "onboard",
            vec![
                json!({"customer_id": "C1", "segment": "AFFLUENT", "pep_flag": true}),
                json!({"customer_id": "C1", "segment": "MASS", "pep_flag": false}),
            ],
        );

        let joined = left.left_join(&right, &["customer_id", "segment"]);
        assert_eq!(joined.row(0).unwrap().get("pep_flag"), Some(&json!(false)));
    }

    #[test]
    fn test_left_join_rows_missing_key_never_match() {
        let left = table("bank", vec![json!({"segment": "MASS"})]);
        let right = table(
            "onboard",
            vec![json!({"customer_id": "C1", "pep_flag": true})],
        );

        let joined = left.left_join(&right, &["customer_id"]);
        assert_eq!(joined.row(0).unwrap().get("pep_flag"), None);
    }

    #[test]
    fn test_fill_missing_covers_absent_and_null() {
        let mut t = table(
            "churn",
            vec![
                json!({"customer_id": "C1"}),
                json!({"customer_id": "C2", "total_loans_amount": null}),
                json!({"customer_id": "C3", "total_loans_amount": 100.0}),
            ],
        );
        t.fill_missing("total_loans_amount", json!(0.0));

        assert_eq!(
            t.column_values("total_loans_amount"),
            vec![Some(json!(0.0)), Some(json!(0.0)), Some(json!(100.0))]
        );
    }

    #[test]
    fn test_add_column_derives_from_row() {
        let mut t = table(
            "loan",
            vec![json!({"requested_amount": 100.0, "income": 50.0})],
        );
        t.add_column("loan_to_income_ratio", |row| {
            let amount = row.get("requested_amount")?.as_f64()?;
            let income = row.get("income")?.as_f64()?;
            Some(json!(amount / income.max(1.0)))
        });

        assert_eq!(
            t.row(0).unwrap().get("loan_to_income_ratio"),
            Some(&json!(2.0))
        );
    }

    #[test]
    fn test_write_csv_blank_for_absent_cells() {
        let t = table(
            "churn",
            vec![
                json!({"customer_id": "C1", "region": "APAC"}),
                json!({"customer_id": "C2"}),
            ],
        );

        let mut buffer = Vec::new();
        t.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("customer_id"));
        assert!(lines[2].ends_with(',') || lines[2].starts_with(','));
    }
}
