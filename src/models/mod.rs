//! Core data shapes for the import pipeline.
//!
//! This module contains the data structures shared across the pipeline:
//!
//! - [`RawTable`] - the parsed file as rows of trimmed strings
//! - [`TransformedRow`] - one schema-keyed output row
//! - [`ValidationResult`] - per-row validation outcome
//! - [`FieldError`] - a single field failure within a row
//! - [`CellErrorIndex`] - derived row/field → message lookup
//! - [`Verdict`] - the outcome of one validator on one value
//!
//! Row indices everywhere in this crate are relative to the
//! post-header-filter, pre-exclusion array: the header row, when
//! present, is never indexed, and excluding a row does not shift the
//! indices of the rows after it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Raw Table
// =============================================================================

/// The parsed file: rows of source columns, cells trimmed at the parse
/// boundary. Row 0 may or may not be a header row; callers decide via
/// [`crate::parser::detect_has_headers`] or a manual override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of rows, header included when present.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of source columns, taken from the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// The header row, if the table is treated as having one.
    pub fn header_row(&self, has_headers: bool) -> Option<&[String]> {
        if has_headers {
            self.rows.first().map(Vec::as_slice)
        } else {
            None
        }
    }

    /// Data rows in the canonical index space: everything after the
    /// header row when `has_headers`, the whole table otherwise.
    pub fn data_rows(&self, has_headers: bool) -> &[Vec<String>] {
        if has_headers && !self.rows.is_empty() {
            &self.rows[1..]
        } else {
            &self.rows
        }
    }

    /// Write one cell, padding the row with empty strings if it is
    /// shorter than the target column. `row` is a raw index (header
    /// included).
    pub fn set_cell(&mut self, row: usize, column: usize, value: String) {
        if let Some(r) = self.rows.get_mut(row) {
            if r.len() <= column {
                r.resize(column + 1, String::new());
            }
            r[column] = value;
        }
    }
}

// =============================================================================
// Transformed Rows
// =============================================================================

/// One output row: schema field key → string value. Missing source
/// cells become `""`, never null.
pub type TransformedRow = BTreeMap<String, String>;

// =============================================================================
// Validation Results
// =============================================================================

/// Outcome of running one validator against one raw string value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Verdict {
    pub fn ok() -> Self {
        Self { is_valid: true, message: None }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { is_valid: false, message: Some(message.into()) }
    }
}

/// A single field failure within a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Schema field key.
    pub key: String,
    /// The failing validator's message.
    pub message: String,
}

/// Per-row validation outcome. `is_valid` holds iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub row_index: usize,
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn new(row_index: usize, errors: Vec<FieldError>) -> Self {
        Self { row_index, is_valid: errors.is_empty(), errors }
    }

    /// Replace this row's entry for one field: drop any existing error
    /// for `key`, record `error` in its place when present, and keep
    /// the other fields' entries untouched.
    pub fn set_field_error(&mut self, key: &str, error: Option<FieldError>) {
        match (self.errors.iter().position(|e| e.key == key), error) {
            (Some(pos), Some(err)) => self.errors[pos] = err,
            (Some(pos), None) => {
                self.errors.remove(pos);
            }
            (None, Some(err)) => self.errors.push(err),
            (None, None) => {}
        }
        self.is_valid = self.errors.is_empty();
    }
}

// =============================================================================
// Cell Error Index
// =============================================================================

/// Derived row → (field key → message) lookup for inline error display.
///
/// Absence of a row means "no known error", not "known valid": submit
/// gating must check the [`ValidationResult`]s, never this index.
pub type CellErrorIndex = BTreeMap<usize, BTreeMap<String, String>>;

/// Pure fold over validation results into a [`CellErrorIndex`].
///
/// Rows with no errors produce no entry.
pub fn build_cell_error_index(results: &[ValidationResult]) -> CellErrorIndex {
    let mut index = CellErrorIndex::new();
    for result in results {
        if result.is_valid {
            continue;
        }
        let entry = index.entry(result.row_index).or_default();
        for error in &result.errors {
            entry.insert(error.key.clone(), error.message.clone());
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        RawTable::new(vec![
            vec!["name".into(), "age".into()],
            vec!["Alice".into(), "30".into()],
            vec!["Bob".into()],
        ])
    }

    #[test]
    fn test_data_rows_skip_header() {
        let t = table();
        assert_eq!(t.data_rows(true).len(), 2);
        assert_eq!(t.data_rows(false).len(), 3);
        assert_eq!(t.header_row(true).unwrap()[0], "name");
        assert!(t.header_row(false).is_none());
    }

    #[test]
    fn test_width_uses_widest_row() {
        assert_eq!(table().width(), 2);
        assert_eq!(RawTable::default().width(), 0);
    }

    #[test]
    fn test_set_cell_pads_short_rows() {
        let mut t = table();
        t.set_cell(2, 1, "25".into());
        assert_eq!(t.rows()[2], vec!["Bob".to_string(), "25".to_string()]);

        t.set_cell(2, 3, "x".into());
        assert_eq!(t.rows()[2].len(), 4);
        assert_eq!(t.rows()[2][2], "");
    }

    #[test]
    fn test_build_index_skips_valid_rows() {
        let results = vec![
            ValidationResult::new(0, vec![]),
            ValidationResult::new(
                1,
                vec![
                    FieldError { key: "age".into(), message: "Must be a number".into() },
                    FieldError { key: "email".into(), message: "Invalid email address".into() },
                ],
            ),
        ];

        let index = build_cell_error_index(&results);
        assert!(!index.contains_key(&0));
        assert_eq!(index[&1]["age"], "Must be a number");
        assert_eq!(index[&1]["email"], "Invalid email address");
    }

    #[test]
    fn test_set_field_error_patches_in_place() {
        let mut result = ValidationResult::new(
            3,
            vec![
                FieldError { key: "name".into(), message: "This field is required".into() },
                FieldError { key: "age".into(), message: "Must be a number".into() },
            ],
        );

        result.set_field_error("age", None);
        assert_eq!(result.errors.len(), 1);
        assert!(!result.is_valid);

        result.set_field_error("name", None);
        assert!(result.is_valid);

        result.set_field_error("name", Some(FieldError { key: "name".into(), message: "bad".into() }));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].message, "bad");
    }

    #[test]
    fn test_result_serde_camel_case() {
        let result = ValidationResult::new(2, vec![]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rowIndex"], 2);
        assert_eq!(json["isValid"], true);
    }
}
