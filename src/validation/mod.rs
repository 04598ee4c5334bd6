//! Validation of raw rows against the schema through a column mapping.
//!
//! Semantics, uniform across full passes and single-cell
//! re-validation:
//!
//! - **fail-fast per field**: a field's chain stops at the first
//!   failing validator and records exactly that message
//! - **accumulate across fields**: one error per failing field within
//!   a row
//! - a mapping target with no schema entry records
//!   `Schema for "<key>" not found.` and moves on — a misconfiguration
//!   signal, not a data error
//!
//! Output is deterministic: one [`ValidationResult`] per input row, in
//! input order, errors in ascending source-column order.

use crate::mapping::ColumnMapping;
use crate::models::{FieldError, ValidationResult};
use crate::schema::{run_chain, Schema};

fn schema_not_found(key: &str) -> FieldError {
    FieldError {
        key: key.to_string(),
        message: format!("Schema for \"{}\" not found.", key),
    }
}

/// Validate rows through the mapping.
///
/// `rows` are raw (source-column-indexed) rows in the canonical index
/// space; `row_index` in each result is the row's position in `rows`.
pub async fn validate_rows(
    rows: &[Vec<String>],
    schema: &Schema,
    mapping: &ColumnMapping,
) -> Vec<ValidationResult> {
    let mut results = Vec::with_capacity(rows.len());

    for (row_index, row) in rows.iter().enumerate() {
        let mut errors = Vec::new();

        for (column, key) in mapping.iter() {
            let Some(field) = schema.get(key) else {
                errors.push(schema_not_found(key));
                continue;
            };

            let value = row.get(column).map(String::as_str).unwrap_or("");
            let verdict = run_chain(field.validators(), value).await;
            if !verdict.is_valid {
                errors.push(FieldError {
                    key: key.to_string(),
                    message: verdict.message.unwrap_or_else(|| "Invalid value".to_string()),
                });
            }
        }

        results.push(ValidationResult::new(row_index, errors));
    }

    results
}

/// Re-validate a single cell value, with the same chain semantics as a
/// full pass. Returns the field's error, or `None` when the value now
/// passes.
pub async fn validate_cell(value: &str, key: &str, schema: &Schema) -> Option<FieldError> {
    let Some(field) = schema.get(key) else {
        return Some(schema_not_found(key));
    };

    let verdict = run_chain(field.validators(), value).await;
    if verdict.is_valid {
        None
    } else {
        Some(FieldError {
            key: key.to_string(),
            message: verdict.message.unwrap_or_else(|| "Invalid value".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{example_config, FieldSpec, FieldType, Rule};

    fn schema() -> Schema {
        Schema::from_config(example_config()).unwrap()
    }

    fn mapping(schema: &Schema) -> ColumnMapping {
        let mut mapping = ColumnMapping::new();
        mapping.set(0, "name", schema);
        mapping.set(1, "age", schema);
        mapping.set(2, "email", schema);
        mapping
    }

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_one_result_per_row_in_order() {
        let schema = schema();
        let rows = rows(&[
            &["Alice", "30", "a@example.com"],
            &["", "x", "b@example.com"],
            &["Carol", "41", "c@example.com"],
        ]);

        let results = validate_rows(&rows, &schema, &mapping(&schema)).await;
        assert_eq!(results.len(), 3);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.row_index, i);
        }
        assert!(results[0].is_valid);
        assert!(!results[1].is_valid);
        assert!(results[2].is_valid);
    }

    #[tokio::test]
    async fn test_errors_accumulate_across_fields() {
        let schema = schema();
        // name passes its only validator; age and email both fail
        let rows = rows(&[&["Bob123", "-5", "bobexample.com"]]);

        let results = validate_rows(&rows, &schema, &mapping(&schema)).await;
        let errors = &results[0].errors;

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].key, "age");
        assert_eq!(errors[0].message, "Age must be greater than zero");
        assert_eq!(errors[1].key, "email");
        assert_eq!(errors[1].message, "Invalid email address");
    }

    #[tokio::test]
    async fn test_fail_fast_per_field() {
        let schema = schema();
        // Missing email column: value defaults to "", the first email
        // validator (required) fails, the second one's message must
        // not appear.
        let rows = rows(&[&["Dave", "40"]]);

        let results = validate_rows(&rows, &schema, &mapping(&schema)).await;
        let errors = &results[0].errors;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key, "email");
        assert_eq!(errors[0].message, "This field is required");
    }

    #[tokio::test]
    async fn test_unmapped_schema_key_records_config_signal() {
        let schema = schema();
        // Build a mapping whose target no longer exists in the schema
        // the rows are validated against.
        let donor = Schema::new().with_field("username", FieldSpec::new("Username", FieldType::String));
        let mut mapping = ColumnMapping::new();
        mapping.set(0, "username", &donor);

        let rows = rows(&[&["dave"]]);
        let results = validate_rows(&rows, &schema, &mapping).await;

        assert!(!results[0].is_valid);
        assert_eq!(results[0].errors[0].key, "username");
        assert_eq!(results[0].errors[0].message, "Schema for \"username\" not found.");
    }

    #[tokio::test]
    async fn test_idempotence() {
        let schema = schema();
        let mapping = mapping(&schema);
        let rows = rows(&[&["Bob123", "-5", "bobexample.com"], &["Dave", "40"]]);

        let first = validate_rows(&rows, &schema, &mapping).await;
        let second = validate_rows(&rows, &schema, &mapping).await;
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_validator_default_message() {
        let schema = Schema::new().with_field(
            "code",
            FieldSpec::new("Code", FieldType::String).with_rule(Rule::Pattern {
                pattern: "^[0-9]+$".to_string(),
            }),
        );

        let error = validate_cell("abc", "code", &schema).await.unwrap();
        assert_eq!(error.message, "Invalid format");
    }

    #[tokio::test]
    async fn test_validate_cell_matches_row_semantics() {
        let schema = schema();

        assert!(validate_cell("bob@example.com", "email", &schema).await.is_none());

        let error = validate_cell("", "email", &schema).await.unwrap();
        assert_eq!(error.message, "This field is required");

        let error = validate_cell("x", "username", &schema).await.unwrap();
        assert_eq!(error.message, "Schema for \"username\" not found.");
    }
}
