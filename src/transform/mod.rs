//! Row projection through a column mapping.
//!
//! Pure derivation: raw rows in, schema-keyed rows out. Recomputed
//! whenever the table, mapping or exclusions change — never patched
//! incrementally.

use std::collections::BTreeSet;

use crate::mapping::ColumnMapping;
use crate::models::TransformedRow;

/// Project raw rows into schema-keyed rows.
///
/// One output row per input row, with one entry per mapped field.
/// Missing cells become `""`, never null, so downstream validators
/// always receive a string.
pub fn transform(rows: &[Vec<String>], mapping: &ColumnMapping) -> Vec<TransformedRow> {
    rows.iter().map(|row| project_row(row, mapping)).collect()
}

/// Like [`transform`], but dropping rows whose index is excluded.
///
/// Indices are in the canonical space (post-header-filter,
/// pre-exclusion), so excluding a row does not shift those after it.
pub fn transform_retained(
    rows: &[Vec<String>],
    mapping: &ColumnMapping,
    excluded: &BTreeSet<usize>,
) -> Vec<TransformedRow> {
    rows.iter()
        .enumerate()
        .filter(|(index, _)| !excluded.contains(index))
        .map(|(_, row)| project_row(row, mapping))
        .collect()
}

fn project_row(row: &[String], mapping: &ColumnMapping) -> TransformedRow {
    let mut out = TransformedRow::new();
    for (column, key) in mapping.iter() {
        let value = row.get(column).cloned().unwrap_or_default();
        out.insert(key.to_string(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{example_config, Schema};

    fn mapping() -> ColumnMapping {
        let schema = Schema::from_config(example_config()).unwrap();
        let mut mapping = ColumnMapping::new();
        mapping.set(0, "name", &schema);
        mapping.set(1, "age", &schema);
        mapping.set(2, "email", &schema);
        mapping
    }

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_projection() {
        let rows = rows(&[&["Alice", "30", "a@example.com"]]);
        let out = transform(&rows, &mapping());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "Alice");
        assert_eq!(out[0]["age"], "30");
        assert_eq!(out[0]["email"], "a@example.com");
    }

    #[test]
    fn test_missing_cells_become_empty_strings() {
        let rows = rows(&[&["Dave", "40"]]);
        let out = transform(&rows, &mapping());

        assert_eq!(out[0]["email"], "");
    }

    #[test]
    fn test_unmapped_columns_dropped() {
        let schema = Schema::from_config(example_config()).unwrap();
        let mut partial = ColumnMapping::new();
        partial.set(1, "age", &schema);

        let rows = rows(&[&["Alice", "30", "a@example.com"]]);
        let out = transform(&rows, &partial);

        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0]["age"], "30");
    }

    #[test]
    fn test_exclusion_filters_without_shifting() {
        let rows = rows(&[
            &["Alice", "30", "a@example.com"],
            &["Bob", "25", "b@example.com"],
            &["Carol", "41", "c@example.com"],
        ]);

        let excluded = BTreeSet::from([1]);
        let out = transform_retained(&rows, &mapping(), &excluded);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["name"], "Alice");
        assert_eq!(out[1]["name"], "Carol");
    }
}
