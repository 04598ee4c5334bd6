//! Column mapping: source columns onto schema fields.
//!
//! A mapping associates source column indices with schema field keys.
//! Two invariants hold at all times:
//!
//! - each field key appears at most once as a target (mutual exclusion
//!   across source columns)
//! - confirmation requires every schema field to be mapped; the gate
//!   reports the missing field *labels* and never panics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::Schema;

/// Source column index → schema field key, column-ordered.
///
/// Serializes as the host-facing `{"0": "name", "1": "age"}` shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    entries: BTreeMap<usize, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a source column to a schema field.
    ///
    /// Silently ignored (returns `false`) when `key` is not in the
    /// schema, or when another column already holds `key`. Remapping a
    /// column replaces its previous target.
    pub fn set(&mut self, column: usize, key: &str, schema: &Schema) -> bool {
        if !schema.contains_key(key) {
            return false;
        }
        if let Some(holder) = self.source_for(key) {
            if holder != column {
                return false;
            }
        }
        self.entries.insert(column, key.to_string());
        true
    }

    /// Clear a column's mapping (the empty-selection case).
    pub fn clear(&mut self, column: usize) {
        self.entries.remove(&column);
    }

    /// Target field for a source column, if mapped.
    pub fn get(&self, column: usize) -> Option<&str> {
        self.entries.get(&column).map(String::as_str)
    }

    /// Source column currently holding a field key, if any.
    pub fn source_for(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(_, k)| k.as_str() == key)
            .map(|(col, _)| *col)
    }

    /// `(column, key)` pairs in ascending column order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(col, key)| (*col, key.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Completeness gate: every schema field key must appear among the
    /// mapping's targets before transformation proceeds.
    ///
    /// # Returns
    /// * `Ok(())` when the mapping is complete
    /// * `Err(labels)` listing the unmapped fields' labels, in schema
    ///   key order
    pub fn confirm(&self, schema: &Schema) -> Result<(), Vec<String>> {
        let missing: Vec<String> = schema
            .iter()
            .filter(|(key, _)| self.source_for(key).is_none())
            .map(|(_, spec)| spec.label.clone())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }
}

/// Suggest an initial mapping by matching header text against field
/// keys, labels and alternates (case-insensitive). Only unambiguous
/// matches are taken; everything else is left for the user.
pub fn auto_map(headers: &[String], schema: &Schema) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();

    for (column, header) in headers.iter().enumerate() {
        let header = header.trim().to_lowercase();
        if header.is_empty() {
            continue;
        }

        let candidates: Vec<&String> = schema
            .iter()
            .filter(|(key, spec)| {
                key.to_lowercase() == header
                    || spec.label.to_lowercase() == header
                    || spec.alternates.iter().any(|alt| alt.to_lowercase() == header)
            })
            .map(|(key, _)| key)
            .collect();

        if let [key] = candidates.as_slice() {
            mapping.set(column, key.as_str(), schema);
        }
    }

    mapping
}
