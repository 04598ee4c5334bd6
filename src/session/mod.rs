//! The import session: an explicit state machine over the pipeline.
//!
//! ```text
//! ┌────────────┐    ┌─────────────┐    ┌────────────────┐    ┌───────────┐
//! │ SelectFile │───▶│ MapColumns  │───▶│ ReviewValidate │───▶│ Submitted │
//! │  (upload)  │    │ (map+gate)  │    │ (edit/exclude) │    │  (done)   │
//! └────────────┘    └─────────────┘    └────────────────┘    └───────────┘
//! ```
//!
//! The session owns the canonical snapshots — raw table, header flag,
//! column mapping, exclusions — and recomputes the derived state
//! (validation results, cell-error index) from them on every relevant
//! change. Derived state is never patched incrementally except for the
//! single-cell path, which replaces exactly the edited field's entries.
//!
//! Commands return `Result`; data-quality problems are values inside
//! the `Ok` variants, never `Err`.

pub mod events;

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::{ConfigError, ImportResult, SessionError};
use crate::mapping::{auto_map, ColumnMapping};
use crate::models::{
    build_cell_error_index, CellErrorIndex, FieldError, RawTable, TransformedRow,
    ValidationResult,
};
use crate::parser::{self, detect_has_headers, ParsedSheet, SheetInfo};
use crate::schema::Schema;
use crate::transform::transform_retained;
use crate::validation::{validate_cell, validate_rows};

pub use events::{EventBus, ImportEvent};

/// Where the session currently is in the import flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    SelectFile,
    MapColumns,
    ReviewValidate,
    Submitted,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::SelectFile => "select-file",
            Step::MapColumns => "map-columns",
            Step::ReviewValidate => "review-validate",
            Step::Submitted => "submitted",
        }
    }
}

/// Outcome of confirming the column mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// Mapping complete; validation ran.
    Confirmed { valid: usize, invalid: usize },
    /// Required fields unmapped; their labels, in schema order.
    MissingFields(Vec<String>),
}

/// One import attempt, from file selection to submission.
pub struct ImportSession {
    schema: Schema,
    step: Step,
    table: RawTable,
    sheet_info: Option<SheetInfo>,
    has_headers: bool,
    header_guess: bool,
    mapping: ColumnMapping,
    excluded: BTreeSet<usize>,
    results: Vec<ValidationResult>,
    cell_errors: CellErrorIndex,
    edit_seq: u64,
    latest_edits: HashMap<(usize, String), u64>,
    events: EventBus,
}

impl ImportSession {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            step: Step::SelectFile,
            table: RawTable::default(),
            sheet_info: None,
            has_headers: false,
            header_guess: false,
            mapping: ColumnMapping::new(),
            excluded: BTreeSet::new(),
            results: Vec::new(),
            cell_errors: CellErrorIndex::new(),
            edit_seq: 0,
            latest_edits: HashMap::new(),
            events: EventBus::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn has_headers(&self) -> bool {
        self.has_headers
    }

    /// What the heuristic guessed at parse time, before any override.
    pub fn header_guess(&self) -> bool {
        self.header_guess
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn cell_errors(&self) -> &CellErrorIndex {
        &self.cell_errors
    }

    pub fn excluded(&self) -> &BTreeSet<usize> {
        &self.excluded
    }

    /// Parse metadata for the loaded file, if one is loaded.
    pub fn sheet_info(&self) -> Option<&SheetInfo> {
        self.sheet_info.as_ref()
    }

    /// Subscribe to the session's event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ImportEvent> {
        self.events.subscribe()
    }

    /// Number of data rows in the canonical index space.
    pub fn data_row_count(&self) -> usize {
        self.table.data_rows(self.has_headers).len()
    }

    /// Source column display names: the header row when present,
    /// `Column N` otherwise.
    pub fn columns(&self) -> Vec<String> {
        match self.table.header_row(self.has_headers) {
            Some(header) => header.to_vec(),
            None => (0..self.table.width())
                .map(|i| format!("Column {}", i + 1))
                .collect(),
        }
    }

    // =========================================================================
    // SelectFile
    // =========================================================================

    /// Load an uploaded file. Replaces nothing on failure: a parse
    /// error leaves the session in `SelectFile` for another attempt.
    pub fn load_bytes(&mut self, bytes: &[u8], name_hint: Option<&str>) -> ImportResult<()> {
        self.expect_step(Step::SelectFile, "select-file")?;

        let ParsedSheet { table, info } = match parser::parse_bytes(bytes, name_hint) {
            Ok(sheet) => sheet,
            Err(e) => {
                self.events.emit(ImportEvent::ParseError { message: e.to_string() });
                return Err(e.into());
            }
        };

        self.has_headers = detect_has_headers(table.rows());
        self.header_guess = self.has_headers;
        self.table = table;
        self.sheet_info = Some(info);
        self.step = Step::MapColumns;

        self.events.emit(ImportEvent::FileParsed {
            row_count: self.data_row_count(),
            column_count: self.table.width(),
            has_headers: self.has_headers,
        });

        Ok(())
    }

    /// Load a file from disk (CLI path).
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> ImportResult<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(crate::error::ParseError::from)?;
        let name = path.file_name().and_then(|n| n.to_str());
        self.load_bytes(&bytes, name)
    }

    // =========================================================================
    // MapColumns
    // =========================================================================

    /// Manual override for the header heuristic. Column identities
    /// change with the header row, so the mapping resets.
    pub fn set_has_headers(&mut self, has_headers: bool) -> ImportResult<()> {
        self.expect_step(Step::MapColumns, "map-columns")?;
        if self.has_headers != has_headers {
            self.has_headers = has_headers;
            self.mapping = ColumnMapping::new();
        }
        Ok(())
    }

    /// Map a source column to a schema field. Returns whether the
    /// mapping was applied (an unknown key or an already-held field is
    /// a silent no-op, per the mapper contract).
    pub fn map_column(&mut self, column: usize, key: &str) -> ImportResult<bool> {
        self.expect_step(Step::MapColumns, "map-columns")?;
        if column >= self.table.width() {
            return Ok(false);
        }
        Ok(self.mapping.set(column, key, &self.schema))
    }

    /// Clear a column's mapping (empty selection).
    pub fn clear_column(&mut self, column: usize) -> ImportResult<()> {
        self.expect_step(Step::MapColumns, "map-columns")?;
        self.mapping.clear(column);
        Ok(())
    }

    /// Replace the whole mapping, entry by entry, under the usual
    /// mutation rules. Returns how many entries were applied.
    pub fn replace_mapping(&mut self, entries: &ColumnMapping) -> ImportResult<usize> {
        self.expect_step(Step::MapColumns, "map-columns")?;
        self.mapping = ColumnMapping::new();
        let mut applied = 0;
        for (column, key) in entries.iter() {
            if column < self.table.width() && self.mapping.set(column, key, &self.schema) {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Suggest a mapping from the header row.
    pub fn auto_map(&mut self) -> ImportResult<&ColumnMapping> {
        self.expect_step(Step::MapColumns, "map-columns")?;
        self.mapping = auto_map(&self.columns(), &self.schema);
        Ok(&self.mapping)
    }

    /// The completeness gate. On success, transforms and validates the
    /// data rows and advances to `ReviewValidate`; on a miss, reports
    /// the missing field labels and stays put. Never invokes a
    /// validator before the gate passes.
    pub async fn confirm_mapping(&mut self) -> ImportResult<ConfirmOutcome> {
        self.expect_step(Step::MapColumns, "map-columns")?;

        if let Err(missing) = self.mapping.confirm(&self.schema) {
            return Ok(ConfirmOutcome::MissingFields(missing));
        }

        self.step = Step::ReviewValidate;
        self.events.emit(ImportEvent::MappingConfirmed { mapped: self.mapping.len() });

        let (valid, invalid) = self.run_validation().await;
        Ok(ConfirmOutcome::Confirmed { valid, invalid })
    }

    // =========================================================================
    // ReviewValidate
    // =========================================================================

    /// Edit one cell and re-validate just its field.
    ///
    /// The edit writes through the mapping to the raw cell, so the
    /// transformed rows stay a pure derivation. Each edit carries a
    /// sequence number; if a newer edit for the same cell lands while
    /// this one's validators are suspended, the stale outcome is
    /// discarded (last-write-wins by edit order, not completion order).
    ///
    /// Returns the field's error, or `None` when the new value passes.
    pub async fn edit_cell(
        &mut self,
        row: usize,
        key: &str,
        value: String,
    ) -> ImportResult<Option<FieldError>> {
        self.expect_step(Step::ReviewValidate, "review-validate")?;

        let len = self.data_row_count();
        if row >= len {
            return Err(SessionError::RowOutOfRange { row, len }.into());
        }
        let column = self
            .mapping
            .source_for(key)
            .ok_or_else(|| ConfigError::UnknownField(key.to_string()))?;

        self.edit_seq += 1;
        let seq = self.edit_seq;
        self.latest_edits.insert((row, key.to_string()), seq);

        let raw_row = row + usize::from(self.has_headers);
        self.table.set_cell(raw_row, column, value.clone());

        let outcome = validate_cell(&value, key, &self.schema).await;
        self.apply_edit_outcome(row, key, seq, outcome.clone());
        Ok(outcome)
    }

    /// Apply a completed cell validation unless a newer edit for the
    /// same cell superseded it while the chain ran. Returns whether
    /// the outcome was applied.
    fn apply_edit_outcome(
        &mut self,
        row: usize,
        key: &str,
        seq: u64,
        outcome: Option<FieldError>,
    ) -> bool {
        if self.latest_edits.get(&(row, key.to_string())) != Some(&seq) {
            return false;
        }

        self.patch_result(row, key, outcome.clone());
        self.events.emit(ImportEvent::CellEdited {
            row_index: row,
            key: key.to_string(),
            valid: outcome.is_none(),
        });
        true
    }

    /// Toggle a row's exclusion from the final submission. Validation
    /// results keep their indices; exclusion only filters transform
    /// and submit.
    pub fn set_row_excluded(&mut self, row: usize, excluded: bool) -> ImportResult<()> {
        self.expect_step(Step::ReviewValidate, "review-validate")?;

        let len = self.data_row_count();
        if row >= len {
            return Err(SessionError::RowOutOfRange { row, len }.into());
        }

        let changed = if excluded {
            self.excluded.insert(row)
        } else {
            self.excluded.remove(&row)
        };
        if changed {
            self.events.emit(ImportEvent::RowExcluded { row_index: row, excluded });
        }
        Ok(())
    }

    /// Recompute all derived state from the current snapshots.
    pub async fn revalidate(&mut self) -> ImportResult<(usize, usize)> {
        self.expect_step(Step::ReviewValidate, "review-validate")?;
        Ok(self.run_validation().await)
    }

    /// Number of retained (non-excluded) rows that still fail.
    pub fn invalid_retained(&self) -> usize {
        self.results
            .iter()
            .filter(|r| !self.excluded.contains(&r.row_index) && !r.is_valid)
            .count()
    }

    /// Whether every retained row passes validation. Checks the
    /// results, never the cell-error index — absence there only means
    /// "no known error".
    pub fn can_submit(&self) -> bool {
        self.step == Step::ReviewValidate && self.invalid_retained() == 0
    }

    /// Finish the import: gate on validation, emit the retained rows.
    pub fn submit(&mut self) -> ImportResult<Vec<TransformedRow>> {
        self.expect_step(Step::ReviewValidate, "review-validate")?;

        let invalid = self.invalid_retained();
        if invalid > 0 {
            return Err(SessionError::ValidationPending { invalid }.into());
        }

        let rows = transform_retained(
            self.table.data_rows(self.has_headers),
            &self.mapping,
            &self.excluded,
        );

        self.step = Step::Submitted;
        self.events.emit(ImportEvent::ImportSucceeded { row_count: rows.len() });
        Ok(rows)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Step back from review to mapping. The mapping survives; derived
    /// state is dropped and recomputed on the next confirmation.
    pub fn back(&mut self) -> ImportResult<()> {
        self.expect_step(Step::ReviewValidate, "review-validate")?;
        self.step = Step::MapColumns;
        self.results.clear();
        self.cell_errors.clear();
        self.latest_edits.clear();
        Ok(())
    }

    /// Abandon the attempt and return to file selection.
    pub fn cancel(&mut self) {
        self.step = Step::SelectFile;
        self.table = RawTable::default();
        self.sheet_info = None;
        self.has_headers = false;
        self.header_guess = false;
        self.mapping = ColumnMapping::new();
        self.excluded.clear();
        self.results.clear();
        self.cell_errors.clear();
        self.latest_edits.clear();
        self.events.emit(ImportEvent::Cancelled);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn expect_step(&self, expected: Step, name: &'static str) -> Result<(), SessionError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidStep {
                expected: name,
                actual: self.step.as_str(),
            })
        }
    }

    async fn run_validation(&mut self) -> (usize, usize) {
        let results =
            validate_rows(self.table.data_rows(self.has_headers), &self.schema, &self.mapping)
                .await;
        let valid = results.iter().filter(|r| r.is_valid).count();
        let invalid = results.len() - valid;

        self.cell_errors = build_cell_error_index(&results);
        self.results = results;

        self.events.emit(ImportEvent::ValidationComplete { valid, invalid });
        (valid, invalid)
    }

    fn patch_result(&mut self, row: usize, key: &str, outcome: Option<FieldError>) {
        if let Some(result) = self.results.iter_mut().find(|r| r.row_index == row) {
            result.set_field_error(key, outcome.clone());
        }

        match outcome {
            Some(error) => {
                self.cell_errors
                    .entry(row)
                    .or_default()
                    .insert(key.to_string(), error.message);
            }
            None => {
                if let Some(entry) = self.cell_errors.get_mut(&row) {
                    entry.remove(key);
                    if entry.is_empty() {
                        self.cell_errors.remove(&row);
                    }
                }
            }
        }
    }
}
