//! REST API types for host integration.
//!
//! All wire names are camelCase; row indices are in the canonical
//! (post-header-filter) space used everywhere else in the crate.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::mapping::ColumnMapping;
use crate::models::{CellErrorIndex, FieldError, TransformedRow, ValidationResult};
use crate::session::{ImportSession, Step};

/// Response after creating a session from an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: String,
    pub step: Step,
    /// Source column display names (header cells or `Column N`).
    pub columns: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    /// Current header flag (the heuristic's guess until overridden).
    pub has_headers: bool,
    /// Mapping suggested from the headers; may be partial or empty.
    pub suggested_mapping: ColumnMapping,
}

/// Session status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: String,
    pub step: Step,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub has_headers: bool,
    pub mapping: ColumnMapping,
    pub excluded_rows: Vec<usize>,
}

/// Request body for the header override endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadersRequest {
    pub has_headers: bool,
}

/// Request body for the mapping endpoint: `{"0": "name", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRequest {
    pub mappings: ColumnMapping,
}

/// Validation snapshot returned whenever a full pass runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: usize,
    pub invalid: usize,
    pub results: Vec<ValidationResult>,
    pub cell_errors: CellErrorIndex,
}

impl ValidationReport {
    pub fn from_session(session: &ImportSession) -> Self {
        let results = session.results().to_vec();
        let valid = results.iter().filter(|r| r.is_valid).count();
        Self {
            valid,
            invalid: results.len() - valid,
            results,
            cell_errors: session.cell_errors().clone(),
        }
    }
}

/// Response of the mapping endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResponse {
    /// "confirmed" or "incomplete".
    pub status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

/// Request body for a cell edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEditRequest {
    pub row_index: usize,
    pub key: String,
    pub value: String,
}

/// Response to a cell edit: the patched field only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEditResponse {
    pub row_index: usize,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FieldError>,
    pub row_valid: bool,
    pub can_submit: bool,
}

/// Request body for toggling row exclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionRequest {
    pub row_index: usize,
    pub excluded: bool,
}

/// Response of a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: String,
    pub row_count: usize,
    pub rows: Vec<TransformedRow>,
}

/// Create an error response body.
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_response_skips_empty_parts() {
        let response = MappingResponse {
            status: "confirmed".into(),
            missing_fields: vec![],
            validation: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("missingFields").is_none());
        assert!(json.get("validation").is_none());
    }

    #[test]
    fn test_cell_edit_request_wire_names() {
        let req: CellEditRequest =
            serde_json::from_str(r#"{"rowIndex": 3, "key": "age", "value": "30"}"#).unwrap();
        assert_eq!(req.row_index, 3);
        assert_eq!(req.key, "age");
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("no file provided");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "no file provided");
    }
}
