//! Error types for the Sheetload import pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ParseError`] - file reading and decoding errors
//! - [`ConfigError`] - host-supplied schema/mapping misuse
//! - [`SessionError`] - import session state violations
//! - [`ImportError`] - top-level pipeline errors
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Data-quality problems are never errors: a cell that fails its
//! validator chain is reported as a [`crate::models::ValidationResult`]
//! value, not through these types.

use thiserror::Error;

// =============================================================================
// File Parsing Errors
// =============================================================================

/// Errors while turning an uploaded file into a raw table.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the detected encoding.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Invalid CSV content.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid spreadsheet workbook.
    #[error("Invalid spreadsheet: {0}")]
    Excel(String),

    /// The file contained no rows.
    #[error("File contains no data rows")]
    EmptyFile,

    /// The file format is not supported.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Caller-misuse errors in the host-supplied configuration.
///
/// These are contract violations, reported distinctly from data-quality
/// errors and worth failing fast on.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The schema document failed JSON Schema validation.
    #[error("Invalid schema configuration: {}", .errors.join("; "))]
    InvalidSchema { errors: Vec<String> },

    /// The schema document is not valid JSON.
    #[error("Schema configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema defines no fields.
    #[error("Schema defines no fields")]
    EmptySchema,

    /// A rule carries a regex pattern that does not compile.
    #[error("Invalid pattern for field '{field}': {message}")]
    InvalidPattern { field: String, message: String },

    /// A command referenced a field key the schema does not define.
    #[error("Unknown schema field: {0}")]
    UnknownField(String),
}

// =============================================================================
// Session Errors
// =============================================================================

/// Import session state violations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A command was issued in the wrong step.
    #[error("Invalid step for this command: expected {expected}, session is at {actual}")]
    InvalidStep {
        expected: &'static str,
        actual: &'static str,
    },

    /// A row index outside the data row range.
    #[error("Row index {row} out of range ({len} data rows)")]
    RowOutOfRange { row: usize, len: usize },

    /// Submission attempted while retained rows still fail validation.
    #[error("{invalid} retained rows still fail validation")]
    ValidationPending { invalid: usize },
}

// =============================================================================
// Import Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the main error type returned by [`crate::session::ImportSession`]
/// commands. It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum ImportError {
    /// File parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session state error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Unknown session.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for parsing operations.
pub type ParserResult<T> = Result<T, ParseError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for session commands.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ParseError -> ImportError
        let parse_err = ParseError::EmptyFile;
        let import_err: ImportError = parse_err.into();
        assert!(import_err.to_string().contains("no data rows"));

        // ConfigError -> ImportError
        let config_err = ConfigError::UnknownField("email".into());
        let import_err: ImportError = config_err.into();
        assert!(import_err.to_string().contains("email"));

        // ImportError -> ServerError
        let server_err: ServerError = ImportError::from(SessionError::ValidationPending { invalid: 3 }).into();
        assert!(server_err.to_string().contains("3 retained rows"));
    }

    #[test]
    fn test_invalid_step_format() {
        let err = SessionError::InvalidStep {
            expected: "map-columns",
            actual: "select-file",
        };
        let msg = err.to_string();
        assert!(msg.contains("map-columns"));
        assert!(msg.contains("select-file"));
    }

    #[test]
    fn test_invalid_schema_joins_errors() {
        let err = ConfigError::InvalidSchema {
            errors: vec!["missing label".into(), "bad type".into()],
        };
        assert!(err.to_string().contains("missing label; bad type"));
    }
}
