//! # Sheetload - spreadsheet import, mapping and validation
//!
//! Sheetload turns user-uploaded CSV/XLSX files into validated,
//! schema-keyed rows: parse, map columns onto a host-supplied schema,
//! validate every cell through per-field validator chains, let the
//! user fix or exclude rows, and hand the clean rows back.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV/XLSX   │────▶│   Parser    │────▶│  Mapping +  │────▶│  Validated  │
//! │   (bytes)   │     │  (auto-enc) │     │  Transform  │     │    rows     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                         ┌──────▼──────┐
//!                                         │  Validation │  per-field chains,
//!                                         │   results   │  fail-fast per field
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetload::{ImportSession, Schema};
//!
//! #[tokio::main]
//! async fn main() {
//!     let schema = Schema::from_json(include_str!("schema.json")).unwrap();
//!     let mut session = ImportSession::new(schema);
//!
//!     session.load_file("people.csv").unwrap();
//!     session.auto_map().unwrap();
//!     session.confirm_mapping().await.unwrap();
//!
//!     if session.can_submit() {
//!         let rows = session.submit().unwrap();
//!         println!("Imported {} rows", rows.len());
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Core data shapes (RawTable, ValidationResult, ...)
//! - [`schema`] - Host-supplied schema, rules and validator chains
//! - [`parser`] - CSV/XLSX parsing with auto-detection
//! - [`mapping`] - Column mapping and the completeness gate
//! - [`transform`] - Row projection through the mapping
//! - [`validation`] - Per-field validation passes
//! - [`session`] - The import state machine and event bus
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Configuration
pub mod schema;

// Parsing
pub mod parser;

// Pipeline
pub mod mapping;
pub mod transform;
pub mod validation;

// Session state machine
pub mod session;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, ImportError, ParseError, ServerError, SessionError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    build_cell_error_index, CellErrorIndex, FieldError, RawTable, TransformedRow,
    ValidationResult, Verdict,
};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use schema::{
    example_config, AsyncValidator, FieldConfig, FieldRule, FieldSpec, FieldType, FnValidator,
    Rule, Schema, SchemaConfig, Validate,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    detect_delimiter, detect_encoding, detect_has_headers, parse_bytes, parse_file,
    ParsedSheet, SheetInfo, TableFormat,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use mapping::{auto_map, ColumnMapping};
pub use transform::{transform, transform_retained};
pub use validation::{validate_cell, validate_rows};

// =============================================================================
// Re-exports - Session
// =============================================================================

pub use session::{ConfirmOutcome, EventBus, ImportEvent, ImportSession, Step};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
