//! HTTP API module.
//!
//! This module provides the HTTP server and API types for host
//! applications embedding the importer over the wire.

pub mod server;
pub mod types;

pub use server::start_server;
pub use types::*;
