//! Next.js flight payload parser
//!
//! Reads the server component payload that Next.js streams into a page via
//! `self.__next_f.push(...)` scripts and rebuilds its objects:
//! - chunk collection from inline scripts (SWC AST parsing, no evaluation)
//! - `key:value` line indexing with watched-property lookup
//! - `$<hex>` pointer resolution, including pointers inside JSON strings
//! - materialization of nested, string-encoded documents
//!
//! Also exposes a JSON request API and an FFI layer for non-Rust hosts.

mod chunks;
pub mod error;
pub mod extract;
pub mod ffi;
mod lines;
mod materialize;
pub mod options;
pub mod payload;
mod reference;
mod resolver;

pub use error::{FlightError, Result};
pub use extract::{extract_all, extract_from_payload, ExtractSpec, ExtractionRequest, ExtractionResult, Lookup};
pub use ffi::*;
pub use options::FlightOptions;
pub use payload::{FlightPayload, PayloadStats};
