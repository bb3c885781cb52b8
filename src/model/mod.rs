//! Data model: field payloads, conversions and the record collaborator
//!
//! This module owns the value side of materialization: the raw field
//! payloads a record exposes and the conversions that turn them into typed
//! members (and back, for export).

#![warn(missing_docs)]

pub mod record;
pub mod value;

pub use record::{ExtractionMode, MemoryRecord, Record, RenderFn};
pub use value::{ConvertError, ConvertResult, FieldConvert, FieldValue};
