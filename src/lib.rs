//! Typed object materialization for schema-less content records
//!
//! Content repositories expose records as string-keyed field bags. This crate
//! turns such records into strongly-typed instances (and back) without
//! per-call reflection costs: each type's field mappings are flattened once
//! across its declaration levels and cached, and construction goes through a
//! compiled activator closure built on first use.
//!
//! ```
//! use itemcast::{ExtractionMode, Mapped, Materializer, MemoryRecord, TypeDeclaration};
//! use uuid::Uuid;
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Teaser {
//!     headline: String,
//!     id: Uuid,
//! }
//!
//! impl Mapped for Teaser {
//!     fn declarations() -> Vec<TypeDeclaration<Self>> {
//!         vec![
//!             TypeDeclaration::new("Teaser")
//!                 .field(
//!                     "Headline",
//!                     ExtractionMode::Raw,
//!                     |t: &Teaser| t.headline.clone(),
//!                     |t, v| t.headline = v,
//!                 )
//!                 .identifier("Id", |t: &Teaser| t.id, |t, v| t.id = v),
//!         ]
//!     }
//! }
//!
//! let id = Uuid::new_v4();
//! let record = MemoryRecord::new(id).with_field("Headline", "hello world");
//!
//! let engine = Materializer::new();
//! let teaser: Teaser = engine.materialize(&record).unwrap();
//! assert_eq!(teaser.headline, "hello world");
//! assert_eq!(teaser.id, id);
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod model;

// Re-export main types
pub use config::{
    Activator, ActivatorCache, BindError, ConfigurationError, ConfigurationRegistry,
    ConfigurationResult, FieldDescriptor, IdentifierDescriptor, Mapped, TypeConfiguration,
    TypeDeclaration,
};
pub use context::MappingContext;
pub use engine::{
    ExportedRecord, FieldConversionError, FieldErrorPolicy, MaterializeError, MaterializeResult,
    Materializer, MaterializerOptions,
};
pub use model::{
    ConvertError, ConvertResult, ExtractionMode, FieldConvert, FieldValue, MemoryRecord, Record,
};
