//! Record collaborator: the read-only field bag a typed instance is built from

use crate::model::value::FieldValue;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// How a field's value is retrieved from the record
///
/// A closed axis: either the stored representation verbatim, or the processed
/// representation produced by the record's rendering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// Unprocessed stored value
    Raw,
    /// Processed/display value from the rendering pipeline
    Rendered,
}

/// One content record: a string-keyed field bag plus a unique identifier
///
/// The record is owned by the repository client, never by this crate; the
/// materializer borrows it for a single call and performs no writes.
pub trait Record: Send + Sync {
    /// Unique identifier of the record
    fn id(&self) -> Uuid;

    /// Look up a field by name under the given extraction mode
    ///
    /// `None` means the field is absent from the record, which materializes
    /// the target member at its default value rather than failing.
    fn field(&self, name: &str, mode: ExtractionMode) -> Option<FieldValue>;
}

/// Rendering hook applied to a field when [`ExtractionMode::Rendered`] is requested
pub type RenderFn = dyn Fn(&str, &FieldValue) -> FieldValue + Send + Sync;

/// In-memory [`Record`] implementation
///
/// Backs the test suite and the bench harness, and serves hosts that already
/// hold field data outside a repository session. The renderer is optional;
/// without one, `Rendered` extraction falls back to the stored value.
pub struct MemoryRecord {
    id: Uuid,
    fields: FxHashMap<String, FieldValue>,
    renderer: Option<Box<RenderFn>>,
}

impl MemoryRecord {
    /// Create an empty record with the given identifier
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            fields: FxHashMap::default(),
            renderer: None,
        }
    }

    /// Build a record from a JSON object, one field per key
    ///
    /// String values become [`FieldValue::Text`]; everything else is kept
    /// structured. Non-object payloads produce an empty field bag.
    pub fn from_json(id: Uuid, payload: Value) -> Self {
        let mut record = Self::new(id);
        if let Value::Object(entries) = payload {
            for (name, value) in entries {
                record.fields.insert(name, FieldValue::from(value));
            }
        }
        record
    }

    /// Add or replace a field, builder style
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Install a rendering hook for `Rendered` extraction, builder style
    pub fn with_renderer(
        mut self,
        renderer: impl Fn(&str, &FieldValue) -> FieldValue + Send + Sync + 'static,
    ) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Add or replace a field in place
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Number of fields in the bag
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the bag holds no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Record for MemoryRecord {
    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, name: &str, mode: ExtractionMode) -> Option<FieldValue> {
        let stored = self.fields.get(name)?;
        match (mode, &self.renderer) {
            (ExtractionMode::Rendered, Some(render)) => Some(render(name, stored)),
            _ => Some(stored.clone()),
        }
    }
}
