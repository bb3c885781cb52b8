//! Field and identifier descriptors and the flattened type configuration

use crate::model::{ConvertError, ExtractionMode, FieldValue};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Failure of one compiled binding
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    /// The payload could not be converted into the member type
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// The erased binding was applied to an instance of a different type
    #[error("binding for member '{member}' of '{type_name}' applied to a foreign instance")]
    InstanceMismatch {
        /// Member the binding was compiled for
        member: &'static str,
        /// Type the binding was compiled for
        type_name: &'static str,
    },
}

pub(crate) type SetterFn = dyn Fn(&mut dyn Any, FieldValue) -> Result<(), BindError> + Send + Sync;
pub(crate) type ReaderFn = dyn Fn(&dyn Any) -> Result<FieldValue, BindError> + Send + Sync;
pub(crate) type IdSetterFn = dyn Fn(&mut dyn Any, Uuid) -> Result<(), BindError> + Send + Sync;
pub(crate) type IdReaderFn = dyn Fn(&dyn Any) -> Result<Uuid, BindError> + Send + Sync;

/// One mapped member: where its value comes from and how it is assigned
///
/// The setter and reader are compiled once when the declaration is built and
/// shared through the cached configuration thereafter; applying a descriptor
/// on the hot path costs one dynamic call, not a reflective lookup.
#[derive(Clone)]
pub struct FieldDescriptor {
    /// Declared source field name; `None` derives the name from the member
    pub source_field: Option<&'static str>,
    /// Target member name on the owning type
    pub member: &'static str,
    /// Raw or rendered extraction
    pub mode: ExtractionMode,
    /// Declaration level that contributed this descriptor (diagnostics)
    pub declared_at: &'static str,
    setter: Arc<SetterFn>,
    reader: Arc<ReaderFn>,
}

impl FieldDescriptor {
    pub(crate) fn new(
        source_field: Option<&'static str>,
        member: &'static str,
        mode: ExtractionMode,
        declared_at: &'static str,
        setter: Arc<SetterFn>,
        reader: Arc<ReaderFn>,
    ) -> Self {
        Self {
            source_field,
            member,
            mode,
            declared_at,
            setter,
            reader,
        }
    }

    /// Field name looked up on the record: the declared source, or the member name
    pub fn effective_source(&self) -> &'static str {
        self.source_field.unwrap_or(self.member)
    }

    /// Convert and assign a payload onto the instance
    pub fn assign(&self, instance: &mut dyn Any, value: FieldValue) -> Result<(), BindError> {
        (self.setter)(instance, value)
    }

    /// Read the member back as a field payload
    pub fn read(&self, instance: &dyn Any) -> Result<FieldValue, BindError> {
        (self.reader)(instance)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("source_field", &self.source_field)
            .field("member", &self.member)
            .field("mode", &self.mode)
            .field("declared_at", &self.declared_at)
            .finish_non_exhaustive()
    }
}

/// The member that receives the record's unique identifier
#[derive(Clone)]
pub struct IdentifierDescriptor {
    /// Target member name on the owning type
    pub member: &'static str,
    /// Declaration level that contributed this descriptor (diagnostics)
    pub declared_at: &'static str,
    setter: Arc<IdSetterFn>,
    reader: Arc<IdReaderFn>,
}

impl IdentifierDescriptor {
    pub(crate) fn new(
        member: &'static str,
        declared_at: &'static str,
        setter: Arc<IdSetterFn>,
        reader: Arc<IdReaderFn>,
    ) -> Self {
        Self {
            member,
            declared_at,
            setter,
            reader,
        }
    }

    /// Assign the record identifier onto the instance
    pub fn assign(&self, instance: &mut dyn Any, id: Uuid) -> Result<(), BindError> {
        (self.setter)(instance, id)
    }

    /// Read the identifier member back
    pub fn read(&self, instance: &dyn Any) -> Result<Uuid, BindError> {
        (self.reader)(instance)
    }
}

impl fmt::Debug for IdentifierDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierDescriptor")
            .field("member", &self.member)
            .field("declared_at", &self.declared_at)
            .finish_non_exhaustive()
    }
}

/// Flattened, immutable mapping definition for one concrete type
///
/// Built once per type by the configuration registry from the type's
/// declaration levels; target members are unique (the most-derived
/// declaration wins) and descriptor order is stable across rebuilds.
#[derive(Debug, Clone)]
pub struct TypeConfiguration {
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
    identifier: Option<IdentifierDescriptor>,
}

impl TypeConfiguration {
    pub(crate) fn new(
        type_id: TypeId,
        type_name: &'static str,
        fields: Vec<FieldDescriptor>,
        identifier: Option<IdentifierDescriptor>,
    ) -> Self {
        Self {
            type_id,
            type_name,
            fields,
            identifier,
        }
    }

    /// `TypeId` of the configured type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Display name of the configured type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Field descriptors in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Identifier descriptor, if one was declared
    pub fn identifier(&self) -> Option<&IdentifierDescriptor> {
        self.identifier.as_ref()
    }

    /// Whether the configuration maps nothing at all
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.identifier.is_none()
    }
}
