//! Declaration API: how a type states its field mappings
//!
//! Replaces attribute discovery with explicit, type-indexed declarations. A
//! mapped type implements [`Mapped`] and returns its declaration levels,
//! base-most ancestor first; shared ancestor levels are ordinary generic
//! functions over member-access traits, so deep single-inheritance chains
//! from the source system map onto plain Rust traits.

use crate::config::descriptor::{
    BindError, FieldDescriptor, IdReaderFn, IdSetterFn, IdentifierDescriptor, ReaderFn, SetterFn,
};
use crate::model::{ExtractionMode, FieldConvert, FieldValue};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// A type that can be materialized from a record
///
/// `Default` stands in for the parameterless constructor the activator cache
/// compiles around. Types with no declared mappings still implement the
/// trait; the default `declarations` is empty, and materialization yields a
/// bare default instance.
pub trait Mapped: Default + Send + Sized + 'static {
    /// Display name used in diagnostics
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Declaration levels for this type, base-most ancestor first
    ///
    /// Each level carries the mappings one ancestor declared for itself; the
    /// registry overlays them so that a member re-declared at a deeper level
    /// wins over the base declaration.
    fn declarations() -> Vec<TypeDeclaration<Self>> {
        Vec::new()
    }
}

/// One declaration level: the mappings a single ancestor declares
///
/// Field bindings pair a reader and a writer closure over the concrete type;
/// both are compiled into type-erased descriptors immediately, so flattening
/// and every later materialization work on erased data.
pub struct TypeDeclaration<T> {
    level: &'static str,
    fields: Vec<FieldDescriptor>,
    identifier: Option<IdentifierDescriptor>,
    duplicate_identifier: Option<&'static str>,
    _marker: PhantomData<fn(T)>,
}

impl<T: 'static> TypeDeclaration<T> {
    /// Start a declaration level with a diagnostic name
    pub fn new(level: &'static str) -> Self {
        Self {
            level,
            fields: Vec::new(),
            identifier: None,
            duplicate_identifier: None,
            _marker: PhantomData,
        }
    }

    /// Map a member whose source field name equals the member name
    pub fn field<V, G, S>(
        self,
        member: &'static str,
        mode: ExtractionMode,
        get: G,
        set: S,
    ) -> Self
    where
        V: FieldConvert + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.bind(None, member, mode, get, set)
    }

    /// Map a member from an explicitly named source field
    pub fn field_from<V, G, S>(
        self,
        source: &'static str,
        member: &'static str,
        mode: ExtractionMode,
        get: G,
        set: S,
    ) -> Self
    where
        V: FieldConvert + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.bind(Some(source), member, mode, get, set)
    }

    /// Mark the member that receives the record identifier
    ///
    /// Declaring a second identifier on the same level is contradictory and
    /// is reported when the level is flattened into a configuration.
    pub fn identifier<G, S>(mut self, member: &'static str, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Uuid + Send + Sync + 'static,
        S: Fn(&mut T, Uuid) + Send + Sync + 'static,
    {
        if self.identifier.is_some() {
            self.duplicate_identifier = Some(member);
            return self;
        }

        let type_name = std::any::type_name::<T>();
        let setter: Arc<IdSetterFn> = Arc::new(move |instance: &mut dyn Any, id: Uuid| {
            let target = instance
                .downcast_mut::<T>()
                .ok_or(BindError::InstanceMismatch { member, type_name })?;
            set(target, id);
            Ok(())
        });
        let reader: Arc<IdReaderFn> = Arc::new(move |instance: &dyn Any| {
            let target = instance
                .downcast_ref::<T>()
                .ok_or(BindError::InstanceMismatch { member, type_name })?;
            Ok(get(target))
        });

        self.identifier = Some(IdentifierDescriptor::new(member, self.level, setter, reader));
        self
    }

    fn bind<V, G, S>(
        mut self,
        source: Option<&'static str>,
        member: &'static str,
        mode: ExtractionMode,
        get: G,
        set: S,
    ) -> Self
    where
        V: FieldConvert + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let setter: Arc<SetterFn> = Arc::new(move |instance: &mut dyn Any, value: FieldValue| {
            let target = instance
                .downcast_mut::<T>()
                .ok_or(BindError::InstanceMismatch { member, type_name })?;
            set(target, V::from_field(&value)?);
            Ok(())
        });
        let reader: Arc<ReaderFn> = Arc::new(move |instance: &dyn Any| {
            let target = instance
                .downcast_ref::<T>()
                .ok_or(BindError::InstanceMismatch { member, type_name })?;
            Ok(get(target).into_field())
        });

        self.fields.push(FieldDescriptor::new(
            source, member, mode, self.level, setter, reader,
        ));
        self
    }

    /// Diagnostic name of this level
    pub fn level_name(&self) -> &'static str {
        self.level
    }

    /// Number of field bindings declared on this level
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether this level declares nothing
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.identifier.is_none()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        &'static str,
        Vec<FieldDescriptor>,
        Option<IdentifierDescriptor>,
        Option<&'static str>,
    ) {
        (
            self.level,
            self.fields,
            self.identifier,
            self.duplicate_identifier,
        )
    }
}
