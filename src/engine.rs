//! Materialization engine - the main entry point for turning records into typed objects

use crate::config::{
    ActivatorCache, BindError, ConfigurationError, ConfigurationRegistry, Mapped,
};
use crate::context::MappingContext;
use crate::model::{FieldValue, Record};
use rustc_hash::FxHashMap;
use std::any::Any;
use thiserror::Error;
use uuid::Uuid;

/// Result type for materialization operations
pub type MaterializeResult<T> = Result<T, MaterializeError>;

/// Errors that can occur while materializing or exporting an instance
#[derive(Error, Debug)]
pub enum MaterializeError {
    /// The type's configuration could not be resolved or activated
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// One or more field payloads failed conversion
    #[error("materializing '{type_name}': {} field(s) failed conversion", errors.len())]
    Conversion {
        /// Type being materialized
        type_name: &'static str,
        /// Every field that failed, in configuration order
        errors: Vec<FieldConversionError>,
    },

    /// A nested materialization chain grew past the configured limit
    #[error("nested materialization exceeded the configured depth limit of {limit}")]
    DepthExceeded {
        /// The configured `max_depth`
        limit: usize,
    },
}

/// A conversion failure bound to its source field and target member
#[derive(Error, Debug, Clone, PartialEq)]
#[error("field '{field}' -> member '{member}': {source}")]
pub struct FieldConversionError {
    /// Record field the payload came from
    pub field: &'static str,
    /// Member the payload was destined for
    pub member: &'static str,
    /// The underlying conversion failure
    #[source]
    pub source: crate::model::ConvertError,
}

/// What happens when a field payload fails conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorPolicy {
    /// Keep populating the remaining fields, then surface one aggregated
    /// error listing every failure
    Accumulate,
    /// Abort the instance on the first failing field
    FailFast,
}

/// Tunables for a [`Materializer`]
///
/// The conversion-failure policy is deliberately explicit API surface; the
/// engine never silently swallows a failing field either way.
#[derive(Debug, Clone)]
pub struct MaterializerOptions {
    /// Conversion-failure handling, see [`FieldErrorPolicy`]
    pub field_error_policy: FieldErrorPolicy,

    /// Maximum nesting depth for related-object materialization
    pub max_depth: usize,
}

impl MaterializerOptions {
    /// Abort an instance on its first failing field
    pub fn fail_fast() -> Self {
        Self {
            field_error_policy: FieldErrorPolicy::FailFast,
            ..Self::default()
        }
    }
}

impl Default for MaterializerOptions {
    fn default() -> Self {
        Self {
            field_error_policy: FieldErrorPolicy::Accumulate,
            max_depth: 16,
        }
    }
}

/// An instance mapped back into field form
///
/// The pure inverse of materialization: field payloads keyed by each
/// descriptor's effective source name, plus the identifier when one is
/// declared. Nothing is written to any record or repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedRecord {
    /// Identifier member value, when an identifier descriptor is declared
    pub id: Option<Uuid>,
    /// Field payloads keyed by effective source field name
    pub fields: FxHashMap<String, FieldValue>,
}

/// Main engine for materializing typed instances from records
///
/// Owns the two process-wide caches (type configurations and compiled
/// activators) and orchestrates construction and population. `Send + Sync`;
/// share one instance across worker threads for the life of the process so
/// the caches warm exactly once per type.
#[derive(Debug, Default)]
pub struct Materializer {
    configurations: ConfigurationRegistry,
    activators: ActivatorCache,
    options: MaterializerOptions,
}

static NO_SESSION: () = ();

impl Materializer {
    /// Create an engine with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with explicit options
    pub fn with_options(options: MaterializerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// The configuration registry backing this engine
    pub fn configurations(&self) -> &ConfigurationRegistry {
        &self.configurations
    }

    /// The activator cache backing this engine
    pub fn activators(&self) -> &ActivatorCache {
        &self.activators
    }

    /// The options this engine runs with
    pub fn options(&self) -> &MaterializerOptions {
        &self.options
    }

    /// Resolve `T`'s configuration and compile its activator ahead of use
    ///
    /// Hosts call this at startup so the first real materialization of `T`
    /// is a pure cache read.
    pub fn warm_up<T: Mapped>(&self) -> Result<(), ConfigurationError> {
        self.configurations.configuration::<T>()?;
        self.activators.activator::<T>();
        Ok(())
    }

    /// Materialize a `T` from a record, with a fresh root context
    pub fn materialize<T: Mapped>(&self, record: &dyn Record) -> MaterializeResult<T> {
        let context = MappingContext::root(record, &NO_SESSION);
        self.materialize_in(&context)
    }

    /// Materialize a `T` inside an existing mapping context
    ///
    /// Used by related-object bindings that derive a child context from the
    /// one they were invoked under.
    pub fn materialize_in<T: Mapped>(&self, context: &MappingContext<'_>) -> MaterializeResult<T> {
        if context.depth() > self.options.max_depth {
            return Err(MaterializeError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }

        let configuration = self.configurations.configuration::<T>()?;
        let activator = self.activators.activator::<T>();
        let mut instance: T = activator.instantiate_as()?;

        if let Some(identifier) = configuration.identifier() {
            let id = context.record().id();
            if let Err(err) = identifier.assign(&mut instance, id) {
                return Err(Self::escalate_bind_error::<T>(
                    err,
                    identifier.member,
                    identifier.member,
                ));
            }
        }

        let mut failures: Vec<FieldConversionError> = Vec::new();
        for descriptor in configuration.fields() {
            let Some(value) = context
                .record()
                .field(descriptor.effective_source(), descriptor.mode)
            else {
                log::trace!(
                    "field '{}' absent on record; member '{}' of '{}' keeps its default",
                    descriptor.effective_source(),
                    descriptor.member,
                    configuration.type_name(),
                );
                continue;
            };

            match descriptor.assign(&mut instance, value) {
                Ok(()) => {}
                Err(BindError::Convert(source)) => {
                    let failure = FieldConversionError {
                        field: descriptor.effective_source(),
                        member: descriptor.member,
                        source,
                    };
                    match self.options.field_error_policy {
                        FieldErrorPolicy::FailFast => {
                            return Err(MaterializeError::Conversion {
                                type_name: T::type_name(),
                                errors: vec![failure],
                            });
                        }
                        FieldErrorPolicy::Accumulate => failures.push(failure),
                    }
                }
                Err(err @ BindError::InstanceMismatch { .. }) => {
                    return Err(Self::escalate_bind_error::<T>(
                        err,
                        descriptor.effective_source(),
                        descriptor.member,
                    ));
                }
            }
        }

        if !failures.is_empty() {
            return Err(MaterializeError::Conversion {
                type_name: T::type_name(),
                errors: failures,
            });
        }

        Ok(instance)
    }

    /// Map a populated instance back into field form
    ///
    /// Walks the same flattened configuration as materialization, reading
    /// each member through its compiled reader. Descriptors sharing a source
    /// field overwrite one another in configuration order.
    pub fn export<T: Mapped>(&self, instance: &T) -> MaterializeResult<ExportedRecord> {
        let configuration = self.configurations.configuration::<T>()?;
        let instance_any: &dyn Any = instance;

        let id = match configuration.identifier() {
            Some(identifier) => Some(identifier.read(instance_any).map_err(|err| {
                Self::escalate_bind_error::<T>(err, identifier.member, identifier.member)
            })?),
            None => None,
        };

        let mut fields =
            FxHashMap::with_capacity_and_hasher(configuration.fields().len(), Default::default());
        for descriptor in configuration.fields() {
            let value = descriptor.read(instance_any).map_err(|err| {
                Self::escalate_bind_error::<T>(
                    err,
                    descriptor.effective_source(),
                    descriptor.member,
                )
            })?;
            fields.insert(descriptor.effective_source().to_owned(), value);
        }

        Ok(ExportedRecord { id, fields })
    }

    fn escalate_bind_error<T: Mapped>(
        err: BindError,
        field: &'static str,
        member: &'static str,
    ) -> MaterializeError {
        match err {
            BindError::InstanceMismatch { member, type_name } => {
                ConfigurationError::InstanceTypeMismatch { type_name, member }.into()
            }
            BindError::Convert(source) => MaterializeError::Conversion {
                type_name: T::type_name(),
                errors: vec![FieldConversionError {
                    field,
                    member,
                    source,
                }],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypeDeclaration;
    use crate::model::{ExtractionMode, MemoryRecord};

    #[derive(Default, Debug, PartialEq)]
    struct Teaser {
        headline: String,
        id: Uuid,
    }

    impl Mapped for Teaser {
        fn declarations() -> Vec<TypeDeclaration<Self>> {
            vec![
                TypeDeclaration::new("Teaser")
                    .field(
                        "Headline",
                        ExtractionMode::Raw,
                        |t: &Teaser| t.headline.clone(),
                        |t, v| t.headline = v,
                    )
                    .identifier("Id", |t: &Teaser| t.id, |t, v| t.id = v),
            ]
        }
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_engine_is_shareable_across_threads() {
        assert_send_sync::<Materializer>();
    }

    #[test]
    fn test_materialize_populates_members_and_identifier() {
        let id = Uuid::new_v4();
        let record = MemoryRecord::new(id).with_field("Headline", "hello world");
        let engine = Materializer::new();

        let teaser: Teaser = engine.materialize(&record).unwrap();
        assert_eq!(teaser.headline, "hello world");
        assert_eq!(teaser.id, id);
    }

    #[test]
    fn test_warm_up_seeds_both_caches() {
        let engine = Materializer::new();
        assert!(engine.configurations().is_empty());
        assert!(engine.activators().is_empty());

        engine.warm_up::<Teaser>().unwrap();
        assert_eq!(engine.configurations().len(), 1);
        assert_eq!(engine.activators().len(), 1);
    }

    #[test]
    fn test_default_options_accumulate() {
        let options = MaterializerOptions::default();
        assert_eq!(options.field_error_policy, FieldErrorPolicy::Accumulate);
        assert_eq!(MaterializerOptions::fail_fast().field_error_policy, FieldErrorPolicy::FailFast);
    }
}
