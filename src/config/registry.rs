//! Process-wide cache of flattened type configurations

use crate::config::declare::Mapped;
use crate::config::descriptor::{FieldDescriptor, TypeConfiguration};
use crate::config::{ConfigurationError, ConfigurationResult};
use dashmap::DashMap;
use indexmap::IndexMap;
use std::any::TypeId;
use std::sync::Arc;

/// Caches one flattened [`TypeConfiguration`] per concrete type
///
/// Resolution is lazy: the first request for a type walks its declaration
/// levels and flattens them; every later request is a cache read. Entries are
/// immutable and never evicted; one per distinct mapped type for the life of
/// the process. Concurrent first requests may each build the configuration
/// (the flatten is a pure function of the type), but only one result is
/// published and all callers converge on it.
#[derive(Debug, Default)]
pub struct ConfigurationRegistry {
    configurations: DashMap<TypeId, Arc<TypeConfiguration>>,
}

impl ConfigurationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the configuration for `T`, building and caching it on first use
    ///
    /// A type whose declarations are empty resolves to an empty configuration
    /// rather than an error; materialization then degenerates to a bare
    /// default instance. Build failures are returned and never cached.
    pub fn configuration<T: Mapped>(&self) -> ConfigurationResult<Arc<TypeConfiguration>> {
        let key = TypeId::of::<T>();
        if let Some(existing) = self.configurations.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }

        log::debug!("flattening type configuration for '{}'", T::type_name());
        let built = Arc::new(flatten_declarations::<T>()?);
        let entry = self.configurations.entry(key).or_insert(built);
        Ok(Arc::clone(entry.value()))
    }

    /// Look up an already-resolved configuration by erased type id
    pub fn get(&self, type_id: TypeId) -> Option<Arc<TypeConfiguration>> {
        self.configurations
            .get(&type_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of resolved configurations
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// Whether no configuration has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

/// Walk `T`'s declaration levels and flatten them into one configuration
///
/// Levels are applied base-most first; a member re-declared at a deeper level
/// replaces the earlier descriptor in place, keeping the original slot so
/// descriptor order stays stable under overrides. The identifier follows the
/// same rule: the deepest declaring level wins.
pub(crate) fn flatten_declarations<T: Mapped>() -> ConfigurationResult<TypeConfiguration> {
    let mut members: IndexMap<&'static str, FieldDescriptor> = IndexMap::new();
    let mut identifier = None;

    for level in T::declarations() {
        let (level_name, fields, level_identifier, duplicate) = level.into_parts();
        if duplicate.is_some() {
            return Err(ConfigurationError::DuplicateIdentifier {
                type_name: T::type_name(),
                level: level_name,
            });
        }

        for descriptor in fields {
            members.insert(descriptor.member, descriptor);
        }
        if let Some(descriptor) = level_identifier {
            identifier = Some(descriptor);
        }
    }

    Ok(TypeConfiguration::new(
        TypeId::of::<T>(),
        T::type_name(),
        members.into_values().collect(),
        identifier,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::declare::TypeDeclaration;
    use crate::model::ExtractionMode;
    use uuid::Uuid;

    #[derive(Default, Debug)]
    struct Article {
        title: String,
        body: String,
        id: Uuid,
    }

    impl Mapped for Article {
        fn declarations() -> Vec<TypeDeclaration<Self>> {
            vec![
                TypeDeclaration::new("ContentBase")
                    .field(
                        "Title",
                        ExtractionMode::Raw,
                        |a: &Article| a.title.clone(),
                        |a, v| a.title = v,
                    )
                    .field(
                        "Body",
                        ExtractionMode::Raw,
                        |a: &Article| a.body.clone(),
                        |a, v| a.body = v,
                    )
                    .identifier("Id", |a: &Article| a.id, |a, v| a.id = v),
                // The derived level re-declares Title with rendered extraction.
                TypeDeclaration::new("Article").field(
                    "Title",
                    ExtractionMode::Rendered,
                    |a: &Article| a.title.clone(),
                    |a, v| a.title = v,
                ),
            ]
        }
    }

    #[derive(Default)]
    struct Unmapped;

    impl Mapped for Unmapped {}

    #[derive(Default)]
    struct TwoIdentifiers {
        id: Uuid,
    }

    impl Mapped for TwoIdentifiers {
        fn declarations() -> Vec<TypeDeclaration<Self>> {
            vec![
                TypeDeclaration::new("TwoIdentifiers")
                    .identifier("Id", |t: &TwoIdentifiers| t.id, |t, v| t.id = v)
                    .identifier("AlsoId", |t: &TwoIdentifiers| t.id, |t, v| t.id = v),
            ]
        }
    }

    #[test]
    fn test_most_derived_declaration_wins_in_place() {
        let registry = ConfigurationRegistry::new();
        let configuration = registry.configuration::<Article>().unwrap();

        let fields = configuration.fields();
        assert_eq!(fields.len(), 2, "override must not duplicate the member");
        // Title keeps the base slot but carries the derived level's mode.
        assert_eq!(fields[0].member, "Title");
        assert_eq!(fields[0].mode, ExtractionMode::Rendered);
        assert_eq!(fields[0].declared_at, "Article");
        assert_eq!(fields[1].member, "Body");
        assert_eq!(configuration.identifier().unwrap().member, "Id");
    }

    #[test]
    fn test_unmapped_type_gets_empty_configuration() {
        let registry = ConfigurationRegistry::new();
        let configuration = registry.configuration::<Unmapped>().unwrap();
        assert!(configuration.is_empty());
    }

    #[test]
    fn test_configuration_is_cached_once() {
        let registry = ConfigurationRegistry::new();
        let first = registry.configuration::<Article>().unwrap();
        let second = registry.configuration::<Article>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_identifier_fails_and_is_not_cached() {
        let registry = ConfigurationRegistry::new();
        let err = registry.configuration::<TwoIdentifiers>().unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateIdentifier {
                type_name: TwoIdentifiers::type_name(),
                level: "TwoIdentifiers",
            }
        );
        assert!(registry.is_empty(), "failed builds must not be cached");
    }

    #[test]
    fn test_erased_lookup_sees_resolved_entries_only() {
        let registry = ConfigurationRegistry::new();
        assert!(registry.get(TypeId::of::<Article>()).is_none());

        registry.configuration::<Article>().unwrap();
        let erased = registry.get(TypeId::of::<Article>()).unwrap();
        assert_eq!(erased.type_name(), Article::type_name());
    }
}
