//! Type configuration resolution and compiled activation
//!
//! The mapping side of materialization: declarations state which record
//! fields feed which members, the registry flattens inheritance chains into
//! cached per-type configurations, and the activator cache compiles
//! constructor closures so hot-path construction never pays an introspective
//! lookup.

#![warn(missing_docs)]

pub mod activator;
pub mod declare;
pub mod descriptor;
pub mod registry;

pub use activator::{Activator, ActivatorCache};
pub use declare::{Mapped, TypeDeclaration};
pub use descriptor::{BindError, FieldDescriptor, IdentifierDescriptor, TypeConfiguration};
pub use registry::ConfigurationRegistry;

use std::any::TypeId;
use thiserror::Error;

/// Result type for configuration resolution and activation
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

/// A type's mapping cannot be resolved or its instances cannot be activated
///
/// Fatal to the requesting call; never retried and never cached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// One declaration level marks more than one identifier member
    #[error("type '{type_name}' declares more than one identifier at level '{level}'")]
    DuplicateIdentifier {
        /// Type whose declaration is contradictory
        type_name: &'static str,
        /// Declaration level carrying the duplicate
        level: &'static str,
    },

    /// No activator has been compiled for the requested type id
    #[error("no activator compiled for type {type_id:?}")]
    ActivatorUnavailable {
        /// The erased type id that was requested
        type_id: TypeId,
    },

    /// An activator was asked to produce a type it was not compiled for
    #[error("activator for '{actual}' cannot produce '{expected}'")]
    ActivatorMismatch {
        /// Type the caller asked for
        expected: &'static str,
        /// Type the activator constructs
        actual: &'static str,
    },

    /// A compiled binding was applied to an instance of a different type
    #[error("compiled binding for member '{member}' of '{type_name}' was applied to a different type")]
    InstanceTypeMismatch {
        /// Type the binding was compiled for
        type_name: &'static str,
        /// Member the binding targets
        member: &'static str,
    },
}
