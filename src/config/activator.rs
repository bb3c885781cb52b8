// Copyright 2024 Itemcast Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Compiled activators: constructor closures built once per type
//!
//! Generic construction through an erased type id is the slow path the
//! surrounding benchmarks exist to catch. The cache compiles a monomorphized
//! factory closure the first time a type is activated and hands out clones of
//! that closure ever after, so each materialization pays one indirect call.

use crate::config::declare::Mapped;
use crate::config::{ConfigurationError, ConfigurationResult};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A compiled zero-argument factory bound to one type
///
/// Cheap to clone and safe to invoke concurrently; every invocation produces
/// a fresh, independent instance.
#[derive(Clone)]
pub struct Activator {
    construct: Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>,
    type_name: &'static str,
}

impl Activator {
    pub(crate) fn compile<T: Mapped>() -> Self {
        Self {
            construct: Arc::new(|| Box::new(T::default())),
            type_name: T::type_name(),
        }
    }

    /// Construct a bare instance behind an erased box
    pub fn instantiate(&self) -> Box<dyn Any + Send> {
        (self.construct)()
    }

    /// Construct a bare instance and unbox it as `T`
    pub fn instantiate_as<T: 'static>(&self) -> ConfigurationResult<T> {
        self.instantiate()
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| ConfigurationError::ActivatorMismatch {
                expected: std::any::type_name::<T>(),
                actual: self.type_name,
            })
    }

    /// Name of the type this activator constructs
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Activator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activator")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Process-wide cache of compiled activators, keyed by type
///
/// First use of a type compiles its activator under the map's per-key entry
/// guard, so concurrent first users serialize on the build and observe the
/// same compiled closure. Entries are never evicted.
#[derive(Debug, Default)]
pub struct ActivatorCache {
    activators: DashMap<TypeId, Activator>,
}

impl ActivatorCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the activator for `T`, compiling it on first use
    pub fn activator<T: Mapped>(&self) -> Activator {
        let entry = self.activators.entry(TypeId::of::<T>()).or_insert_with(|| {
            log::debug!("compiling activator for '{}'", T::type_name());
            Activator::compile::<T>()
        });
        entry.value().clone()
    }

    /// Look up an already-compiled activator by erased type id
    ///
    /// Unlike [`activator`](Self::activator) this path cannot compile: a
    /// type that was never seeded has no usable constructor here, which is
    /// surfaced as [`ConfigurationError::ActivatorUnavailable`].
    pub fn get(&self, type_id: TypeId) -> ConfigurationResult<Activator> {
        self.activators
            .get(&type_id)
            .map(|entry| entry.value().clone())
            .ok_or(ConfigurationError::ActivatorUnavailable { type_id })
    }

    /// Number of compiled activators
    pub fn len(&self) -> usize {
        self.activators.len()
    }

    /// Whether nothing has been compiled yet
    pub fn is_empty(&self) -> bool {
        self.activators.is_empty()
    }
}
