//! Per-call mapping context threaded through nested materializations

use crate::model::Record;
use std::any::Any;
use uuid::Uuid;

/// Short-lived context for one materialization call
///
/// Carries the record being mapped, an opaque handle to the originating
/// repository session, and a link to the enclosing context when a mapped
/// member is itself materialized from a related record. Created per call,
/// discarded when the call returns; never persisted.
#[derive(Clone, Copy)]
pub struct MappingContext<'a> {
    record: &'a dyn Record,
    session: &'a (dyn Any + Send + Sync),
    parent: Option<&'a MappingContext<'a>>,
}

impl<'a> MappingContext<'a> {
    /// Root context for a fresh materialization call
    pub fn root(record: &'a dyn Record, session: &'a (dyn Any + Send + Sync)) -> Self {
        Self {
            record,
            session,
            parent: None,
        }
    }

    /// The record currently being mapped
    pub fn record(&self) -> &'a dyn Record {
        self.record
    }

    /// Downcast the opaque session handle to a concrete host type
    pub fn session_as<S: Any>(&self) -> Option<&'a S> {
        self.session.downcast_ref::<S>()
    }

    /// Derive a child context for materializing a related record
    ///
    /// The session handle propagates; the child links back to `self` so
    /// nested graphs can detect cycles and report their depth.
    pub fn child<'b>(&'b self, record: &'b dyn Record) -> MappingContext<'b> {
        MappingContext {
            record,
            session: self.session,
            parent: Some(self),
        }
    }

    /// Number of enclosing contexts above this one
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent;
        while let Some(context) = current {
            depth += 1;
            current = context.parent;
        }
        depth
    }

    /// Whether a record id appears in this context or any enclosing one
    ///
    /// Lets related-object bindings break cycles instead of re-materializing
    /// a record that is already on the path.
    pub fn record_in_ancestry(&self, id: Uuid) -> bool {
        let mut current = Some(self);
        while let Some(context) = current {
            if context.record.id() == id {
                return true;
            }
            current = context.parent;
        }
        false
    }
}
