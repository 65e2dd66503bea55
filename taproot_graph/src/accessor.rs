// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The inner-accessor seam: how a path reference actually reads a property.
//!
//! When a path reference resolves, it reads `property` off its parent's
//! current object through an [`Accessor`]. The default, [`DirectAccessor`],
//! is an uncached read-through. Hosts can register a [`ReferenceType`]
//! factory on an object's meta record to substitute a custom accessor for a
//! given property (a computed/derived value, for example); the custom
//! accessor participates in the same cache/notify protocol as a plain
//! property.

use alloc::boxed::Box;
use alloc::sync::Arc;

use taproot_heap::{NameId, ObjectId, PropertySource, Value};

/// Reads one property of one object.
///
/// Accessors are stateful (`&mut self`) so that derived accessors can keep
/// per-instance scratch, and so tests can count reads. An accessor is built
/// at most once per distinct parent-value identity; caching of the *result*
/// is the owning path reference's job, not the accessor's.
pub trait Accessor {
    /// Reads the current value of `property` on `object` from `source`.
    ///
    /// Called on every recompute; implementations should read live state and
    /// must not cache.
    fn read(&mut self, source: &dyn PropertySource, object: ObjectId, property: NameId) -> Value;
}

impl core::fmt::Debug for dyn Accessor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn Accessor")
    }
}

/// The default accessor: a direct, uncached property read.
///
/// Always "dirty" in the sense that every read goes back to the source; the
/// underlying object is not instrumented, so there is nothing to cache here.
#[derive(Copy, Clone, Debug, Default)]
pub struct DirectAccessor;

impl Accessor for DirectAccessor {
    #[inline]
    fn read(&mut self, source: &dyn PropertySource, object: ObjectId, property: NameId) -> Value {
        source.read(object, property)
    }
}

/// Factory for custom per-property accessors.
///
/// Registered via
/// [`ReferenceGraph::try_set_reference_type`](crate::ReferenceGraph::try_set_reference_type);
/// instantiated lazily when a path reference first resolves against an
/// object, and again whenever the parent value changes identity.
pub trait ReferenceType {
    /// Builds an accessor for `property` on `object`.
    fn instantiate(&self, object: ObjectId, property: NameId) -> Box<dyn Accessor>;
}

impl core::fmt::Debug for dyn ReferenceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn ReferenceType")
    }
}

impl<F> ReferenceType for F
where
    F: Fn(ObjectId, NameId) -> Box<dyn Accessor>,
{
    fn instantiate(&self, object: ObjectId, property: NameId) -> Box<dyn Accessor> {
        self(object, property)
    }
}

/// A shared, clonable reference-type factory.
pub type ReferenceFactory = Arc<dyn ReferenceType>;
