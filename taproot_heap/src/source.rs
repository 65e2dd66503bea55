// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property read/write capability traits.
//!
//! The reference graph never touches object storage directly; it reads and
//! writes through these traits. [`Heap`](crate::Heap) is the canonical
//! implementation, but embedders with their own data model (typed structs,
//! columnar stores, ...) can implement them per field instead of exposing
//! reflection-style access.

use crate::handle::ObjectId;
use crate::name::NameId;
use crate::value::Value;

/// Read access to object properties.
///
/// Reads are infallible: a missing property, a stale handle, or a property
/// of something that is not readable all yield [`Value::Null`].
pub trait PropertySource {
    /// Reads the current value of `property` on `object`.
    fn read(&self, object: ObjectId, property: NameId) -> Value;
}

/// Write access to object properties, in addition to reads.
///
/// This is a *raw* write: it does not notify anyone. Tracked mutation goes
/// through the reference graph's `set_property`, which snapshots interested
/// parties, performs the raw write through this trait, and then notifies.
pub trait PropertySink: PropertySource {
    /// Writes `value` to `property` on `object`.
    ///
    /// Returns `false` if the handle is stale and the write was dropped.
    fn write(&mut self, object: ObjectId, property: NameId, value: Value) -> bool;
}
