// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object handles and identity ids.

use core::fmt;

/// A handle to an object slot in a [`Heap`](crate::Heap).
///
/// Handles are `(index, generation)` pairs. The index addresses a slot in the
/// arena; the generation distinguishes the current occupant from earlier
/// occupants of a reused slot. A handle whose generation does not match the
/// slot's current generation is *stale*: reads through it yield
/// [`Value::Null`](crate::Value::Null) and writes are ignored.
///
/// # Example
///
/// ```rust
/// use taproot_heap::Heap;
///
/// let mut heap = Heap::new();
/// let a = heap.alloc();
/// heap.free(a);
/// let b = heap.alloc();
///
/// // The slot was reused, but the stale handle does not alias the new object.
/// assert_ne!(a, b);
/// assert!(!heap.contains(a));
/// assert!(heap.contains(b));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Creates an object handle from raw parts.
    ///
    /// This is typically produced by [`Heap::alloc`](crate::Heap::alloc)
    /// rather than constructed directly. Forged handles are harmless: they
    /// simply read as null and refuse writes.
    #[must_use]
    #[inline]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index of this handle.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation of this handle.
    #[must_use]
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}v{})", self.index, self.generation)
    }
}

/// A monotonically increasing identity id, stable for an object's lifetime.
///
/// Unlike [`ObjectId`] slot indices, guids are never reused: two objects that
/// ever existed in the same heap always have distinct guids, even when one
/// recycled the other's slot. Literal values do not get guids; only allocated
/// objects do.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid(u64);

impl Guid {
    /// Creates a guid from its raw value.
    #[must_use]
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    #[must_use]
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guid").field(&self.0).finish()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self.0)
    }
}
