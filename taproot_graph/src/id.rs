// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference node handles.

use core::fmt;

/// A handle to a node in a [`ReferenceGraph`](crate::ReferenceGraph).
///
/// Like object handles, reference handles are `(index, generation)` pairs
/// into a slab. A handle whose generation no longer matches is *stale*:
/// reads through it yield null, and all other operations on it are no-ops.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId {
    index: u32,
    generation: u32,
}

impl RefId {
    /// Creates a reference handle from raw parts.
    ///
    /// This is typically produced by the graph rather than constructed
    /// directly. Forged handles are harmless; they are simply stale.
    #[must_use]
    #[inline]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slab index of this handle.
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

impl fmt::Debug for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefId({}v{})", self.index, self.generation)
    }
}
