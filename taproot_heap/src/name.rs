// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property-name interning.
//!
//! Field maps, observer tables, and memoized child maps are all keyed by
//! property name. Interning names once into a compact [`NameId`] keeps those
//! hot maps keyed by a `Copy` integer instead of an owned string, and makes
//! "same property?" checks a single integer compare.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::hash::BuildHasher;

use hashbrown::DefaultHashBuilder;
use hashbrown::HashMap;

/// A compact, interned property name.
///
/// Ids are assigned densely from zero in interning order, so they can also be
/// used to index side tables.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NameId(u32);

impl NameId {
    /// Returns this id as a `usize` index (for tables keyed by name ids).
    #[must_use]
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw numeric id.
    #[must_use]
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NameId").field(&self.0).finish()
    }
}

/// Interns property names into compact [`NameId`] handles.
///
/// Each distinct name is stored exactly once. Lookups use a hash-bucket index
/// (hash -> small list of candidate ids) so no duplicate copies of the name
/// are kept for the reverse map.
///
/// # Example
///
/// ```rust
/// use taproot_heap::NameTable;
///
/// let mut names = NameTable::new();
/// let x = names.intern("x");
/// let x2 = names.intern("x");
/// let y = names.intern("y");
///
/// assert_eq!(x, x2);
/// assert_ne!(x, y);
/// assert_eq!(names.resolve(x), Some("x"));
/// assert_eq!(names.lookup("y"), Some(y));
/// assert_eq!(names.lookup("z"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: Vec<Box<str>>,
    buckets: HashMap<u64, Vec<NameId>>,
    build_hasher: DefaultHashBuilder,
}

impl NameTable {
    /// Creates an empty name table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the table contains no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the name for an interned id, if the id is in-range.
    #[must_use]
    pub fn resolve(&self, id: NameId) -> Option<&str> {
        self.names.get(id.as_usize()).map(AsRef::as_ref)
    }

    /// Returns the id for `name` without interning it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<NameId> {
        let hash = self.build_hasher.hash_one(name);
        let ids = self.buckets.get(&hash)?;
        ids.iter()
            .copied()
            .find(|id| &*self.names[id.as_usize()] == name)
    }

    /// Interns `name` and returns its [`NameId`].
    ///
    /// If an equal name was already interned, the existing id is returned.
    pub fn intern(&mut self, name: &str) -> NameId {
        let hash = self.build_hasher.hash_one(name);
        if let Some(ids) = self.buckets.get(&hash) {
            for &id in ids {
                if &*self.names[id.as_usize()] == name {
                    return id;
                }
            }
        }

        let id = NameId(u32::try_from(self.names.len()).expect("too many interned names (u32)"));
        self.names.push(Box::from(name));
        self.buckets.entry(hash).or_default().push(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_duplicates_to_same_id() {
        let mut names = NameTable::new();
        let a0 = names.intern("a");
        let a1 = names.intern("a");
        let b = names.intern("b");

        assert_eq!(a0, a1);
        assert_ne!(a0, b);
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn resolve_and_lookup() {
        let mut names = NameTable::new();
        let a = names.intern("alpha");

        assert_eq!(names.resolve(a), Some("alpha"));
        assert_eq!(names.lookup("alpha"), Some(a));
        assert_eq!(names.lookup("beta"), None);
        assert_eq!(names.resolve(NameId(99)), None);
    }

    #[test]
    fn ids_are_dense() {
        let mut names = NameTable::new();
        let a = names.intern("a");
        let b = names.intern("b");
        let c = names.intern("c");

        assert_eq!(a.as_usize(), 0);
        assert_eq!(b.as_usize(), 1);
        assert_eq!(c.as_usize(), 2);
    }
}
