// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object meta records and the meta side-table.
//!
//! A [`Meta`] record tracks everything the graph knows about one object:
//! which path references are currently reading through each of its
//! properties (the observer sets), any per-property reference-type
//! overrides, and the object's lazily created singleton root reference.
//!
//! The [`MetaTable`] is the side-table mapping [`ObjectId`] to [`Meta`]. It
//! is owned by the graph, not process-wide, and is evicted explicitly when
//! the host frees an arena slot.
//!
//! ## Sealing
//!
//! An override map can be *sealed*: frozen into a shared, reference-counted
//! read-only map that many objects of the same shape reuse. Registering an
//! override on a sealed record fails with
//! [`SealedMetaError`](crate::SealedMetaError) instead of mutating shared
//! state.

use alloc::sync::Arc;
use smallvec::SmallVec;

use hashbrown::{HashMap, HashSet};
use taproot_heap::{NameId, ObjectId};

use crate::accessor::ReferenceFactory;
use crate::id::RefId;

/// A frozen, shareable reference-type override map.
pub type SharedOverrides = Arc<HashMap<NameId, ReferenceFactory>>;

#[derive(Debug, Clone)]
enum Overrides {
    Open(HashMap<NameId, ReferenceFactory>),
    Sealed(SharedOverrides),
}

impl Overrides {
    fn get(&self, property: NameId) -> Option<&ReferenceFactory> {
        match self {
            Self::Open(map) => map.get(&property),
            Self::Sealed(map) => map.get(&property),
        }
    }
}

/// Per-object side record: observer sets, overrides, and the singleton root.
#[derive(Debug, Default)]
pub struct Meta {
    /// Path references currently depending on each literal property.
    observers: HashMap<NameId, HashSet<RefId>>,
    overrides: Option<Overrides>,
    root: Option<RefId>,
}

impl Meta {
    /// Creates an empty, unsealed meta record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a meta record whose override map is a shared sealed map.
    #[must_use]
    pub fn sealed_with(overrides: SharedOverrides) -> Self {
        Self {
            observers: HashMap::new(),
            overrides: Some(Overrides::Sealed(overrides)),
            root: None,
        }
    }

    /// Returns `true` if the override map is sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        matches!(self.overrides, Some(Overrides::Sealed(_)))
    }

    /// Returns the reference-type override for `property`, if any.
    #[must_use]
    pub fn reference_type(&self, property: NameId) -> Option<ReferenceFactory> {
        self.overrides
            .as_ref()
            .and_then(|o| o.get(property))
            .cloned()
    }

    /// Registers a reference-type override for `property`.
    ///
    /// Returns `false` if the record is sealed; the override is not applied.
    pub fn set_reference_type(&mut self, property: NameId, factory: ReferenceFactory) -> bool {
        match &mut self.overrides {
            Some(Overrides::Sealed(_)) => false,
            Some(Overrides::Open(map)) => {
                map.insert(property, factory);
                true
            }
            None => {
                let mut map = HashMap::new();
                map.insert(property, factory);
                self.overrides = Some(Overrides::Open(map));
                true
            }
        }
    }

    /// Freezes the override map and returns the shared copy.
    ///
    /// Sealing an already-sealed record returns the existing shared map.
    pub fn seal(&mut self) -> SharedOverrides {
        match self.overrides.take() {
            Some(Overrides::Sealed(shared)) => {
                self.overrides = Some(Overrides::Sealed(Arc::clone(&shared)));
                shared
            }
            Some(Overrides::Open(map)) => {
                let shared: SharedOverrides = Arc::new(map);
                self.overrides = Some(Overrides::Sealed(Arc::clone(&shared)));
                shared
            }
            None => {
                let shared: SharedOverrides = Arc::new(HashMap::new());
                self.overrides = Some(Overrides::Sealed(Arc::clone(&shared)));
                shared
            }
        }
    }

    /// Returns the singleton root reference for this object, if created.
    #[must_use]
    pub fn root(&self) -> Option<RefId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: RefId) {
        self.root = Some(root);
    }

    pub(crate) fn clear_root(&mut self) {
        self.root = None;
    }

    /// Records that `observer` is reading through `property`.
    pub(crate) fn add_observer(&mut self, property: NameId, observer: RefId) {
        self.observers.entry(property).or_default().insert(observer);
    }

    /// Removes `observer` from `property`'s observer set.
    pub(crate) fn remove_observer(&mut self, property: NameId, observer: RefId) {
        if let Some(set) = self.observers.get_mut(&property) {
            set.remove(&observer);
            if set.is_empty() {
                self.observers.remove(&property);
            }
        }
    }

    /// Copies the current observer set for `property` into a snapshot.
    ///
    /// The snapshot order is not specified; the set is consulted at a single
    /// consistent point before any observer is notified.
    pub(crate) fn observers_snapshot(&self, property: NameId) -> SmallVec<[RefId; 4]> {
        self.observers
            .get(&property)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Copies every observer across all properties into a snapshot.
    ///
    /// Used on eviction, when the whole record is being dropped and every
    /// reference still reading through the object must be told to re-read.
    pub(crate) fn observers_flat(&self) -> SmallVec<[RefId; 8]> {
        self.observers
            .values()
            .flat_map(|set| set.iter().copied())
            .collect()
    }

    /// Returns the number of properties with at least one observer.
    #[must_use]
    pub fn observed_properties(&self) -> usize {
        self.observers.len()
    }
}

/// Side-table mapping objects to their [`Meta`] records.
#[derive(Debug, Default)]
pub struct MetaTable {
    records: HashMap<ObjectId, Meta>,
}

impl MetaTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of objects with a meta record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no object has a meta record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the meta record for `object`, if one exists.
    #[must_use]
    pub fn get(&self, object: ObjectId) -> Option<&Meta> {
        self.records.get(&object)
    }

    pub(crate) fn get_mut(&mut self, object: ObjectId) -> Option<&mut Meta> {
        self.records.get_mut(&object)
    }

    /// Returns the meta record for `object`, creating it if absent.
    pub fn for_object(&mut self, object: ObjectId) -> &mut Meta {
        self.records.entry(object).or_default()
    }

    /// Installs a meta record whose overrides are a shared sealed map.
    ///
    /// Replaces any existing record for `object`.
    pub fn insert_sealed(&mut self, object: ObjectId, overrides: SharedOverrides) {
        self.records.insert(object, Meta::sealed_with(overrides));
    }

    /// Removes and returns the meta record for `object`.
    pub fn remove(&mut self, object: ObjectId) -> Option<Meta> {
        self.records.remove(&object)
    }
}
