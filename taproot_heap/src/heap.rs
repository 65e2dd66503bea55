// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The object arena.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::handle::{Guid, ObjectId};
use crate::name::{NameId, NameTable};
use crate::source::{PropertySink, PropertySource};
use crate::value::Value;

/// One arena slot.
///
/// `fields` is `None` while the slot sits on the free list. The generation
/// counter is bumped on every free, so stale handles never alias the next
/// occupant.
#[derive(Debug)]
struct Slot {
    generation: u32,
    guid: Guid,
    fields: Option<HashMap<NameId, Value>>,
}

/// An arena of dynamic objects addressed by [`ObjectId`] handles.
///
/// The heap owns object storage, the property [`NameTable`], and the guid
/// counter. Freed slots go on a free list and are reused with a bumped
/// generation; guids are never reused.
///
/// # Example
///
/// ```rust
/// use taproot_heap::{Heap, Value};
///
/// let mut heap = Heap::new();
/// let name = heap.intern("name");
///
/// let obj = heap.alloc_with([("name", Value::from("ada"))]);
/// assert_eq!(heap.get(obj, name), Value::from("ada"));
///
/// heap.set(obj, name, Value::from("grace"));
/// assert_eq!(heap.get(obj, name), Value::from("grace"));
/// ```
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    names: NameTable,
    next_guid: u64,
}

impl Heap {
    /// Creates an empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty heap with pre-allocated slot capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            names: NameTable::new(),
            next_guid: 0,
        }
    }

    /// Returns the number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns `true` if no objects are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a shared reference to the property name table.
    #[must_use]
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    /// Returns a mutable reference to the property name table.
    #[must_use]
    pub fn names_mut(&mut self) -> &mut NameTable {
        &mut self.names
    }

    /// Interns a property name. See [`NameTable::intern`].
    pub fn intern(&mut self, name: &str) -> NameId {
        self.names.intern(name)
    }

    /// Allocates a new empty object and returns its handle.
    pub fn alloc(&mut self) -> ObjectId {
        let guid = Guid::from_raw(self.next_guid);
        self.next_guid += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.guid = guid;
            slot.fields = Some(HashMap::new());
            return ObjectId::from_parts(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).expect("heap exceeds u32 slots");
        self.slots.push(Slot {
            generation: 0,
            guid,
            fields: Some(HashMap::new()),
        });
        ObjectId::from_parts(index, 0)
    }

    /// Allocates an object and populates it from `(name, value)` pairs.
    ///
    /// Names are interned on the fly; this is mostly a convenience for
    /// building test fixtures and small literals.
    pub fn alloc_with<'a>(
        &mut self,
        fields: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> ObjectId {
        let id = self.alloc();
        for (name, value) in fields {
            let name = self.names.intern(name);
            self.set(id, name, value);
        }
        id
    }

    /// Frees an object, returning its slot to the free list.
    ///
    /// Returns `false` if the handle was already stale. Any side tables keyed
    /// by this handle (the reference graph's meta table in particular) should
    /// be evicted by the caller; the heap does not know about them.
    pub fn free(&mut self, object: ObjectId) -> bool {
        let Some(slot) = self.live_slot_mut(object) else {
            return false;
        };
        slot.fields = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(object.index());
        true
    }

    /// Returns `true` if `object` refers to a live object.
    #[must_use]
    pub fn contains(&self, object: ObjectId) -> bool {
        self.live_slot(object).is_some()
    }

    /// Returns the guid of a live object.
    #[must_use]
    pub fn guid(&self, object: ObjectId) -> Option<Guid> {
        self.live_slot(object).map(|slot| slot.guid)
    }

    /// Reads a field, yielding [`Value::Null`] for missing fields or stale
    /// handles.
    #[must_use]
    pub fn get(&self, object: ObjectId, property: NameId) -> Value {
        self.live_slot(object)
            .and_then(|slot| slot.fields.as_ref())
            .and_then(|fields| fields.get(&property))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Returns `true` if the field is explicitly present on the object.
    #[must_use]
    pub fn has(&self, object: ObjectId, property: NameId) -> bool {
        self.live_slot(object)
            .and_then(|slot| slot.fields.as_ref())
            .is_some_and(|fields| fields.contains_key(&property))
    }

    /// Writes a field. This is a raw write with no notification; tracked
    /// mutation goes through the reference graph.
    ///
    /// Returns `false` if the handle is stale.
    pub fn set(&mut self, object: ObjectId, property: NameId, value: Value) -> bool {
        let Some(slot) = self.live_slot_mut(object) else {
            return false;
        };
        if let Some(fields) = slot.fields.as_mut() {
            fields.insert(property, value);
            true
        } else {
            false
        }
    }

    /// Removes a field from an object.
    ///
    /// Returns the removed value, if the field was present.
    pub fn remove(&mut self, object: ObjectId, property: NameId) -> Option<Value> {
        self.live_slot_mut(object)?
            .fields
            .as_mut()?
            .remove(&property)
    }

    /// Returns an iterator over the fields of a live object.
    ///
    /// The iteration order is not specified.
    pub fn fields(&self, object: ObjectId) -> impl Iterator<Item = (NameId, &Value)> + '_ {
        self.live_slot(object)
            .and_then(|slot| slot.fields.as_ref())
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(k, v)| (*k, v)))
    }

    fn live_slot(&self, object: ObjectId) -> Option<&Slot> {
        let slot = self.slots.get(object.index() as usize)?;
        (slot.generation == object.generation() && slot.fields.is_some()).then_some(slot)
    }

    fn live_slot_mut(&mut self, object: ObjectId) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(object.index() as usize)?;
        (slot.generation == object.generation() && slot.fields.is_some()).then_some(slot)
    }
}

impl PropertySource for Heap {
    #[inline]
    fn read(&self, object: ObjectId, property: NameId) -> Value {
        self.get(object, property)
    }
}

impl PropertySink for Heap {
    #[inline]
    fn write(&mut self, object: ObjectId, property: NameId, value: Value) -> bool {
        self.set(object, property, value)
    }
}

impl fmt::Display for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Heap({} live objects)", self.len())
    }
}
