// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slab-backed subscriber lists.
//!
//! Every chainable reference owns a `ChainList` of its dependents. The list
//! is a slab with free-list reuse and intrusive prev/next links rather than
//! pointer-linked nodes, so that appending, removing by handle, and removing
//! entries while a notification pass is underway are all O(1) and
//! well-defined.
//!
//! Notification order is deterministic: iteration visits the most recently
//! chained dependent first. Callers that need to tolerate removals during a
//! pass should snapshot the list first (the graph does this at the start of
//! every notify pass).

use alloc::vec::Vec;
use core::fmt;

/// Sentinel for "no link".
const NIL: u32 = u32::MAX;

/// A handle to one subscription in a [`ChainList`].
///
/// Removing through a stale handle (already removed, or the slot was reused)
/// is a no-op, which makes double-destroy safe by construction.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    slot: u32,
    generation: u32,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription({}v{})", self.slot, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    generation: u32,
    /// `None` while the slot sits on the free list.
    item: Option<T>,
    prev: u32,
    next: u32,
}

/// An ordered list of dependents with O(1) append and O(1) removal by handle.
///
/// # Example
///
/// ```rust
/// use taproot_graph::ChainList;
///
/// let mut list = ChainList::new();
/// let a = list.push(1_u32);
/// let _b = list.push(2_u32);
///
/// // Most recently chained first.
/// let order: Vec<_> = list.iter().collect();
/// assert_eq!(order, vec![2, 1]);
///
/// assert!(list.remove(a));
/// assert!(!list.remove(a)); // double-remove is a no-op
/// ```
#[derive(Debug, Clone)]
pub struct ChainList<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    head: u32,
    len: usize,
}

impl<T: Copy> Default for ChainList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> ChainList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            head: NIL,
            len: 0,
        }
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no live subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `item` and returns its [`Subscription`] handle.
    ///
    /// New entries are linked at the front, so they are visited first on the
    /// next notification pass.
    pub fn push(&mut self, item: T) -> Subscription {
        let slot = if let Some(slot) = self.free.pop() {
            let entry = &mut self.entries[slot as usize];
            entry.item = Some(item);
            entry.prev = NIL;
            entry.next = self.head;
            slot
        } else {
            let slot = u32::try_from(self.entries.len()).expect("chain list exceeds u32 slots");
            self.entries.push(Entry {
                generation: 0,
                item: Some(item),
                prev: NIL,
                next: self.head,
            });
            slot
        };

        if self.head != NIL {
            self.entries[self.head as usize].prev = slot;
        }
        self.head = slot;
        self.len += 1;

        Subscription {
            slot,
            generation: self.entries[slot as usize].generation,
        }
    }

    /// Removes the subscription, relinking its neighbors.
    ///
    /// Returns `false` if the handle is stale (already removed or reused).
    pub fn remove(&mut self, subscription: Subscription) -> bool {
        let idx = subscription.slot as usize;
        let Some(entry) = self.entries.get(idx) else {
            return false;
        };
        if entry.generation != subscription.generation || entry.item.is_none() {
            return false;
        }

        let (prev, next) = (entry.prev, entry.next);
        if prev != NIL {
            self.entries[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.entries[next as usize].prev = prev;
        }

        let entry = &mut self.entries[idx];
        entry.item = None;
        entry.generation = entry.generation.wrapping_add(1);
        entry.prev = NIL;
        entry.next = NIL;
        self.free.push(subscription.slot);
        self.len -= 1;
        true
    }

    /// Removes all subscriptions.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free.clear();
        self.head = NIL;
        self.len = 0;
    }

    /// Iterates the live items, most recently chained first.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        ChainIter {
            list: self,
            cursor: self.head,
        }
    }

    /// Copies the live items into `out`, most recently chained first.
    ///
    /// Used to snapshot the dependent set before a notification pass, so the
    /// pass is insulated from removals performed by notified dependents.
    pub fn snapshot_into(&self, out: &mut Vec<T>) {
        out.extend(self.iter());
    }
}

struct ChainIter<'a, T> {
    list: &'a ChainList<T>,
    cursor: u32,
}

impl<T: Copy> Iterator for ChainIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let entry = &self.list.entries[self.cursor as usize];
        self.cursor = entry.next;
        entry.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn default_is_empty() {
        let list: ChainList<u32> = ChainList::default();
        assert!(list.is_empty());
        assert_eq!(list.iter().count(), 0);
    }

    #[test]
    fn push_iterates_most_recent_first() {
        let mut list = ChainList::new();
        list.push(1_u32);
        list.push(2_u32);
        list.push(3_u32);

        let order: Vec<_> = list.iter().collect();
        assert_eq!(order, vec![3, 2, 1]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn remove_middle_relinks() {
        let mut list = ChainList::new();
        list.push(1_u32);
        let b = list.push(2_u32);
        list.push(3_u32);

        assert!(list.remove(b));
        let order: Vec<_> = list.iter().collect();
        assert_eq!(order, vec![3, 1]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_head_and_tail() {
        let mut list = ChainList::new();
        let a = list.push(1_u32);
        list.push(2_u32);
        let c = list.push(3_u32);

        assert!(list.remove(c)); // head
        assert!(list.remove(a)); // tail
        let order: Vec<_> = list.iter().collect();
        assert_eq!(order, vec![2]);
    }

    #[test]
    fn double_remove_is_noop() {
        let mut list = ChainList::new();
        let a = list.push(1_u32);

        assert!(list.remove(a));
        assert!(!list.remove(a));
        assert!(list.is_empty());
    }

    #[test]
    fn reused_slot_does_not_honor_stale_handle() {
        let mut list = ChainList::new();
        let a = list.push(1_u32);
        assert!(list.remove(a));

        // Reuses a's slot with a new generation.
        let b = list.push(2_u32);
        assert!(!list.remove(a));
        assert_eq!(list.iter().count(), 1);
        assert!(list.remove(b));
    }

    #[test]
    fn removal_during_snapshot_pass() {
        // A dependent that unsubscribes itself while being notified must not
        // disturb the rest of the pass when the pass runs off a snapshot.
        let mut list = ChainList::new();
        let a = list.push(1_u32);
        let b = list.push(2_u32);
        list.push(3_u32);

        let mut snapshot = Vec::new();
        list.snapshot_into(&mut snapshot);
        assert_eq!(snapshot, vec![3, 2, 1]);

        for item in snapshot {
            // "2" removes itself, and also removes a not-yet-visited sibling.
            if item == 2 {
                assert!(list.remove(b));
                assert!(list.remove(a));
            }
        }
        let order: Vec<_> = list.iter().collect();
        assert_eq!(order, vec![3]);
    }

    #[test]
    fn clear_resets_everything() {
        let mut list = ChainList::new();
        list.push(1_u32);
        list.push(2_u32);

        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.iter().count(), 0);

        list.push(9_u32);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![9]);
    }
}
