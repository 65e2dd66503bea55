// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Explainability helpers for notification passes.
//!
//! The core graph intentionally does not store provenance for why a
//! reference was notified. For many embedders it is useful to answer
//! questions like: "why did this binding go stale?".
//!
//! This module provides a minimal, additive hook:
//! [`ReferenceGraph::notify_traced`](crate::ReferenceGraph::notify_traced)
//! and the traced variants of the mutation entry points, plus a small
//! recorder, [`NotifyRecorder`], which stores the notification log of a
//! pass. If you need aggregate statistics or sampling, implement
//! [`NotifyTrace`] yourself.

use alloc::vec::Vec;

use taproot_heap::{NameId, ObjectId};

use crate::id::RefId;

/// Why a reference was notified.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NotifyReason {
    /// The host called `notify` on this reference directly.
    Explicit,
    /// A root reference was swapped via `update`.
    RootUpdate,
    /// The parent's chain-walk reached this reference.
    Parent {
        /// The upstream reference whose notification propagated here.
        parent: RefId,
    },
    /// A tracked property mutation (`set_property` / `notify_property`).
    Mutation {
        /// The mutated object.
        object: ObjectId,
        /// The mutated property.
        property: NameId,
    },
}

/// A callback sink for notification tracing.
pub trait NotifyTrace {
    /// Called once per reference visited during a notification pass, in
    /// visit order.
    fn notified(&mut self, node: RefId, reason: NotifyReason);
}

/// Records every notification of a pass, in visit order.
#[derive(Debug, Default, Clone)]
pub struct NotifyRecorder {
    events: Vec<(RefId, NotifyReason)>,
}

impl NotifyRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Returns the recorded events in visit order.
    #[must_use]
    pub fn events(&self) -> &[(RefId, NotifyReason)] {
        &self.events
    }

    /// Returns the number of times `node` was notified.
    #[must_use]
    pub fn count_for(&self, node: RefId) -> usize {
        self.events.iter().filter(|(n, _)| *n == node).count()
    }

    /// Returns the recorded reason for the first notification of `node`.
    #[must_use]
    pub fn first_reason(&self, node: RefId) -> Option<NotifyReason> {
        self.events
            .iter()
            .find(|(n, _)| *n == node)
            .map(|(_, r)| *r)
    }
}

impl NotifyTrace for NotifyRecorder {
    fn notified(&mut self, node: RefId, reason: NotifyReason) {
        self.events.push((node, reason));
    }
}
