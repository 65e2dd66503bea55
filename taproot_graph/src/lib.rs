// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Taproot Graph: a dependency-tracked reference and invalidation graph.
//!
//! This crate implements push-pull reactivity over the objects of a
//! [`taproot_heap`] arena (or any [`PropertySource`] the host provides):
//! notifications are *pushed* eagerly through the graph, but values are
//! *pulled* lazily and cached until the next notification.
//!
//! - **Reference graph** ([`ReferenceGraph`]): Owns all reference nodes and
//!   orchestrates reads, caching, and propagation. References are addressed
//!   by compact [`RefId`] handles (index + generation).
//! - **Roots and paths**: A root reference wraps an externally-owned value
//!   and is never dirty; path references hang off it one property hop at a
//!   time, memoized per `(parent, property)`, each with a transient value
//!   cache that is dropped on notification.
//! - **Chaining** ([`ChainList`], [`Subscription`]): Dependents subscribe to
//!   an upstream reference and are notified most recently chained first.
//!   Forked references ([`ReferenceGraph::fork`]) expose a plain dirty flag
//!   for consumers outside the chain protocol; sinks
//!   ([`ReferenceGraph::observe`]) invoke a host callback.
//! - **Accessors** ([`Accessor`], [`ReferenceType`]): The seam through which
//!   a path reference actually reads a property; hosts register factories on
//!   an object's meta record to substitute computed/derived reads.
//! - **Meta side-table** ([`Meta`]): Per-object observer sets, sealable
//!   reference-type overrides, and the object's singleton root reference.
//! - **Mutation entry points** ([`ReferenceGraph::set_property`],
//!   [`ReferenceGraph::notify_property`]): Tracked writes and out-of-band
//!   mutation announcements that invalidate exactly the references reading
//!   through the mutated property.
//! - **Tracing** ([`NotifyTrace`], [`NotifyRecorder`]): Optional hooks that
//!   record why each reference was notified during a pass.
//!
//! ## Quick Start
//!
//! ```rust
//! use taproot_graph::ReferenceGraph;
//! use taproot_heap::{Heap, Value};
//!
//! let mut heap = Heap::new();
//! let user = heap.alloc_with([("name", Value::from("ada"))]);
//! let account = heap.alloc_with([("user", Value::Object(user))]);
//! let name = heap.intern("name");
//!
//! let mut graph = ReferenceGraph::new();
//! let root = graph.root_for(account);
//! let name_ref = graph.path(root, "user.name", heap.names_mut());
//!
//! // Pulled lazily, cached until invalidated.
//! assert_eq!(graph.value(name_ref, &heap), Value::from("ada"));
//!
//! // A tracked write invalidates exactly the references that read through it.
//! graph.set_property(&mut heap, user, name, Value::from("grace"));
//! assert_eq!(graph.value(name_ref, &heap), Value::from("grace"));
//! ```
//!
//! ## Execution model
//!
//! The graph is single-threaded and synchronous. A notification pass runs to
//! completion before the triggering call returns, visiting memoized children
//! depth-first and then directly chained subscribers. Subscriber lists are
//! snapshotted at the start of each pass, so notified dependents may remove
//! themselves (or siblings) mid-pass without disturbing it.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod accessor;
mod chain;
mod error;
mod graph;
mod id;
mod meta;
mod trace;

pub use accessor::{Accessor, DirectAccessor, ReferenceFactory, ReferenceType};
pub use chain::{ChainList, Subscription};
pub use error::SealedMetaError;
pub use graph::ReferenceGraph;
pub use id::RefId;
pub use meta::{Meta, MetaTable, SharedOverrides};
pub use trace::{NotifyRecorder, NotifyReason, NotifyTrace};
