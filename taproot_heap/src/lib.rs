// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Taproot Heap: object arena and dynamic value model for the reference graph.
//!
//! This crate provides the object side of Taproot:
//!
//! - **Object arena** ([`Heap`]): Allocates dynamic records into slots and
//!   hands out compact [`ObjectId`] handles (index + generation). Each live
//!   object also carries a monotonically increasing [`Guid`] that is never
//!   reused, so side tables can be keyed by identity without relying on a
//!   garbage collector.
//! - **Value model** ([`Value`]): A small dynamic value type (null, booleans,
//!   numbers, strings, object handles) with explicit identity comparison
//!   ([`Value::identity_eq`]) for cache-invalidation decisions.
//! - **Name interning** ([`NameTable`], [`NameId`]): Property names are
//!   interned once so that field maps, observer tables, and memoized child
//!   maps are keyed by compact ids rather than strings.
//! - **Capability traits** ([`PropertySource`], [`PropertySink`]): The
//!   read/write seam between the reference graph and whatever actually owns
//!   the data. [`Heap`] is the canonical implementation; embedders with their
//!   own data model can implement the traits directly.
//!
//! ## Quick Start
//!
//! ```rust
//! use taproot_heap::{Heap, PropertySource, Value};
//!
//! let mut heap = Heap::new();
//! let x = heap.intern("x");
//!
//! let obj = heap.alloc();
//! heap.set(obj, x, Value::Int(1));
//!
//! assert_eq!(heap.read(obj, x), Value::Int(1));
//!
//! // Missing fields read as null rather than failing.
//! let y = heap.intern("y");
//! assert_eq!(heap.read(obj, y), Value::Null);
//!
//! // Freeing the slot invalidates the handle.
//! heap.free(obj);
//! assert!(!heap.contains(obj));
//! assert_eq!(heap.read(obj, x), Value::Null);
//! ```
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod handle;
mod heap;
mod name;
mod source;
mod value;

pub use handle::{Guid, ObjectId};
pub use heap::Heap;
pub use name::{NameId, NameTable};
pub use source::{PropertySink, PropertySource};
pub use value::Value;
