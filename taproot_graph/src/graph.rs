// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The reference graph: roots, memoized path references, and propagation.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;

use taproot_heap::{NameId, NameTable, ObjectId, PropertySink, PropertySource, Value};

use crate::accessor::{Accessor, DirectAccessor, ReferenceFactory};
use crate::chain::{ChainList, Subscription};
use crate::error::SealedMetaError;
use crate::meta::{Meta, MetaTable, SharedOverrides};
use crate::id::RefId;
use crate::trace::{NotifyReason, NotifyTrace};

/// A root reference: wraps an externally-owned value, never dirty.
#[derive(Debug)]
struct RootNode {
    value: Value,
    /// Set when this is the meta-owned singleton root for an object.
    object: Option<ObjectId>,
    /// Memoized direct children, by property.
    chains: HashMap<NameId, RefId>,
    dependents: ChainList<RefId>,
}

/// A path reference: one property hop from a parent reference, with a
/// transient cache.
#[derive(Debug)]
struct PathNode {
    parent: RefId,
    property: NameId,
    /// `None` is the empty-cache sentinel.
    cache: Option<Value>,
    /// The parent value observed on the last resolve; identity changes here
    /// force the inner accessor to be rebuilt.
    seen_parent: Option<Value>,
    accessor: Option<Box<dyn Accessor>>,
    /// The object whose meta observer set currently holds this reference.
    registered_on: Option<ObjectId>,
    chains: HashMap<NameId, RefId>,
    dependents: ChainList<RefId>,
}

/// A forked reference: a leaf consumer exposing a plain dirty flag.
#[derive(Debug)]
struct ForkNode {
    upstream: RefId,
    dirty: bool,
    subscription: Option<Subscription>,
}

/// A host adapter: a callback invoked on every notification.
struct SinkNode {
    upstream: RefId,
    callback: Box<dyn FnMut(RefId)>,
    subscription: Option<Subscription>,
}

impl fmt::Debug for SinkNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkNode")
            .field("upstream", &self.upstream)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum Node {
    Root(RootNode),
    Path(PathNode),
    Fork(ForkNode),
    Sink(SinkNode),
}

#[derive(Debug)]
struct NodeSlot {
    generation: u32,
    node: Option<Node>,
}

/// A dependency-tracked reference/invalidation graph.
///
/// The graph owns all reference nodes (in a slab keyed by [`RefId`]) and the
/// per-object [`Meta`] side-table. Consumers obtain a root reference for an
/// object, derive path references by walking property names, and read
/// `value()` to get current data, computed and cached on demand. Mutations
/// performed through [`set_property`](Self::set_property) (or announced via
/// [`notify_property`](Self::notify_property)) invalidate exactly the cached
/// references that read through the mutated property, plus their downstream
/// subscribers.
///
/// Execution is single-threaded and synchronous: all propagation triggered
/// by a notification runs to completion before the triggering call returns.
/// Subscriber lists are snapshotted at the start of each notification pass,
/// so a notified dependent may freely remove itself (or any sibling) without
/// disturbing the pass.
///
/// # Example
///
/// ```rust
/// use taproot_graph::ReferenceGraph;
/// use taproot_heap::{Heap, Value};
///
/// let mut heap = Heap::new();
/// let x = heap.intern("x");
/// let y = heap.intern("y");
///
/// let inner = heap.alloc_with([("y", Value::Int(1))]);
/// let outer = heap.alloc_with([("x", Value::Object(inner))]);
///
/// let mut graph = ReferenceGraph::new();
/// let root = graph.root_for(outer);
/// let x_ref = graph.get(root, x);
/// let y_ref = graph.get(x_ref, y);
///
/// assert_eq!(graph.value(y_ref, &heap), Value::Int(1));
///
/// // Tracked mutation invalidates the cached path.
/// graph.set_property(&mut heap, inner, y, Value::Int(2));
/// assert_eq!(graph.value(y_ref, &heap), Value::Int(2));
/// ```
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    slots: Vec<NodeSlot>,
    free: Vec<u32>,
    meta: MetaTable,
    live: usize,
}

impl ReferenceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live reference nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the graph has no live reference nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the total number of live chain subscriptions.
    ///
    /// Useful for diagnosing dangling-subscription leaks: a forked or
    /// observed reference that is never destroyed keeps its subscription
    /// alive and is over-notified forever.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|slot| slot.node.as_ref())
            .map(|node| match node {
                Node::Root(r) => r.dependents.len(),
                Node::Path(p) => p.dependents.len(),
                Node::Fork(_) | Node::Sink(_) => 0,
            })
            .sum()
    }

    /// Returns the number of objects with a meta record.
    #[must_use]
    pub fn tracked_objects(&self) -> usize {
        self.meta.len()
    }

    /// Returns the meta record for `object`, if one exists.
    #[must_use]
    pub fn meta(&self, object: ObjectId) -> Option<&Meta> {
        self.meta.get(object)
    }

    // -------------------------------------------------------------------------
    // Construction and traversal
    // -------------------------------------------------------------------------

    /// Returns the singleton root reference for `object`, creating it if
    /// needed.
    ///
    /// The root is recorded in the object's meta record, so repeated calls
    /// return the same reference, and
    /// [`notify_property`](Self::notify_property) can find the subtree.
    pub fn root_for(&mut self, object: ObjectId) -> RefId {
        if let Some(root) = self.meta.get(object).and_then(Meta::root)
            && self.node(root).is_some()
        {
            return root;
        }
        let root = self.alloc_node(Node::Root(RootNode {
            value: Value::Object(object),
            object: Some(object),
            chains: HashMap::new(),
            dependents: ChainList::new(),
        }));
        self.meta.for_object(object).set_root(root);
        root
    }

    /// Creates a standalone root reference wrapping `value`.
    ///
    /// Unlike [`root_for`](Self::root_for), this root is not recorded in any
    /// meta record; it is only reachable through the returned handle.
    pub fn new_root(&mut self, value: Value) -> RefId {
        self.alloc_node(Node::Root(RootNode {
            value,
            object: None,
            chains: HashMap::new(),
            dependents: ChainList::new(),
        }))
    }

    /// Returns the memoized child reference for `property`, creating it if
    /// needed.
    ///
    /// Calling `get` twice with the same arguments returns the identical
    /// reference, so consumers that store subscriptions can rely on
    /// handle-equality stability.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a live root or path reference.
    pub fn get(&mut self, parent: RefId, property: NameId) -> RefId {
        if let Some(existing) = self.chain_for(parent, property) {
            return existing;
        }
        match self.node(parent) {
            Some(Node::Root(_) | Node::Path(_)) => {}
            _ => panic!("get requires a live root or path reference"),
        }

        let child = self.alloc_node(Node::Path(PathNode {
            parent,
            property,
            cache: None,
            seen_parent: None,
            accessor: None,
            registered_on: None,
            chains: HashMap::new(),
            dependents: ChainList::new(),
        }));
        match self.node_mut(parent) {
            Some(Node::Root(r)) => r.chains.insert(property, child),
            Some(Node::Path(p)) => p.chains.insert(property, child),
            _ => unreachable!("parent validated above"),
        };
        child
    }

    /// Looks up the memoized child for `property` without creating it.
    ///
    /// External mutation notifiers use this so that checking "does anyone
    /// care?" never force-creates a dependency edge.
    #[must_use]
    pub fn chain_for(&self, parent: RefId, property: NameId) -> Option<RefId> {
        match self.node(parent)? {
            Node::Root(r) => r.chains.get(&property).copied(),
            Node::Path(p) => p.chains.get(&property).copied(),
            Node::Fork(_) | Node::Sink(_) => None,
        }
    }

    /// Walks `parts` from `from`, building memoized children as it goes.
    pub fn reference_from_parts(
        &mut self,
        from: RefId,
        parts: impl IntoIterator<Item = NameId>,
    ) -> RefId {
        let mut current = from;
        for property in parts {
            current = self.get(current, property);
        }
        current
    }

    /// Walks a dotted path like `"a.b.c"` from `from`, interning each
    /// segment into `names`.
    pub fn path(&mut self, from: RefId, dotted: &str, names: &mut NameTable) -> RefId {
        let mut current = from;
        for segment in dotted.split('.') {
            let property = names.intern(segment);
            current = self.get(current, property);
        }
        current
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Returns the current value of a reference, computing and caching on
    /// demand.
    ///
    /// A stale handle reads as [`Value::Null`]. Reading a path whose parent
    /// resolves to null or a primitive yields [`Value::Null`] without
    /// constructing an inner accessor.
    pub fn value(&mut self, id: RefId, source: &dyn PropertySource) -> Value {
        enum Plan {
            Fork(RefId),
            Sink(RefId),
            Path { parent: RefId, property: NameId },
        }

        let plan = match self.node(id) {
            None => return Value::Null,
            Some(Node::Root(root)) => return root.value.clone(),
            Some(Node::Fork(fork)) => Plan::Fork(fork.upstream),
            Some(Node::Sink(sink)) => Plan::Sink(sink.upstream),
            Some(Node::Path(path)) => {
                if let Some(cached) = &path.cache {
                    return cached.clone();
                }
                Plan::Path {
                    parent: path.parent,
                    property: path.property,
                }
            }
        };

        match plan {
            Plan::Fork(upstream) => {
                let value = self.value(upstream, source);
                if let Some(Node::Fork(fork)) = self.node_mut(id) {
                    fork.dirty = false;
                }
                value
            }
            Plan::Sink(upstream) => self.value(upstream, source),
            Plan::Path { parent, property } => self.resolve_path(id, parent, property, source),
        }
    }

    /// Returns `true` if the reference would recompute on the next read.
    ///
    /// Roots are never dirty; forks report their flag; stale handles report
    /// dirty.
    #[must_use]
    pub fn is_dirty(&self, id: RefId) -> bool {
        match self.node(id) {
            None => true,
            Some(Node::Root(_)) => false,
            Some(Node::Path(path)) => path.cache.is_none(),
            Some(Node::Fork(fork)) => fork.dirty,
            Some(Node::Sink(_)) => true,
        }
    }

    fn resolve_path(
        &mut self,
        id: RefId,
        parent: RefId,
        property: NameId,
        source: &dyn PropertySource,
    ) -> Value {
        let parent_value = self.value(parent, source);

        let result = if let Some(object) = parent_value.as_object() {
            // Reuse the inner accessor when the parent identity is unchanged;
            // otherwise tear down the old registration and rebuild.
            let (needs_accessor, old_registration) = match self.node_mut(id) {
                Some(Node::Path(path)) => {
                    let same_identity = path.accessor.is_some()
                        && path
                            .seen_parent
                            .as_ref()
                            .is_some_and(|seen| seen.identity_eq(&parent_value));
                    if same_identity {
                        (false, None)
                    } else {
                        path.accessor = None;
                        (true, path.registered_on.take())
                    }
                }
                _ => return Value::Null,
            };

            if let Some(old) = old_registration
                && old != object
                && let Some(meta) = self.meta.get_mut(old)
            {
                meta.remove_observer(property, id);
            }

            if needs_accessor {
                let accessor: Box<dyn Accessor> = match self
                    .meta
                    .get(object)
                    .and_then(|meta| meta.reference_type(property))
                {
                    Some(factory) => factory.instantiate(object, property),
                    None => Box::new(DirectAccessor),
                };
                if let Some(Node::Path(path)) = self.node_mut(id) {
                    path.accessor = Some(accessor);
                }
            }

            // Register on the current object so raw mutations reach us.
            let needs_register = match self.node(id) {
                Some(Node::Path(path)) => path.registered_on != Some(object),
                _ => false,
            };
            if needs_register {
                self.meta.for_object(object).add_observer(property, id);
                if let Some(Node::Path(path)) = self.node_mut(id) {
                    path.registered_on = Some(object);
                }
            }

            match self.node_mut(id) {
                Some(Node::Path(path)) => match path.accessor.as_mut() {
                    Some(accessor) => accessor.read(source, object, property),
                    None => Value::Null,
                },
                _ => Value::Null,
            }
        } else {
            // Null or primitive parent: short-circuit, no accessor is built.
            Value::Null
        };

        if let Some(Node::Path(path)) = self.node_mut(id) {
            path.cache = Some(result.clone());
            path.seen_parent = Some(parent_value);
        }
        result
    }

    // -------------------------------------------------------------------------
    // Notification
    // -------------------------------------------------------------------------

    /// Marks a reference stale and propagates to its subscribers.
    ///
    /// Propagation is eager, synchronous, and depth-first: memoized children
    /// complete before directly chained subscribers, and subscribers run
    /// most recently chained first. Notifying a stale handle or a reference
    /// with no dependents is a no-op; repeated notification is idempotent.
    pub fn notify(&mut self, id: RefId) {
        self.notify_inner(id, NotifyReason::Explicit, &mut None);
    }

    /// Like [`notify`](Self::notify), recording every visit into `trace`.
    pub fn notify_traced(&mut self, id: RefId, trace: &mut dyn NotifyTrace) {
        self.notify_inner(id, NotifyReason::Explicit, &mut Some(trace));
    }

    /// Swaps the value wrapped by a root reference and notifies
    /// unconditionally.
    ///
    /// The root has no parent-driven invalidation, so this is the only way
    /// its children learn of a swap. Notification happens even when the new
    /// value is identical to the old one.
    ///
    /// # Panics
    ///
    /// Panics if `root` is live but not a root reference.
    pub fn update(&mut self, root: RefId, value: Value) {
        self.update_inner(root, value, &mut None);
    }

    /// Like [`update`](Self::update), recording every visit into `trace`.
    pub fn update_traced(&mut self, root: RefId, value: Value, trace: &mut dyn NotifyTrace) {
        self.update_inner(root, value, &mut Some(trace));
    }

    fn update_inner(
        &mut self,
        root: RefId,
        value: Value,
        trace: &mut Option<&mut dyn NotifyTrace>,
    ) {
        match self.node_mut(root) {
            Some(Node::Root(node)) => node.value = value,
            Some(_) => panic!("update requires a root reference"),
            None => return,
        }
        self.notify_inner(root, NotifyReason::RootUpdate, trace);
    }

    fn notify_inner(
        &mut self,
        id: RefId,
        reason: NotifyReason,
        trace: &mut Option<&mut dyn NotifyTrace>,
    ) {
        let mut children: SmallVec<[(NameId, RefId); 8]> = SmallVec::new();
        let mut dependents: SmallVec<[RefId; 8]> = SmallVec::new();
        let mut unregister: Option<(ObjectId, NameId)> = None;
        let mut is_sink = false;

        match self.node_mut(id) {
            None => return,
            Some(Node::Fork(fork)) => {
                fork.dirty = true;
                if let Some(t) = trace {
                    t.notified(id, reason);
                }
                return;
            }
            Some(Node::Sink(_)) => {
                is_sink = true;
                if let Some(t) = trace {
                    t.notified(id, reason);
                }
            }
            Some(Node::Root(root)) => {
                children.extend(root.chains.iter().map(|(k, v)| (*k, *v)));
                dependents.extend(root.dependents.iter());
                if let Some(t) = trace {
                    t.notified(id, reason);
                }
            }
            Some(Node::Path(path)) => {
                path.cache = None;
                if let Some(old) = path.registered_on.take() {
                    unregister = Some((old, path.property));
                }
                children.extend(path.chains.iter().map(|(k, v)| (*k, *v)));
                dependents.extend(path.dependents.iter());
                if let Some(t) = trace {
                    t.notified(id, reason);
                }
            }
        }

        if is_sink {
            if let Some(Node::Sink(sink)) = self.node_mut(id) {
                (sink.callback)(id);
            }
            return;
        }

        if let Some((object, property)) = unregister
            && let Some(meta) = self.meta.get_mut(object)
        {
            meta.remove_observer(property, id);
        }

        // The memoized-child walk is made deterministic by property id; the
        // dependent snapshot is already ordered most recently chained first.
        children.sort_unstable_by_key(|(property, _)| *property);

        for (_, child) in children {
            self.notify_inner(child, NotifyReason::Parent { parent: id }, trace);
        }
        for dependent in dependents {
            self.notify_inner(dependent, NotifyReason::Parent { parent: id }, trace);
        }
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Chains `dependent` to be notified whenever `upstream` may have
    /// changed.
    ///
    /// Returns a handle for [`unchain`](Self::unchain). Subscribers are
    /// notified most recently chained first.
    ///
    /// Chains must form a DAG. Propagation walks dependents recursively, so
    /// chaining two references onto each other (directly or through a
    /// longer cycle) recurses without bound on the next notification; no
    /// cycle check is performed at insertion.
    ///
    /// # Panics
    ///
    /// Panics if `upstream` is not a live root or path reference.
    pub fn chain(&mut self, upstream: RefId, dependent: RefId) -> Subscription {
        match self.node_mut(upstream) {
            Some(Node::Root(root)) => root.dependents.push(dependent),
            Some(Node::Path(path)) => path.dependents.push(dependent),
            _ => panic!("chain requires a live root or path reference"),
        }
    }

    /// Removes a subscription created by [`chain`](Self::chain).
    ///
    /// Returns `false` if the handle or the upstream reference is stale;
    /// removing twice is a no-op.
    pub fn unchain(&mut self, upstream: RefId, subscription: Subscription) -> bool {
        match self.node_mut(upstream) {
            Some(Node::Root(root)) => root.dependents.remove(subscription),
            Some(Node::Path(path)) => path.dependents.remove(subscription),
            _ => false,
        }
    }

    /// Creates a forked reference over `upstream`.
    ///
    /// The fork subscribes immediately and exposes a plain dirty flag,
    /// decoupled from the internal chain protocol: notification only sets
    /// the flag, and [`value`](Self::value) clears it. Forks start dirty.
    ///
    /// # Panics
    ///
    /// Panics if `upstream` is not a live root or path reference.
    pub fn fork(&mut self, upstream: RefId) -> RefId {
        let id = self.alloc_node(Node::Fork(ForkNode {
            upstream,
            dirty: true,
            subscription: None,
        }));
        let subscription = self.chain(upstream, id);
        if let Some(Node::Fork(fork)) = self.node_mut(id) {
            fork.subscription = Some(subscription);
        }
        id
    }

    /// Registers a host callback invoked on every notification of
    /// `upstream`.
    ///
    /// The callback receives the sink's own handle. It must not assume
    /// access to the graph; it typically just records staleness for the
    /// host's next turn.
    ///
    /// # Panics
    ///
    /// Panics if `upstream` is not a live root or path reference.
    pub fn observe(&mut self, upstream: RefId, callback: impl FnMut(RefId) + 'static) -> RefId {
        let id = self.alloc_node(Node::Sink(SinkNode {
            upstream,
            callback: Box::new(callback),
            subscription: None,
        }));
        let subscription = self.chain(upstream, id);
        if let Some(Node::Sink(sink)) = self.node_mut(id) {
            sink.subscription = Some(subscription);
        }
        id
    }

    /// Destroys a reference, releasing its subscriptions.
    ///
    /// Destroying a root or path reference also destroys its memoized
    /// children. Returns `false` (a no-op) if the handle was already stale.
    pub fn destroy(&mut self, id: RefId) -> bool {
        let Some(node) = self.free_node(id) else {
            return false;
        };
        match node {
            Node::Root(root) => {
                if let Some(object) = root.object
                    && let Some(meta) = self.meta.get_mut(object)
                    && meta.root() == Some(id)
                {
                    meta.clear_root();
                }
                for (_, child) in root.chains {
                    self.destroy(child);
                }
            }
            Node::Path(path) => {
                match self.node_mut(path.parent) {
                    Some(Node::Root(parent)) => {
                        if parent.chains.get(&path.property) == Some(&id) {
                            parent.chains.remove(&path.property);
                        }
                    }
                    Some(Node::Path(parent)) => {
                        if parent.chains.get(&path.property) == Some(&id) {
                            parent.chains.remove(&path.property);
                        }
                    }
                    _ => {}
                }
                if let Some(object) = path.registered_on
                    && let Some(meta) = self.meta.get_mut(object)
                {
                    meta.remove_observer(path.property, id);
                }
                for (_, child) in path.chains {
                    self.destroy(child);
                }
            }
            Node::Fork(fork) => {
                if let Some(subscription) = fork.subscription {
                    self.unchain(fork.upstream, subscription);
                }
            }
            Node::Sink(sink) => {
                if let Some(subscription) = sink.subscription {
                    self.unchain(sink.upstream, subscription);
                }
            }
        }
        true
    }

    // -------------------------------------------------------------------------
    // External mutation entry points
    // -------------------------------------------------------------------------

    /// Announces that `property` on `object` was mutated out-of-band.
    ///
    /// Notifies every reference currently reading through the property, and
    /// the object's root-derived chain for that property if one exists.
    /// The interested-party set is snapshotted at a single consistent point
    /// before anyone is told to re-read.
    pub fn notify_property(&mut self, object: ObjectId, property: NameId) {
        self.notify_property_inner(object, property, &mut None);
    }

    /// Like [`notify_property`](Self::notify_property), recording every
    /// visit into `trace`.
    pub fn notify_property_traced(
        &mut self,
        object: ObjectId,
        property: NameId,
        trace: &mut dyn NotifyTrace,
    ) {
        self.notify_property_inner(object, property, &mut Some(trace));
    }

    /// Writes `value` to `property` on `object` through `sink`, then
    /// notifies as in [`notify_property`](Self::notify_property).
    ///
    /// The interested-party snapshot is taken *before* the raw write, so
    /// every party observed at that point is re-read exactly once.
    pub fn set_property(
        &mut self,
        sink: &mut dyn PropertySink,
        object: ObjectId,
        property: NameId,
        value: Value,
    ) {
        self.set_property_inner(sink, object, property, value, &mut None);
    }

    /// Like [`set_property`](Self::set_property), recording every visit
    /// into `trace`.
    pub fn set_property_traced(
        &mut self,
        sink: &mut dyn PropertySink,
        object: ObjectId,
        property: NameId,
        value: Value,
        trace: &mut dyn NotifyTrace,
    ) {
        self.set_property_inner(sink, object, property, value, &mut Some(trace));
    }

    fn notify_property_inner(
        &mut self,
        object: ObjectId,
        property: NameId,
        trace: &mut Option<&mut dyn NotifyTrace>,
    ) {
        let (observers, chain) = self.mutation_targets(object, property);
        let reason = NotifyReason::Mutation { object, property };
        for observer in observers {
            self.notify_inner(observer, reason, trace);
        }
        if let Some(chain) = chain {
            self.notify_inner(chain, reason, trace);
        }
    }

    fn set_property_inner(
        &mut self,
        sink: &mut dyn PropertySink,
        object: ObjectId,
        property: NameId,
        value: Value,
        trace: &mut Option<&mut dyn NotifyTrace>,
    ) {
        let (observers, chain) = self.mutation_targets(object, property);
        sink.write(object, property, value);

        let reason = NotifyReason::Mutation { object, property };
        for observer in observers {
            self.notify_inner(observer, reason, trace);
        }
        if let Some(chain) = chain {
            self.notify_inner(chain, reason, trace);
        }
    }

    /// Snapshots the parties interested in `(object, property)`: the raw
    /// observer set, plus the root-derived chain if it is not already an
    /// observer (a reference reached both ways is notified once).
    fn mutation_targets(
        &self,
        object: ObjectId,
        property: NameId,
    ) -> (SmallVec<[RefId; 4]>, Option<RefId>) {
        let Some(meta) = self.meta.get(object) else {
            return (SmallVec::new(), None);
        };
        let observers = meta.observers_snapshot(property);
        let chain = meta
            .root()
            .and_then(|root| self.chain_for(root, property))
            .filter(|chain| !observers.contains(chain));
        (observers, chain)
    }

    // -------------------------------------------------------------------------
    // Meta configuration
    // -------------------------------------------------------------------------

    /// Registers a custom reference-type factory for `property` on
    /// `object`.
    ///
    /// Path references resolving that property against `object` will read
    /// through an accessor built by `factory` instead of the default direct
    /// read. Already-built accessors are unaffected until the next rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`SealedMetaError`] if the object's meta record is sealed.
    pub fn try_set_reference_type(
        &mut self,
        object: ObjectId,
        property: NameId,
        factory: ReferenceFactory,
    ) -> Result<(), SealedMetaError> {
        if self.meta.for_object(object).set_reference_type(property, factory) {
            Ok(())
        } else {
            Err(SealedMetaError { object, property })
        }
    }

    /// Freezes `object`'s reference-type overrides and returns the shared
    /// map, for reuse by other objects of the same shape.
    pub fn seal_meta(&mut self, object: ObjectId) -> SharedOverrides {
        self.meta.for_object(object).seal()
    }

    /// Installs a sealed meta record for `object` sharing `overrides`.
    ///
    /// Intended for freshly allocated objects of a known shape; any
    /// existing meta record for `object` is replaced.
    pub fn adopt_sealed_meta(&mut self, object: ObjectId, overrides: SharedOverrides) {
        self.meta.insert_sealed(object, overrides);
    }

    /// Tears down everything the graph knows about `object`.
    ///
    /// Call this when the host frees the object's arena slot: the meta
    /// record is removed, the object's singleton root subtree (if any) is
    /// destroyed, and any surviving path reference that was reading through
    /// the object is notified so it drops its cached value.
    pub fn evict(&mut self, object: ObjectId) {
        let Some(meta) = self.meta.remove(object) else {
            return;
        };
        if let Some(root) = meta.root() {
            self.destroy(root);
        }
        for observer in meta.observers_flat() {
            self.notify_inner(observer, NotifyReason::Explicit, &mut None);
        }
    }

    // -------------------------------------------------------------------------
    // Slab plumbing
    // -------------------------------------------------------------------------

    fn alloc_node(&mut self, node: Node) -> RefId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return RefId::from_parts(index, slot.generation);
        }
        let index = u32::try_from(self.slots.len()).expect("reference graph exceeds u32 slots");
        self.slots.push(NodeSlot {
            generation: 0,
            node: Some(node),
        });
        RefId::from_parts(index, 0)
    }

    fn free_node(&mut self, id: RefId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() || slot.node.is_none() {
            return None;
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.live -= 1;
        slot.node.take()
    }

    fn node(&self, id: RefId) -> Option<&Node> {
        let slot = self.slots.get(id.index() as usize)?;
        (slot.generation == id.generation())
            .then_some(slot.node.as_ref())
            .flatten()
    }

    fn node_mut(&mut self, id: RefId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        (slot.generation == id.generation())
            .then_some(slot.node.as_mut())
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    use taproot_heap::Heap;

    use crate::trace::NotifyRecorder;

    /// Builds `outer = { b: inner }`, `inner = { c: 1 }`.
    fn nested_heap() -> (Heap, ObjectId, ObjectId) {
        let mut heap = Heap::new();
        let inner = heap.alloc_with([("c", Value::Int(1))]);
        let outer = heap.alloc_with([("b", Value::Object(inner))]);
        (heap, outer, inner)
    }

    /// Derives the two-hop path `from.a.b`.
    fn get_nested(graph: &mut ReferenceGraph, from: RefId, a: NameId, b: NameId) -> RefId {
        let mid = graph.get(from, a);
        graph.get(mid, b)
    }

    struct CountingAccessor {
        reads: Rc<Cell<u32>>,
    }

    impl Accessor for CountingAccessor {
        fn read(
            &mut self,
            source: &dyn PropertySource,
            object: ObjectId,
            property: NameId,
        ) -> Value {
            self.reads.set(self.reads.get() + 1);
            source.read(object, property)
        }
    }

    fn counting_factory(reads: Rc<Cell<u32>>, builds: Rc<Cell<u32>>) -> ReferenceFactory {
        Arc::new(move |_, _| {
            builds.set(builds.get() + 1);
            Box::new(CountingAccessor {
                reads: Rc::clone(&reads),
            }) as Box<dyn Accessor>
        })
    }

    #[test]
    fn get_is_memoized() {
        let (mut heap, outer, _) = nested_heap();
        let b = heap.intern("b");
        let c = heap.intern("c");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);

        assert_eq!(graph.get(root, b), graph.get(root, b));
        assert_eq!(graph.root_for(outer), root);

        let b_ref = graph.get(root, b);
        assert_ne!(graph.get(b_ref, c), b_ref);
        assert_eq!(graph.get(b_ref, c), graph.get(b_ref, c));
    }

    #[test]
    fn cached_value_skips_reads() {
        let (mut heap, outer, _) = nested_heap();
        let b = heap.intern("b");

        let reads = Rc::new(Cell::new(0));
        let builds = Rc::new(Cell::new(0));

        let mut graph = ReferenceGraph::new();
        graph
            .try_set_reference_type(
                outer,
                b,
                counting_factory(Rc::clone(&reads), Rc::clone(&builds)),
            )
            .unwrap();

        let root = graph.root_for(outer);
        let b_ref = graph.get(root, b);

        let first = graph.value(b_ref, &heap);
        let second = graph.value(b_ref, &heap);
        assert_eq!(first, second);
        assert_eq!(reads.get(), 1);
        assert_eq!(builds.get(), 1);

        graph.notify(b_ref);
        assert!(graph.is_dirty(b_ref));
        graph.value(b_ref, &heap);
        assert_eq!(reads.get(), 2);
        // Same parent identity: the accessor is reused, not rebuilt.
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn set_property_invalidates_the_reading_chain() {
        let (mut heap, outer, inner) = nested_heap();
        let b = heap.intern("b");
        let c = heap.intern("c");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        let c_ref = get_nested(&mut graph, root, b, c);
        assert_eq!(graph.value(c_ref, &heap), Value::Int(1));

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink_events = Rc::clone(&events);
        graph.observe(c_ref, move |id| sink_events.borrow_mut().push(id));

        graph.set_property(&mut heap, inner, c, Value::Int(2));
        assert_eq!(events.borrow().len(), 1);
        assert!(graph.is_dirty(c_ref));
        assert_eq!(graph.value(c_ref, &heap), Value::Int(2));
    }

    #[test]
    fn set_property_notifies_subscriber_exactly_once() {
        let (mut heap, outer, inner) = nested_heap();
        let b = heap.intern("b");
        let c = heap.intern("c");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        let c_ref = get_nested(&mut graph, root, b, c);
        graph.value(c_ref, &heap);

        let sink = graph.observe(c_ref, |_| {});

        let mut recorder = NotifyRecorder::new();
        graph.set_property_traced(&mut heap, inner, c, Value::Int(7), &mut recorder);

        assert_eq!(recorder.count_for(sink), 1);
        assert_eq!(recorder.count_for(c_ref), 1);
        assert_eq!(
            recorder.first_reason(c_ref),
            Some(NotifyReason::Mutation {
                object: inner,
                property: c
            })
        );
        assert_eq!(
            recorder.first_reason(sink),
            Some(NotifyReason::Parent { parent: c_ref })
        );
        assert_eq!(heap.get(inner, c), Value::Int(7));
    }

    #[test]
    fn parent_identity_change_rebuilds_accessor() {
        let (mut heap, outer, _inner) = nested_heap();
        let b = heap.intern("b");
        let c = heap.intern("c");
        let replacement = heap.alloc_with([("c", Value::Int(9))]);

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        let c_ref = get_nested(&mut graph, root, b, c);
        assert_eq!(graph.value(c_ref, &heap), Value::Int(1));

        // Swap the intermediate object; the leaf re-resolves against it.
        graph.set_property(&mut heap, outer, b, Value::Object(replacement));
        assert_eq!(graph.value(c_ref, &heap), Value::Int(9));

        // The leaf re-registered on the replacement: tracked mutations on
        // it now reach the leaf.
        graph.set_property(&mut heap, replacement, c, Value::Int(10));
        assert_eq!(graph.value(c_ref, &heap), Value::Int(10));
    }

    #[test]
    fn unchain_stops_notifications() {
        let mut graph = ReferenceGraph::new();
        let r1 = graph.new_root(Value::Int(1));
        let r2 = graph.new_root(Value::Int(2));

        let fork = graph.fork(r1);
        let heap = Heap::new();
        graph.value(fork, &heap);
        assert!(!graph.is_dirty(fork));

        // Chain the same fork onto a second upstream, then unchain it.
        let sub = graph.chain(r2, fork);
        graph.update(r2, Value::Int(3));
        assert!(graph.is_dirty(fork));

        graph.value(fork, &heap);
        assert!(graph.unchain(r2, sub));
        assert!(!graph.unchain(r2, sub));

        graph.update(r2, Value::Int(4));
        assert!(!graph.is_dirty(fork));
    }

    #[test]
    fn update_notifies_even_without_change() {
        let (mut heap, outer, _) = nested_heap();
        let b = heap.intern("b");

        let mut graph = ReferenceGraph::new();
        let root = graph.new_root(Value::Object(outer));
        let b_ref = graph.get(root, b);
        graph.value(b_ref, &heap);
        assert!(!graph.is_dirty(b_ref));

        // Same identity, still a full notification.
        graph.update(root, Value::Object(outer));
        assert!(graph.is_dirty(b_ref));
        assert_eq!(graph.value(root, &heap), Value::Object(outer));
    }

    #[test]
    fn null_parent_short_circuits() {
        let mut heap = Heap::new();
        let outer = heap.alloc_with([("x", Value::Null)]);
        let x = heap.intern("x");
        let y = heap.intern("y");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        let y_ref = get_nested(&mut graph, root, x, y);

        assert_eq!(graph.value(y_ref, &heap), Value::Null);
        assert!(!graph.is_dirty(y_ref));
        assert_eq!(graph.value(y_ref, &heap), Value::Null);

        // No accessor was built and nothing registered beyond the root's
        // own object.
        assert_eq!(graph.tracked_objects(), 1);
    }

    #[test]
    fn fork_dirty_lifecycle() {
        let (mut heap, outer, _) = nested_heap();
        let b = heap.intern("b");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        let b_ref = graph.get(root, b);

        let fork = graph.fork(b_ref);
        assert!(graph.is_dirty(fork));

        graph.value(fork, &heap);
        assert!(!graph.is_dirty(fork));

        // Notification only flips the flag; no recompute happens until the
        // next read.
        graph.notify(b_ref);
        assert!(graph.is_dirty(fork));
        graph.value(fork, &heap);
        assert!(!graph.is_dirty(fork));
    }

    #[test]
    fn dependents_notified_most_recent_first() {
        let mut graph = ReferenceGraph::new();
        let root = graph.new_root(Value::Int(0));

        let order = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        graph.observe(root, move |_| first.borrow_mut().push(1));
        graph.observe(root, move |_| second.borrow_mut().push(2));

        graph.notify(root);
        assert_eq!(*order.borrow(), vec![2, 1]);
    }

    #[test]
    fn path_walks_dotted_segments() {
        let (mut heap, outer, _) = nested_heap();
        let b = heap.intern("b");
        let c = heap.intern("c");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        let via_get = get_nested(&mut graph, root, b, c);

        let via_path = graph.path(root, "b.c", heap.names_mut());
        assert_eq!(via_path, via_get);

        let via_parts = graph.reference_from_parts(root, [b, c]);
        assert_eq!(via_parts, via_get);
    }

    #[test]
    fn chain_for_does_not_create() {
        let (mut heap, outer, _) = nested_heap();
        let b = heap.intern("b");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        assert!(graph.chain_for(root, b).is_none());

        let b_ref = graph.get(root, b);
        assert_eq!(graph.chain_for(root, b), Some(b_ref));
    }

    #[test]
    fn destroy_cascades_and_is_idempotent() {
        let (mut heap, outer, _) = nested_heap();
        let b = heap.intern("b");
        let c = heap.intern("c");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        let b_ref = graph.get(root, b);
        let c_ref = graph.get(b_ref, c);
        graph.value(c_ref, &heap);

        assert!(graph.destroy(b_ref));
        assert!(!graph.destroy(b_ref));

        // The whole subtree is gone and the handles are inert.
        assert_eq!(graph.value(c_ref, &heap), Value::Null);
        assert!(graph.is_dirty(c_ref));
        graph.notify(c_ref);

        // The parent's memo slot was released: a re-derived child is fresh.
        let rebuilt = graph.get(root, b);
        assert_ne!(rebuilt, b_ref);
    }

    #[test]
    fn destroyed_sink_stops_firing() {
        let mut graph = ReferenceGraph::new();
        let root = graph.new_root(Value::Int(0));

        let count = Rc::new(Cell::new(0));
        let sink_count = Rc::clone(&count);
        let sink = graph.observe(root, move |_| sink_count.set(sink_count.get() + 1));
        assert_eq!(graph.live_subscriptions(), 1);

        graph.notify(root);
        assert_eq!(count.get(), 1);

        assert!(graph.destroy(sink));
        assert_eq!(graph.live_subscriptions(), 0);
        graph.notify(root);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn sealed_meta_rejects_new_overrides() {
        let mut heap = Heap::new();
        let obj = heap.alloc();
        let sibling = heap.alloc();
        let x = heap.intern("x");
        let y = heap.intern("y");
        heap.set(obj, x, Value::Int(1));
        heap.set(sibling, x, Value::Int(5));

        let reads = Rc::new(Cell::new(0));
        let builds = Rc::new(Cell::new(0));

        let mut graph = ReferenceGraph::new();
        graph
            .try_set_reference_type(obj, x, counting_factory(reads, Rc::clone(&builds)))
            .unwrap();

        let shared = graph.seal_meta(obj);
        let err = graph
            .try_set_reference_type(
                obj,
                y,
                Arc::new(|_, _| Box::new(DirectAccessor) as Box<dyn Accessor>),
            )
            .unwrap_err();
        assert_eq!(err.object, obj);
        assert_eq!(err.property, y);

        // A sibling of the same shape adopts the sealed map and resolves
        // through the same factory.
        graph.adopt_sealed_meta(sibling, shared);
        let root = graph.root_for(sibling);
        let x_ref = graph.get(root, x);
        assert_eq!(graph.value(x_ref, &heap), Value::Int(5));
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn evict_tears_down_root_subtree() {
        let (mut heap, outer, _) = nested_heap();
        let b = heap.intern("b");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        let b_ref = graph.get(root, b);
        graph.value(b_ref, &heap);

        graph.evict(outer);
        assert_eq!(graph.value(root, &heap), Value::Null);
        assert_eq!(graph.value(b_ref, &heap), Value::Null);
        assert_eq!(graph.tracked_objects(), 0);

        // A later root_for starts from scratch.
        assert_ne!(graph.root_for(outer), root);
    }

    #[test]
    fn evict_invalidates_outside_observers() {
        let (mut heap, _outer, inner) = nested_heap();
        let c = heap.intern("c");

        // A reference from an unrelated tree reads through `inner`.
        let mut graph = ReferenceGraph::new();
        let root = graph.new_root(Value::Object(inner));
        let c_ref = graph.get(root, c);
        assert_eq!(graph.value(c_ref, &heap), Value::Int(1));

        // Evicting the object drops the reader's cache along with the record.
        graph.evict(inner);
        assert!(graph.is_dirty(c_ref));
        assert_eq!(graph.tracked_objects(), 0);
    }

    #[test]
    fn notify_property_without_writers_is_noop() {
        let mut heap = Heap::new();
        let obj = heap.alloc();
        let x = heap.intern("x");

        let mut graph = ReferenceGraph::new();
        // No meta record for obj at all.
        graph.notify_property(obj, x);
        assert_eq!(graph.tracked_objects(), 0);
    }

    #[test]
    fn notify_property_reaches_raw_observers() {
        let (mut heap, outer, inner) = nested_heap();
        let b = heap.intern("b");
        let c = heap.intern("c");

        let mut graph = ReferenceGraph::new();
        let root = graph.root_for(outer);
        let c_ref = get_nested(&mut graph, root, b, c);
        assert_eq!(graph.value(c_ref, &heap), Value::Int(1));

        // Out-of-band write, then an announcement.
        heap.set(inner, c, Value::Int(3));
        assert_eq!(graph.value(c_ref, &heap), Value::Int(1)); // still cached

        graph.notify_property(inner, c);
        assert_eq!(graph.value(c_ref, &heap), Value::Int(3));
    }

    #[test]
    fn stale_handles_are_inert() {
        let mut graph = ReferenceGraph::new();
        let root = graph.new_root(Value::Int(1));
        assert!(graph.destroy(root));

        let heap = Heap::new();
        assert_eq!(graph.value(root, &heap), Value::Null);
        assert!(graph.is_dirty(root));
        graph.notify(root);
        graph.update(root, Value::Int(2));
        assert!(!graph.destroy(root));
        assert!(graph.is_empty());
    }

    #[test]
    fn traced_update_records_reasons_down_the_tree() {
        let (mut heap, outer, _) = nested_heap();
        let b = heap.intern("b");

        let mut graph = ReferenceGraph::new();
        let root = graph.new_root(Value::Object(outer));
        let b_ref = graph.get(root, b);
        graph.value(b_ref, &heap);

        let mut recorder = NotifyRecorder::new();
        graph.update_traced(root, Value::Null, &mut recorder);

        assert_eq!(recorder.first_reason(root), Some(NotifyReason::RootUpdate));
        assert_eq!(
            recorder.first_reason(b_ref),
            Some(NotifyReason::Parent { parent: root })
        );
        assert_eq!(recorder.count_for(b_ref), 1);
    }
}
