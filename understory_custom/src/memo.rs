// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity-keyed memo stores for structural sharing.
//!
//! A [`MemoStore`] maps a fixed-arity tuple of key parts to a previously
//! computed [`Value`]. Key parts are either small strategy tags or the
//! identity of a reference-backed input (a tree, a unit, a flag set).
//!
//! Identity is the allocation address. Every stored entry keeps a weak
//! handle to each object in its key, which keeps the allocation reserved,
//! so a live object at the same address is always the same object. Entries
//! whose objects have all been dropped by the host can never hit again;
//! [`MemoStore::prune`] removes them. Entries can also be evicted by
//! generation with [`MemoStore::evict_before`].
//!
//! A result that is one of its own inputs is stored as the input's position
//! rather than as a strong handle, so it cannot keep its key alive. A result
//! that merely captures its inputs (a combined derivation, for instance)
//! still does, and is only reclaimed by generation eviction.

use alloc::rc::{Rc, Weak};
use core::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::flags::FlagInterner;
use crate::value::Value;

trait Liveness {
    fn is_alive(&self) -> bool;
}

impl<T: ?Sized> Liveness for Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

/// Identity of a reference-backed object, usable as a memo key part.
#[derive(Clone)]
pub(crate) struct ObjectRef {
    addr: usize,
    guard: Rc<dyn Liveness>,
}

impl ObjectRef {
    pub(crate) fn new<T: ?Sized + 'static>(rc: &Rc<T>) -> Self {
        Self {
            addr: Rc::as_ptr(rc).cast::<()>() as usize,
            guard: Rc::new(Rc::downgrade(rc)),
        }
    }

    #[inline]
    pub(crate) fn addr(&self) -> usize {
        self.addr
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRef")
            .field(&format_args!("{:#x}", self.addr))
            .finish()
    }
}

/// One element of a memo key.
#[derive(Clone, Debug)]
pub(crate) enum MemoPart {
    /// A strategy descriptor (merge direction, avoidance mode, ...).
    Tag(usize),
    /// The identity of an input object.
    Object(ObjectRef),
}

impl MemoPart {
    #[inline]
    fn raw(&self) -> usize {
        match self {
            Self::Tag(tag) => *tag,
            Self::Object(obj) => obj.addr(),
        }
    }
}

/// A memoized result.
#[derive(Clone, Debug)]
pub(crate) enum Cached {
    /// A value computed from the inputs.
    Value(Value),
    /// The input at this position, returned unchanged.
    Input(usize),
}

impl Cached {
    /// Wraps `result`, recording it by position when it is one of `inputs`.
    pub(crate) fn new(result: Value, inputs: &[&Value]) -> Self {
        match inputs.iter().position(|input| input.same(&result)) {
            Some(index) => Self::Input(index),
            None => Self::Value(result),
        }
    }

    /// Rebuilds the result against the same `inputs` it was stored with.
    pub(crate) fn resolve(self, inputs: &[&Value]) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Input(index) => inputs.get(index).map(|input| (*input).clone()),
        }
    }
}

type RawKey = SmallVec<[usize; 5]>;

struct Entry {
    guards: SmallVec<[Rc<dyn Liveness>; 3]>,
    value: Cached,
    generation: u64,
}

impl Entry {
    fn is_alive(&self) -> bool {
        self.guards.iter().all(|guard| guard.is_alive())
    }
}

/// A fixed-arity, identity-keyed memo store.
///
/// Positions are fixed per store, so a strategy tag in position 0 can never
/// collide with an object address in position 2.
pub struct MemoStore {
    arity: usize,
    entries: HashMap<RawKey, Entry>,
    generation: u64,
}

impl MemoStore {
    /// Creates a store whose keys have exactly `arity` parts.
    #[must_use]
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            entries: HashMap::new(),
            generation: 0,
        }
    }

    /// Returns the key arity.
    #[must_use]
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the number of cached entries (live or not yet pruned).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the current generation. New entries are stamped with it.
    #[must_use]
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a new generation and returns it.
    pub fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Drops every entry stamped with a generation older than `generation`.
    ///
    /// Returns the number of entries removed.
    pub fn evict_before(&mut self, generation: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.generation >= generation);
        before - self.entries.len()
    }

    /// Drops entries whose key objects are no longer reachable.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_alive());
        before - self.entries.len()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn raw_key(&self, key: &[MemoPart]) -> Option<RawKey> {
        debug_assert_eq!(key.len(), self.arity, "memo key arity mismatch");
        (key.len() == self.arity).then(|| key.iter().map(MemoPart::raw).collect())
    }

    pub(crate) fn get(&self, key: &[MemoPart]) -> Option<Cached> {
        let raw = self.raw_key(key)?;
        let hit = self.entries.get(&raw).map(|entry| entry.value.clone());
        if hit.is_some() {
            tracing::trace!(arity = self.arity, "memo hit");
        }
        hit
    }

    pub(crate) fn insert(&mut self, key: &[MemoPart], value: Cached) {
        let Some(raw) = self.raw_key(key) else {
            return;
        };
        let guards = key
            .iter()
            .filter_map(|part| match part {
                MemoPart::Object(obj) => Some(obj.guard.clone()),
                MemoPart::Tag(_) => None,
            })
            .collect();
        tracing::trace!(arity = self.arity, "memo store");
        self.entries.insert(
            raw,
            Entry {
                guards,
                value,
                generation: self.generation,
            },
        );
    }
}

impl fmt::Debug for MemoStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoStore")
            .field("arity", &self.arity)
            .field("len", &self.entries.len())
            .field("generation", &self.generation)
            .finish()
    }
}

/// The memo state shared by tree merges and linking merges.
///
/// Owns the merge store (`strategy, avoidance, flags, left, right`), the
/// linking store (`flags, target, source`) and the flag interner.
#[derive(Debug)]
pub struct MemoContainer {
    merges: MemoStore,
    links: MemoStore,
    flags: FlagInterner,
}

impl Default for MemoContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            merges: MemoStore::new(5),
            links: MemoStore::new(3),
            flags: FlagInterner::new(),
        }
    }

    /// The tree-merge store.
    #[must_use]
    pub fn merges(&self) -> &MemoStore {
        &self.merges
    }

    /// The linking store.
    #[must_use]
    pub fn links(&self) -> &MemoStore {
        &self.links
    }

    /// The flag interner.
    #[must_use]
    pub fn flags(&self) -> &FlagInterner {
        &self.flags
    }

    pub(crate) fn merges_mut(&mut self) -> &mut MemoStore {
        &mut self.merges
    }

    pub(crate) fn links_mut(&mut self) -> &mut MemoStore {
        &mut self.links
    }

    /// Mutable access to the flag interner.
    pub fn flags_mut(&mut self) -> &mut FlagInterner {
        &mut self.flags
    }

    /// Prunes unreachable entries from both stores.
    pub fn prune(&mut self) -> usize {
        self.merges.prune() + self.links.prune()
    }

    /// Starts a new generation in both stores.
    pub fn advance_generation(&mut self) -> u64 {
        self.links.advance_generation();
        self.merges.advance_generation()
    }

    /// Evicts entries older than `generation` from both stores.
    pub fn evict_before(&mut self, generation: u64) -> usize {
        self.merges.evict_before(generation) + self.links.evict_before(generation)
    }

    /// Drops all cached results. Interned flag sets are kept.
    pub fn clear(&mut self) {
        self.merges.clear();
        self.links.clear();
    }
}
