// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linking: spreading one value into sibling slots of a tree.
//!
//! A linking merge fills an empty slot with the source value, or merges
//! the source into what the slot already holds, always with
//! [`MergeFlag::IsLinking`] set so units can opt out through
//! [`MergeFlag::AvoidLinking`] or [`MergeFlag::AvoidLinkageMerging`].

use crate::flags::{FlagSet, MergeFlag};
use crate::memo::{Cached, MemoContainer, MemoPart};
use crate::merge::{MergeStrategy, merge_units};
use crate::unit::Unit;
use crate::value::{Tree, Value};

/// Options for a [`Linker`].
#[derive(Clone, Debug, Default)]
pub struct LinkConfig {
    flags: FlagSet,
    avoid_merging_if_explicitly_set: bool,
}

impl LinkConfig {
    /// No extra flags, and explicitly set slots are merged into.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags passed to every linking merge, in addition to
    /// [`MergeFlag::IsLinking`].
    #[must_use]
    pub fn flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    /// When set, a slot that already holds a unit is left alone.
    #[must_use]
    pub fn avoid_merging_if_explicitly_set(mut self, avoid: bool) -> Self {
        self.avoid_merging_if_explicitly_set = avoid;
        self
    }
}

/// Propagates values into tree slots.
///
/// ```rust
/// use understory_custom::{Component, LinkConfig, Linker, MemoContainer, Tree, Value};
///
/// let mut memo = MemoContainer::new();
/// let linker = Linker::new(&LinkConfig::new(), &mut memo);
///
/// let icon = Value::from(Component::new("svg"));
/// let target = Tree::new().with("start", Value::Null);
/// let linked = linker.link_all(&mut memo, &icon, &target, ["start", "end"]);
/// assert!(linked.get("start").unwrap().same(&icon));
/// assert!(linked.get("end").unwrap().same(&icon));
/// ```
#[derive(Clone, Debug)]
pub struct Linker {
    flags: FlagSet,
    avoid_merging_if_explicitly_set: bool,
}

impl Linker {
    /// Creates a linker whose flags are interned in `memo`.
    ///
    /// Link results are cached in the same container, so pass it to every
    /// [`Linker::link`] call.
    #[must_use]
    pub fn new(config: &LinkConfig, memo: &mut MemoContainer) -> Self {
        let flags = config.flags.with(MergeFlag::IsLinking);
        Self {
            flags: memo.flags_mut().canonical(&flags),
            avoid_merging_if_explicitly_set: config.avoid_merging_if_explicitly_set,
        }
    }

    /// The canonical flags used for linking merges.
    #[must_use]
    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// Links `source` into `target[key]` and returns the updated tree.
    ///
    /// - An absent, undefined or null slot takes `source`.
    /// - A pair of units is merged with the slot's value as the
    ///   higher-priority side; see [`merge_units`].
    /// - A source tree is linked key by key into a tree slot.
    /// - Anything else leaves the slot alone.
    #[must_use]
    pub fn link(&self, memo: &mut MemoContainer, source: &Value, target: &Tree, key: &str) -> Tree {
        let existing = match target.get(key) {
            Some(value) if !value.is_nullish() => value,
            _ => return target.clone().with(key, source.clone()),
        };
        if existing.same(source) {
            return target.clone();
        }

        let memo_key = match (existing.object_ref(), source.object_ref()) {
            (Some(a), Some(b)) => Some([
                MemoPart::Object(self.flags.object_ref()),
                MemoPart::Object(a),
                MemoPart::Object(b),
            ]),
            _ => None,
        };
        let inputs = [existing, source];
        let cached = memo_key.as_ref().and_then(|k| memo.links().get(k));
        if let Some(hit) = cached.and_then(|hit| hit.resolve(&inputs)) {
            return target.clone().with(key, hit);
        }

        let linked = match self.link_value(memo, existing, source) {
            Some(linked) => linked,
            None => return target.clone(),
        };
        if let Some(memo_key) = &memo_key {
            memo.links_mut()
                .insert(memo_key, Cached::new(linked.clone(), &inputs));
        }
        target.clone().with(key, linked)
    }

    /// Links `source` into each of `keys` in turn.
    #[must_use]
    pub fn link_all<'a>(
        &self,
        memo: &mut MemoContainer,
        source: &Value,
        target: &Tree,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Tree {
        keys.into_iter()
            .fold(target.clone(), |acc, key| self.link(memo, source, &acc, key))
    }

    fn link_value(
        &self,
        memo: &mut MemoContainer,
        existing: &Value,
        source: &Value,
    ) -> Option<Value> {
        match (existing, source) {
            (Value::Unit(a), Value::Unit(b)) => self.merge_into(a, b),
            (Value::Tree(slot), Value::Tree(fields)) => {
                let linked = fields.iter().fold(slot.clone(), |acc, (name, value)| {
                    self.link(memo, value, &acc, name)
                });
                (!linked.ptr_eq(slot)).then_some(Value::Tree(linked))
            }
            _ => None,
        }
    }

    fn merge_into(&self, existing: &Unit, source: &Unit) -> Option<Value> {
        if self.avoid_merging_if_explicitly_set {
            return None;
        }
        Some(Value::Unit(merge_units(
            existing,
            source,
            MergeStrategy::OverrideLeftToRight,
            &self.flags,
        )))
    }
}
