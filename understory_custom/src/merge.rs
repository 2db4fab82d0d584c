// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree-level merging of customization layers.
//!
//! [`merge_customizations`] folds a lower-priority layer tree into a
//! higher-priority one. Unit leaves merge through [`merge_units`], nested
//! trees recurse, and every other value follows the configured
//! [`MergeStrategy`]. Results are memoized per pair of input objects in a
//! [`MemoContainer`], so re-merging unchanged subtrees returns the very
//! same result objects.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::flags::FlagSet;
use crate::hook::{Hook, HookKind};
use crate::memo::{Cached, MemoContainer, MemoPart, ObjectRef};
use crate::unit::Unit;
use crate::value::{Tree, Value};

/// Which side wins when two values cannot be merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MergeStrategy {
    /// The left (higher-priority) value wins.
    #[default]
    OverrideLeftToRight,
    /// The right (lower-priority) value wins.
    OverrideRightToLeft,
}

impl MergeStrategy {
    fn tag(self) -> usize {
        match self {
            Self::OverrideLeftToRight => 0,
            Self::OverrideRightToLeft => 1,
        }
    }

    fn pick(self, left: &Value, right: &Value) -> Value {
        match self {
            Self::OverrideLeftToRight => left.clone(),
            Self::OverrideRightToLeft => right.clone(),
        }
    }
}

/// The verdict of a [`DecisionFn`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Merge the two values as usual.
    Merge,
    /// Keep the higher-priority value untouched.
    Skip,
}

/// Decides per field whether merging should happen.
///
/// Receives the dotted path of the field and the higher- and
/// lower-priority values. A merge with a decision is never memoized, so a
/// subtree shared between two paths is decided once per path.
pub type DecisionFn = Rc<dyn Fn(&str, &Value, &Value) -> Decision>;

/// Options for [`merge_customizations`].
#[derive(Clone, Default)]
pub struct MergeConfig {
    strategy: MergeStrategy,
    avoid_unit_merging: bool,
    flags: FlagSet,
    decision: Option<DecisionFn>,
}

impl MergeConfig {
    /// Left-to-right merging of everything, with no extra flags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the override direction.
    #[must_use]
    pub fn strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// When set, unit pairs are not merged; the override rule applies.
    #[must_use]
    pub fn avoid_unit_merging(mut self, avoid: bool) -> Self {
        self.avoid_unit_merging = avoid;
        self
    }

    /// Flags passed to every unit merge.
    #[must_use]
    pub fn flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    /// Installs a per-field veto.
    #[must_use]
    pub fn decision(mut self, f: impl Fn(&str, &Value, &Value) -> Decision + 'static) -> Self {
        self.decision = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for MergeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeConfig")
            .field("strategy", &self.strategy)
            .field("avoid_unit_merging", &self.avoid_unit_merging)
            .field("flags", &self.flags)
            .field("decision", &self.decision.is_some())
            .finish()
    }
}

/// Merges two units in the given direction.
///
/// If either side is a component derivation, the result is a new
/// component derivation that evaluates both sides on use and merges the
/// outcomes. It is safe only if both sides are. Otherwise the winning
/// side's [`Unit::merge`] is called with the other side.
#[must_use]
pub fn merge_units(left: &Unit, right: &Unit, strategy: MergeStrategy, flags: &FlagSet) -> Unit {
    if left.as_component_hook().is_none() && right.as_component_hook().is_none() {
        return match strategy {
            MergeStrategy::OverrideLeftToRight => left.merge(right, flags),
            MergeStrategy::OverrideRightToLeft => right.merge(left, flags),
        };
    }

    let is_safe = unit_is_safe(left) && unit_is_safe(right);
    let (left, right, flags) = (left.clone(), right.clone(), flags.clone());
    let combined = Hook::new(HookKind::Component, is_safe, move |args| {
        let first = evaluate(&left, args);
        let second = evaluate(&right, args);
        if let (Value::Unit(a), Value::Unit(b)) = (&first, &second) {
            return Value::Unit(merge_units(a, b, strategy, &flags));
        }
        match strategy {
            MergeStrategy::OverrideLeftToRight => first_present(first, second),
            MergeStrategy::OverrideRightToLeft => first_present(second, first),
        }
    });
    Unit::Hook(combined)
}

fn unit_is_safe(unit: &Unit) -> bool {
    unit.as_hook().is_none_or(Hook::is_safe)
}

fn evaluate(unit: &Unit, args: &[Value]) -> Value {
    match unit {
        Unit::Hook(hook) => hook.call(args),
        other => Value::Unit(other.clone()),
    }
}

fn first_present(preferred: Value, fallback: Value) -> Value {
    if preferred.is_nullish() {
        fallback
    } else {
        preferred
    }
}

/// Merges the `low` layer into the `high` layer.
///
/// - Keys only `low` has (or that `high` holds as undefined) are copied.
/// - Identical values are kept as they are.
/// - Unit pairs merge with [`merge_units`] unless unit merging is avoided.
/// - Nested tree pairs recurse.
/// - Anything else follows the configured [`MergeStrategy`].
///
/// A field merging to undefined is removed. Results are memoized in
/// `memo` per pair of input objects. A decision callback sees field paths,
/// which are not part of the memo key, so merges with one bypass `memo`.
///
/// ```rust
/// use understory_custom::{merge_customizations, MemoContainer, MergeConfig, Tree};
///
/// let theme = Tree::new().with("color", "red");
/// let base = Tree::new().with("color", "blue").with("size", 2);
///
/// let mut memo = MemoContainer::new();
/// let config = MergeConfig::new();
/// let merged = merge_customizations(&theme, &base, &mut memo, &config);
/// assert_eq!(merged, Tree::new().with("color", "red").with("size", 2));
///
/// // The same inputs hit the memo and return the same tree.
/// let again = merge_customizations(&theme, &base, &mut memo, &config);
/// assert!(again.ptr_eq(&merged));
/// ```
pub fn merge_customizations(
    high: &Tree,
    low: &Tree,
    memo: &mut MemoContainer,
    config: &MergeConfig,
) -> Tree {
    let flags = memo.flags_mut().canonical(&config.flags);
    let mut cx = MergeCx {
        strategy: config.strategy,
        avoidance: usize::from(config.avoid_unit_merging),
        flags_ref: flags.object_ref(),
        flags,
        decision: config.decision.as_deref(),
        memoize: config.decision.is_none(),
        memo,
    };
    cx.merge_trees(high, low, "")
}

struct MergeCx<'a> {
    strategy: MergeStrategy,
    avoidance: usize,
    flags: FlagSet,
    flags_ref: ObjectRef,
    decision: Option<&'a dyn Fn(&str, &Value, &Value) -> Decision>,
    memoize: bool,
    memo: &'a mut MemoContainer,
}

impl MergeCx<'_> {
    fn key(&self, left: ObjectRef, right: ObjectRef) -> [MemoPart; 5] {
        [
            MemoPart::Tag(self.strategy.tag()),
            MemoPart::Tag(self.avoidance),
            MemoPart::Object(self.flags_ref.clone()),
            MemoPart::Object(left),
            MemoPart::Object(right),
        ]
    }

    fn merge_trees(&mut self, high: &Tree, low: &Tree, path: &str) -> Tree {
        if high.ptr_eq(low) {
            return high.clone();
        }
        let key = self
            .memoize
            .then(|| self.key(high.object_ref(), low.object_ref()));
        let (high_input, low_input) = (Value::Tree(high.clone()), Value::Tree(low.clone()));
        let inputs = [&high_input, &low_input];
        if let Some(Value::Tree(hit)) = key.as_ref().and_then(|key| self.lookup(key, &inputs)) {
            return hit;
        }

        let mut merged = high.clone();
        for (name, low_value) in low.iter() {
            let high_value = match high.get(name) {
                Some(value) if !value.is_undefined() => value,
                _ => {
                    if !low_value.is_undefined() {
                        merged.set(name.clone(), low_value.clone());
                    }
                    continue;
                }
            };
            if high_value.same(low_value) {
                continue;
            }

            let field_path = if path.is_empty() {
                String::from(&**name)
            } else {
                format!("{path}.{name}")
            };
            if let Some(decision) = self.decision {
                if decision(&field_path, high_value, low_value) == Decision::Skip {
                    continue;
                }
            }

            let field_key = match (high_value.object_ref(), low_value.object_ref()) {
                (Some(a), Some(b)) if self.memoize => Some(self.key(a, b)),
                _ => None,
            };
            let field_inputs = [high_value, low_value];
            let cached = field_key
                .as_ref()
                .and_then(|field_key| self.lookup(field_key, &field_inputs));
            let result = match cached {
                Some(hit) => hit,
                None => {
                    let result = self.merge_values(high_value, low_value, &field_path);
                    if let Some(field_key) = &field_key {
                        self.store(field_key, result.clone(), &field_inputs);
                    }
                    result
                }
            };

            if result.is_undefined() {
                merged.remove(name);
            } else {
                merged.set(name.clone(), result);
            }
        }

        if let Some(key) = &key {
            self.store(key, Value::Tree(merged.clone()), &inputs);
        }
        merged
    }

    fn lookup(&self, key: &[MemoPart], inputs: &[&Value]) -> Option<Value> {
        self.memo.merges().get(key)?.resolve(inputs)
    }

    fn store(&mut self, key: &[MemoPart], result: Value, inputs: &[&Value]) {
        self.memo
            .merges_mut()
            .insert(key, Cached::new(result, inputs));
    }

    fn merge_values(&mut self, high: &Value, low: &Value, path: &str) -> Value {
        match (high, low) {
            (Value::Unit(a), Value::Unit(b)) if self.avoidance == 0 => {
                Value::Unit(merge_units(a, b, self.strategy, &self.flags))
            }
            (Value::Tree(a), Value::Tree(b)) => Value::Tree(self.merge_trees(a, b, path)),
            _ => self.strategy.pick(high, low),
        }
    }
}

/// Returns `next`, reusing subtrees of `previous` that are deeply equal.
///
/// When nothing changed at all, `previous` itself is returned, so callers
/// comparing results by identity see no change.
#[must_use]
pub fn reuse_unchanged(previous: &Tree, next: &Tree) -> Tree {
    if previous.ptr_eq(next) {
        return next.clone();
    }
    let mut unchanged = previous.len() == next.len();
    let mut out = next.clone();
    for (name, value) in next.iter() {
        let Some(old) = previous.get(name) else {
            unchanged = false;
            continue;
        };
        let reused = reuse_value(old, value);
        if !reused.same(old) {
            unchanged = false;
        }
        if !reused.same(value) {
            out.set(name.clone(), reused);
        }
    }
    if unchanged { previous.clone() } else { out }
}

fn reuse_value(previous: &Value, next: &Value) -> Value {
    if previous.same(next) {
        return previous.clone();
    }
    match (previous, next) {
        (Value::Tree(a), Value::Tree(b)) => Value::Tree(reuse_unchanged(a, b)),
        (Value::List(a), Value::List(b)) if a.len() == b.len() => {
            let items: Vec<Value> = a
                .iter()
                .zip(b.iter())
                .map(|(old, new)| reuse_value(old, new))
                .collect();
            if items.iter().zip(a.iter()).all(|(item, old)| item.same(old)) {
                previous.clone()
            } else {
                Value::from(items)
            }
        }
        _ => next.clone(),
    }
}
