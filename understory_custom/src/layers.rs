// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A stack of customization layers resolved into one effective tree.
//!
//! The stack starts from a base tree (usually the package defaults) and
//! folds every pushed layer over it, top layer last. Each layer has a
//! [`LayerMode`] deciding how much of the layers below it may merge into
//! its units. Mode flags accumulate upwards: a layer sees its own flags
//! and those of every layer beneath it.

use alloc::vec::Vec;

use crate::flags::{FlagSet, MergeFlag};
use crate::lift::add_flags_deep;
use crate::memo::MemoContainer;
use crate::merge::{Decision, MergeConfig, merge_customizations, reuse_unchanged};
use crate::value::{Tree, Value};

/// How a layer's units treat the units beneath them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayerMode {
    /// Merge with everything.
    #[default]
    Merging,
    /// Merge with everything except package defaults.
    NonPackageMerging,
    /// Never merge units; the layer's values replace lower ones.
    NonMerging,
}

impl LayerMode {
    /// The flags this mode contributes.
    #[must_use]
    pub fn flags(self) -> FlagSet {
        match self {
            Self::Merging => FlagSet::empty(),
            Self::NonPackageMerging => {
                FlagSet::from_flags([MergeFlag::AvoidWithPackageDefaultValue])
            }
            Self::NonMerging => FlagSet::from_flags([
                MergeFlag::AvoidWithPackageDefaultValue,
                MergeFlag::AvoidWithNonPackageValue,
            ]),
        }
    }

    fn avoids_unit_merging(self) -> bool {
        self == Self::NonMerging
    }
}

#[derive(Clone, Debug)]
struct Layer {
    tree: Tree,
    mode: LayerMode,
}

/// Resolves a base tree and any number of layers into one tree.
///
/// The stack owns its [`MemoContainer`]: resolving again after pushing
/// the same layer objects reuses every previous merge, and unchanged
/// subtrees of the result keep their identity across resolutions.
///
/// ```rust
/// use understory_custom::{Component, LayerMode, LayerStack, Tree, Unit, Value};
///
/// let base = Tree::new().with(
///     "button",
///     Component::new("button").with_defaults(Tree::new().with("type", "button")),
/// );
/// let theme = Tree::new().with(
///     "button",
///     Component::new("button").with_defaults(Tree::new().with("class", "primary")),
/// );
///
/// let mut stack = LayerStack::new(base);
/// stack.push(theme, LayerMode::Merging);
/// let resolved = stack.resolve();
///
/// let button = resolved.get("button").and_then(Value::as_unit).and_then(Unit::as_component);
/// let props = button.unwrap().merged_props(&Tree::new());
/// assert_eq!(props.get("type"), Some(&Value::from("button")));
/// assert_eq!(props.get("class"), Some(&Value::from("primary")));
///
/// // Nothing changed: the same tree comes back.
/// assert!(stack.resolve().ptr_eq(&resolved));
/// ```
#[derive(Debug)]
pub struct LayerStack {
    base: Tree,
    base_flags: FlagSet,
    layers: Vec<Layer>,
    config: MergeConfig,
    memo: MemoContainer,
    last: Option<Tree>,
}

impl LayerStack {
    /// Creates a stack over `base`.
    #[must_use]
    pub fn new(base: Tree) -> Self {
        Self {
            base,
            base_flags: FlagSet::empty(),
            layers: Vec::new(),
            config: MergeConfig::new(),
            memo: MemoContainer::new(),
            last: None,
        }
    }

    /// Creates a stack over package defaults.
    ///
    /// Every component in `base` is tagged with
    /// [`MergeFlag::IsPackageDefaultValue`], so layers in
    /// [`LayerMode::NonPackageMerging`] do not merge into them.
    #[must_use]
    pub fn with_package_defaults(base: &Tree) -> Self {
        Self::new(add_flags_deep(base, [MergeFlag::IsPackageDefaultValue]))
    }

    /// Flags applied to every layer, in addition to the mode flags.
    #[must_use]
    pub fn with_base_flags(mut self, flags: FlagSet) -> Self {
        self.base_flags = flags;
        self.last = None;
        self
    }

    /// Installs a per-field veto used for every layer merge.
    #[must_use]
    pub fn with_decision(mut self, f: impl Fn(&str, &Value, &Value) -> Decision + 'static) -> Self {
        self.config = self.config.decision(f);
        // Decided merges bypass the memo, so earlier entries are dead weight.
        self.memo.clear();
        self.last = None;
        self
    }

    /// Pushes a layer on top.
    pub fn push(&mut self, tree: Tree, mode: LayerMode) {
        self.layers.push(Layer { tree, mode });
    }

    /// Removes the top layer and returns its tree.
    pub fn pop(&mut self) -> Option<Tree> {
        self.layers.pop().map(|layer| layer.tree)
    }

    /// Replaces the tree of the layer at `index` (0 is the lowest pushed
    /// layer). Returns the previous tree, or `None` if out of range.
    pub fn replace(&mut self, index: usize, tree: Tree) -> Option<Tree> {
        let layer = self.layers.get_mut(index)?;
        Some(core::mem::replace(&mut layer.tree, tree))
    }

    /// Replaces the base tree and returns the previous one.
    pub fn replace_base(&mut self, base: Tree) -> Tree {
        core::mem::replace(&mut self.base, base)
    }

    /// Returns the number of pushed layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if only the base is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The memo state shared by every layer merge.
    #[must_use]
    pub fn memo(&self) -> &MemoContainer {
        &self.memo
    }

    /// Mutable access to the memo state, for pruning or eviction.
    pub fn memo_mut(&mut self) -> &mut MemoContainer {
        &mut self.memo
    }

    /// The effective flags of the layer at `index`.
    #[must_use]
    pub fn layer_flags(&self, index: usize) -> Option<FlagSet> {
        if index >= self.layers.len() {
            return None;
        }
        Some(
            self.layers[..=index]
                .iter()
                .fold(self.base_flags.clone(), |acc, layer| acc.union(&layer.mode.flags())),
        )
    }

    /// Folds every layer over the base and returns the effective tree.
    pub fn resolve(&mut self) -> Tree {
        let mut resolved = self.base.clone();
        let mut flags = self.base_flags.clone();
        for layer in &self.layers {
            flags = flags.union(&layer.mode.flags());
            let config = self
                .config
                .clone()
                .flags(flags.clone())
                .avoid_unit_merging(layer.mode.avoids_unit_merging());
            resolved = merge_customizations(&layer.tree, &resolved, &mut self.memo, &config);
        }
        let resolved = match &self.last {
            Some(previous) => reuse_unchanged(previous, &resolved),
            None => resolved,
        };
        tracing::trace!(layers = self.layers.len(), "resolved layer stack");
        self.last = Some(resolved.clone());
        resolved
    }

    /// Drops memo entries whose inputs are gone and returns how many.
    pub fn collect_garbage(&mut self) -> usize {
        self.memo.prune()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::unit::Unit;

    fn props_of(tree: &Tree, key: &str) -> Tree {
        tree.get(key)
            .and_then(Value::as_unit)
            .and_then(Unit::as_component)
            .unwrap()
            .merged_props(&Tree::new())
    }

    fn button(attr: &str) -> Tree {
        Tree::new().with(
            "button",
            Component::new("button").with_defaults(Tree::new().with(attr, true)),
        )
    }

    #[test]
    fn popped_non_merging_layers_are_collectable() {
        let mut stack = LayerStack::new(button("base"));
        for _ in 0..50 {
            stack.push(button("layer"), LayerMode::NonMerging);
            let resolved = stack.resolve();
            assert_eq!(props_of(&resolved, "button").get("base"), None);
            stack.pop();
        }
        assert!(stack.resolve().get("button").is_some());

        // Each round cached the tree merge and the picked unit.
        assert_eq!(stack.collect_garbage(), 100);
        assert!(stack.memo().merges().is_empty());
    }

    #[test]
    fn empty_stack_resolves_to_base() {
        let base = button("base");
        let mut stack = LayerStack::new(base.clone());
        assert!(stack.resolve().ptr_eq(&base));
    }

    #[test]
    fn merging_layers_combine_units() {
        let mut stack = LayerStack::new(button("base"));
        stack.push(button("theme"), LayerMode::Merging);
        stack.push(button("app"), LayerMode::Merging);
        let props = props_of(&stack.resolve(), "button");
        for attr in ["base", "theme", "app"] {
            assert_eq!(props.get(attr), Some(&Value::Bool(true)), "{attr}");
        }
    }

    #[test]
    fn non_package_layers_skip_package_defaults() {
        let mut stack = LayerStack::with_package_defaults(&button("base"));
        stack.push(button("theme"), LayerMode::NonPackageMerging);
        let props = props_of(&stack.resolve(), "button");
        assert_eq!(props.get("theme"), Some(&Value::Bool(true)));
        assert_eq!(props.get("base"), None);
    }

    #[test]
    fn non_merging_layers_replace_units() {
        let mut stack = LayerStack::new(button("base"));
        stack.push(button("app"), LayerMode::NonMerging);
        let props = props_of(&stack.resolve(), "button");
        assert_eq!(props.get("app"), Some(&Value::Bool(true)));
        assert_eq!(props.get("base"), None);
    }

    #[test]
    fn mode_flags_accumulate_upwards() {
        let mut stack = LayerStack::new(Tree::new());
        stack.push(Tree::new(), LayerMode::NonPackageMerging);
        stack.push(Tree::new(), LayerMode::Merging);
        let flags = stack.layer_flags(1).unwrap();
        assert!(flags.contains(&MergeFlag::AvoidWithPackageDefaultValue));
        assert!(stack.layer_flags(2).is_none());
    }

    #[test]
    fn popping_a_layer_restores_the_previous_result() {
        let base = Tree::new()
            .with("a", button("base"))
            .with("b", button("base"));
        let mut stack = LayerStack::new(base);
        stack.push(
            Tree::new().with("a", button("x")).with("b", button("y")),
            LayerMode::Merging,
        );
        let first = stack.resolve();

        let extra = Tree::new().with("a", button("x2")).with("b", button("y"));
        stack.push(extra, LayerMode::Merging);
        stack.pop();
        let again = stack.resolve();
        assert!(again.ptr_eq(&first));
    }

    #[test]
    fn pop_and_replace() {
        let mut stack = LayerStack::new(Tree::new());
        stack.push(Tree::new().with("x", 1), LayerMode::Merging);
        assert_eq!(stack.len(), 1);
        let old = stack.replace(0, Tree::new().with("x", 2)).unwrap();
        assert_eq!(old.get("x"), Some(&Value::from(1)));
        assert_eq!(stack.resolve().get("x"), Some(&Value::from(2)));
        assert!(stack.pop().is_some());
        assert!(stack.is_empty());
        assert!(stack.replace(0, Tree::new()).is_none());
    }
}
