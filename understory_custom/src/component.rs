// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component units: a primitive, its defaults, slots and merge policy.
//!
//! ## Merging
//!
//! [`Component::merge`] folds a lower-priority component into a
//! higher-priority one:
//!
//! 1. Merging a component with itself returns it unchanged.
//! 2. The effective flag set is computed: both sides' additive flags,
//!    minus both sides' subtractive flags, plus the caller's flags.
//! 3. A custom merge strategy on the receiver takes over completely.
//! 4. Vetoes are checked in a fixed order; any veto returns the receiver.
//! 5. Defaults are merged (custom props strategy, deep attribute merge for
//!    two markup tags, or carried over when the receiver was a hole).
//! 6. The result unions both sides' configuration.
//!
//! ## Rendering
//!
//! [`Component::render`] assembles slots around the primitive:
//! innermost wrappers around the caller's children, then inner start/end
//! entries, inner wrappers, the node itself, outer wrappers, outer
//! before/after siblings and finally outermost wrappers.

use alloc::format;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

use crate::attrs::{merge_attributes, strip_keys};
use crate::element::{Element, ElementNode, Primitive};
use crate::error::{CustomError, Result, StrategyError};
use crate::flags::{BuiltinFlags, FlagSet, MergeFlag};
use crate::memo::ObjectRef;
use crate::slots::{Slot, Slots};
use crate::text::TextProps;
use crate::unit::Unit;
use crate::value::{Key, Tree};

/// A custom whole-component merge: `(this, other, flags)`.
pub type ComponentMergeFn =
    Rc<dyn Fn(&Component, &Component, &FlagSet) -> core::result::Result<Component, StrategyError>>;

/// A custom defaults merge: `(this_defaults, other_defaults, flags)`.
pub type PropsMergeFn =
    Rc<dyn Fn(&Tree, &Tree, &FlagSet) -> core::result::Result<Tree, StrategyError>>;

/// Combines resolved defaults with caller props: `(defaults, props)`.
pub type PropsToDefaultsFn = Rc<dyn Fn(&Tree, &Tree) -> Tree>;

/// Maps final props before they reach the primitive.
pub type TransformPropsFn = Rc<dyn Fn(&Tree) -> Tree>;

/// Default props of a component.
#[derive(Clone)]
pub enum Defaults {
    /// A fixed attribute set.
    Static(Tree),
    /// Defaults computed from the props passed at render time.
    Derived(Rc<dyn Fn(&Tree) -> Tree>),
}

impl Default for Defaults {
    fn default() -> Self {
        Self::Static(Tree::new())
    }
}

impl From<Tree> for Defaults {
    fn from(tree: Tree) -> Self {
        Self::Static(tree)
    }
}

impl Defaults {
    /// Creates props-dependent defaults.
    #[must_use]
    pub fn derived(f: impl Fn(&Tree) -> Tree + 'static) -> Self {
        Self::Derived(Rc::new(f))
    }

    /// Evaluates the defaults for `props`.
    #[must_use]
    pub fn resolve(&self, props: &Tree) -> Tree {
        match self {
            Self::Static(tree) => tree.clone(),
            Self::Derived(f) => f(props),
        }
    }

    /// Combines two defaults with `f`, staying static when both are.
    fn combine(high: &Self, low: &Self, f: impl Fn(&Tree, &Tree) -> Tree + 'static) -> Self {
        match (high, low) {
            (Self::Static(a), Self::Static(b)) => Self::Static(f(a, b)),
            _ => {
                let (high, low) = (high.clone(), low.clone());
                Self::derived(move |props| f(&high.resolve(props), &low.resolve(props)))
            }
        }
    }
}

impl fmt::Debug for Defaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(tree) => f.debug_tuple("Static").field(tree).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Optional configuration of a component.
///
/// Every setter consumes and returns the options, so a configuration reads
/// as one expression:
///
/// ```rust
/// use understory_custom::{Component, ComponentOptions, MergeFlag, Slot, Text};
///
/// let options = ComponentOptions::new()
///     .name("Card")
///     .component(Slot::InnerStart, Text::new("title"))
///     .flags([MergeFlag::AvoidMergingDifferentComponents])
///     .strip_prop_keys(["internal"]);
///
/// let card = Component::create(Some("section".into()), Default::default(), options);
/// assert_eq!(card.name(), Some("Card"));
/// assert_eq!(card.slots().get(Slot::InnerStart).len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct ComponentOptions {
    name: Option<Rc<str>>,
    slots: Slots,
    merge_strategy: Option<ComponentMergeFn>,
    props_merge_strategy: Option<PropsMergeFn>,
    props_to_defaults_strategy: Option<PropsToDefaultsFn>,
    flags: FlagSet,
    subtractive_flags: FlagSet,
    transform_props: Option<TransformPropsFn>,
    strip_prop_keys: SmallVec<[Key; 2]>,
}

impl ComponentOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends one unit to `slot`.
    #[must_use]
    pub fn component(self, slot: Slot, unit: impl Into<Unit>) -> Self {
        self.components(slot, [unit.into()])
    }

    /// Appends units to `slot`.
    #[must_use]
    pub fn components(mut self, slot: Slot, units: impl IntoIterator<Item = Unit>) -> Self {
        self.slots.insert(slot, units, None);
        self
    }

    /// Sets a custom whole-component merge strategy.
    #[must_use]
    pub fn merge_strategy(
        mut self,
        f: impl Fn(&Component, &Component, &FlagSet) -> core::result::Result<Component, StrategyError>
        + 'static,
    ) -> Self {
        self.merge_strategy = Some(Rc::new(f));
        self
    }

    /// Sets a custom defaults merge strategy.
    #[must_use]
    pub fn props_merge_strategy(
        mut self,
        f: impl Fn(&Tree, &Tree, &FlagSet) -> core::result::Result<Tree, StrategyError> + 'static,
    ) -> Self {
        self.props_merge_strategy = Some(Rc::new(f));
        self
    }

    /// Sets how resolved defaults combine with render props.
    #[must_use]
    pub fn props_to_defaults_strategy(mut self, f: impl Fn(&Tree, &Tree) -> Tree + 'static) -> Self {
        self.props_to_defaults_strategy = Some(Rc::new(f));
        self
    }

    /// Adds additive flags.
    #[must_use]
    pub fn flags(mut self, flags: impl IntoIterator<Item = MergeFlag>) -> Self {
        self.flags = self.flags.union(&FlagSet::from_flags(flags));
        self
    }

    /// Adds subtractive flags.
    #[must_use]
    pub fn subtractive_flags(mut self, flags: impl IntoIterator<Item = MergeFlag>) -> Self {
        self.subtractive_flags = self.subtractive_flags.union(&FlagSet::from_flags(flags));
        self
    }

    /// Sets the props transform.
    #[must_use]
    pub fn transform_props(mut self, f: impl Fn(&Tree) -> Tree + 'static) -> Self {
        self.transform_props = Some(Rc::new(f));
        self
    }

    /// Adds keys removed from props before rendering.
    #[must_use]
    pub fn strip_prop_keys<'a>(mut self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        for key in keys {
            push_unique(&mut self.strip_prop_keys, key.into());
        }
        self
    }

    /// Applies `update` on top of `self`: set fields replace, slots and
    /// keys append, flags union.
    fn apply(&self, update: Self) -> Self {
        let mut slots = self.slots.clone();
        for slot in Slot::ALL {
            slots.insert(slot, update.slots.get(slot).iter().cloned(), None);
        }
        let mut strip_prop_keys = self.strip_prop_keys.clone();
        for key in update.strip_prop_keys {
            push_unique(&mut strip_prop_keys, key);
        }
        Self {
            name: update.name.or_else(|| self.name.clone()),
            slots,
            merge_strategy: update.merge_strategy.or_else(|| self.merge_strategy.clone()),
            props_merge_strategy: update
                .props_merge_strategy
                .or_else(|| self.props_merge_strategy.clone()),
            props_to_defaults_strategy: update
                .props_to_defaults_strategy
                .or_else(|| self.props_to_defaults_strategy.clone()),
            flags: self.flags.union(&update.flags),
            subtractive_flags: self.subtractive_flags.union(&update.subtractive_flags),
            transform_props: update.transform_props.or_else(|| self.transform_props.clone()),
            strip_prop_keys,
        }
    }

    /// The configuration carried by a merge result.
    fn union(high: &Self, low: &Self) -> Self {
        let mut strip_prop_keys = high.strip_prop_keys.clone();
        for key in &low.strip_prop_keys {
            push_unique(&mut strip_prop_keys, key.clone());
        }
        let transform_props = match (&high.transform_props, &low.transform_props) {
            (Some(first), Some(second)) => {
                let (first, second) = (first.clone(), second.clone());
                Some(Rc::new(move |props: &Tree| second(&first(props))) as TransformPropsFn)
            }
            (first, second) => first.clone().or_else(|| second.clone()),
        };
        Self {
            name: high.name.clone().or_else(|| low.name.clone()),
            slots: Slots::concat(&high.slots, &low.slots),
            merge_strategy: high.merge_strategy.clone().or_else(|| low.merge_strategy.clone()),
            props_merge_strategy: high
                .props_merge_strategy
                .clone()
                .or_else(|| low.props_merge_strategy.clone()),
            props_to_defaults_strategy: high
                .props_to_defaults_strategy
                .clone()
                .or_else(|| low.props_to_defaults_strategy.clone()),
            flags: high.flags.union(&low.flags),
            subtractive_flags: high.subtractive_flags.union(&low.subtractive_flags),
            transform_props,
            strip_prop_keys,
        }
    }
}

fn push_unique(keys: &mut SmallVec<[Key; 2]>, key: Key) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("name", &self.name)
            .field("slots", &self.slots)
            .field("flags", &self.flags)
            .field("subtractive_flags", &self.subtractive_flags)
            .field("strip_prop_keys", &self.strip_prop_keys)
            .field("merge_strategy", &self.merge_strategy.is_some())
            .field("props_merge_strategy", &self.props_merge_strategy.is_some())
            .field("transform_props", &self.transform_props.is_some())
            .finish_non_exhaustive()
    }
}

/// A customizable component.
///
/// ```rust
/// use understory_custom::{Component, Element, FlagSet, Slot, Text, Tree, Value};
///
/// let base = Component::new("button").with_defaults(Tree::new().with("className", "btn"));
/// let theme = Component::new("button")
///     .with_defaults(Tree::new().with("className", "primary"))
///     .add_component(Slot::InnerStart, [Text::new("*")], None);
///
/// let merged = theme.merge(&base, &FlagSet::empty());
/// let Element::Node(node) = merged.render(&Tree::new(), vec![Element::text("OK")]).unwrap() else {
///     panic!("expected a node");
/// };
/// assert_eq!(node.props.get("className"), Some(&Value::from("primary btn")));
/// assert_eq!(node.children, [Element::text("*"), Element::text("OK")]);
/// ```
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentData>,
}

#[derive(Clone)]
struct ComponentData {
    primitive: Option<Primitive>,
    defaults: Defaults,
    options: ComponentOptions,
}

impl Component {
    /// Creates a component from all of its parts.
    ///
    /// A `None` primitive makes the component a hole that takes its
    /// primitive from whatever it is merged with.
    #[must_use]
    pub fn create(primitive: Option<Primitive>, defaults: Defaults, options: ComponentOptions) -> Self {
        Self::from_data(ComponentData {
            primitive,
            defaults,
            options,
        })
    }

    /// Creates a component for `primitive` with no defaults.
    #[must_use]
    pub fn new(primitive: impl Into<Primitive>) -> Self {
        Self::create(Some(primitive.into()), Defaults::default(), ComponentOptions::new())
    }

    /// Creates a component whose primitive is still undetermined.
    #[must_use]
    pub fn hole() -> Self {
        Self::create(None, Defaults::default(), ComponentOptions::new())
    }

    fn from_data(data: ComponentData) -> Self {
        Self {
            inner: Rc::new(data),
        }
    }

    fn update(&self, f: impl FnOnce(&mut ComponentData)) -> Self {
        let mut data = (*self.inner).clone();
        f(&mut data);
        Self::from_data(data)
    }

    /// Returns the primitive, or `None` for a hole.
    #[must_use]
    #[inline]
    pub fn primitive(&self) -> Option<&Primitive> {
        self.inner.primitive.as_ref()
    }

    /// Returns the default props provider.
    #[must_use]
    #[inline]
    pub fn defaults(&self) -> &Defaults {
        &self.inner.defaults
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.options.name.as_deref()
    }

    /// Returns the slots.
    #[must_use]
    #[inline]
    pub fn slots(&self) -> &Slots {
        &self.inner.options.slots
    }

    /// Returns the additive flags.
    #[must_use]
    #[inline]
    pub fn flags(&self) -> &FlagSet {
        &self.inner.options.flags
    }

    /// Returns the subtractive flags.
    #[must_use]
    #[inline]
    pub fn subtractive_flags(&self) -> &FlagSet {
        &self.inner.options.subtractive_flags
    }

    /// Returns the additive flags minus the subtractive ones.
    #[must_use]
    pub fn own_flags(&self) -> FlagSet {
        self.flags().subtract(self.subtractive_flags())
    }

    /// Returns the keys stripped from props before rendering.
    #[must_use]
    pub fn strip_prop_keys(&self) -> &[Key] {
        &self.inner.options.strip_prop_keys
    }

    /// Returns a copy with new defaults.
    #[must_use]
    pub fn with_defaults(&self, defaults: impl Into<Defaults>) -> Self {
        let defaults = defaults.into();
        self.update(|data| data.defaults = defaults)
    }

    /// Returns a copy with `units` inserted into `slot` at a circular
    /// `index` (`None` appends).
    #[must_use]
    pub fn add_component<U: Into<Unit>>(
        &self,
        slot: Slot,
        units: impl IntoIterator<Item = U>,
        index: Option<isize>,
    ) -> Self {
        let units: Vec<Unit> = units.into_iter().map(Into::into).collect();
        self.update(|data| data.options.slots.insert(slot, units, index))
    }

    /// Returns a copy reconfigured with `options`.
    ///
    /// Options that are set replace the current ones, slot entries are
    /// appended, strip keys are added and flags are unioned.
    #[must_use]
    pub fn config(&self, options: ComponentOptions) -> Self {
        self.update(|data| data.options = data.options.apply(options))
    }

    /// Returns a copy with additional additive flags.
    #[must_use]
    pub fn add_flags(&self, flags: impl IntoIterator<Item = MergeFlag>) -> Self {
        let flags = FlagSet::from_flags(flags);
        if flags.is_subset(self.flags()) {
            return self.clone();
        }
        self.update(|data| data.options.flags = data.options.flags.union(&flags))
    }

    /// Returns a copy with additional subtractive flags.
    #[must_use]
    pub fn subtract_flags(&self, flags: impl IntoIterator<Item = MergeFlag>) -> Self {
        let flags = FlagSet::from_flags(flags);
        if flags.is_subset(self.subtractive_flags()) {
            return self.clone();
        }
        self.update(|data| {
            data.options.subtractive_flags = data.options.subtractive_flags.union(&flags);
        })
    }

    /// Returns a copy whose props additionally pass through `f`, after any
    /// existing transform.
    #[must_use]
    pub fn transform_props(&self, f: impl Fn(&Tree) -> Tree + 'static) -> Self {
        self.update(|data| {
            let transform: TransformPropsFn = match data.options.transform_props.take() {
                Some(existing) => Rc::new(move |props: &Tree| f(&existing(props))),
                None => Rc::new(f),
            };
            data.options.transform_props = Some(transform);
        })
    }

    /// Merges `other` (lower priority) into `self` under `flags`.
    ///
    /// Never fails: a vetoed merge, or a failing custom strategy, returns
    /// `self` unchanged. The exception is a custom defaults strategy over
    /// derived defaults. It only runs when props are resolved, after the
    /// merge has already happened, so a failure there falls back to
    /// `self`'s resolved defaults while the merged slots and options stay.
    #[must_use]
    pub fn merge(&self, other: &Self, flags: &FlagSet) -> Self {
        if self.ptr_eq(other) {
            return self.clone();
        }
        let this_opts = &self.inner.options;
        let other_opts = &other.inner.options;
        let effective = this_opts
            .flags
            .union(&other_opts.flags)
            .subtract(&this_opts.subtractive_flags.union(&other_opts.subtractive_flags))
            .union(flags);

        if let Some(strategy) = &this_opts.merge_strategy {
            return match strategy(self, other, &effective) {
                Ok(merged) => merged,
                Err(err) => {
                    tracing::warn!(name = ?self.name(), error = %err, "component merge strategy failed");
                    self.clone()
                }
            };
        }

        if let Some(reason) = self.veto(other, &effective) {
            tracing::debug!(name = ?self.name(), reason, "component merge vetoed");
            return self.clone();
        }

        let primitive = self.primitive().or(other.primitive()).cloned();
        let defaults = if let Some(strategy) = &this_opts.props_merge_strategy {
            match self.merge_defaults_with(other, strategy, &effective) {
                Some(defaults) => defaults,
                None => return self.clone(),
            }
        } else if self.primitive().is_some_and(Primitive::is_tag)
            && other.primitive().is_some_and(Primitive::is_tag)
        {
            Defaults::combine(self.defaults(), other.defaults(), merge_attributes)
        } else if primitive.as_ref() != self.primitive() {
            self.defaults().clone()
        } else {
            return self.clone();
        };

        Self::from_data(ComponentData {
            primitive,
            defaults,
            options: ComponentOptions::union(this_opts, other_opts),
        })
    }

    /// Returns the name of the first veto that applies, if any.
    fn veto(&self, other: &Self, effective: &FlagSet) -> Option<&'static str> {
        let this_own = self.own_flags();
        let other_own = other.own_flags();
        if effective.has(BuiltinFlags::AVOID_ANY_MERGING)
            || this_own.has(BuiltinFlags::AVOID_ANY_MERGING)
            || other_own.has(BuiltinFlags::AVOID_ANY_MERGING)
        {
            return Some("avoid_any_merging");
        }
        let this_pkg = this_own.has(BuiltinFlags::IS_PACKAGE_DEFAULT_VALUE);
        let other_pkg = other_own.has(BuiltinFlags::IS_PACKAGE_DEFAULT_VALUE);
        if effective.has(BuiltinFlags::AVOID_WITH_PACKAGE_DEFAULT_VALUE) && (this_pkg || other_pkg) {
            return Some("avoid_with_package_default_value");
        }
        if effective.has(BuiltinFlags::AVOID_WITH_NON_PACKAGE_VALUE) && !(this_pkg && other_pkg) {
            return Some("avoid_with_non_package_value");
        }
        if effective.has(BuiltinFlags::IS_LINKING | BuiltinFlags::AVOID_LINKING) {
            return Some("avoid_linking");
        }
        if effective.has(BuiltinFlags::AVOID_MERGING_DIFFERENT_COMPONENTS)
            && self.primitive() != other.primitive()
        {
            return Some("avoid_merging_different_components");
        }
        if effective.has(BuiltinFlags::AVOID_LINKAGE_MERGING | BuiltinFlags::IS_LINKING) {
            return Some("avoid_linkage_merging");
        }
        None
    }

    /// Runs the custom defaults strategy; `None` means it failed.
    ///
    /// With derived defaults on either side the strategy runs lazily and
    /// cannot fail the merge; it falls back to the higher side's defaults.
    fn merge_defaults_with(
        &self,
        other: &Self,
        strategy: &PropsMergeFn,
        flags: &FlagSet,
    ) -> Option<Defaults> {
        match (self.defaults(), other.defaults()) {
            (Defaults::Static(high), Defaults::Static(low)) => match strategy(high, low, flags) {
                Ok(tree) => Some(Defaults::Static(tree)),
                Err(err) => {
                    tracing::warn!(name = ?self.name(), error = %err, "props merge strategy failed");
                    None
                }
            },
            (high, low) => {
                let (strategy, flags) = (strategy.clone(), flags.clone());
                Some(Defaults::combine(high, low, move |a, b| {
                    strategy(a, b, &flags).unwrap_or_else(|err| {
                        tracing::warn!(error = %err, "props merge strategy failed");
                        a.clone()
                    })
                }))
            }
        }
    }

    /// Resolves defaults against `props` and combines them, props winning.
    #[must_use]
    pub fn merged_props(&self, props: &Tree) -> Tree {
        let defaults = self.defaults().resolve(props);
        if let Some(strategy) = &self.inner.options.props_to_defaults_strategy {
            return strategy(&defaults, props);
        }
        if defaults.is_empty() {
            return props.clone();
        }
        let mut merged = defaults;
        for (key, value) in props.iter() {
            merged.set(key.clone(), value.clone());
        }
        merged
    }

    /// Renders the component with `props` around `children`.
    ///
    /// # Errors
    ///
    /// - [`CustomError::UndeterminedPrimitive`] if the component is a hole.
    /// - [`CustomError::TypeMismatch`] if a slot holds a unit that cannot
    ///   be rendered there.
    pub fn render(&self, props: &Tree, children: Vec<Element>) -> Result<Element> {
        self.render_keyed(props, children, None)
    }

    pub(crate) fn render_keyed(
        &self,
        props: &Tree,
        children: Vec<Element>,
        key: Option<Key>,
    ) -> Result<Element> {
        let primitive = self
            .primitive()
            .cloned()
            .ok_or_else(|| CustomError::UndeterminedPrimitive {
                name: self.name().map(Into::into),
            })?;
        let options = &self.inner.options;
        let merged = self.merged_props(props);
        let stripped = strip_keys(&merged, &options.strip_prop_keys);
        let final_props = match &options.transform_props {
            Some(transform) => transform(&stripped),
            None => stripped,
        };

        let slots = &options.slots;
        let mut children = wrap(slots, Slot::InnermostWrapper, children)?;
        let start = slots.get(Slot::InnerStart);
        let end = slots.get(Slot::InnerEnd);
        if !start.is_empty() || !end.is_empty() {
            let mut assembled = render_entries(Slot::InnerStart, start)?;
            assembled.append(&mut children);
            assembled.extend(render_entries(Slot::InnerEnd, end)?);
            children = assembled;
        }
        let children = wrap(slots, Slot::InnerWrapper, children)?;

        let node = Element::Node(ElementNode {
            primitive,
            props: final_props,
            key: None,
            children,
        });
        let mut element = single(wrap(slots, Slot::OuterWrapper, vec![node])?);

        let before = slots.get(Slot::OuterBefore);
        let after = slots.get(Slot::OuterAfter);
        if !before.is_empty() || !after.is_empty() {
            let mut siblings = render_entries(Slot::OuterBefore, before)?;
            siblings.push(element);
            siblings.extend(render_entries(Slot::OuterAfter, after)?);
            element = Element::Fragment(siblings);
        }
        let element = single(wrap(slots, Slot::OutermostWrapper, vec![element])?);
        Ok(element.keyed(key))
    }

    /// Returns `true` if both handles are the same unit.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(&self.inner)
    }
}

fn entry_key(slot: Slot, index: usize) -> Key {
    format!("{}-{index}", slot.name()).into()
}

fn render_entries(slot: Slot, units: &[Unit]) -> Result<Vec<Element>> {
    units
        .iter()
        .enumerate()
        .map(|(index, unit)| match unit {
            Unit::Component(c) => c.render_keyed(&Tree::new(), Vec::new(), Some(entry_key(slot, index))),
            Unit::Text(t) => t.render(TextProps::default(), None),
            other => Err(CustomError::type_mismatch(
                slot.name(),
                "component or text",
                other.kind().name(),
            )),
        })
        .collect()
}

/// Wraps `children` with every wrapper of `slot`, the first entry outermost.
fn wrap(slots: &Slots, slot: Slot, children: Vec<Element>) -> Result<Vec<Element>> {
    let mut inner = children;
    for (index, unit) in slots.get(slot).iter().enumerate().rev() {
        let Unit::Component(wrapper) = unit else {
            return Err(CustomError::type_mismatch(
                slot.name(),
                "component",
                unit.kind().name(),
            ));
        };
        inner = vec![wrapper.render_keyed(&Tree::new(), inner, Some(entry_key(slot, index)))?];
    }
    Ok(inner)
}

fn single(mut elements: Vec<Element>) -> Element {
    if elements.len() == 1 {
        elements.pop().unwrap_or_default()
    } else {
        Element::Fragment(elements)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("primitive", &self.inner.primitive)
            .field("defaults", &self.inner.defaults)
            .field("options", &self.inner.options)
            .finish()
    }
}
