// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deep conversions that lift plain values in a raw tree into units.
//!
//! Every helper walks nested trees and lists, stops at the first unit on
//! each branch and leaves unrelated values alone. Branches without any
//! change keep their identity, so lifting an already lifted tree returns
//! it unchanged.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::component::Component;
use crate::element::Primitive;
use crate::flags::MergeFlag;
use crate::hook::{Hook, HookKind};
use crate::text::Text;
use crate::unit::Unit;
use crate::value::{Tree, Value};

enum Step {
    Replace(Value),
    Keep,
    Descend,
}

fn map_tree(tree: &Tree, f: &mut impl FnMut(&Value) -> Step) -> Tree {
    let mut out = tree.clone();
    for (key, value) in tree.iter() {
        let mapped = map_value(value, f);
        if !mapped.same(value) {
            out.set(key.clone(), mapped);
        }
    }
    out
}

fn map_value(value: &Value, f: &mut impl FnMut(&Value) -> Step) -> Value {
    match f(value) {
        Step::Replace(new) => new,
        Step::Keep => value.clone(),
        Step::Descend => match value {
            Value::Tree(tree) => Value::Tree(map_tree(tree, f)),
            Value::List(items) => {
                let mapped: Vec<Value> = items.iter().map(|item| map_value(item, f)).collect();
                if mapped.iter().zip(items.iter()).all(|(a, b)| a.same(b)) {
                    value.clone()
                } else {
                    Value::from(mapped)
                }
            }
            _ => value.clone(),
        },
    }
}

/// Lifts strings, numbers and nulls into [`Text`] units.
#[must_use]
pub fn to_texts(tree: &Tree) -> Tree {
    map_tree(tree, &mut |value: &Value| match value {
        Value::Str(s) => Step::Replace(Text::new(&**s).into()),
        Value::Number(n) => Step::Replace(Text::new(*n).into()),
        Value::Null => Step::Replace(Text::null().into()),
        Value::Tree(_) | Value::List(_) => Step::Descend,
        _ => Step::Keep,
    })
}

/// Passes every component in `tree` through `transform`.
///
/// Opaque primitives are lifted into components first. Component
/// derivations get `transform` composed into their post-transform, so it
/// applies to whatever component they produce.
#[must_use]
pub fn to_components(tree: &Tree, transform: impl Fn(&Component) -> Component + 'static) -> Tree {
    let transform: Rc<dyn Fn(&Component) -> Component> = Rc::new(transform);
    map_tree(tree, &mut |value: &Value| match value {
        Value::Unit(Unit::Component(c)) => Step::Replace(transform(c).into()),
        Value::Unit(Unit::Hook(hook)) if hook.kind() == HookKind::Component => {
            let transform = transform.clone();
            let hook = hook.with_transform(move |produced| match produced {
                Value::Unit(Unit::Component(c)) => transform(&c).into(),
                other => other,
            });
            Step::Replace(hook.into())
        }
        Value::Unit(_) => Step::Keep,
        Value::Opaque(opaque) => match opaque.downcast_ref::<Primitive>() {
            Some(primitive) => {
                Step::Replace(transform(&Component::new(primitive.clone())).into())
            }
            None => Step::Keep,
        },
        Value::Tree(_) | Value::List(_) => Step::Descend,
        _ => Step::Keep,
    })
}

/// Adds `flags` to every component in `tree`, including components
/// produced by component derivations.
///
/// ```rust
/// use understory_custom::{lift, Component, MergeFlag, Tree, Unit, Value};
///
/// let layer = Tree::new().with("button", Component::new("button"));
/// let tagged = lift::add_flags_deep(&layer, [MergeFlag::IsPackageDefaultValue]);
/// let button = tagged.get("button").and_then(Value::as_unit).and_then(Unit::as_component);
/// assert!(button.unwrap().flags().contains(&MergeFlag::IsPackageDefaultValue));
/// ```
#[must_use]
pub fn add_flags_deep(tree: &Tree, flags: impl IntoIterator<Item = MergeFlag>) -> Tree {
    let flags: Vec<MergeFlag> = flags.into_iter().collect();
    to_components(tree, move |component| component.add_flags(flags.iter().cloned()))
}

/// Turns callbacks into unsafe derivations of `kind`.
#[must_use]
pub fn to_hooks(tree: &Tree, kind: HookKind) -> Tree {
    callbacks_to_derivations(tree, kind, false)
}

/// Turns callbacks into safe derivations of `kind`.
#[must_use]
pub fn to_fns(tree: &Tree, kind: HookKind) -> Tree {
    callbacks_to_derivations(tree, kind, true)
}

fn callbacks_to_derivations(tree: &Tree, kind: HookKind, is_safe: bool) -> Tree {
    map_tree(tree, &mut |value: &Value| match value {
        Value::Callback(callback) => {
            let callback = callback.clone();
            let hook = Hook::new(kind, is_safe, move |args| callback.call(args));
            Step::Replace(hook.into())
        }
        Value::Tree(_) | Value::List(_) => Step::Descend,
        _ => Step::Keep,
    })
}
