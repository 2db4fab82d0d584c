// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Derivations: lazily computed stand-ins for units.
//!
//! A [`Hook`] wraps a function together with the kind of value it should
//! produce, a safety bit and an optional post-transform.
//!
//! - A *safe* derivation (the `*_fn` constructors) promises that swapping
//!   its function between passes is harmless.
//! - An *unsafe* derivation (the `*_hook` constructors) may carry state
//!   tied to its function, so a swap must remount whatever depends on it.
//!
//! Invoking a derivation that returns another derivation keeps invoking
//! until a plain value comes out; see [`Hook::resolve`].

use alloc::rc::Rc;
use core::fmt;

use smallvec::SmallVec;

use crate::memo::ObjectRef;
use crate::text::TextProps;
use crate::unit::Unit;
use crate::value::{Tree, Value};

/// Longest derivation chain [`Hook::resolve`] follows.
const MAX_HOPS: usize = 64;

type HookFn = dyn Fn(&[Value]) -> Value;
type TransformFn = dyn Fn(Value) -> Value;

/// What a derivation's result should normalize to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Produces a [`Component`](crate::Component), called with a props tree.
    Component,
    /// Produces a [`Text`](crate::Text), called with text props.
    Text,
    /// Produces a data value, called with arbitrary arguments.
    Data,
    /// Produces anything.
    Raw,
}

/// The identity of the function wrapped by a derivation.
///
/// Holding an id keeps the function alive, so two ids compare equal only
/// if they name the very same function instance.
#[derive(Clone)]
pub struct FnId(Rc<HookFn>);

impl PartialEq for FnId {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for FnId {}

impl fmt::Debug for FnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnId")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// The outcome of fully invoking a derivation chain.
#[derive(Clone, Debug)]
pub struct Resolved {
    /// The terminal value with every post-transform applied.
    pub value: Value,
    /// `true` only if every hop of the chain is safe.
    pub is_safe: bool,
    /// The wrapped function of each hop, outermost first.
    pub hops: SmallVec<[FnId; 2]>,
}

/// A lazily evaluated unit.
///
/// ```rust
/// use understory_custom::{Hook, Value};
///
/// let inner = Hook::function(|_| Value::from(2));
/// let outer = Hook::hook(move |_| Value::from(inner.clone()))
///     .with_transform(|v| match v {
///         Value::Number(n) => Value::Number(n * 10.0),
///         other => other,
///     });
///
/// let resolved = outer.resolve(&[]);
/// assert_eq!(resolved.value, Value::from(20));
/// assert_eq!(resolved.hops.len(), 2);
/// // One unsafe hop makes the chain unsafe.
/// assert!(!resolved.is_safe);
/// ```
#[derive(Clone)]
pub struct Hook {
    inner: Rc<HookData>,
}

#[derive(Clone)]
struct HookData {
    kind: HookKind,
    func: Rc<HookFn>,
    is_safe: bool,
    transform: Option<Rc<TransformFn>>,
}

impl Hook {
    /// Creates a derivation from its parts.
    #[must_use]
    pub fn new(kind: HookKind, is_safe: bool, f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self::from_data(HookData {
            kind,
            func: Rc::new(f),
            is_safe,
            transform: None,
        })
    }

    fn from_data(data: HookData) -> Self {
        Self {
            inner: Rc::new(data),
        }
    }

    /// An unsafe derivation of any value.
    #[must_use]
    pub fn hook(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self::new(HookKind::Raw, false, f)
    }

    /// A safe derivation of any value.
    #[must_use]
    pub fn function(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self::new(HookKind::Raw, true, f)
    }

    /// An unsafe derivation of a component from props.
    #[must_use]
    pub fn component_hook(f: impl Fn(&Tree) -> Value + 'static) -> Self {
        Self::new(HookKind::Component, false, props_adapter(f))
    }

    /// A safe derivation of a component from props.
    #[must_use]
    pub fn component_fn(f: impl Fn(&Tree) -> Value + 'static) -> Self {
        Self::new(HookKind::Component, true, props_adapter(f))
    }

    /// An unsafe derivation of a text.
    #[must_use]
    pub fn text_hook(f: impl Fn(TextProps) -> Value + 'static) -> Self {
        Self::new(HookKind::Text, false, text_adapter(f))
    }

    /// A safe derivation of a text.
    #[must_use]
    pub fn text_fn(f: impl Fn(TextProps) -> Value + 'static) -> Self {
        Self::new(HookKind::Text, true, text_adapter(f))
    }

    /// An unsafe derivation of data.
    #[must_use]
    pub fn data_hook(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self::new(HookKind::Data, false, f)
    }

    /// A safe derivation of data.
    #[must_use]
    pub fn data_fn(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self::new(HookKind::Data, true, f)
    }

    /// Returns the declared result kind.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> HookKind {
        self.inner.kind
    }

    /// Returns the safety bit of this hop alone.
    #[must_use]
    #[inline]
    pub fn is_safe(&self) -> bool {
        self.inner.is_safe
    }

    /// Returns a safe copy sharing the same function.
    #[must_use]
    pub fn to_fn(&self) -> Self {
        self.with_safety(true)
    }

    /// Returns an unsafe copy sharing the same function.
    #[must_use]
    pub fn to_hook(&self) -> Self {
        self.with_safety(false)
    }

    fn with_safety(&self, is_safe: bool) -> Self {
        if self.inner.is_safe == is_safe {
            return self.clone();
        }
        Self::from_data(HookData {
            is_safe,
            ..(*self.inner).clone()
        })
    }

    /// Returns a copy whose results additionally pass through `f`.
    ///
    /// `f` runs after any transform already present. The wrapped function
    /// and therefore [`Hook::original_fn_id`] are unchanged.
    #[must_use]
    pub fn with_transform(&self, f: impl Fn(Value) -> Value + 'static) -> Self {
        let transform: Rc<TransformFn> = match self.inner.transform.clone() {
            Some(existing) => Rc::new(move |value| f(existing(value))),
            None => Rc::new(f),
        };
        Self::from_data(HookData {
            transform: Some(transform),
            ..(*self.inner).clone()
        })
    }

    /// Returns the identity of the wrapped function.
    #[must_use]
    pub fn original_fn_id(&self) -> FnId {
        FnId(self.inner.func.clone())
    }

    /// Invokes the chain and returns the terminal value.
    pub fn call(&self, args: &[Value]) -> Value {
        self.resolve(args).value
    }

    /// Invokes the chain, unwrapping returned derivations.
    ///
    /// Every hop receives the same `args`. Post-transforms are applied to
    /// the terminal value, innermost hop first. A chain longer than 64 hops
    /// is cut off, and the derivation it stopped at becomes the value.
    pub fn resolve(&self, args: &[Value]) -> Resolved {
        let mut hops = SmallVec::new();
        let mut transforms: SmallVec<[Rc<TransformFn>; 2]> = SmallVec::new();
        let mut is_safe = true;
        let mut current = self.clone();
        let value = loop {
            hops.push(current.original_fn_id());
            is_safe &= current.inner.is_safe;
            if let Some(transform) = &current.inner.transform {
                transforms.push(transform.clone());
            }
            match (current.inner.func)(args) {
                Value::Unit(Unit::Hook(next)) if hops.len() < MAX_HOPS => current = next,
                Value::Unit(Unit::Hook(next)) => {
                    tracing::warn!(hops = hops.len(), "derivation chain too long, stopping");
                    break Value::Unit(Unit::Hook(next));
                }
                value => break value,
            }
        };
        let value = transforms
            .iter()
            .rev()
            .fold(value, |value, transform| transform(value));
        Resolved {
            value,
            is_safe,
            hops,
        }
    }

    /// Convenience for component derivations: resolves with `props`.
    pub fn resolve_with_props(&self, props: &Tree) -> Resolved {
        self.resolve(&[Value::Tree(props.clone())])
    }

    /// Derivation merge: the higher-priority derivation wins.
    ///
    /// Component derivations get a combined merge at the unit dispatch
    /// level; see [`merge_units`](crate::merge_units).
    #[must_use]
    pub fn merge(&self, _other: &Self) -> Self {
        self.clone()
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

fn props_adapter(f: impl Fn(&Tree) -> Value + 'static) -> impl Fn(&[Value]) -> Value + 'static {
    move |args| match args.first() {
        Some(Value::Tree(props)) => f(props),
        _ => f(&Tree::new()),
    }
}

fn text_adapter(f: impl Fn(TextProps) -> Value + 'static) -> impl Fn(&[Value]) -> Value + 'static {
    move |args| {
        let props = match args.first() {
            Some(Value::Tree(props)) => TextProps::from_tree(props),
            _ => TextProps::default(),
        };
        f(props)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("kind", &self.inner.kind)
            .field("is_safe", &self.inner.is_safe)
            .field("fn", &self.original_fn_id())
            .field("transform", &self.inner.transform.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    use crate::component::Component;

    #[test]
    fn constructors_set_kind_and_safety() {
        let cases = [
            (Hook::hook(|_| Value::Null), HookKind::Raw, false),
            (Hook::function(|_| Value::Null), HookKind::Raw, true),
            (Hook::component_hook(|_| Value::Null), HookKind::Component, false),
            (Hook::component_fn(|_| Value::Null), HookKind::Component, true),
            (Hook::text_hook(|_| Value::Null), HookKind::Text, false),
            (Hook::text_fn(|_| Value::Null), HookKind::Text, true),
            (Hook::data_hook(|_| Value::Null), HookKind::Data, false),
            (Hook::data_fn(|_| Value::Null), HookKind::Data, true),
        ];
        for (hook, kind, safe) in cases {
            assert_eq!(hook.kind(), kind);
            assert_eq!(hook.is_safe(), safe);
        }
    }

    #[test]
    fn safety_flip_keeps_function_identity() {
        let hook = Hook::data_hook(|_| Value::from(1));
        let func = hook.to_fn();
        assert!(func.is_safe());
        assert_eq!(func.original_fn_id(), hook.original_fn_id());
        assert!(func.to_fn().ptr_eq(&func));
        assert!(!func.to_hook().is_safe());
    }

    #[test]
    fn self_returning_chain_stops_at_the_hop_limit() {
        let slot: Rc<RefCell<Option<Hook>>> = Rc::default();
        let inner = slot.clone();
        let hook = Hook::function(move |_| match &*inner.borrow() {
            Some(next) => Value::from(next.clone()),
            None => Value::Null,
        });
        *slot.borrow_mut() = Some(hook.clone());

        let resolved = hook.resolve(&[]);
        assert_eq!(resolved.hops.len(), MAX_HOPS);
        assert!(resolved.value.as_unit().and_then(Unit::as_hook).is_some());
        slot.borrow_mut().take();
    }

    #[test]
    fn distinct_closures_have_distinct_ids() {
        let a = Hook::function(|_| Value::Null);
        let b = Hook::function(|_| Value::Null);
        assert_ne!(a.original_fn_id(), b.original_fn_id());
        assert_eq!(a.clone().original_fn_id(), a.original_fn_id());
    }

    #[test]
    fn transforms_compose_in_order() {
        let hook = Hook::function(|_| Value::from(1))
            .with_transform(|v| match v {
                Value::Number(n) => Value::Number(n + 1.0),
                other => other,
            })
            .with_transform(|v| match v {
                Value::Number(n) => Value::Number(n * 3.0),
                other => other,
            });
        assert_eq!(hook.call(&[]), Value::from(6));
    }

    #[test]
    fn chain_safety_is_conjunction() {
        let unsafe_inner = Hook::hook(|_| Value::from(1));
        let safe_outer = Hook::function(move |_| Value::from(unsafe_inner.clone()));
        let resolved = safe_outer.resolve(&[]);
        assert!(!resolved.is_safe);
        assert_eq!(resolved.hops.len(), 2);

        let all_safe = Hook::function(|_| Value::from(Hook::function(|_| Value::Null)));
        assert!(all_safe.resolve(&[]).is_safe);
    }

    #[test]
    fn component_hook_receives_props() {
        let hook = Hook::component_fn(|props| {
            let tag = props.get("tag").and_then(Value::as_str).unwrap_or("div");
            Value::from(Component::new(tag))
        });
        let resolved = hook.resolve_with_props(&Tree::new().with("tag", "span"));
        let Some(Unit::Component(component)) = resolved.value.as_unit() else {
            panic!("expected a component");
        };
        assert_eq!(component.primitive().map(|p| p.name()), Some("span"));
    }

    #[test]
    fn text_hook_receives_text_props() {
        let hook = Hook::text_fn(|props| Value::Bool(props.disable_transformer));
        let props = TextProps {
            disable_transformer: true,
        };
        assert_eq!(
            hook.call(&[Value::Tree(props.to_tree())]),
            Value::Bool(true)
        );
        assert_eq!(hook.call(&[]), Value::Bool(false));
    }
}
