// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Projecting a schema of declared kinds into resolvable handles.
//!
//! [`project`] walks a raw schema tree. Each leaf that declares a kind
//! (a unit, or one of the kind tags `"c"`, `"t"`, `"d"`, `"h"`) becomes a
//! [`Handle`] that knows where its value lives in a resolved customization
//! tree. Handles read their value through a [`Selector`] on every pass and
//! record derivation identities in a [`DerivationTracker`], usually the one
//! owned by a [`RemountBoundary`](crate::RemountBoundary).
//!
//! ```rust
//! use understory_custom::{
//!     Component, Element, RemountBoundary, Tree, Value, projection,
//! };
//!
//! let schema = Tree::new().with("header", Tree::new().with("title", "c"));
//! let handles = projection::project(&schema);
//! let title = handles.get(&["header", "title"]).unwrap();
//!
//! let resolved = Tree::new().with(
//!     "value",
//!     Tree::new().with("header", Tree::new().with("title", Component::new("h1"))),
//! );
//! let mut boundary = RemountBoundary::new();
//! let element = boundary
//!     .run(|tracker| {
//!         title.render_component(&resolved, tracker, &Tree::new(), vec![Element::text("Hi")])
//!     })
//!     .unwrap();
//! assert_eq!(element.as_node().unwrap().primitive.name(), "h1");
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

use crate::component::Component;
use crate::element::{Element, Primitive};
use crate::error::{CustomError, Result};
use crate::hook::{Hook, HookKind, Resolved};
use crate::text::{Text, TextPayload, TextProps};
use crate::tracker::DerivationTracker;
use crate::unit::{Unit, UnitKind};
use crate::value::{Key, Tree, Value};

/// The prefix [`project`] puts in front of every path.
pub const DEFAULT_PREFIX: &str = "value";

/// Reads values out of a resolved customization tree.
pub trait Selector {
    /// Returns the value at `path`, if there is one.
    fn select(&self, path: &[Key]) -> Option<Value>;
}

impl Selector for Tree {
    fn select(&self, path: &[Key]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.get(first)?;
        for key in rest {
            current = current.as_tree()?.get(key)?;
        }
        Some(current.clone())
    }
}

/// A resolvable stand-in for one leaf of a schema.
#[derive(Clone)]
pub struct Handle {
    path: Vec<Key>,
    prefix_len: usize,
    kind: UnitKind,
    default: Option<Value>,
}

impl Handle {
    /// Creates a handle for the value at `path`.
    #[must_use]
    pub fn new(path: impl IntoIterator<Item = Key>, kind: UnitKind) -> Self {
        Self {
            path: path.into_iter().collect(),
            prefix_len: 0,
            kind,
            default: None,
        }
    }

    /// Uses `value` whenever the selected value is undefined.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// The full path, prefix included.
    #[must_use]
    pub fn path(&self) -> &[Key] {
        &self.path
    }

    /// The path relative to the projection prefix.
    #[must_use]
    pub fn relative_path(&self) -> &[Key] {
        &self.path[self.prefix_len..]
    }

    /// The full path joined with dots.
    #[must_use]
    pub fn dotted_path(&self) -> String {
        let mut out = String::new();
        for (i, key) in self.path.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(key);
        }
        out
    }

    /// The declared kind.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Reads the current value, falling back to the default.
    #[must_use]
    pub fn select(&self, selector: &impl Selector) -> Value {
        match selector.select(&self.path) {
            Some(value) if !value.is_undefined() => value,
            _ => self.default.clone().unwrap_or_default(),
        }
    }

    fn mismatch(&self, found: &Value) -> CustomError {
        CustomError::TypeMismatch {
            path: self.dotted_path(),
            expected: self.kind.name(),
            found: found.kind_name(),
        }
    }

    /// Resolves a component handle and renders it.
    ///
    /// A component derivation is used with `props`. Bare string tags and
    /// opaque primitives are lifted into components.
    ///
    /// # Errors
    ///
    /// - [`CustomError::IdentityViolation`] if an unsafe derivation changed.
    /// - [`CustomError::TypeMismatch`] if the value is not a component.
    /// - Any error from [`Component::render`].
    pub fn render_component(
        &self,
        selector: &impl Selector,
        tracker: &mut DerivationTracker,
        props: &Tree,
        children: Vec<Element>,
    ) -> Result<Element> {
        let component = self.component(selector, tracker, props)?;
        component.render(props, children)
    }

    /// Resolves a component handle to its component without rendering.
    ///
    /// # Errors
    ///
    /// See [`Handle::render_component`].
    pub fn component(
        &self,
        selector: &impl Selector,
        tracker: &mut DerivationTracker,
        props: &Tree,
    ) -> Result<Component> {
        let value = self.use_value(selector, tracker, &[Value::Tree(props.clone())])?;
        match value {
            Value::Unit(Unit::Component(component)) => Ok(component),
            Value::Str(tag) => Ok(Component::new(Primitive::tag(&tag))),
            Value::Opaque(ref opaque) => opaque
                .downcast_ref::<Primitive>()
                .map(|primitive| Component::new(primitive.clone()))
                .ok_or_else(|| self.mismatch(&value)),
            other => Err(self.mismatch(&other)),
        }
    }

    /// Resolves a text handle and renders it.
    ///
    /// `transformer`, if any, is a derivation mapping one text payload to
    /// another. Its identity is tracked like the text's own.
    ///
    /// # Errors
    ///
    /// - [`CustomError::IdentityViolation`] if an unsafe derivation changed.
    /// - [`CustomError::TypeMismatch`] if the value is not text.
    pub fn render_text(
        &self,
        selector: &impl Selector,
        tracker: &mut DerivationTracker,
        props: &Tree,
        transformer: Option<&Hook>,
    ) -> Result<Element> {
        self.text_value(selector, tracker, props, transformer)
            .map(TextPayload::into_element)
    }

    /// Resolves a text handle to its (possibly transformed) payload.
    ///
    /// # Errors
    ///
    /// See [`Handle::render_text`].
    pub fn text_value(
        &self,
        selector: &impl Selector,
        tracker: &mut DerivationTracker,
        props: &Tree,
        transformer: Option<&Hook>,
    ) -> Result<TextPayload> {
        let text = self.text(selector, tracker, props)?;
        let Some(hook) = transformer else {
            return text.transformed(TextProps::from_tree(props), None);
        };
        tracker.observe(
            &self.transformer_path(),
            &Resolved {
                value: Value::Undefined,
                is_safe: hook.is_safe(),
                hops: SmallVec::from_elem(hook.original_fn_id(), 1),
            },
        )?;
        let transform = |payload: &TextPayload| {
            TextPayload::from_value(&hook.call(&[payload.to_value()]))
        };
        text.transformed(TextProps::from_tree(props), Some(&transform))
    }

    /// Resolves a text handle to its untransformed payload.
    ///
    /// Text derivations are used with the transformer disabled.
    ///
    /// # Errors
    ///
    /// See [`Handle::render_text`].
    pub fn raw_text(
        &self,
        selector: &impl Selector,
        tracker: &mut DerivationTracker,
    ) -> Result<TextPayload> {
        let props = TextProps {
            disable_transformer: true,
        }
        .to_tree();
        Ok(self.text(selector, tracker, &props)?.raw().clone())
    }

    fn text(
        &self,
        selector: &impl Selector,
        tracker: &mut DerivationTracker,
        props: &Tree,
    ) -> Result<Text> {
        let value = self.use_value(selector, tracker, &[Value::Tree(props.clone())])?;
        match value {
            Value::Unit(Unit::Text(text)) => Ok(text),
            other => TextPayload::from_value(&other)
                .map(Text::new)
                .map_err(|_| self.mismatch(&other)),
        }
    }

    fn transformer_path(&self) -> String {
        let mut path = self.dotted_path();
        path.push_str("#transformer");
        path
    }

    /// Resolves a data handle with `args`.
    ///
    /// A data unit yields its value and ignores `args`. A derivation is
    /// used with `args`, and a data unit it produces is unwrapped.
    ///
    /// # Errors
    ///
    /// - [`CustomError::IdentityViolation`] if an unsafe derivation changed.
    /// - [`CustomError::TypeMismatch`] if the value is neither data nor a
    ///   derivation.
    pub fn data(
        &self,
        selector: &impl Selector,
        tracker: &mut DerivationTracker,
        args: &[Value],
    ) -> Result<Value> {
        let selected = self.select(selector);
        if !matches!(selected, Value::Unit(Unit::Data(_) | Unit::Hook(_))) {
            return Err(self.mismatch(&selected));
        }
        match self.use_selected(selected, tracker, args)? {
            Value::Unit(Unit::Data(data)) => Ok(data.value().clone()),
            other => Ok(other),
        }
    }

    /// Resolves a raw derivation handle with `args`.
    ///
    /// A value that is not a derivation acts as a safe constant function.
    ///
    /// # Errors
    ///
    /// [`CustomError::IdentityViolation`] if an unsafe derivation changed.
    pub fn call(
        &self,
        selector: &impl Selector,
        tracker: &mut DerivationTracker,
        args: &[Value],
    ) -> Result<Value> {
        let chain = match self.select(selector) {
            Value::Unit(Unit::Hook(hook)) => hook.resolve(args),
            constant => Resolved {
                value: constant,
                is_safe: true,
                hops: SmallVec::new(),
            },
        };
        tracker.observe(&self.dotted_path(), &chain)?;
        Ok(chain.value)
    }

    fn use_value(
        &self,
        selector: &impl Selector,
        tracker: &mut DerivationTracker,
        args: &[Value],
    ) -> Result<Value> {
        self.use_selected(self.select(selector), tracker, args)
    }

    /// Uses a derivation, or passes a plain value through.
    ///
    /// Plain values count as an empty, unsafe chain: swapping a derivation
    /// for a plain value (or back) is a change that needs a remount.
    fn use_selected(
        &self,
        selected: Value,
        tracker: &mut DerivationTracker,
        args: &[Value],
    ) -> Result<Value> {
        let chain = match selected {
            Value::Unit(Unit::Hook(hook)) => hook.resolve(args),
            plain => Resolved {
                value: plain,
                is_safe: false,
                hops: SmallVec::new(),
            },
        };
        tracker.observe(&self.dotted_path(), &chain)?;
        Ok(chain.value)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("path", &self.dotted_path())
            .field("kind", &self.kind)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// The handles produced by [`project`].
#[derive(Clone, Debug, Default)]
pub struct Projection {
    /// Sorted by relative path.
    handles: Vec<Handle>,
}

impl Projection {
    /// Returns the handle at `path`, relative to the prefix.
    #[must_use]
    pub fn get(&self, path: &[&str]) -> Option<&Handle> {
        self.handles
            .binary_search_by(|handle| {
                handle
                    .relative_path()
                    .iter()
                    .map(|key| &**key)
                    .cmp(path.iter().copied())
            })
            .ok()
            .map(|index| &self.handles[index])
    }

    /// Iterates over all handles in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Handle> + '_ {
        self.handles.iter()
    }

    /// Returns the number of handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if the schema declared nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Projects `schema` under the [`DEFAULT_PREFIX`].
#[must_use]
pub fn project(schema: &Tree) -> Projection {
    project_with_prefix(schema, &[DEFAULT_PREFIX])
}

/// Projects `schema`, prefixing every path with `prefix`.
///
/// Leaves that declare no kind (plain scalars, callbacks, lists) are
/// skipped; nested trees are walked.
#[must_use]
pub fn project_with_prefix(schema: &Tree, prefix: &[&str]) -> Projection {
    let mut path: Vec<Key> = prefix.iter().map(|&key| Key::from(key)).collect();
    let mut handles = Vec::new();
    walk(schema, &mut path, prefix.len(), &mut handles);
    handles.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));
    Projection { handles }
}

fn walk(schema: &Tree, path: &mut Vec<Key>, prefix_len: usize, out: &mut Vec<Handle>) {
    for (key, value) in schema.iter() {
        path.push(key.clone());
        if let Some(kind) = declared_kind(value) {
            out.push(Handle {
                path: path.clone(),
                prefix_len,
                kind,
                default: None,
            });
        } else if let Value::Tree(nested) = value {
            walk(nested, path, prefix_len, out);
        }
        path.pop();
    }
}

fn declared_kind(value: &Value) -> Option<UnitKind> {
    match value {
        Value::Str(tag) => match &**tag {
            "c" => Some(UnitKind::Component),
            "t" => Some(UnitKind::Text),
            "d" => Some(UnitKind::Data),
            "h" => Some(UnitKind::Hook),
            _ => None,
        },
        Value::Unit(Unit::Hook(hook)) => Some(match hook.kind() {
            HookKind::Component => UnitKind::Component,
            HookKind::Text => UnitKind::Text,
            HookKind::Data => UnitKind::Data,
            HookKind::Raw => UnitKind::Hook,
        }),
        Value::Unit(unit) => Some(unit.kind()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data;
    use crate::slots::Slot;
    use crate::tracker::RemountBoundary;
    use alloc::vec;

    fn layer(inner: Tree) -> Tree {
        Tree::new().with(DEFAULT_PREFIX, inner)
    }

    fn handle(name: &str, kind: UnitKind) -> Handle {
        Handle::new([Key::from(DEFAULT_PREFIX), Key::from(name)], kind)
    }

    #[test]
    fn schema_kinds_become_handles() {
        let schema = Tree::new()
            .with("button", Component::new("button"))
            .with(
                "labels",
                Tree::new().with("ok", "t").with("cancel", Text::new("Cancel")),
            )
            .with("format", Hook::data_fn(|_| Value::Null))
            .with("ignored", 3);
        let projection = project(&schema);

        assert_eq!(projection.len(), 4);
        let ok = projection.get(&["labels", "ok"]).unwrap();
        assert_eq!(ok.kind(), UnitKind::Text);
        assert_eq!(ok.dotted_path(), "value.labels.ok");
        assert_eq!(
            projection.get(&["format"]).unwrap().kind(),
            UnitKind::Data
        );
        assert!(projection.get(&["ignored"]).is_none());
    }

    #[test]
    fn custom_prefix() {
        let projection = project_with_prefix(&Tree::new().with("a", "h"), &["theme", "x"]);
        let handle = projection.get(&["a"]).unwrap();
        assert_eq!(handle.dotted_path(), "theme.x.a");
        assert_eq!(handle.relative_path().len(), 1);
    }

    #[test]
    fn component_handle_renders_slots() {
        let component = Component::new("div")
            .add_component(Slot::InnerStart, [Component::new("i")], None);
        let resolved = layer(Tree::new().with("box", component));
        let handle = handle("box", UnitKind::Component);

        let mut tracker = DerivationTracker::new();
        let element = handle
            .render_component(&resolved, &mut tracker, &Tree::new(), vec![Element::text("c")])
            .unwrap();
        let children = element.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1], Element::text("c"));
    }

    #[test]
    fn string_tags_lift_into_components() {
        let resolved = layer(Tree::new().with("box", "section"));
        let handle = handle("box", UnitKind::Component);
        let component = handle
            .component(&resolved, &mut DerivationTracker::new(), &Tree::new())
            .unwrap();
        assert_eq!(component.primitive(), Some(&Primitive::tag("section")));
    }

    #[test]
    fn wrong_kind_is_a_type_mismatch() {
        let resolved = layer(Tree::new().with("box", 3));
        let handle = handle("box", UnitKind::Component);
        let err = handle
            .component(&resolved, &mut DerivationTracker::new(), &Tree::new())
            .unwrap_err();
        assert_eq!(
            err,
            CustomError::type_mismatch("value.box", "component", "number")
        );
    }

    #[test]
    fn defaults_fill_missing_values() {
        let handle = Handle::new([Key::from("v"), Key::from("x")], UnitKind::Data)
            .with_default(Data::new(7));
        let value = handle
            .data(&Tree::new(), &mut DerivationTracker::new(), &[])
            .unwrap();
        assert_eq!(value, Value::from(7));
    }

    #[test]
    fn data_handles_unwrap_derivation_results_and_ignore_args_for_data() {
        let handle = Handle::new([Key::from("v"), Key::from("x")], UnitKind::Data);
        let mut tracker = DerivationTracker::new();

        let plain = Tree::new().with("v", Tree::new().with("x", Data::new("d")));
        let value = handle.data(&plain, &mut tracker, &[Value::from(1)]).unwrap();
        assert_eq!(value, Value::from("d"));

        let derived = Tree::new().with(
            "v",
            Tree::new().with(
                "x",
                Hook::data_fn(|args| Value::from(Data::new(args[0].clone()))),
            ),
        );
        let mut tracker = DerivationTracker::new();
        let value = handle.data(&derived, &mut tracker, &[Value::from(5)]).unwrap();
        assert_eq!(value, Value::from(5));
    }

    #[test]
    fn text_handles_apply_the_transformer() {
        let resolved = layer(Tree::new().with("title", "hello"));
        let handle = handle("title", UnitKind::Text);
        let upper = Hook::function(|args| match args.first() {
            Some(Value::Str(s)) => Value::from(s.to_uppercase()),
            _ => Value::Undefined,
        });

        let mut tracker = DerivationTracker::new();
        let element = handle
            .render_text(&resolved, &mut tracker, &Tree::new(), Some(&upper))
            .unwrap();
        assert_eq!(element, Element::text("HELLO"));

        let raw = handle.raw_text(&resolved, &mut tracker).unwrap();
        assert_eq!(raw, TextPayload::from("hello"));

        let disabled = TextProps {
            disable_transformer: true,
        }
        .to_tree();
        let element = handle
            .render_text(&resolved, &mut tracker, &disabled, Some(&upper))
            .unwrap();
        assert_eq!(element, Element::text("hello"));
    }

    #[test]
    fn raw_hook_handles_treat_values_as_constants() {
        let handle = handle("n", UnitKind::Hook);
        let mut tracker = DerivationTracker::new();
        let constant = layer(Tree::new().with("n", 4));
        assert_eq!(handle.call(&constant, &mut tracker, &[]).unwrap(), Value::from(4));

        // A safe constant may be swapped for a derivation.
        let derived = layer(Tree::new().with("n", Hook::function(|_| Value::from(5))));
        assert_eq!(handle.call(&derived, &mut tracker, &[]).unwrap(), Value::from(5));
    }

    #[test]
    fn swapping_an_unsafe_component_hook_remounts() {
        let handle = handle("b", UnitKind::Component);
        let first = layer(Tree::new().with(
            "b",
            Hook::component_hook(|_| Value::from(Component::new("b"))),
        ));
        let second = layer(Tree::new().with(
            "b",
            Hook::component_hook(|_| Value::from(Component::new("b"))),
        ));

        let mut boundary = RemountBoundary::new();
        for resolved in [&first, &second, &second] {
            boundary
                .run(|tracker| handle.render_component(resolved, tracker, &Tree::new(), vec![]))
                .unwrap();
        }
        assert_eq!(boundary.remounts(), 1);
    }
}
