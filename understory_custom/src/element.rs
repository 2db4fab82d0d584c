// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderable results.
//!
//! An [`Element`] is what resolving a component or text produces. It is a
//! plain description handed to the host runtime; nothing in this crate
//! interprets it further.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::value::{Key, Tree};

/// The underlying renderable primitive of a component.
#[derive(Clone)]
pub enum Primitive {
    /// A generic markup-like leaf (`"div"`, `"span"`), compared by name.
    Tag(Rc<str>),
    /// A host-defined widget, compared by identity.
    Widget(Widget),
}

impl Primitive {
    /// Creates a markup tag primitive.
    #[must_use]
    pub fn tag(name: &str) -> Self {
        Self::Tag(name.into())
    }

    /// Returns `true` for markup tags.
    #[must_use]
    #[inline]
    pub fn is_tag(&self) -> bool {
        matches!(self, Self::Tag(_))
    }

    /// Returns the tag or widget name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Tag(name) => name,
            Self::Widget(widget) => widget.name(),
        }
    }
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tag(a), Self::Tag(b)) => a == b,
            (Self::Widget(a), Self::Widget(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(name) => f.debug_tuple("Tag").field(name).finish(),
            Self::Widget(widget) => widget.fmt(f),
        }
    }
}

impl From<&str> for Primitive {
    fn from(name: &str) -> Self {
        Self::tag(name)
    }
}

impl From<Widget> for Primitive {
    fn from(widget: Widget) -> Self {
        Self::Widget(widget)
    }
}

/// A host-defined widget kind.
///
/// Two widgets are the same primitive only if they are the same instance;
/// creating two widgets with the same name yields two distinct primitives.
#[derive(Clone)]
pub struct Widget {
    name: Rc<str>,
}

impl Widget {
    /// Creates a new, distinct widget kind.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if both handles are the same widget kind.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.name, &other.name)
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Widget").field(&self.name).finish()
    }
}

/// A materialized node: a primitive with final props and children.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementNode {
    /// The primitive the node instantiates.
    pub primitive: Primitive,
    /// Final props after defaults, stripping and transforms.
    pub props: Tree,
    /// Positional key used by the host for reconciliation.
    pub key: Option<Key>,
    /// Child elements in order.
    pub children: Vec<Element>,
}

/// A renderable result.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Element {
    /// Renders nothing.
    #[default]
    Empty,
    /// A text run.
    Text(Rc<str>),
    /// A primitive instance.
    Node(ElementNode),
    /// A sequence of siblings without a wrapping node.
    Fragment(Vec<Element>),
}

impl Element {
    /// Creates a text element.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Text(text.into())
    }

    /// Creates a node with no key.
    #[must_use]
    pub fn node(primitive: impl Into<Primitive>, props: Tree, children: Vec<Self>) -> Self {
        Self::Node(ElementNode {
            primitive: primitive.into(),
            props,
            key: None,
            children,
        })
    }

    /// Returns the node, if this is one.
    #[must_use]
    pub fn as_node(&self) -> Option<&ElementNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the node's key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.as_node().and_then(|node| node.key.as_deref())
    }

    /// Sets the key on a node; other elements are returned unchanged.
    #[must_use]
    pub(crate) fn keyed(mut self, key: Option<Key>) -> Self {
        if let (Self::Node(node), Some(key)) = (&mut self, key) {
            node.key = Some(key);
        }
        self
    }

    /// Returns the children of a node or fragment.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Node(node) => &node.children,
            Self::Fragment(children) => children,
            Self::Empty | Self::Text(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn tags_compare_by_name_widgets_by_identity() {
        assert_eq!(Primitive::tag("div"), Primitive::from("div"));
        assert_ne!(Primitive::tag("div"), Primitive::tag("span"));

        let button = Widget::new("Button");
        assert_eq!(Primitive::from(button.clone()), Primitive::from(button));
        assert_ne!(
            Primitive::from(Widget::new("Button")),
            Primitive::from(Widget::new("Button"))
        );
    }

    #[test]
    fn keyed_only_touches_nodes() {
        let node = Element::node("div", Tree::new(), vec![]).keyed(Some("k".into()));
        assert_eq!(node.key(), Some("k"));
        let text = Element::text("hi").keyed(Some("k".into()));
        assert_eq!(text, Element::text("hi"));
    }
}
