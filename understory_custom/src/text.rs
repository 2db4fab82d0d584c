// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text units.

use alloc::format;
use alloc::rc::Rc;
use core::fmt;

use crate::element::Element;
use crate::error::{CustomError, Result};
use crate::memo::ObjectRef;
use crate::value::{Opaque, Tree, Value};

/// Prop key that disables the text transformer.
pub const DISABLE_TRANSFORMER_KEY: &str = "disableTextTransformer";

/// The payload of a [`Text`] unit.
#[derive(Clone, Debug, PartialEq)]
pub enum TextPayload {
    /// Plain text.
    Str(Rc<str>),
    /// A number, rendered as its decimal form.
    Number(f64),
    /// Nothing.
    Null,
    /// Pre-built rich content.
    Rich(Element),
}

impl TextPayload {
    /// Converts the payload into a [`Value`] for derivations.
    ///
    /// Rich content travels as an opaque [`Element`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Str(s) => Value::Str(s.clone()),
            Self::Number(n) => Value::Number(*n),
            Self::Null => Value::Null,
            Self::Rich(element) => Value::Opaque(Opaque::new(element.clone())),
        }
    }

    /// Reads a payload back from a [`Value`].
    ///
    /// # Errors
    ///
    /// Returns [`CustomError::TypeMismatch`] for values that are not text.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(Self::Str(s.clone())),
            Value::Number(n) => Ok(Self::Number(*n)),
            Value::Null | Value::Undefined => Ok(Self::Null),
            Value::Opaque(opaque) => opaque
                .downcast_ref::<Element>()
                .map(|element| Self::Rich(element.clone()))
                .ok_or_else(|| CustomError::type_mismatch("", "text", "opaque")),
            other => Err(CustomError::type_mismatch("", "text", other.kind_name())),
        }
    }

    /// Renders the payload; numbers become strings.
    #[must_use]
    pub fn into_element(self) -> Element {
        match self {
            Self::Str(s) => Element::Text(s),
            Self::Number(n) => Element::Text(format!("{n}").into()),
            Self::Null => Element::Empty,
            Self::Rich(element) => element,
        }
    }
}

impl From<&str> for TextPayload {
    fn from(text: &str) -> Self {
        Self::Str(text.into())
    }
}

impl From<f64> for TextPayload {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Element> for TextPayload {
    fn from(element: Element) -> Self {
        Self::Rich(element)
    }
}

/// Props understood by [`Text::render`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextProps {
    /// Skip the external transformer and render the raw payload.
    pub disable_transformer: bool,
}

impl TextProps {
    /// Reads text props from a props tree.
    #[must_use]
    pub fn from_tree(props: &Tree) -> Self {
        Self {
            disable_transformer: matches!(
                props.get(DISABLE_TRANSFORMER_KEY),
                Some(Value::Bool(true))
            ),
        }
    }

    /// Writes text props into a props tree.
    #[must_use]
    pub fn to_tree(self) -> Tree {
        let mut tree = Tree::new();
        if self.disable_transformer {
            tree.set(DISABLE_TRANSFORMER_KEY, true);
        }
        tree
    }
}

/// A text transformer applied at resolution time.
pub type TextTransformer<'a> = &'a dyn Fn(&TextPayload) -> Result<TextPayload>;

/// A customizable text.
///
/// ```rust
/// use understory_custom::{Element, Text, TextPayload, TextProps};
///
/// let text = Text::new(42.0);
/// assert_eq!(text.raw(), &TextPayload::Number(42.0));
/// assert_eq!(
///     text.render(TextProps::default(), None).unwrap(),
///     Element::text("42")
/// );
/// ```
#[derive(Clone)]
pub struct Text {
    inner: Rc<TextPayload>,
}

impl Text {
    /// Creates a text unit.
    #[must_use]
    pub fn new(payload: impl Into<TextPayload>) -> Self {
        Self {
            inner: Rc::new(payload.into()),
        }
    }

    /// Creates a text unit holding nothing.
    #[must_use]
    pub fn null() -> Self {
        Self::new(TextPayload::Null)
    }

    /// Returns the untransformed payload.
    #[must_use]
    #[inline]
    pub fn raw(&self) -> &TextPayload {
        &self.inner
    }

    /// Applies `transformer` unless disabled by `props`.
    ///
    /// A transformer failing with [`CustomError::TypeMismatch`] falls back
    /// to the raw payload.
    ///
    /// # Errors
    ///
    /// Propagates any other transformer error.
    pub fn transformed(
        &self,
        props: TextProps,
        transformer: Option<TextTransformer<'_>>,
    ) -> Result<TextPayload> {
        let Some(transformer) = transformer.filter(|_| !props.disable_transformer) else {
            return Ok(self.raw().clone());
        };
        match transformer(self.raw()) {
            Ok(payload) => Ok(payload),
            Err(CustomError::TypeMismatch { .. }) => Ok(self.raw().clone()),
            Err(err) => Err(err),
        }
    }

    /// Renders the (possibly transformed) payload.
    ///
    /// # Errors
    ///
    /// See [`Text::transformed`].
    pub fn render(
        &self,
        props: TextProps,
        transformer: Option<TextTransformer<'_>>,
    ) -> Result<Element> {
        self.transformed(props, transformer)
            .map(TextPayload::into_element)
    }

    /// Text merge: the higher-priority text always wins.
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

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Text").field(&*self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn shout(payload: &TextPayload) -> Result<TextPayload> {
        match payload {
            TextPayload::Str(s) => Ok(TextPayload::from(s.to_uppercase().as_str())),
            _ => Err(CustomError::type_mismatch("", "string", "other")),
        }
    }

    #[test]
    fn numbers_render_as_strings() {
        assert_eq!(
            Text::new(1.5).render(TextProps::default(), None),
            Ok(Element::text("1.5"))
        );
        assert_eq!(
            Text::null().render(TextProps::default(), None),
            Ok(Element::Empty)
        );
    }

    #[test]
    fn transformer_applies_and_can_be_disabled() {
        let text = Text::new("hello");
        assert_eq!(
            text.render(TextProps::default(), Some(&shout)),
            Ok(Element::text("HELLO"))
        );
        let disabled = TextProps {
            disable_transformer: true,
        };
        assert_eq!(text.render(disabled, Some(&shout)), Ok(Element::text("hello")));
        assert_eq!(text.raw(), &TextPayload::from("hello"));
    }

    #[test]
    fn type_mismatch_falls_back_to_raw() {
        let text = Text::new(7.0);
        assert_eq!(
            text.transformed(TextProps::default(), Some(&shout)),
            Ok(TextPayload::Number(7.0))
        );
    }

    #[test]
    fn other_errors_propagate() {
        let failing = |_: &TextPayload| -> Result<TextPayload> {
            Err(CustomError::IdentityViolation {
                path: "t".to_string(),
            })
        };
        let err = Text::new("x")
            .render(TextProps::default(), Some(&failing))
            .unwrap_err();
        assert!(err.is_identity_violation());
    }

    #[test]
    fn payload_value_roundtrip_for_rich() {
        let rich = TextPayload::Rich(Element::text("bold"));
        assert_eq!(TextPayload::from_value(&rich.to_value()), Ok(rich));
        assert!(TextPayload::from_value(&Value::Bool(true)).is_err());
    }

    #[test]
    fn props_tree_roundtrip() {
        let props = TextProps {
            disable_transformer: true,
        };
        assert_eq!(TextProps::from_tree(&props.to_tree()), props);
        assert_eq!(TextProps::from_tree(&Tree::new()), TextProps::default());
    }
}
