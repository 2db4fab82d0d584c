// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed set of customizable units.

use core::fmt;

use crate::component::Component;
use crate::data::Data;
use crate::element::Primitive;
use crate::flags::FlagSet;
use crate::hook::{Hook, HookKind};
use crate::memo::ObjectRef;
use crate::text::Text;

/// The family of a [`Unit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// A [`Component`].
    Component,
    /// A [`Text`].
    Text,
    /// A [`Data`] value.
    Data,
    /// A [`Hook`] derivation.
    Hook,
}

impl UnitKind {
    /// Returns a short lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Text => "text",
            Self::Data => "data",
            Self::Hook => "hook",
        }
    }

    /// Returns the derivation kind that produces units of this family.
    #[must_use]
    pub fn hook_kind(self) -> HookKind {
        match self {
            Self::Component => HookKind::Component,
            Self::Text => HookKind::Text,
            Self::Data => HookKind::Data,
            Self::Hook => HookKind::Raw,
        }
    }
}

/// A customizable unit.
///
/// Units are immutable; every operation returns a new unit or an existing
/// one. Merging is directional: the receiver is the higher-priority layer.
#[derive(Clone)]
pub enum Unit {
    /// A component.
    Component(Component),
    /// A text.
    Text(Text),
    /// A data value.
    Data(Data),
    /// A derivation.
    Hook(Hook),
}

impl Unit {
    /// Returns the unit's family.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        match self {
            Self::Component(_) => UnitKind::Component,
            Self::Text(_) => UnitKind::Text,
            Self::Data(_) => UnitKind::Data,
            Self::Hook(_) => UnitKind::Hook,
        }
    }

    /// Merges `other` (lower priority) into `self`.
    ///
    /// Units of different families do not merge: `self` is returned.
    #[must_use]
    pub fn merge(&self, other: &Self, flags: &FlagSet) -> Self {
        if self.ptr_eq(other) {
            return self.clone();
        }
        match (self, other) {
            (Self::Component(a), Self::Component(b)) => Self::Component(a.merge(b, flags)),
            (Self::Text(a), Self::Text(b)) => Self::Text(a.merge(b)),
            (Self::Data(a), Self::Data(b)) => Self::Data(a.merge(b)),
            (Self::Hook(a), Self::Hook(b)) => Self::Hook(a.merge(b)),
            _ => self.clone(),
        }
    }

    /// Returns `true` if both handles are the same unit.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Component(a), Self::Component(b)) => a.ptr_eq(b),
            (Self::Text(a), Self::Text(b)) => a.ptr_eq(b),
            (Self::Data(a), Self::Data(b)) => a.ptr_eq(b),
            (Self::Hook(a), Self::Hook(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Returns the component, if this is one.
    #[must_use]
    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Self::Component(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the text, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the data, if this is one.
    #[must_use]
    pub fn as_data(&self) -> Option<&Data> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the derivation, if this is one.
    #[must_use]
    pub fn as_hook(&self) -> Option<&Hook> {
        match self {
            Self::Hook(h) => Some(h),
            _ => None,
        }
    }

    /// Returns the derivation if it produces components.
    #[must_use]
    pub fn as_component_hook(&self) -> Option<&Hook> {
        self.as_hook().filter(|h| h.kind() == HookKind::Component)
    }

    pub(crate) fn object_ref(&self) -> ObjectRef {
        match self {
            Self::Component(c) => c.object_ref(),
            Self::Text(t) => t.object_ref(),
            Self::Data(d) => d.object_ref(),
            Self::Hook(h) => h.object_ref(),
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(c) => c.fmt(f),
            Self::Text(t) => t.fmt(f),
            Self::Data(d) => d.fmt(f),
            Self::Hook(h) => h.fmt(f),
        }
    }
}

impl From<Component> for Unit {
    fn from(c: Component) -> Self {
        Self::Component(c)
    }
}

impl From<Text> for Unit {
    fn from(t: Text) -> Self {
        Self::Text(t)
    }
}

impl From<Data> for Unit {
    fn from(d: Data) -> Self {
        Self::Data(d)
    }
}

impl From<Hook> for Unit {
    fn from(h: Hook) -> Self {
        Self::Hook(h)
    }
}

impl From<Primitive> for Unit {
    fn from(primitive: Primitive) -> Self {
        Self::Component(Component::new(primitive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn self_merge_is_identity_for_every_kind() {
        let units = [
            Unit::from(Component::new("div")),
            Unit::from(Text::new("t")),
            Unit::from(Data::new(1)),
            Unit::from(Hook::function(|_| Value::Null)),
        ];
        for unit in units {
            assert!(unit.merge(&unit, &FlagSet::empty()).ptr_eq(&unit));
        }
    }

    #[test]
    fn different_families_keep_receiver() {
        let text = Unit::from(Text::new("t"));
        let data = Unit::from(Data::new(1));
        assert!(text.merge(&data, &FlagSet::empty()).ptr_eq(&text));
    }

    #[test]
    fn bare_primitive_lifts_into_component() {
        let unit = Unit::from(Primitive::tag("hr"));
        assert_eq!(unit.kind(), UnitKind::Component);
    }
}
