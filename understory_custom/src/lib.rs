// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Custom: layered customization and override resolution.
//!
//! ## Overview
//!
//! A UI library ships default building blocks; themes, design systems and
//! applications stack their own overrides on top. This crate resolves such
//! a stack into one effective tree of customizable units, merging units
//! where the layers allow it and keeping structural sharing everywhere else.
//!
//! ## Units
//!
//! A [`Tree`] holds plain [`Value`]s and [`Unit`]s. There are four unit
//! families:
//!
//! - [`Component`]: a renderable primitive with default props, wrapper and
//!   child [`Slots`], flags and optional strategies.
//! - [`Text`]: a text payload with an optional rendering function.
//! - [`Data`]: a plain data value.
//! - [`Hook`]: a derivation producing any of the above when evaluated.
//!
//! Units are immutable handles. Merging or configuring them returns a new
//! unit; the inputs are never changed.
//!
//! ## Merging
//!
//! [`merge_customizations`] merges a higher-priority tree into a
//! lower-priority one. Units present on both sides are merged with
//! [`merge_units`], subject to [`MergeFlag`]s that can veto a merge (for
//! example [`MergeFlag::AvoidWithPackageDefaultValue`]). Results are
//! memoized in a [`MemoContainer`] keyed by input identity, so merging the
//! same inputs again returns the same objects.
//!
//! [`LayerStack`] folds a base and any number of layers, each with a
//! [`LayerMode`], and keeps the result stable across resolutions.
//!
//! ```rust
//! use understory_custom::{Component, LayerMode, LayerStack, Tree, Unit, Value};
//!
//! let defaults = Tree::new().with(
//!     "button",
//!     Component::new("button").with_defaults(Tree::new().with("className", "btn")),
//! );
//! let app = Tree::new().with(
//!     "button",
//!     Component::new("button").with_defaults(Tree::new().with("className", "primary")),
//! );
//!
//! let mut stack = LayerStack::with_package_defaults(&defaults);
//! stack.push(app, LayerMode::Merging);
//! let resolved = stack.resolve();
//!
//! let button = resolved.get("button").and_then(Value::as_unit).and_then(Unit::as_component);
//! let props = button.unwrap().merged_props(&Tree::new());
//! assert_eq!(props.get("className"), Some(&Value::from("primary btn")));
//! ```
//!
//! ## Linking
//!
//! A [`Linker`] spreads one value into sibling slots of a tree, merging
//! into whatever the slots already hold unless the units opt out.
//!
//! ## Consumption
//!
//! The [`projection`] module turns a schema into handles that read,
//! evaluate and render units out of a resolved tree. Each evaluation is
//! checked by a [`DerivationTracker`]: an unsafe derivation whose identity
//! changes between passes is an [`IdentityViolation`](CustomError::IdentityViolation),
//! which a [`RemountBoundary`] recovers from by starting over.
//!
//! The [`lift`] module lifts plain values of a raw tree into units.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod attrs;
mod component;
mod data;
mod element;
mod error;
mod flags;
mod hook;
mod layers;
pub mod lift;
mod link;
mod memo;
mod merge;
pub mod projection;
mod slots;
mod text;
mod tracker;
mod unit;
mod value;

pub use attrs::merge_attributes;
pub use component::{
    Component, ComponentMergeFn, ComponentOptions, Defaults, PropsMergeFn, PropsToDefaultsFn,
    TransformPropsFn,
};
pub use data::Data;
pub use element::{Element, ElementNode, Primitive, Widget};
pub use error::{CustomError, Result, StrategyError};
pub use flags::{BuiltinFlags, FlagInterner, FlagSet, MergeFlag};
pub use hook::{FnId, Hook, HookKind, Resolved};
pub use layers::{LayerMode, LayerStack};
pub use link::{LinkConfig, Linker};
pub use memo::{MemoContainer, MemoStore};
pub use merge::{
    Decision, DecisionFn, MergeConfig, MergeStrategy, merge_customizations, merge_units,
    reuse_unchanged,
};
pub use slots::{Slot, Slots, circular_index};
pub use text::{DISABLE_TRANSFORMER_KEY, Text, TextPayload, TextProps, TextTransformer};
pub use tracker::{DerivationTracker, RemountBoundary};
pub use unit::{Unit, UnitKind};
pub use value::{Callback, Key, Opaque, Tree, Value};
