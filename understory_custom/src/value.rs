// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic layer values.
//!
//! Layers are plain nested key-value trees whose leaves are customizable
//! units, derivations, or plain values. [`Value`] is the closed set of
//! things a leaf can be, and [`Tree`] is the nested map.
//!
//! Reference-backed variants (`List`, `Tree`, `Callback`, `Unit`, `Opaque`)
//! carry an identity; scalars do not. Identity is what the memo stores key
//! on, so a tree passed twice is recognised as "the same input".

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use crate::component::Component;
use crate::data::Data;
use crate::hook::Hook;
use crate::memo::ObjectRef;
use crate::text::Text;
use crate::unit::Unit;

/// A tree key. Shared so that cloning trees never copies key text.
pub type Key = Rc<str>;

/// A leaf or branch of a layer tree.
#[derive(Clone, Default)]
pub enum Value {
    /// Explicitly absent. Merging treats it like a missing key.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string.
    Str(Key),
    /// A list. Lists are never merged element-wise.
    List(Rc<[Value]>),
    /// A plain nested map.
    Tree(Tree),
    /// A function value (event handlers and similar).
    Callback(Callback),
    /// A customizable unit or derivation.
    Unit(Unit),
    /// An opaque instance; never recursed into.
    Opaque(Opaque),
}

impl Value {
    /// Creates a string value.
    #[must_use]
    pub fn str(text: &str) -> Self {
        Self::Str(text.into())
    }

    /// Returns `true` for [`Value::Undefined`].
    #[must_use]
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns `true` for [`Value::Undefined`] and [`Value::Null`].
    #[must_use]
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Returns a short name of the variant, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Tree(_) => "tree",
            Self::Callback(_) => "callback",
            Self::Unit(unit) => unit.kind().name(),
            Self::Opaque(_) => "opaque",
        }
    }

    /// Returns the nested tree, if this is one.
    #[must_use]
    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Returns the unit, if this is one.
    #[must_use]
    pub fn as_unit(&self) -> Option<&Unit> {
        match self {
            Self::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the number, if this is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the callback, if this is one.
    #[must_use]
    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Self::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    /// Identity comparison: scalars by value, reference-backed values by
    /// pointer.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Tree(a), Self::Tree(b)) => a.ptr_eq(b),
            (Self::Callback(a), Self::Callback(b)) => a.ptr_eq(b),
            (Self::Unit(a), Self::Unit(b)) => a.ptr_eq(b),
            (Self::Opaque(a), Self::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Returns the identity handle used as a memo key, or `None` for
    /// scalars (which bypass memoization).
    pub(crate) fn object_ref(&self) -> Option<ObjectRef> {
        match self {
            Self::List(list) => Some(ObjectRef::new(list)),
            Self::Tree(tree) => Some(ObjectRef::new(&tree.inner)),
            Self::Callback(cb) => Some(ObjectRef::new(&cb.inner)),
            Self::Unit(unit) => Some(unit.object_ref()),
            Self::Opaque(opaque) => Some(ObjectRef::new(&opaque.inner)),
            _ => None,
        }
    }
}

/// Structural equality: trees and lists compare deeply, callbacks, units
/// and opaque values compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b) || a[..] == b[..],
            (Self::Tree(a), Self::Tree(b)) => a == b,
            _ => self.same(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::List(list) => f.debug_list().entries(list.iter()).finish(),
            Self::Tree(tree) => tree.fmt(f),
            Self::Callback(cb) => cb.fmt(f),
            Self::Unit(unit) => unit.fmt(f),
            Self::Opaque(opaque) => opaque.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value.into())
    }
}

impl From<Tree> for Value {
    fn from(value: Tree) -> Self {
        Self::Tree(value)
    }
}

impl From<Callback> for Value {
    fn from(value: Callback) -> Self {
        Self::Callback(value)
    }
}

impl From<Opaque> for Value {
    fn from(value: Opaque) -> Self {
        Self::Opaque(value)
    }
}

impl From<Unit> for Value {
    fn from(value: Unit) -> Self {
        Self::Unit(value)
    }
}

impl From<Component> for Value {
    fn from(value: Component) -> Self {
        Self::Unit(value.into())
    }
}

impl From<Text> for Value {
    fn from(value: Text) -> Self {
        Self::Unit(value.into())
    }
}

impl From<Data> for Value {
    fn from(value: Data) -> Self {
        Self::Unit(value.into())
    }
}

impl From<Hook> for Value {
    fn from(value: Hook) -> Self {
        Self::Unit(value.into())
    }
}

/// An immutable, shared, key-sorted map of [`Value`]s.
///
/// Cloning is cheap (`Rc`). Mutating methods are copy-on-write: if the
/// underlying storage is shared (for example with a memo store), it is
/// copied first, so values handed out earlier never change.
///
/// # Example
///
/// ```rust
/// use understory_custom::{Tree, Value};
///
/// let base = Tree::new().with("color", "red").with("size", 2);
/// let mut edited = base.clone();
/// edited.set("color", "blue");
///
/// assert_eq!(base.get("color"), Some(&Value::from("red")));
/// assert_eq!(edited.get("color"), Some(&Value::from("blue")));
/// assert!(!base.ptr_eq(&edited));
/// ```
#[derive(Clone, Default)]
pub struct Tree {
    inner: Rc<TreeData>,
}

#[derive(Clone, Default)]
pub(crate) struct TreeData {
    /// Sorted by key for binary search lookup.
    entries: Vec<(Key, Value)>,
}

impl TreeData {
    #[inline]
    fn find(&self, key: &str) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| (**k).cmp(key))
    }
}

impl Tree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` if the tree has no keys.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Gets the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner
            .find(key)
            .ok()
            .map(|idx| &self.inner.entries[idx].1)
    }

    /// Returns `true` if `key` is present (even if its value is undefined).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.find(key).is_ok()
    }

    /// Follows a path of keys through nested trees.
    ///
    /// Returns `None` as soon as a step is missing or not a tree.
    #[must_use]
    pub fn get_path<'a>(&'a self, path: &[&str]) -> Option<&'a Value> {
        let (last, parents) = path.split_last()?;
        let mut node = self;
        for key in parents {
            node = node.get(key)?.as_tree()?;
        }
        node.get(last)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> + '_ {
        self.inner.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterates keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.inner.entries.iter().map(|(k, _)| k)
    }

    /// Sets `key` to `value`, copying the storage first if it is shared.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let data = Rc::make_mut(&mut self.inner);
        match data.find(&key) {
            Ok(idx) => data.entries[idx].1 = value,
            Err(idx) => data.entries.insert(idx, (key, value)),
        }
    }

    /// Removes `key`, copying the storage first if it is shared.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.inner.find(key).ok()?;
        Some(Rc::make_mut(&mut self.inner).entries.remove(idx).1)
    }

    /// Builder-style [`Tree::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns `true` if both handles point at the same storage.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(&self.inner)
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.len() == other.len()
                && self
                    .inner
                    .entries
                    .iter()
                    .zip(other.inner.entries.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && va == vb))
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Tree {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        for (key, value) in iter {
            tree.set(key, value);
        }
        tree
    }
}

type CallbackFn = dyn Fn(&[Value]) -> Value;

/// A shared function value compared by identity.
#[derive(Clone)]
pub struct Callback {
    inner: Rc<CallbackFn>,
}

impl Callback {
    /// Wraps a function.
    #[must_use]
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self { inner: Rc::new(f) }
    }

    /// Invokes the function.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.inner)(args)
    }

    /// Returns `true` if both handles wrap the same function instance.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback")
            .field(&Rc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

/// An opaque, shared instance (never merged structurally).
#[derive(Clone)]
pub struct Opaque {
    inner: Rc<dyn Any>,
}

impl Opaque {
    /// Wraps a value.
    #[must_use]
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            inner: Rc::new(value),
        }
    }

    /// Attempts to view the value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Returns `true` if both handles wrap the same instance.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opaque").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn tree_keeps_keys_sorted() {
        let tree = Tree::new().with("b", 2).with("a", 1).with("c", 3);
        let keys: Vec<&str> = tree.keys().map(|k| &**k).collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn tree_set_replaces() {
        let mut tree = Tree::new().with("a", 1);
        tree.set("a", 5);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get("a"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn tree_copy_on_write() {
        let original = Tree::new().with("a", 1);
        let mut copy = original.clone();
        assert!(copy.ptr_eq(&original));

        copy.set("b", 2);
        assert!(!copy.ptr_eq(&original));
        assert!(!original.contains_key("b"));
        assert_eq!(copy.len(), 2);
    }

    #[test]
    fn tree_remove() {
        let mut tree = Tree::new().with("a", 1).with("b", 2);
        assert_eq!(tree.remove("a"), Some(Value::Number(1.0)));
        assert_eq!(tree.remove("a"), None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn get_path_walks_nested_trees() {
        let tree = Tree::new().with("theme", Tree::new().with("button", Tree::new().with("size", 3)));
        assert_eq!(
            tree.get_path(&["theme", "button", "size"]),
            Some(&Value::Number(3.0))
        );
        assert_eq!(tree.get_path(&["theme", "missing", "size"]), None);
        assert_eq!(tree.get_path(&["theme", "button", "size", "deeper"]), None);
        assert_eq!(tree.get_path(&[]), None);
    }

    #[test]
    fn deep_equality_vs_identity() {
        let a = Value::from(Tree::new().with("x", 1));
        let b = Value::from(Tree::new().with("x", 1));
        assert_eq!(a, b);
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
    }

    #[test]
    fn callbacks_compare_by_identity() {
        let cb = Callback::new(|_| Value::Null);
        let other = Callback::new(|_| Value::Null);
        assert_eq!(Value::from(cb.clone()), Value::from(cb));
        assert_ne!(
            Value::from(other),
            Value::from(Callback::new(|_| Value::Null))
        );
    }

    #[test]
    fn scalars_have_no_identity() {
        assert!(Value::from(1).object_ref().is_none());
        assert!(Value::from("s").object_ref().is_none());
        assert!(Value::Null.object_ref().is_none());
        assert!(Value::from(Tree::new()).object_ref().is_some());
        assert!(Value::from(vec![Value::Null]).object_ref().is_some());
    }

    #[test]
    fn opaque_downcast() {
        let opaque = Opaque::new(7_u8);
        assert_eq!(opaque.downcast_ref::<u8>(), Some(&7));
        assert_eq!(opaque.downcast_ref::<u16>(), None);
    }
}
