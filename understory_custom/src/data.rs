// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data units.

use alloc::rc::Rc;
use core::fmt;

use crate::memo::ObjectRef;
use crate::value::Value;

/// A customizable wrapper around an arbitrary immutable value.
///
/// A data unit resolved through a handle may be called with arguments
/// like a data derivation; the arguments are ignored.
#[derive(Clone)]
pub struct Data {
    inner: Rc<Value>,
}

impl Data {
    /// Wraps a value.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            inner: Rc::new(value.into()),
        }
    }

    /// Returns the wrapped value.
    #[must_use]
    #[inline]
    pub fn value(&self) -> &Value {
        &self.inner
    }

    /// Data merge: the higher-priority data always wins.
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

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Data").field(&*self.inner).finish()
    }
}
