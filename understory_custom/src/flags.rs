// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Merge-policy flags and flag sets.
//!
//! A [`MergeFlag`] is either one of the reserved policy tokens or an
//! arbitrary host-defined string. A [`FlagSet`] is an immutable,
//! order-independent set of flags with union/subtract algebra.
//!
//! Reserved flags are stored in a [`BuiltinFlags`] bitmask; host flags are
//! kept in a small sorted list next to it. [`FlagInterner`] hands out one
//! canonical [`FlagSet`] instance per distinct set of flags so callers can
//! detect "no flag change" by identity.

use alloc::rc::Rc;
use core::fmt;
use core::hash::{Hash, Hasher};

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::memo::ObjectRef;
use crate::value::Key;

bitflags::bitflags! {
    /// Bitmask of the reserved merge flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BuiltinFlags: u16 {
        /// The unit comes from a package default layer.
        const IS_PACKAGE_DEFAULT_VALUE = 1 << 0;
        /// The merge is a linking merge (one value spread into sibling slots).
        const IS_LINKING = 1 << 1;
        /// Veto the merge if either side is a package default.
        const AVOID_WITH_PACKAGE_DEFAULT_VALUE = 1 << 2;
        /// Veto the merge unless both sides are package defaults.
        const AVOID_WITH_NON_PACKAGE_VALUE = 1 << 3;
        /// Veto the merge if it is a linking merge (conflicts with `IS_LINKING`).
        const AVOID_LINKING = 1 << 4;
        /// Unconditional veto.
        const AVOID_ANY_MERGING = 1 << 5;
        /// Veto specifically when `IS_LINKING` is present.
        const AVOID_LINKAGE_MERGING = 1 << 6;
        /// Veto when the two units wrap different primitives.
        const AVOID_MERGING_DIFFERENT_COMPONENTS = 1 << 7;
        /// Render-time opt-out of prop sanitization.
        const AVOID_STRIPPING_INVALID_DOM_PROPS = 1 << 8;
    }
}

/// A single merge-policy token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MergeFlag {
    /// See [`BuiltinFlags::IS_PACKAGE_DEFAULT_VALUE`].
    IsPackageDefaultValue,
    /// See [`BuiltinFlags::IS_LINKING`].
    IsLinking,
    /// See [`BuiltinFlags::AVOID_WITH_PACKAGE_DEFAULT_VALUE`].
    AvoidWithPackageDefaultValue,
    /// See [`BuiltinFlags::AVOID_WITH_NON_PACKAGE_VALUE`].
    AvoidWithNonPackageValue,
    /// See [`BuiltinFlags::AVOID_LINKING`].
    AvoidLinking,
    /// See [`BuiltinFlags::AVOID_ANY_MERGING`].
    AvoidAnyMerging,
    /// See [`BuiltinFlags::AVOID_LINKAGE_MERGING`].
    AvoidLinkageMerging,
    /// See [`BuiltinFlags::AVOID_MERGING_DIFFERENT_COMPONENTS`].
    AvoidMergingDifferentComponents,
    /// See [`BuiltinFlags::AVOID_STRIPPING_INVALID_DOM_PROPS`].
    AvoidStrippingInvalidDomProps,
    /// A host-defined flag.
    Custom(Key),
}

impl MergeFlag {
    /// Creates a host-defined flag.
    #[must_use]
    pub fn custom(name: &str) -> Self {
        Self::Custom(name.into())
    }

    /// Returns the bitmask for a reserved flag, or `None` for custom flags.
    #[must_use]
    pub fn builtin(&self) -> Option<BuiltinFlags> {
        Some(match self {
            Self::IsPackageDefaultValue => BuiltinFlags::IS_PACKAGE_DEFAULT_VALUE,
            Self::IsLinking => BuiltinFlags::IS_LINKING,
            Self::AvoidWithPackageDefaultValue => BuiltinFlags::AVOID_WITH_PACKAGE_DEFAULT_VALUE,
            Self::AvoidWithNonPackageValue => BuiltinFlags::AVOID_WITH_NON_PACKAGE_VALUE,
            Self::AvoidLinking => BuiltinFlags::AVOID_LINKING,
            Self::AvoidAnyMerging => BuiltinFlags::AVOID_ANY_MERGING,
            Self::AvoidLinkageMerging => BuiltinFlags::AVOID_LINKAGE_MERGING,
            Self::AvoidMergingDifferentComponents => {
                BuiltinFlags::AVOID_MERGING_DIFFERENT_COMPONENTS
            }
            Self::AvoidStrippingInvalidDomProps => BuiltinFlags::AVOID_STRIPPING_INVALID_DOM_PROPS,
            Self::Custom(_) => return None,
        })
    }

    /// Maps a single reserved bit back to its flag.
    fn from_builtin_bit(bit: BuiltinFlags) -> Option<Self> {
        [
            Self::IsPackageDefaultValue,
            Self::IsLinking,
            Self::AvoidWithPackageDefaultValue,
            Self::AvoidWithNonPackageValue,
            Self::AvoidLinking,
            Self::AvoidAnyMerging,
            Self::AvoidLinkageMerging,
            Self::AvoidMergingDifferentComponents,
            Self::AvoidStrippingInvalidDomProps,
        ]
        .into_iter()
        .find(|flag| flag.builtin() == Some(bit))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) struct FlagSetData {
    builtin: BuiltinFlags,
    /// Sorted and deduplicated.
    custom: SmallVec<[Key; 2]>,
}

impl FlagSetData {
    fn insert(&mut self, flag: MergeFlag) {
        match flag.builtin() {
            Some(bits) => self.builtin |= bits,
            None => {
                if let MergeFlag::Custom(name) = flag {
                    if let Err(idx) = self.custom.binary_search(&name) {
                        self.custom.insert(idx, name);
                    }
                }
            }
        }
    }
}

/// An immutable, order-independent set of [`MergeFlag`]s.
///
/// Cloning is cheap (`Rc`). Equality compares contents; use
/// [`FlagSet::ptr_eq`] for identity, which is meaningful for sets handed
/// out by a [`FlagInterner`].
///
/// # Example
///
/// ```rust
/// use understory_custom::{FlagSet, MergeFlag};
///
/// let a = FlagSet::from_flags([MergeFlag::AvoidAnyMerging, MergeFlag::custom("brand")]);
/// let b = FlagSet::from_flags([MergeFlag::custom("brand")]);
///
/// let diff = a.subtract(&b);
/// assert!(diff.contains(&MergeFlag::AvoidAnyMerging));
/// assert!(!diff.contains(&MergeFlag::custom("brand")));
/// assert_eq!(a.union(&b), a);
/// ```
#[derive(Clone, Default)]
pub struct FlagSet {
    inner: Rc<FlagSetData>,
}

impl FlagSet {
    /// Creates an empty flag set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a flag set from any collection of flags; duplicates collapse.
    #[must_use]
    pub fn from_flags(flags: impl IntoIterator<Item = MergeFlag>) -> Self {
        let mut data = FlagSetData::default();
        for flag in flags {
            data.insert(flag);
        }
        Self {
            inner: Rc::new(data),
        }
    }

    /// Creates a flag set from a reserved-flag bitmask.
    #[must_use]
    pub fn from_builtin(bits: BuiltinFlags) -> Self {
        Self {
            inner: Rc::new(FlagSetData {
                builtin: bits,
                custom: SmallVec::new(),
            }),
        }
    }

    /// Returns the reserved flags as a bitmask.
    #[must_use]
    #[inline]
    pub fn builtin(&self) -> BuiltinFlags {
        self.inner.builtin
    }

    /// Returns `true` if every reserved flag in `bits` is present.
    #[must_use]
    #[inline]
    pub fn has(&self, bits: BuiltinFlags) -> bool {
        self.inner.builtin.contains(bits)
    }

    /// Returns `true` if the flag is present.
    #[must_use]
    pub fn contains(&self, flag: &MergeFlag) -> bool {
        match flag {
            MergeFlag::Custom(name) => self.inner.custom.binary_search(name).is_ok(),
            other => other.builtin().is_some_and(|bits| self.has(bits)),
        }
    }

    /// Returns `true` if the set holds no flags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.builtin.is_empty() && self.inner.custom.is_empty()
    }

    /// Returns the number of flags in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.builtin.bits().count_ones() as usize + self.inner.custom.len()
    }

    /// Iterates the flags, reserved flags first, then custom flags sorted.
    pub fn iter(&self) -> impl Iterator<Item = MergeFlag> + '_ {
        self.inner
            .builtin
            .iter()
            .filter_map(MergeFlag::from_builtin_bit)
            .chain(self.inner.custom.iter().cloned().map(MergeFlag::Custom))
    }

    /// Returns the union of both sets.
    ///
    /// Returns a clone of `self` (same identity) when `other` adds nothing.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if other.is_subset(self) {
            return self.clone();
        }
        if self.is_subset(other) {
            return other.clone();
        }
        let mut data = (*self.inner).clone();
        data.builtin |= other.inner.builtin;
        for name in &other.inner.custom {
            data.insert(MergeFlag::Custom(name.clone()));
        }
        Self {
            inner: Rc::new(data),
        }
    }

    /// Returns `self` without the flags in `other`.
    ///
    /// Returns a clone of `self` (same identity) when nothing is removed.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        let removes_builtin = self.inner.builtin.intersects(other.inner.builtin);
        let removes_custom = other
            .inner
            .custom
            .iter()
            .any(|name| self.inner.custom.binary_search(name).is_ok());
        if !removes_builtin && !removes_custom {
            return self.clone();
        }
        let custom = self
            .inner
            .custom
            .iter()
            .filter(|name| other.inner.custom.binary_search(name).is_err())
            .cloned()
            .collect();
        Self {
            inner: Rc::new(FlagSetData {
                builtin: self.inner.builtin - other.inner.builtin,
                custom,
            }),
        }
    }

    /// Returns a copy of the set with `flag` added.
    #[must_use]
    pub fn with(&self, flag: MergeFlag) -> Self {
        if self.contains(&flag) {
            return self.clone();
        }
        let mut data = (*self.inner).clone();
        data.insert(flag);
        Self {
            inner: Rc::new(data),
        }
    }

    /// Returns `true` if every flag of `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        other.inner.builtin.contains(self.inner.builtin)
            && self
                .inner
                .custom
                .iter()
                .all(|name| other.inner.custom.binary_search(name).is_ok())
    }

    /// Returns `true` if both handles point at the same set instance.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(&self.inner)
    }
}

impl PartialEq for FlagSet {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner == other.inner
    }
}

impl Eq for FlagSet {}

impl Hash for FlagSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<MergeFlag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = MergeFlag>>(iter: I) -> Self {
        Self::from_flags(iter)
    }
}

impl From<BuiltinFlags> for FlagSet {
    fn from(bits: BuiltinFlags) -> Self {
        Self::from_builtin(bits)
    }
}

/// Hands out one canonical [`FlagSet`] instance per distinct set of flags.
///
/// Equal inputs (as sets, regardless of order or duplicates) always map to
/// the same instance, so downstream memo stores keyed by flag identity hit
/// whenever the flags did not actually change.
///
/// The interner never forgets a set; the number of distinct flag sets in a
/// program is small.
#[derive(Debug, Default)]
pub struct FlagInterner {
    sets: HashMap<FlagSetData, FlagSet>,
}

impl FlagInterner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of distinct sets interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns `true` if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Returns the canonical instance equal to `set`.
    pub fn canonical(&mut self, set: &FlagSet) -> FlagSet {
        if let Some(existing) = self.sets.get(&*set.inner) {
            return existing.clone();
        }
        self.sets.insert((*set.inner).clone(), set.clone());
        set.clone()
    }

    /// Returns the canonical instance for a collection of flags.
    pub fn canonical_from(&mut self, flags: impl IntoIterator<Item = MergeFlag>) -> FlagSet {
        let set = FlagSet::from_flags(flags);
        self.canonical(&set)
    }
}
