// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named positional slots around and within a component.

use alloc::vec::Vec;
use core::fmt;

use crate::unit::Unit;

/// A named position relative to a component's own rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Siblings rendered before the (wrapped) element.
    OuterBefore,
    /// Siblings rendered after the (wrapped) element.
    OuterAfter,
    /// Wrappers around the element itself.
    OuterWrapper,
    /// Wrappers around the element and its outer siblings.
    OutermostWrapper,
    /// Children prepended to the element's children.
    InnerStart,
    /// Children appended to the element's children.
    InnerEnd,
    /// Wrappers around the assembled child list.
    InnerWrapper,
    /// Wrappers around the caller-supplied children only.
    InnermostWrapper,
}

impl Slot {
    /// Every slot, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::OuterBefore,
        Self::OuterAfter,
        Self::OuterWrapper,
        Self::OutermostWrapper,
        Self::InnerStart,
        Self::InnerEnd,
        Self::InnerWrapper,
        Self::InnermostWrapper,
    ];

    /// Returns the slot's name, also used as the prefix of entry keys.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::OuterBefore => "outerBefore",
            Self::OuterAfter => "outerAfter",
            Self::OuterWrapper => "outerWrapper",
            Self::OutermostWrapper => "outermostWrapper",
            Self::InnerStart => "innerStart",
            Self::InnerEnd => "innerEnd",
            Self::InnerWrapper => "innerWrapper",
            Self::InnermostWrapper => "innermostWrapper",
        }
    }

    /// Returns `true` for the four wrapper slots.
    #[must_use]
    pub fn is_wrapper(self) -> bool {
        matches!(
            self,
            Self::OuterWrapper | Self::OutermostWrapper | Self::InnerWrapper | Self::InnermostWrapper
        )
    }

    /// Returns `true` if, when two layers are merged, the lower layer's
    /// entries go first.
    ///
    /// "Before" slots and wrappers keep declaration order equal to visual
    /// order: what the base declared stays outermost.
    #[must_use]
    pub fn lower_layer_first(self) -> bool {
        matches!(self, Self::OuterBefore | Self::InnerStart) || self.is_wrapper()
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a possibly out-of-range insertion index into `0..=len`.
///
/// Indices inside `0..=len` are kept. Anything else wraps modulo `len + 1`,
/// so `-1` appends and `-2` inserts before the last entry.
///
/// ```rust
/// use understory_custom::circular_index;
///
/// assert_eq!(circular_index(-1, 0), 0);
/// assert_eq!(circular_index(-1, 2), 2);
/// assert_eq!(circular_index(5, 2), 2);
/// assert_eq!(circular_index(1, 2), 1);
/// ```
#[must_use]
pub fn circular_index(index: isize, len: usize) -> usize {
    let slots = len.saturating_add(1);
    if let Ok(idx) = usize::try_from(index) {
        if idx < slots {
            return idx;
        }
        return idx % slots;
    }
    let modulus = isize::try_from(slots).unwrap_or(isize::MAX);
    // rem_euclid of a positive modulus is non-negative.
    usize::try_from(index.rem_euclid(modulus)).unwrap_or(len)
}

/// The entries of every slot of one component.
#[derive(Clone, Default)]
pub struct Slots {
    lists: [Vec<Unit>; 8],
}

impl Slots {
    /// Creates empty slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entries of `slot`.
    #[must_use]
    #[inline]
    pub fn get(&self, slot: Slot) -> &[Unit] {
        &self.lists[slot.index()]
    }

    /// Returns `true` if no slot has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }

    /// Inserts `units` at a circular `index` (append when `None`).
    pub fn insert(&mut self, slot: Slot, units: impl IntoIterator<Item = Unit>, index: Option<isize>) {
        let list = &mut self.lists[slot.index()];
        let at = circular_index(index.unwrap_or(-1), list.len());
        list.splice(at..at, units);
    }

    /// Concatenates two layers' slots, `high` being the higher priority.
    #[must_use]
    pub fn concat(high: &Self, low: &Self) -> Self {
        let mut merged = Self::new();
        for slot in Slot::ALL {
            let (first, second) = if slot.lower_layer_first() {
                (low.get(slot), high.get(slot))
            } else {
                (high.get(slot), low.get(slot))
            };
            let list = &mut merged.lists[slot.index()];
            list.extend_from_slice(first);
            list.extend_from_slice(second);
        }
        merged
    }
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for slot in Slot::ALL {
            let list = self.get(slot);
            if !list.is_empty() {
                map.entry(&slot.name(), &list.len());
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data;
    use crate::value::Value;

    fn data(n: i32) -> Unit {
        Data::new(Value::from(n)).into()
    }

    fn values(slots: &Slots, slot: Slot) -> Vec<Value> {
        slots
            .get(slot)
            .iter()
            .map(|unit| match unit {
                Unit::Data(d) => d.value().clone(),
                _ => Value::Undefined,
            })
            .collect()
    }

    #[test]
    fn circular_index_wraps() {
        assert_eq!(circular_index(0, 0), 0);
        assert_eq!(circular_index(-1, 0), 0);
        assert_eq!(circular_index(2, 2), 2);
        assert_eq!(circular_index(5, 2), 2);
        assert_eq!(circular_index(4, 2), 1);
        assert_eq!(circular_index(-2, 2), 1);
        assert_eq!(circular_index(-3, 2), 0);
        assert_eq!(circular_index(-4, 2), 2);
    }

    #[test]
    fn insertion_order_for_minus_one_zero_len() {
        let mut slots = Slots::new();
        slots.insert(Slot::InnerEnd, [data(1)], Some(-1));
        slots.insert(Slot::InnerEnd, [data(2)], Some(0));
        slots.insert(Slot::InnerEnd, [data(3)], Some(2));
        assert_eq!(
            values(&slots, Slot::InnerEnd),
            [Value::from(2), Value::from(1), Value::from(3)]
        );
    }

    #[test]
    fn default_index_appends_many() {
        let mut slots = Slots::new();
        slots.insert(Slot::OuterAfter, [data(1)], None);
        slots.insert(Slot::OuterAfter, [data(2), data(3)], None);
        slots.insert(Slot::OuterAfter, [data(0)], Some(0));
        assert_eq!(
            values(&slots, Slot::OuterAfter),
            [Value::from(0), Value::from(1), Value::from(2), Value::from(3)]
        );
    }

    #[test]
    fn concat_order_depends_on_slot() {
        let mut high = Slots::new();
        high.insert(Slot::InnerEnd, [data(1)], None);
        high.insert(Slot::InnerStart, [data(1)], None);
        high.insert(Slot::OuterWrapper, [data(1)], None);
        let mut low = Slots::new();
        low.insert(Slot::InnerEnd, [data(2)], None);
        low.insert(Slot::InnerStart, [data(2)], None);
        low.insert(Slot::OuterWrapper, [data(2)], None);

        let merged = Slots::concat(&high, &low);
        assert_eq!(values(&merged, Slot::InnerEnd), [Value::from(1), Value::from(2)]);
        assert_eq!(values(&merged, Slot::InnerStart), [Value::from(2), Value::from(1)]);
        assert_eq!(values(&merged, Slot::OuterWrapper), [Value::from(2), Value::from(1)]);
        assert!(merged.get(Slot::OuterBefore).is_empty());
    }
}
