// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Detecting derivation identity changes across resolution passes.
//!
//! Each pass resolves derivations through a [`DerivationTracker`], which
//! remembers the function identities of every chain it has seen, keyed by
//! path. A changed identity is harmless for a safe chain and an
//! [`IdentityViolation`](CustomError::IdentityViolation) for an unsafe one.
//! A [`RemountBoundary`] catches the violation, starts over with fresh
//! state and runs the pass again.

use alloc::string::String;
use core::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::{CustomError, Result};
use crate::hook::{FnId, Resolved};

type Chain = SmallVec<[FnId; 2]>;

/// Remembers the identity of each derivation chain, by path.
#[derive(Default)]
pub struct DerivationTracker {
    chains: HashMap<String, Chain>,
}

impl DerivationTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the chain behind `resolved` at `path`.
    ///
    /// The first observation at a path always succeeds. After that, a
    /// different chain (another function at any hop, or another number of
    /// hops) is accepted only if the chain is safe. On failure the
    /// previously recorded chain is kept.
    pub fn observe(&mut self, path: &str, resolved: &Resolved) -> Result<()> {
        match self.chains.get_mut(path) {
            None => {
                self.chains.insert(path.into(), resolved.hops.clone());
            }
            Some(chain) if *chain == resolved.hops => {}
            Some(chain) if resolved.is_safe => {
                tracing::debug!(path, "safe derivation changed identity");
                chain.clone_from(&resolved.hops);
            }
            Some(_) => {
                return Err(CustomError::IdentityViolation { path: path.into() });
            }
        }
        Ok(())
    }

    /// Returns the number of tracked paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Returns `true` if nothing has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Stops tracking `path`.
    pub fn forget(&mut self, path: &str) {
        self.chains.remove(path);
    }

    /// Forgets everything, as for a fresh mount.
    pub fn reset(&mut self) {
        self.chains.clear();
    }
}

impl fmt::Debug for DerivationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivationTracker")
            .field("paths", &self.chains.len())
            .finish_non_exhaustive()
    }
}

/// The recovery point for identity violations.
///
/// ```rust
/// use understory_custom::{Hook, RemountBoundary, Value};
///
/// let mut boundary = RemountBoundary::new();
/// let first = Hook::hook(|_| Value::from(1));
/// let second = Hook::hook(|_| Value::from(2));
///
/// for hook in [&first, &second] {
///     let value = boundary
///         .run(|tracker| {
///             let resolved = hook.resolve(&[]);
///             tracker.observe("counter", &resolved)?;
///             Ok(resolved.value)
///         })
///         .unwrap();
///     assert!(matches!(value, Value::Number(_)));
/// }
/// // The unsafe swap forced exactly one remount.
/// assert_eq!(boundary.remounts(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RemountBoundary {
    tracker: DerivationTracker,
    remounts: u64,
}

impl RemountBoundary {
    /// Creates a boundary that has never remounted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times the boundary has remounted.
    #[must_use]
    pub fn remounts(&self) -> u64 {
        self.remounts
    }

    /// The tracker handed to each pass.
    #[must_use]
    pub fn tracker(&self) -> &DerivationTracker {
        &self.tracker
    }

    /// Runs `pass`, remounting once on an identity violation.
    ///
    /// A remount increments the counter, resets the tracker and runs
    /// `pass` again. Any other error is returned as is, and so is an error
    /// from the second run.
    pub fn run<T>(
        &mut self,
        mut pass: impl FnMut(&mut DerivationTracker) -> Result<T>,
    ) -> Result<T> {
        match pass(&mut self.tracker) {
            Err(err) if err.is_identity_violation() => {
                self.remounts += 1;
                tracing::debug!(remounts = self.remounts, error = %err, "remounting");
                self.tracker.reset();
                pass(&mut self.tracker)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    use crate::hook::Hook;
    use crate::value::Value;

    #[test]
    fn unchanged_identity_is_fine() {
        let hook = Hook::hook(|_| Value::Null);
        let mut tracker = DerivationTracker::new();
        for _ in 0..3 {
            tracker.observe("a", &hook.resolve(&[])).unwrap();
        }
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn safe_swap_is_tolerated() {
        let mut tracker = DerivationTracker::new();
        tracker
            .observe("a", &Hook::function(|_| Value::Null).resolve(&[]))
            .unwrap();
        tracker
            .observe("a", &Hook::function(|_| Value::Null).resolve(&[]))
            .unwrap();
    }

    #[test]
    fn unsafe_swap_is_a_violation_and_keeps_history() {
        let first = Hook::hook(|_| Value::Null);
        let mut tracker = DerivationTracker::new();
        tracker.observe("a", &first.resolve(&[])).unwrap();

        let err = tracker
            .observe("a", &Hook::hook(|_| Value::Null).resolve(&[]))
            .unwrap_err();
        assert_eq!(err, CustomError::IdentityViolation { path: "a".into() });
        // The original chain is still the reference.
        tracker.observe("a", &first.resolve(&[])).unwrap();
    }

    #[test]
    fn paths_are_tracked_independently() {
        let mut tracker = DerivationTracker::new();
        tracker
            .observe("a", &Hook::hook(|_| Value::Null).resolve(&[]))
            .unwrap();
        tracker
            .observe("b", &Hook::hook(|_| Value::Null).resolve(&[]))
            .unwrap();
        assert_eq!(tracker.len(), 2);
        tracker.forget("a");
        tracker
            .observe("a", &Hook::hook(|_| Value::Null).resolve(&[]))
            .unwrap();
    }

    #[test]
    fn unsafe_inner_hop_poisons_a_safe_outer() {
        let inner = Rc::new(RefCell::new(Hook::hook(|_| Value::Null)));
        let current = inner.clone();
        let outer = Hook::function(move |_| Value::from(current.borrow().clone()));

        let mut tracker = DerivationTracker::new();
        tracker.observe("a", &outer.resolve(&[])).unwrap();

        *inner.borrow_mut() = Hook::hook(|_| Value::Null);
        assert!(tracker.observe("a", &outer.resolve(&[])).is_err());
    }

    #[test]
    fn boundary_remounts_exactly_once() {
        let mut boundary = RemountBoundary::new();
        let first = Hook::hook(|_| Value::Null);
        let second = Hook::hook(|_| Value::Null);

        boundary
            .run(|tracker| tracker.observe("x", &first.resolve(&[])))
            .unwrap();
        assert_eq!(boundary.remounts(), 0);

        boundary
            .run(|tracker| tracker.observe("x", &second.resolve(&[])))
            .unwrap();
        assert_eq!(boundary.remounts(), 1);
        assert_eq!(boundary.tracker().len(), 1);
    }

    #[test]
    fn boundary_propagates_other_errors() {
        let mut boundary = RemountBoundary::new();
        let result: Result<()> =
            boundary.run(|_| Err(CustomError::type_mismatch("p", "text", "number")));
        assert!(matches!(result, Err(CustomError::TypeMismatch { .. })));
        assert_eq!(boundary.remounts(), 0);
    }
}
