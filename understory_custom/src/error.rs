// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for customization resolution.

use alloc::string::String;

use thiserror::Error;

/// Errors surfaced while resolving customizations into results.
///
/// Merging never fails: a failed merge falls back to the higher-priority
/// side. These errors only come out of resolution (rendering a component,
/// invoking a derivation, projecting a handle).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CustomError {
    /// A resolved value does not match its declared kind.
    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        /// Dotted path of the offending value (may be empty).
        path: String,
        /// The kind the caller declared.
        expected: &'static str,
        /// The kind that was actually found.
        found: &'static str,
    },

    /// An unsafe derivation changed its underlying function between passes.
    ///
    /// This is recoverable: a [`RemountBoundary`](crate::RemountBoundary)
    /// catches it, resets the derived state and re-runs the pass.
    #[error("derivation identity changed at `{path}`; the owning subtree must be remounted")]
    IdentityViolation {
        /// Dotted path of the derivation that changed.
        path: String,
    },

    /// A component whose primitive is still undetermined was rendered.
    #[error("component {name:?} has no primitive to render")]
    UndeterminedPrimitive {
        /// The component's configured name, if any.
        name: Option<String>,
    },
}

impl CustomError {
    /// Shorthand for building a [`CustomError::TypeMismatch`].
    #[must_use]
    pub fn type_mismatch(path: &str, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }

    /// Returns `true` for the recoverable identity violation.
    #[must_use]
    pub fn is_identity_violation(&self) -> bool {
        matches!(self, Self::IdentityViolation { .. })
    }
}

/// Failure reported by a user-supplied merge strategy.
///
/// Strategies return this instead of panicking; the merge boundary logs it
/// and keeps the higher-priority unit unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("merge strategy failed: {message}")]
pub struct StrategyError {
    message: String,
}

impl StrategyError {
    /// Creates a strategy error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for resolution operations.
pub type Result<T, E = CustomError> = core::result::Result<T, E>;
