//! Structural invariant checks for the pipeline's data structures.
//!
//! The simplex tree, the bigraded matrices, the support grid, the half-edge
//! subdivision and the RU state each carry consistency conditions that are
//! cheap to verify and costly to violate silently. `DebugInvariants` gives
//! them one surface: [`validate_invariants`](DebugInvariants::validate_invariants)
//! reports the first violation as a [`PersistenceError`], while
//! [`debug_assert_invariants`](DebugInvariants::debug_assert_invariants)
//! panics on it in debug builds or under the `check-invariants` feature and
//! compiles to nothing otherwise.

use crate::error::PersistenceError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), PersistenceError>;
}

/// Helper macro to run a fallible check and panic on error when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
