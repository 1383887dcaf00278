//! Structural self-checks for the forest and the output graph.

use crate::ftr_error::FtrError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Panic on the first broken invariant when invariant checking is enabled.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "debug_assert_invariants");
    }
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), FtrError>;
}

/// Turn a failed condition into [`FtrError::Invariant`].
#[inline]
pub(crate) fn ensure(cond: bool, message: impl FnOnce() -> String) -> Result<(), FtrError> {
    if cond {
        Ok(())
    } else {
        Err(FtrError::Invariant(message()))
    }
}

/// Helper macro to run a fallible check and panic on error when invariant
/// checking is enabled (debug builds, `check-invariants` or
/// `strict-invariants`).
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
