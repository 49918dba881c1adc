use thiserror::Error;

use crate::TypeKey;

/// Errors that can occur when operating on an [`InventoryGrid`][crate::InventoryGrid].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The caller referenced a slot position outside the grid.
    #[error("position {position} is out of range for a grid of {capacity} slots")]
    InvalidIndex {
        /// The position that was requested.
        position: usize,

        /// The number of slots in the grid at the time of the call.
        capacity: usize,
    },

    /// The caller provided a unit count that is zero or exceeds what the operation allows.
    #[error("amount {amount} is invalid: {problem}")]
    InvalidAmount {
        /// The amount that was rejected.
        amount: u64,

        /// A human-readable description of the problem.
        problem: &'static str,
    },

    /// The operation requires units of a type that the grid does not hold.
    #[error("the grid holds no units of type {type_key}")]
    UnknownType {
        /// The type that was requested.
        type_key: TypeKey,
    },

    /// A snapshot could not be loaded because its content is inconsistent.
    #[error("snapshot is damaged: {problem}")]
    DamagedData {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// The grid detected that its own bookkeeping is inconsistent.
    ///
    /// This indicates a defect in this crate, not invalid input. It is never expected to be
    /// returned and callers should treat it as fatal.
    #[error("inventory bookkeeping is inconsistent: {problem}")]
    InvariantViolation {
        /// A human-readable description of the inconsistency.
        problem: String,
    },
}

impl Error {
    pub(crate) fn damaged(problem: impl Into<String>) -> Self {
        Self::DamagedData {
            problem: problem.into(),
        }
    }

    pub(crate) fn invariant_violation(problem: impl Into<String>) -> Self {
        Self::InvariantViolation {
            problem: problem.into(),
        }
    }
}

/// A specialized `Result` type for inventory grid operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
