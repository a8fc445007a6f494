//! Error types for autodiff

use thiserror::Error;

/// Result type alias using autodiff's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by fallible constructors and the linear-algebra routines.
///
/// Programmer errors (mismatched dimensions inside arithmetic, invalid
/// derivative orders, mixing [`BareReal`](crate::BareReal) with tracked
/// values) panic instead; this enum covers conditions that depend on the
/// numbers themselves.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A pivot fell below the singularity threshold, or elimination produced NaN
    #[error("matrix is computationally singular at pivot {pivot}")]
    Singular {
        /// Row/column index at which elimination broke down
        pivot: usize,
    },

    /// Operand shapes do not fit together
    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// Expected (rows, cols)
        expected: (usize, usize),
        /// Actual (rows, cols)
        got: (usize, usize),
    },

    /// Cholesky factorisation met a non-positive pivot
    #[error("matrix is not positive definite (pivot {pivot} is {value})")]
    NotPositiveDefinite {
        /// Index of the failing diagonal entry
        pivot: usize,
        /// Value under the square root
        value: f64,
    },

    /// An operation needs at least one row and column
    #[error("matrix is empty")]
    EmptyMatrix,

    /// A log-domain probability was constructed from a negative number
    #[error("probability must be non-negative, got {0}")]
    NegativeProbability(f64),

    /// A scalar kind name was not recognised
    #[error("unknown scalar kind '{0}'")]
    UnknownKind(String),
}
