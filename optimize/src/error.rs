//! Error types for optimize

use thiserror::Error;

/// Result type alias using optimize's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons an optimization run stops without a result.
#[derive(Error, Debug)]
pub enum Error {
    /// The objective failed (or returned a NaN gradient) at the starting point
    #[error("invalid initial value")]
    InvalidInitialValue(#[source] anyhow::Error),

    /// The objective failed at a point reached during the iteration
    #[error("invalid value at iteration {iteration}")]
    InvalidValue {
        /// Iteration at which the objective failed
        iteration: usize,
        /// Error reported by the objective
        #[source]
        source: anyhow::Error,
    },

    /// An updated coordinate became non-finite
    #[error("optimization diverged at iteration {iteration}")]
    Diverged {
        /// Iteration that produced the non-finite coordinate
        iteration: usize,
    },

    /// No step length satisfied the sufficient-decrease condition
    #[error("line search failed at iteration {iteration}")]
    LineSearchFailed {
        /// Iteration whose line search failed
        iteration: usize,
    },

    /// The iteration limit was reached before convergence
    #[error("no convergence after {0} iterations")]
    MaxIterations(usize),

    /// A linear solve failed, typically because the system is singular
    #[error(transparent)]
    Linalg(#[from] autodiff::Error),

    /// Hyperparameters or arguments are inconsistent
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Whether a linear system turned out to be singular.
    pub fn is_singular(&self) -> bool {
        matches!(self, Error::Linalg(autodiff::Error::Singular { .. }))
    }

    pub(crate) fn objective(iteration: usize, source: anyhow::Error) -> Self {
        if iteration == 0 {
            Error::InvalidInitialValue(source)
        } else {
            Error::InvalidValue { iteration, source }
        }
    }
}
