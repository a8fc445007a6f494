//! Numerical optimisation on top of forward-mode differentiation.
//!
//! **Part of the [optimize workspace](../index.html)**
//!
//! Every optimizer is a small options struct with [`Default`] and chainable
//! setters. Objectives are ordinary closures over [`autodiff::Vector`];
//! derivatives come from seeding the point before each evaluation.
//!
//! - [`GradientDescent`]: fixed step along the negative gradient
//! - [`Rprop`]: per-coordinate step sizes adapted from gradient signs
//! - [`Newton`]: roots of vector-valued functions, optionally with clamped
//!   variables
//! - [`Bfgs`]: quasi-Newton minimisation with a backtracking line search
//!
//! Objectives return [`anyhow::Result`]; a failing objective ends the run
//! with [`Error::InvalidInitialValue`] or [`Error::InvalidValue`]. Progress
//! is logged through the [`log`] facade at `debug` and `trace` level.
//!
//! ```
//! use autodiff::{Real, Scalar, Vector};
//! use optimize::{Bfgs, Rprop};
//!
//! let f = |x: &Vector<Real>| {
//!     let a = x[0].clone() - 1.0;
//!     let b = x[1].clone() + 2.0;
//!     Ok(a.clone() * a + b.clone() * b)
//! };
//! let x0 = Vector::new(&[-3.0, 5.0]);
//!
//! let r = Bfgs::default().run(f, &x0).unwrap();
//! assert!((r.x[0].value() - 1.0).abs() < 1e-10);
//!
//! let r = Rprop::default().with_step_init(0.1).run(f, &x0).unwrap();
//! assert!((r.x[1].value() + 2.0).abs() < 1e-8);
//! ```

pub mod bfgs;
pub mod error;
pub mod gradient_descent;
pub mod newton;
mod objective;
pub mod rprop;

pub use bfgs::{Bfgs, Stage};
pub use error::{Error, Result};
pub use gradient_descent::GradientDescent;
pub use newton::Newton;
pub use rprop::Rprop;

use autodiff::Vector;

/// Default convergence threshold of every optimizer.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct Solution<S> {
    /// Final point, with every element constant.
    pub x: Vector<S>,
    /// Objective value at `x`. For [`Newton`], `|f(x)|` at the last
    /// evaluation.
    pub value: f64,
    /// Number of updates applied to the starting point.
    pub iterations: usize,
}
