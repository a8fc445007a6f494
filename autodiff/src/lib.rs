//! Forward-mode automatic differentiation up to second order.
//!
//! **Part of the [optimize workspace](../index.html)**
//!
//! This crate provides:
//!
//! - **Differentiable scalars**: [`Real`], [`BareReal`] and [`Probability`],
//!   all implementing [`Scalar`]
//! - **Containers**: [`Vector`] and [`Matrix`], with seeding of independent
//!   variables and Jacobians
//! - **Dense linear algebra**: pivoted Gauss-Jordan, inversion and Cholesky
//!   in [`linalg`]
//! - **Special functions**: error and gamma families in [`special`]
//!
//! # Derivatives of a single variable
//!
//! A scalar tracks its value, an order (0, 1 or 2), and per variable `xᵢ`
//! the first derivative `∂f/∂xᵢ` and the second derivative `∂²f/∂xᵢ²`:
//!
//! ```
//! use autodiff::{Real, Scalar};
//!
//! // f(x) = x³ at x = 9
//! let x = Real::variable(9.0, 0, 1, 2);
//! let y = x.powf(3.0);
//!
//! assert_eq!(y.value(), 729.0);
//! assert_eq!(y.derivative(1, 0), 243.0); // 3x²
//! assert_eq!(y.derivative(2, 0), 54.0);  // 6x
//! ```
//!
//! # Gradients
//!
//! Seed a [`Vector`] and evaluate an ordinary function once:
//!
//! ```
//! use autodiff::{Real, Scalar, Vector};
//!
//! // Rosenbrock: f(x, y) = (1-x)² + 100(y-x²)²
//! let f = |v: &Vector<Real>| {
//!     let (x, y) = (&v[0], &v[1]);
//!     let a = 1.0 - x.clone();
//!     let b = y.clone() - x * x;
//!     a.clone() * a + b.clone() * b * 100.0
//! };
//!
//! let mut x = Vector::new(&[1.0, 1.0]);
//! x.variables(1);
//! let y = f(&x);
//!
//! assert_eq!(y.value(), 0.0);
//! assert_eq!(y.derivative(1, 0), 0.0);
//! assert_eq!(y.derivative(1, 1), 0.0);
//! ```
//!
//! # Probabilities
//!
//! [`Probability`] stores `ln(p)`, so products far below `f64::MIN_POSITIVE`
//! stay representable while derivatives are still taken with respect to `p`:
//!
//! ```
//! use autodiff::{Probability, Scalar};
//!
//! let p = Probability::variable(1e-200, 0, 1, 1);
//! let q = p.clone() * &p;
//!
//! assert_eq!(q.value(), 0.0);
//! assert!((q.log_value() - 2.0 * 1e-200f64.ln()).abs() < 1e-10);
//! ```

pub mod bare_real;
mod derivatives;
pub mod error;
pub mod linalg;
pub mod matrix;
pub mod probability;
pub mod real;
pub mod scalar;
pub mod special;
pub mod vector;

pub use bare_real::BareReal;
pub use error::{Error, Result};
pub use matrix::Matrix;
pub use probability::Probability;
pub use real::Real;
pub use scalar::{Scalar, ScalarKind};
pub use vector::{gradient, Vector};
