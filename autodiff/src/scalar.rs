//! The capability set shared by every differentiable scalar.
//!
//! [`Scalar`] is sealed: exactly three representations implement it.
//!
//! | kind | storage | derivatives |
//! |------|---------|-------------|
//! | [`Real`](crate::Real) | value | up to order 2 |
//! | [`BareReal`](crate::BareReal) | value | none |
//! | [`Probability`](crate::Probability) | `ln(value)` | up to order 2 |
//!
//! Generic container code picks "a scalar of the kind this vector already
//! uses" through [`Scalar::KIND`] and [`Scalar::from_value`]; callers that
//! choose a representation at runtime go through [`ScalarKind`].

use crate::derivatives::Derivatives;
use crate::error::{Error, Result};
use crate::real::Real;
use num_traits::{One, Zero};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Tag naming one of the scalar representations.
///
/// ```
/// use autodiff::ScalarKind;
///
/// let kind: ScalarKind = "probability".parse().unwrap();
/// assert_eq!(kind, ScalarKind::Probability);
/// assert_eq!(kind.to_string(), "probability");
/// assert!("complex".parse::<ScalarKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScalarKind {
    /// [`Real`](crate::Real)
    #[default]
    Real,
    /// [`BareReal`](crate::BareReal)
    BareReal,
    /// [`Probability`](crate::Probability)
    Probability,
}

impl ScalarKind {
    /// Every registered kind.
    pub const ALL: [ScalarKind; 3] = [ScalarKind::Real, ScalarKind::BareReal, ScalarKind::Probability];

    /// Registry name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Real => "real",
            ScalarKind::BareReal => "bare_real",
            ScalarKind::Probability => "probability",
        }
    }

    /// Whether scalars of this kind can carry derivatives.
    pub fn is_differentiable(self) -> bool {
        !matches!(self, ScalarKind::BareReal)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ScalarKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

/// A number that carries its first and second derivatives with respect to
/// a set of independent variables.
///
/// Arithmetic is by value through [`std::ops`] (against `Self`, `&Self` and
/// plain `f64` constants) and returns fresh values; the result of a binary
/// operation carries the higher of the operands' orders and is sized for
/// the larger of their variable counts.
///
/// ```
/// use autodiff::{Real, Scalar};
///
/// // f(x) = 2x³ + 4 at x = 9
/// let mut x = Real::new(9.0);
/// x.set_variable(0, 1, 2);
///
/// let f = x.powf(3.0) * 2.0 + 4.0;
/// assert_eq!(f.value(), 1462.0);
/// assert_eq!(f.derivative(1, 0), 486.0);
/// assert_eq!(f.derivative(2, 0), 108.0);
/// ```
pub trait Scalar:
    sealed::Sealed
    + Clone
    + fmt::Debug
    + fmt::Display
    + PartialEq
    + PartialOrd
    + Zero
    + One
    + std::iter::Sum
    + Neg<Output = Self>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + for<'a> Add<&'a Self, Output = Self>
    + for<'a> Sub<&'a Self, Output = Self>
    + for<'a> Mul<&'a Self, Output = Self>
    + for<'a> Div<&'a Self, Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    /// Registry tag of this representation.
    const KIND: ScalarKind;

    /// A constant (order 0) holding `value`.
    fn from_value(value: f64) -> Self;

    /// The represented number.
    fn value(&self) -> f64;

    /// `ln(value())`; exact for log-domain representations.
    fn log_value(&self) -> f64 {
        self.value().ln()
    }

    /// Highest derivative order carried (0, 1 or 2).
    fn order(&self) -> usize;

    /// Number of independent variables derivatives are tracked for.
    fn n(&self) -> usize;

    /// `∂f/∂xᵢ` for `order == 1`, `∂²f/∂xᵢ²` for `order == 2`.
    ///
    /// Reads at `i >= n()` or above the carried order return 0.
    ///
    /// # Panics
    ///
    /// Panics unless `order` is 1 or 2.
    fn derivative(&self, order: usize, i: usize) -> f64;

    /// Overwrite the value, keeping derivatives.
    fn set_value(&mut self, value: f64);

    /// Make this scalar independent variable `index` of `n` at `order`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= n`, if `order > 2`, or for a representation
    /// that cannot carry derivatives at the requested order.
    fn set_variable(&mut self, index: usize, n: usize, order: usize);

    /// Drop all derivatives and return to order 0.
    fn set_constant(&mut self);

    /// Zero every derivative slot, keeping order and size.
    fn reset_derivatives(&mut self);

    /// Copy value, order and derivatives from any representation.
    fn set_from<T: Scalar>(&mut self, other: &T);

    /// `selfᵏ` with `k` differentiable.
    fn pow(&self, k: &Self) -> Self;

    /// `selfᵏ` for a constant exponent.
    fn powf(&self, k: f64) -> Self {
        self.pow(&Self::from_value(k))
    }

    fn sqrt(&self) -> Self;
    fn abs(&self) -> Self;
    fn sin(&self) -> Self;
    fn cos(&self) -> Self;
    fn tan(&self) -> Self;
    fn sinh(&self) -> Self;
    fn cosh(&self) -> Self;
    fn tanh(&self) -> Self;
    fn exp(&self) -> Self;

    /// Natural logarithm in this representation.
    ///
    /// A [`Probability`](crate::Probability) cannot hold the negative
    /// logarithm of a value below 1 and panics; [`Scalar::log_real`]
    /// returns it as a [`Real`] instead.
    fn ln(&self) -> Self;

    /// `ln(value())` as a [`Real`], derivatives included. Defined for every
    /// positive value of every representation, which makes it the way to
    /// accumulate log-likelihoods in generic code.
    fn log_real(&self) -> Real {
        Real::convert(self).ln()
    }

    fn erf(&self) -> Self;
    fn erfc(&self) -> Self;
    fn log_erfc(&self) -> Self;
    fn gamma(&self) -> Self;
    fn lgamma(&self) -> Self;

    /// Multivariate log-gamma of dimension `k`.
    fn mlgamma(&self, k: usize) -> Self;

    /// Whether the value is finite.
    fn is_finite(&self) -> bool {
        self.value().is_finite()
    }

    /// Build a scalar of this kind from any other, derivatives included.
    fn convert<T: Scalar>(other: &T) -> Self {
        let mut s = Self::zero();
        s.set_from(other);
        s
    }
}

/// Seed loose scalars as independent variables `0..k` at `order`.
///
/// ```
/// use autodiff::{scalar, Real, Scalar};
///
/// let mut x = Real::new(2.0);
/// let mut y = Real::new(5.0);
/// scalar::variables(1, &mut [&mut x, &mut y]);
///
/// let f = x.clone() * y.clone();
/// assert_eq!(f.derivative(1, 0), 5.0);
/// assert_eq!(f.derivative(1, 1), 2.0);
/// ```
pub fn variables<S: Scalar>(order: usize, scalars: &mut [&mut S]) {
    let n = scalars.len();
    for (i, s) in scalars.iter_mut().enumerate() {
        s.set_variable(i, n, order);
    }
}

/// Snapshot of another scalar's derivative state.
pub(crate) fn derivatives_of<T: Scalar>(other: &T) -> Derivatives {
    let mut d = Derivatives::zeros(other.n(), other.order());
    for order in 1..=other.order() {
        for i in 0..other.n() {
            d.set(order, i, other.derivative(order, i));
        }
    }
    d
}

/// Implements the by-reference and `f64` operator variants in terms of the
/// by-value `Self ∘ Self` operators, plus the value-only comparisons keyed on
/// `$key` (`value` or `log_value`).
macro_rules! forward_ops {
    ($t:ty, $key:ident) => {
        forward_ops!(@op $t, Add, add);
        forward_ops!(@op $t, Sub, sub);
        forward_ops!(@op $t, Mul, mul);
        forward_ops!(@op $t, Div, div);

        impl<'a> std::ops::Neg for &'a $t {
            type Output = $t;

            fn neg(self) -> $t {
                -self.clone()
            }
        }

        impl std::iter::Sum for $t {
            fn sum<I: Iterator<Item = $t>>(iter: I) -> $t {
                iter.fold(<$t as num_traits::Zero>::zero(), |acc, x| acc + x)
            }
        }

        impl num_traits::Zero for $t {
            fn zero() -> Self {
                <$t as $crate::Scalar>::from_value(0.0)
            }

            fn is_zero(&self) -> bool {
                $crate::Scalar::value(self) == 0.0
            }
        }

        impl num_traits::One for $t {
            fn one() -> Self {
                <$t as $crate::Scalar>::from_value(1.0)
            }
        }

        impl std::cmp::PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                $crate::Scalar::$key(self) == $crate::Scalar::$key(other)
            }
        }

        impl std::cmp::PartialOrd for $t {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                $crate::Scalar::$key(self).partial_cmp(&$crate::Scalar::$key(other))
            }
        }

        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&$crate::Scalar::value(self), f)
            }
        }

        impl From<f64> for $t {
            fn from(value: f64) -> Self {
                <$t as $crate::Scalar>::from_value(value)
            }
        }
    };
    (@op $t:ty, $trait:ident, $method:ident) => {
        impl<'a> std::ops::$trait<&'a $t> for $t {
            type Output = $t;

            fn $method(self, rhs: &'a $t) -> $t {
                std::ops::$trait::$method(self, rhs.clone())
            }
        }

        impl<'a, 'b> std::ops::$trait<&'b $t> for &'a $t {
            type Output = $t;

            fn $method(self, rhs: &'b $t) -> $t {
                std::ops::$trait::$method(self.clone(), rhs.clone())
            }
        }

        impl std::ops::$trait<f64> for $t {
            type Output = $t;

            fn $method(self, rhs: f64) -> $t {
                std::ops::$trait::$method(self, <$t as $crate::Scalar>::from_value(rhs))
            }
        }

        impl std::ops::$trait<$t> for f64 {
            type Output = $t;

            fn $method(self, rhs: $t) -> $t {
                std::ops::$trait::$method(<$t as $crate::Scalar>::from_value(self), rhs)
            }
        }
    };
}

pub(crate) use forward_ops;
