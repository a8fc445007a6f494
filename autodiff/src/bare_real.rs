//! A derivative-free scalar for intermediate numeric work.

use crate::derivatives::check_order;
use crate::scalar::{forward_ops, sealed, Scalar, ScalarKind};
use crate::special;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A plain real number behind the [`Scalar`] interface.
///
/// `BareReal` never carries derivatives; seeding it as a variable, or
/// copying a tracked value into it, panics. It is the workspace type for
/// computations that only need values, such as an optimizer's Hessian
/// approximation.
///
/// ```
/// use autodiff::{BareReal, Scalar};
///
/// let x = BareReal::new(2.0);
/// let y = (x.clone() * 3.0).exp().ln();
/// assert!((y.value() - 6.0).abs() < 1e-12);
/// assert_eq!(y.order(), 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BareReal(f64);

impl BareReal {
    /// Wrap a value.
    pub fn new(value: f64) -> Self {
        Self(value)
    }
}

impl sealed::Sealed for BareReal {}

impl Scalar for BareReal {
    const KIND: ScalarKind = ScalarKind::BareReal;

    fn from_value(value: f64) -> Self {
        Self(value)
    }

    fn value(&self) -> f64 {
        self.0
    }

    fn order(&self) -> usize {
        0
    }

    fn n(&self) -> usize {
        0
    }

    fn derivative(&self, order: usize, _i: usize) -> f64 {
        assert!(order == 1 || order == 2, "invalid derivative order {}", order);
        0.0
    }

    fn set_value(&mut self, value: f64) {
        self.0 = value;
    }

    fn set_variable(&mut self, _index: usize, _n: usize, order: usize) {
        check_order(order);
        assert!(order == 0, "BareReal cannot carry derivatives of order {}", order);
    }

    fn set_constant(&mut self) {}

    fn reset_derivatives(&mut self) {}

    fn set_from<T: Scalar>(&mut self, other: &T) {
        assert!(
            other.order() == 0,
            "cannot copy a value of order {} into a BareReal",
            other.order()
        );
        self.0 = other.value();
    }

    fn pow(&self, k: &Self) -> Self {
        Self(self.0.powf(k.0))
    }

    fn powf(&self, k: f64) -> Self {
        Self(self.0.powf(k))
    }

    fn sqrt(&self) -> Self {
        Self(self.0.sqrt())
    }

    fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    fn sin(&self) -> Self {
        Self(self.0.sin())
    }

    fn cos(&self) -> Self {
        Self(self.0.cos())
    }

    fn tan(&self) -> Self {
        Self(self.0.tan())
    }

    fn sinh(&self) -> Self {
        Self(self.0.sinh())
    }

    fn cosh(&self) -> Self {
        Self(self.0.cosh())
    }

    fn tanh(&self) -> Self {
        Self(self.0.tanh())
    }

    fn exp(&self) -> Self {
        Self(self.0.exp())
    }

    fn ln(&self) -> Self {
        Self(self.0.ln())
    }

    fn erf(&self) -> Self {
        Self(special::erf(self.0))
    }

    fn erfc(&self) -> Self {
        Self(special::erfc(self.0))
    }

    fn log_erfc(&self) -> Self {
        Self(special::log_erfc(self.0))
    }

    fn gamma(&self) -> Self {
        Self(special::gamma(self.0))
    }

    fn lgamma(&self) -> Self {
        Self(special::lgamma(self.0))
    }

    fn mlgamma(&self, k: usize) -> Self {
        Self(special::mlgamma(self.0, k))
    }
}

impl Neg for BareReal {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Add for BareReal {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for BareReal {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for BareReal {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Div for BareReal {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self(self.0 / rhs.0)
    }
}

forward_ops!(BareReal, value);
