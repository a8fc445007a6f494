//! Probabilities stored in the log domain.
//!
//! A [`Probability`] holds `ln(p)` instead of `p`, so long products of small
//! probabilities do not underflow. Sums use
//! `ln(a + b) = m + ln(1 + exp(min - m))` with `m = max(ln a, ln b)`, and
//! differences `ln(a - b) = ln a + ln(1 - exp(ln b - ln a))`.
//!
//! Derivatives are taken with respect to `p` itself, exactly as for
//! [`Real`], so the two representations are interchangeable inside an
//! objective. Any operation whose exact result would be negative panics.

use crate::derivatives::{rules, Binary, Derivatives, Unary};
use crate::error::{Error, Result};
use crate::real::Real;
use crate::scalar::{derivatives_of, forward_ops, sealed, Scalar, ScalarKind};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A non-negative real number stored as its natural logarithm.
///
/// ```
/// use autodiff::{Probability, Scalar};
///
/// let p = Probability::new(0.01);
/// let tiny = (0..1000).fold(Probability::new(1.0), |acc, _| acc * &p);
///
/// // 0.01^1000 underflows f64, its logarithm does not
/// assert_eq!(tiny.value(), 0.0);
/// assert!((tiny.log_value() - 1000.0 * 0.01f64.ln()).abs() < 1e-8);
/// ```
#[derive(Debug, Clone)]
pub struct Probability {
    log_value: f64,
    derivatives: Derivatives,
}

fn checked_ln(value: f64) -> f64 {
    assert!(
        value.is_nan() || value >= 0.0,
        "probability must be non-negative, got {}",
        value
    );
    value.ln()
}

impl Probability {
    /// A constant probability.
    ///
    /// # Panics
    ///
    /// Panics if `value < 0`; see [`Probability::try_new`].
    pub fn new(value: f64) -> Self {
        Self::from_log(checked_ln(value))
    }

    /// A constant probability, or [`Error::NegativeProbability`].
    pub fn try_new(value: f64) -> Result<Self> {
        if value < 0.0 {
            return Err(Error::NegativeProbability(value));
        }
        Ok(Self::new(value))
    }

    /// Independent variable `index` of `n` at `order`.
    pub fn variable(value: f64, index: usize, n: usize, order: usize) -> Self {
        let mut p = Self::new(value);
        p.derivatives = Derivatives::variable(index, n, order);
        p
    }

    /// A constant with the given logarithm.
    pub fn from_log(log_value: f64) -> Self {
        Self {
            log_value,
            derivatives: Derivatives::default(),
        }
    }

    fn unary(&self, f: Unary) -> Self {
        Self {
            log_value: checked_ln(f.value),
            derivatives: self.derivatives.unary(&f),
        }
    }

    fn binary(&self, other: &Self, log_value: f64, f: Binary) -> Self {
        Self {
            log_value,
            derivatives: Derivatives::binary(&self.derivatives, &other.derivatives, &f),
        }
    }
}

impl Default for Probability {
    fn default() -> Self {
        Self::from_log(f64::NEG_INFINITY)
    }
}

impl sealed::Sealed for Probability {}

impl Scalar for Probability {
    const KIND: ScalarKind = ScalarKind::Probability;

    fn from_value(value: f64) -> Self {
        Self::new(value)
    }

    fn value(&self) -> f64 {
        self.log_value.exp()
    }

    fn log_value(&self) -> f64 {
        self.log_value
    }

    fn order(&self) -> usize {
        self.derivatives.order()
    }

    fn n(&self) -> usize {
        self.derivatives.n()
    }

    fn derivative(&self, order: usize, i: usize) -> f64 {
        self.derivatives.get(order, i)
    }

    fn set_value(&mut self, value: f64) {
        self.log_value = checked_ln(value);
    }

    fn set_variable(&mut self, index: usize, n: usize, order: usize) {
        self.derivatives = Derivatives::variable(index, n, order);
    }

    fn set_constant(&mut self) {
        self.derivatives = Derivatives::default();
    }

    fn reset_derivatives(&mut self) {
        self.derivatives.reset();
    }

    fn set_from<T: Scalar>(&mut self, other: &T) {
        assert!(
            other.value().is_nan() || other.value() >= 0.0,
            "probability must be non-negative, got {}",
            other.value()
        );
        self.log_value = other.log_value();
        self.derivatives = derivatives_of(other);
    }

    fn pow(&self, k: &Self) -> Self {
        let kv = k.value();
        Self {
            log_value: kv * self.log_value,
            derivatives: Derivatives::pow(&self.derivatives, self.value(), &k.derivatives, kv),
        }
    }

    fn sqrt(&self) -> Self {
        let mut r = self.unary(rules::sqrt(self.value()));
        r.log_value = self.log_value / 2.0;
        r
    }

    fn abs(&self) -> Self {
        self.clone()
    }

    fn sin(&self) -> Self {
        self.unary(rules::sin(self.value()))
    }

    fn cos(&self) -> Self {
        self.unary(rules::cos(self.value()))
    }

    fn tan(&self) -> Self {
        self.unary(rules::tan(self.value()))
    }

    fn sinh(&self) -> Self {
        self.unary(rules::sinh(self.value()))
    }

    fn cosh(&self) -> Self {
        self.unary(rules::cosh(self.value()))
    }

    fn tanh(&self) -> Self {
        self.unary(rules::tanh(self.value()))
    }

    fn exp(&self) -> Self {
        let v = self.value();
        let e = v.exp();
        Self {
            log_value: v,
            derivatives: self.derivatives.unary(&Unary::new(e, e, e)),
        }
    }

    /// # Panics
    ///
    /// Panics for values below 1, whose logarithm is negative. Use
    /// [`Scalar::log_real`] for log-likelihoods.
    fn ln(&self) -> Self {
        let v = self.value();
        Self {
            log_value: checked_ln(self.log_value),
            derivatives: self.derivatives.unary(&Unary::new(self.log_value, 1.0 / v, -1.0 / (v * v))),
        }
    }

    /// Exact from the stored logarithm, for any `p > 0`.
    fn log_real(&self) -> Real {
        let v = self.value();
        let f = Unary::new(self.log_value, 1.0 / v, -1.0 / (v * v));
        Real::from_parts(self.log_value, self.derivatives.unary(&f))
    }

    fn erf(&self) -> Self {
        self.unary(rules::erf(self.value()))
    }

    fn erfc(&self) -> Self {
        self.unary(rules::erfc(self.value()))
    }

    fn log_erfc(&self) -> Self {
        self.unary(rules::log_erfc(self.value()))
    }

    fn gamma(&self) -> Self {
        self.unary(rules::gamma(self.value()))
    }

    fn lgamma(&self) -> Self {
        self.unary(rules::lgamma(self.value()))
    }

    fn mlgamma(&self, k: usize) -> Self {
        self.unary(rules::mlgamma(self.value(), k))
    }
}

impl Neg for Probability {
    type Output = Self;

    /// # Panics
    ///
    /// Panics unless the value is zero.
    fn neg(self) -> Self {
        assert!(
            self.log_value == f64::NEG_INFINITY,
            "cannot negate the positive probability {}",
            self.value()
        );
        self.unary(rules::neg(0.0))
    }
}

impl Add for Probability {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let (hi, lo) = if self.log_value >= rhs.log_value {
            (self.log_value, rhs.log_value)
        } else {
            (rhs.log_value, self.log_value)
        };
        let log_value = if lo == f64::NEG_INFINITY {
            hi
        } else {
            hi + (lo - hi).exp().ln_1p()
        };
        self.binary(&rhs, log_value, rules::add(self.value(), rhs.value()))
    }
}

impl Sub for Probability {
    type Output = Self;

    /// # Panics
    ///
    /// Panics if `rhs > self`.
    fn sub(self, rhs: Self) -> Self {
        assert!(
            self.log_value >= rhs.log_value,
            "probability difference {} - {} is negative",
            self.value(),
            rhs.value()
        );
        let log_value = if rhs.log_value == f64::NEG_INFINITY {
            self.log_value
        } else {
            self.log_value + (-(rhs.log_value - self.log_value).exp()).ln_1p()
        };
        self.binary(&rhs, log_value, rules::sub(self.value(), rhs.value()))
    }
}

impl Mul for Probability {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let log_value = self.log_value + rhs.log_value;
        self.binary(&rhs, log_value, rules::mul(self.value(), rhs.value()))
    }
}

impl Div for Probability {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let log_value = self.log_value - rhs.log_value;
        self.binary(&rhs, log_value, rules::div(self.value(), rhs.value()))
    }
}

forward_ops!(Probability, log_value);

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn arithmetic() {
        let two = Probability::new(2.0);
        assert!(close((two.clone() + &two).value(), 4.0));
        assert!(close((two.clone() * 0.5).value(), 1.0));
        assert!(close((Probability::new(4.0) / two.clone()).value(), 2.0));
        assert!(close((Probability::new(5.0) - two).value(), 3.0));
        assert!(close(Probability::new(5.0).ln().value(), 5f64.ln()));
        assert!(close(Probability::new(0.3).exp().value(), 0.3f64.exp()));
    }

    #[test]
    fn zero_is_absorbing() {
        let zero = Probability::new(0.0);
        let p = Probability::new(0.25);
        assert!(close((zero.clone() + &p).value(), 0.25));
        assert!(close((p.clone() - &zero).value(), 0.25));
        assert_eq!((p.clone() - &p).value(), 0.0);
        assert_eq!((zero.clone() * p).value(), 0.0);
        assert_eq!(-zero, Probability::new(0.0));
    }

    #[test]
    fn derivatives_are_with_respect_to_value() {
        let a = Probability::variable(2.0, 0, 1, 2);
        let b = Probability::new(3.0);
        assert!(close((a.clone() + &b).derivative(1, 0), 1.0));
        assert!(close((a.clone() * &b).derivative(1, 0), 3.0));
        // d²(a²)/da² = 2
        assert!(close((a.clone() * a).derivative(2, 0), 2.0));
    }

    #[test]
    fn agrees_with_real() {
        let f_real = |x: Real, y: Real| (x.clone() * &y + x.clone() / &y).sqrt() * x.exp();
        let f_prob =
            |x: Probability, y: Probability| (x.clone() * &y + x.clone() / &y).sqrt() * x.exp();

        for &(a, b) in &[(0.2, 0.7), (1.5, 3.0), (4.0, 0.5)] {
            let r = f_real(Real::variable(a, 0, 2, 2), Real::variable(b, 1, 2, 2));
            let p = f_prob(
                Probability::variable(a, 0, 2, 2),
                Probability::variable(b, 1, 2, 2),
            );
            assert!((r.value() - p.value()).abs() < 1e-10 * r.value().abs().max(1.0));
            for order in 1..=2 {
                for i in 0..2 {
                    let (dr, dp) = (r.derivative(order, i), p.derivative(order, i));
                    assert!((dr - dp).abs() < 1e-9 * dr.abs().max(1.0), "{} {}", dr, dp);
                }
            }
        }
    }

    #[test]
    fn log_real_leaves_the_domain() {
        let p = Probability::variable(0.5, 0, 1, 2);
        let l = p.log_real();
        assert!(close(l.value(), 0.5f64.ln()));
        assert!(close(l.derivative(1, 0), 2.0));
        assert!(close(l.derivative(2, 0), -4.0));
    }

    #[test]
    fn generic_log_likelihood_over_probabilities() {
        // Σ ln pᵢ for any representation
        fn log_likelihood<S: Scalar>(ps: &[S]) -> Real {
            ps.iter().map(|p| p.log_real()).sum()
        }
        let ps = [Probability::variable(0.25, 0, 2, 1), Probability::variable(0.1, 1, 2, 1)];
        let l = log_likelihood(&ps);
        assert!(close(l.value(), 0.025f64.ln()));
        assert!(close(l.derivative(1, 0), 4.0));
        assert!(close(l.derivative(1, 1), 10.0));

        let rs = [Real::variable(0.25, 0, 2, 1), Real::variable(0.1, 1, 2, 1)];
        assert!(close(log_likelihood(&rs).value(), l.value()));
    }

    #[test]
    fn try_new_reports_negative_values() {
        assert_eq!(
            Probability::try_new(-0.1).unwrap_err(),
            Error::NegativeProbability(-0.1)
        );
        assert!(Probability::try_new(0.1).is_ok());
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn negative_value_panics() {
        Probability::new(-1.0);
    }

    #[test]
    #[should_panic(expected = "is negative")]
    fn negative_difference_panics() {
        let _ = Probability::new(1.0) - Probability::new(2.0);
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn log_below_one_panics() {
        Probability::new(0.5).ln();
    }
}
