//! The default differentiable scalar.

use crate::derivatives::{rules, Binary, Derivatives, Unary};
use crate::scalar::{derivatives_of, forward_ops, sealed, Scalar, ScalarKind};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A real number with first and second derivatives.
///
/// # Examples
///
/// ```
/// use autodiff::{Real, Scalar};
///
/// // f(x, y) = x·y + sin(x) at (0, 3)
/// let x = Real::variable(0.0, 0, 2, 1);
/// let y = Real::variable(3.0, 1, 2, 1);
///
/// let f = x.clone() * &y + x.sin();
/// assert_eq!(f.value(), 0.0);
/// assert_eq!(f.derivative(1, 0), 4.0); // y + cos(x)
/// assert_eq!(f.derivative(1, 1), 0.0); // x
/// ```
#[derive(Debug, Clone, Default)]
pub struct Real {
    value: f64,
    derivatives: Derivatives,
}

impl Real {
    /// A constant.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            derivatives: Derivatives::default(),
        }
    }

    /// Independent variable `index` of `n` at `order`.
    pub fn variable(value: f64, index: usize, n: usize, order: usize) -> Self {
        Self {
            value,
            derivatives: Derivatives::variable(index, n, order),
        }
    }

    pub(crate) fn from_parts(value: f64, derivatives: Derivatives) -> Self {
        Self { value, derivatives }
    }

    /// All first derivatives `[∂f/∂x₀, …, ∂f/∂xₙ₋₁]`.
    pub fn gradient(&self) -> Vec<f64> {
        (0..self.n()).map(|i| self.derivative(1, i)).collect()
    }

    fn unary(&self, f: Unary) -> Self {
        Self {
            value: f.value,
            derivatives: self.derivatives.unary(&f),
        }
    }

    fn binary(&self, other: &Self, f: Binary) -> Self {
        Self {
            value: f.value,
            derivatives: Derivatives::binary(&self.derivatives, &other.derivatives, &f),
        }
    }
}

impl sealed::Sealed for Real {}

impl Scalar for Real {
    const KIND: ScalarKind = ScalarKind::Real;

    fn from_value(value: f64) -> Self {
        Self::new(value)
    }

    fn value(&self) -> f64 {
        self.value
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
        self.value = value;
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
        self.value = other.value();
        self.derivatives = derivatives_of(other);
    }

    fn pow(&self, k: &Self) -> Self {
        Self {
            value: self.value.powf(k.value),
            derivatives: Derivatives::pow(&self.derivatives, self.value, &k.derivatives, k.value),
        }
    }

    fn sqrt(&self) -> Self {
        self.unary(rules::sqrt(self.value))
    }

    fn abs(&self) -> Self {
        self.unary(rules::abs(self.value))
    }

    fn sin(&self) -> Self {
        self.unary(rules::sin(self.value))
    }

    fn cos(&self) -> Self {
        self.unary(rules::cos(self.value))
    }

    fn tan(&self) -> Self {
        self.unary(rules::tan(self.value))
    }

    fn sinh(&self) -> Self {
        self.unary(rules::sinh(self.value))
    }

    fn cosh(&self) -> Self {
        self.unary(rules::cosh(self.value))
    }

    fn tanh(&self) -> Self {
        self.unary(rules::tanh(self.value))
    }

    fn exp(&self) -> Self {
        self.unary(rules::exp(self.value))
    }

    fn ln(&self) -> Self {
        self.unary(rules::ln(self.value))
    }

    fn erf(&self) -> Self {
        self.unary(rules::erf(self.value))
    }

    fn erfc(&self) -> Self {
        self.unary(rules::erfc(self.value))
    }

    fn log_erfc(&self) -> Self {
        self.unary(rules::log_erfc(self.value))
    }

    fn gamma(&self) -> Self {
        self.unary(rules::gamma(self.value))
    }

    fn lgamma(&self) -> Self {
        self.unary(rules::lgamma(self.value))
    }

    fn mlgamma(&self, k: usize) -> Self {
        self.unary(rules::mlgamma(self.value, k))
    }
}

impl Neg for Real {
    type Output = Self;

    fn neg(self) -> Self {
        self.unary(rules::neg(self.value))
    }
}

impl Add for Real {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.binary(&rhs, rules::add(self.value, rhs.value))
    }
}

impl Sub for Real {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.binary(&rhs, rules::sub(self.value, rhs.value))
    }
}

impl Mul for Real {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.binary(&rhs, rules::mul(self.value, rhs.value))
    }
}

impl Div for Real {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.binary(&rhs, rules::div(self.value, rhs.value))
    }
}

forward_ops!(Real, value);

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn cube_at_nine() {
        let x = Real::variable(9.0, 0, 1, 2);
        let y = x.clone() * &x * &x;
        assert_eq!(y.value(), 729.0);
        assert_eq!(y.derivative(1, 0), 243.0);
        assert_eq!(y.derivative(2, 0), 54.0);
    }

    #[test]
    fn repeated_products() {
        let a = Real::variable(13.123, 0, 1, 2);
        let b = Real::new(4.321);
        let a2 = a.clone() * a;
        let a4 = a2.clone() * a2;
        let f = a4 * b;
        assert!(close(f.value(), 128149.4603376, 1e-4));
        assert!(close(f.derivative(1, 0), 39061.025783, 1e-4));
        assert!(close(f.derivative(2, 0), 8929.5951649, 1e-4));
    }

    #[test]
    fn pow_with_variable_exponent() {
        let x = Real::variable(3.4, 0, 2, 2);
        let k = Real::variable(4.1, 1, 2, 2);
        let r = x.pow(&k);
        assert!(close(r.derivative(1, 0), 182.124553, 1e-4));
        assert!(close(r.derivative(1, 1), 184.826947, 1e-4));
        assert!(close(r.derivative(2, 0), 166.054739, 1e-4));
        assert!(close(r.derivative(2, 1), 226.186676, 1e-4));
    }

    #[test]
    fn pow_with_negative_base() {
        let x = Real::variable(-3.4, 0, 2, 2);
        let k = Real::variable(4.0, 1, 2, 2);
        let r = x.pow(&k);
        assert!(close(r.derivative(1, 0), -157.216, 1e-4));
        assert!(close(r.derivative(2, 0), 138.720, 1e-4));
        // ∂/∂k involves ln(x)
        assert!(r.derivative(1, 1).is_nan());
        assert!(r.derivative(2, 1).is_nan());
    }

    #[test]
    fn low_powers_at_zero() {
        let x = Real::variable(0.0, 0, 1, 2);
        let y = x.powf(1.0);
        assert_eq!((y.value(), y.derivative(1, 0), y.derivative(2, 0)), (0.0, 1.0, 0.0));
        let y = x.powf(0.0);
        assert_eq!((y.value(), y.derivative(1, 0), y.derivative(2, 0)), (1.0, 0.0, 0.0));
        let y = x.powf(2.0);
        assert_eq!((y.derivative(1, 0), y.derivative(2, 0)), (0.0, 2.0));
    }

    #[test]
    fn tan_and_tanh() {
        let a = Real::variable(4.321, 0, 1, 2);
        assert!(close(a.tan().derivative(1, 0), 6.87184, 1e-4));

        let t = a.tanh();
        assert!(close(t.derivative(1, 0), 0.00070588, 1e-7));
        assert!(close(t.derivative(2, 0), -0.00141127, 1e-7));
    }

    #[test]
    fn error_functions() {
        let a = Real::variable(0.23, 0, 1, 2);

        let s = a.erf();
        assert!(close(s.derivative(1, 0), 1.07023926, 1e-6));
        assert!(close(s.derivative(2, 0), -0.49231006, 1e-6));

        let s = a.erfc();
        assert!(close(s.derivative(1, 0), -1.07023926, 1e-6));
        assert!(close(s.derivative(2, 0), 0.49231006, 1e-6));

        let s = a.log_erfc();
        assert!(close(s.derivative(1, 0), -1.436606354, 1e-6));
        assert!(close(s.derivative(2, 0), -1.402998894, 1e-6));
    }

    #[test]
    fn gamma_family() {
        let a = Real::variable(4.321, 0, 1, 2);
        let g = a.gamma();
        assert!(close(g.derivative(1, 0), 12.2353264, 1e-6));
        assert!(close(g.derivative(2, 0), 18.8065398, 1e-6));

        // d/dx ln Γ(x) = Γ'(x)/Γ(x)
        let l = a.lgamma();
        assert!(close(l.derivative(1, 0), g.derivative(1, 0) / g.value(), 1e-10));
        assert!(close(a.mlgamma(1).derivative(1, 0), l.derivative(1, 0), 1e-12));
    }

    #[test]
    fn cosh_uses_sinh_slope() {
        let a = Real::variable(0.7, 0, 1, 2);
        let c = a.cosh();
        assert!(close(c.derivative(1, 0), 0.7f64.sinh(), 1e-15));
        assert!(close(c.derivative(2, 0), 0.7f64.cosh(), 1e-15));
    }

    #[test]
    fn constants_promote_to_tracked_order() {
        let x = Real::variable(2.0, 1, 3, 1);
        let y = 3.0 * x + 1.0;
        assert_eq!(y.value(), 7.0);
        assert_eq!(y.order(), 1);
        assert_eq!(y.n(), 3);
        assert_eq!(y.gradient(), vec![0.0, 3.0, 0.0]);
    }

    #[test]
    fn set_constant_clears_derivatives() {
        let mut x = Real::variable(2.0, 0, 1, 2);
        x.set_constant();
        assert_eq!(x.order(), 0);
        assert_eq!((x.clone() * x).derivative(1, 0), 0.0);
    }

    #[test]
    fn comparisons_use_value_only() {
        let x = Real::variable(2.0, 0, 1, 1);
        assert_eq!(x, Real::new(2.0));
        assert!(x < Real::new(2.5));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn variable_index_must_fit() {
        Real::variable(1.0, 2, 2, 1);
    }
}
