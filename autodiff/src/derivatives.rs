//! Derivative storage and the chain rules shared by every tracked scalar.
//!
//! A value `f` computed from operands carries, for each independent variable
//! `xᵢ`, the first derivative `∂f/∂xᵢ` and (at order 2) the diagonal second
//! derivative `∂²f/∂xᵢ²`. Every elementary operation supplies its closed-form
//! partials as a [`Unary`] or [`Binary`] and lets [`Derivatives`] apply the
//! chain rule:
//!
//! - unary `f(a)`: `f₁ = f'·a₁`, `f₂ = f'·a₂ + f''·a₁²`
//! - binary `f(a, b)`: `f₁ = f_a·a₁ + f_b·b₁` and
//!   `f₂ = f_a·a₂ + f_b·b₂ + f_aa·a₁² + f_bb·b₁² + 2·f_ab·a₁·b₁`

/// Value and partials of a function of one argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Unary {
    pub value: f64,
    /// f'
    pub d1: f64,
    /// f''
    pub d2: f64,
}

impl Unary {
    pub fn new(value: f64, d1: f64, d2: f64) -> Self {
        Self { value, d1, d2 }
    }
}

/// Value and partials of a function of two arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Binary {
    pub value: f64,
    pub da: f64,
    pub db: f64,
    pub dab: f64,
    pub daa: f64,
    pub dbb: f64,
}

/// Order and per-variable derivatives of a tracked value.
///
/// Storage follows the order: `d1` holds `n` entries from order 1 on, `d2`
/// holds `n` entries at order 2. Reads past the stored range are zero, so a
/// constant combines with a variable without padding.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Derivatives {
    order: usize,
    n: usize,
    d1: Vec<f64>,
    d2: Vec<f64>,
}

pub(crate) fn check_order(order: usize) {
    assert!(order <= 2, "invalid derivative order {}", order);
}

impl Derivatives {
    /// Zero-filled storage for `n` variables at `order`.
    pub fn zeros(n: usize, order: usize) -> Self {
        check_order(order);
        let n = if order == 0 { 0 } else { n };
        Self {
            order,
            n,
            d1: vec![0.0; if order >= 1 { n } else { 0 }],
            d2: vec![0.0; if order >= 2 { n } else { 0 }],
        }
    }

    /// Independent variable `index` among `n`: `∂x/∂xᵢ = δᵢ`.
    pub fn variable(index: usize, n: usize, order: usize) -> Self {
        assert!(
            index < n,
            "Variable index {} out of bounds for n={}",
            index,
            n
        );
        let mut d = Self::zeros(n, order);
        if order >= 1 {
            d.d1[index] = 1.0;
        }
        d
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// `∂f/∂xᵢ` (`order == 1`) or `∂²f/∂xᵢ²` (`order == 2`).
    ///
    /// # Panics
    ///
    /// Panics unless `order` is 1 or 2.
    pub fn get(&self, order: usize, i: usize) -> f64 {
        match order {
            1 => self.d1.get(i).copied().unwrap_or(0.0),
            2 => self.d2.get(i).copied().unwrap_or(0.0),
            _ => panic!("invalid derivative order {}", order),
        }
    }

    pub fn set(&mut self, order: usize, i: usize, value: f64) {
        match order {
            1 => self.d1[i] = value,
            2 => self.d2[i] = value,
            _ => panic!("invalid derivative order {}", order),
        }
    }

    /// Zero every slot, keeping order and size.
    pub fn reset(&mut self) {
        self.d1.iter_mut().for_each(|d| *d = 0.0);
        self.d2.iter_mut().for_each(|d| *d = 0.0);
    }

    /// Chain rule through a function of one argument.
    pub fn unary(&self, f: &Unary) -> Self {
        let mut out = Self::zeros(self.n, self.order);
        if out.order >= 1 {
            for (o, a1) in out.d1.iter_mut().zip(&self.d1) {
                *o = f.d1 * a1;
            }
        }
        if out.order >= 2 {
            for (o, (a1, a2)) in out.d2.iter_mut().zip(self.d1.iter().zip(&self.d2)) {
                *o = f.d1 * a2 + f.d2 * a1 * a1;
            }
        }
        out
    }

    /// Chain rule through a function of two arguments, sized for the
    /// larger operand and carrying the higher order.
    pub fn binary(a: &Self, b: &Self, f: &Binary) -> Self {
        let mut out = Self::zeros(a.n.max(b.n), a.order.max(b.order));
        for i in 0..out.n {
            let (a1, b1) = (a.get(1, i), b.get(1, i));
            if out.order >= 1 {
                out.d1[i] = f.da * a1 + f.db * b1;
            }
            if out.order >= 2 {
                out.d2[i] = f.da * a.get(2, i)
                    + f.db * b.get(2, i)
                    + f.daa * a1 * a1
                    + f.dbb * b1 * b1
                    + 2.0 * f.dab * a1 * b1;
            }
        }
        out
    }

    /// Chain rule for `a^k`.
    ///
    /// The exponent's terms involve `ln a` and are only evaluated for
    /// variables the exponent actually depends on, so a negative base with
    /// a constant (or independent) exponent keeps finite derivatives.
    pub fn pow(a: &Self, av: f64, k: &Self, kv: f64) -> Self {
        let mut out = Self::zeros(a.n.max(k.n), a.order.max(k.order));
        let value = av.powf(kv);
        for i in 0..out.n {
            let (a1, a2) = (a.get(1, i), a.get(2, i));
            let (k1, k2) = (k.get(1, i), k.get(2, i));
            if k1 != 0.0 || k2 != 0.0 {
                let ln_a = av.ln();
                out.d1[i] = av.powf(kv - 1.0) * (kv * a1 + av * ln_a * k1);
                if out.order >= 2 {
                    out.d2[i] = value
                        * ((kv - 1.0) * kv * a1 * a1 / (av * av)
                            + (2.0 * (1.0 + kv * ln_a) * a1 * k1 + kv * a2) / av
                            + ln_a * (ln_a * k1 * k1 + k2));
                }
            } else {
                // vanishing coefficients must not meet an infinite power at a = 0
                let f1 = if kv == 0.0 { 0.0 } else { kv * av.powf(kv - 1.0) };
                let curvature = kv * (kv - 1.0);
                let f2 = if curvature == 0.0 { 0.0 } else { curvature * av.powf(kv - 2.0) };
                out.d1[i] = f1 * a1;
                if out.order >= 2 {
                    out.d2[i] = f1 * a2 + f2 * a1 * a1;
                }
            }
        }
        out
    }
}

/// Closed-form partials of the elementary functions.
pub(crate) mod rules {
    use super::{Binary, Unary};
    use crate::special;

    pub fn add(a: f64, b: f64) -> Binary {
        Binary { value: a + b, da: 1.0, db: 1.0, dab: 0.0, daa: 0.0, dbb: 0.0 }
    }

    pub fn sub(a: f64, b: f64) -> Binary {
        Binary { value: a - b, da: 1.0, db: -1.0, dab: 0.0, daa: 0.0, dbb: 0.0 }
    }

    pub fn mul(a: f64, b: f64) -> Binary {
        Binary { value: a * b, da: b, db: a, dab: 1.0, daa: 0.0, dbb: 0.0 }
    }

    pub fn div(a: f64, b: f64) -> Binary {
        let b2 = b * b;
        Binary {
            value: a / b,
            da: 1.0 / b,
            db: -a / b2,
            dab: -1.0 / b2,
            daa: 0.0,
            dbb: 2.0 * a / (b2 * b),
        }
    }

    pub fn neg(a: f64) -> Unary {
        Unary::new(-a, -1.0, 0.0)
    }

    pub fn sqrt(a: f64) -> Unary {
        let s = a.sqrt();
        Unary::new(s, 0.5 / s, -0.25 / (a * s))
    }

    pub fn abs(a: f64) -> Unary {
        Unary::new(a.abs(), if a < 0.0 { -1.0 } else { 1.0 }, 0.0)
    }

    pub fn sin(a: f64) -> Unary {
        let (s, c) = a.sin_cos();
        Unary::new(s, c, -s)
    }

    pub fn cos(a: f64) -> Unary {
        let (s, c) = a.sin_cos();
        Unary::new(c, -s, -c)
    }

    pub fn tan(a: f64) -> Unary {
        let t = a.tan();
        let sec2 = 1.0 + t * t;
        Unary::new(t, sec2, 2.0 * t * sec2)
    }

    pub fn sinh(a: f64) -> Unary {
        Unary::new(a.sinh(), a.cosh(), a.sinh())
    }

    pub fn cosh(a: f64) -> Unary {
        Unary::new(a.cosh(), a.sinh(), a.cosh())
    }

    pub fn tanh(a: f64) -> Unary {
        let t = a.tanh();
        let sech2 = 1.0 - t * t;
        Unary::new(t, sech2, -2.0 * t * sech2)
    }

    pub fn exp(a: f64) -> Unary {
        let e = a.exp();
        Unary::new(e, e, e)
    }

    pub fn ln(a: f64) -> Unary {
        Unary::new(a.ln(), 1.0 / a, -1.0 / (a * a))
    }

    pub fn erf(a: f64) -> Unary {
        let d1 = special::FRAC_2_SQRT_PI * (-a * a).exp();
        Unary::new(special::erf(a), d1, -2.0 * a * d1)
    }

    pub fn erfc(a: f64) -> Unary {
        let d1 = -special::FRAC_2_SQRT_PI * (-a * a).exp();
        Unary::new(special::erfc(a), d1, -2.0 * a * d1)
    }

    pub fn log_erfc(a: f64) -> Unary {
        let value = special::log_erfc(a);
        let d1 = -special::FRAC_2_SQRT_PI * (-a * a - value).exp();
        Unary::new(value, d1, -2.0 * a * d1 - d1 * d1)
    }

    pub fn gamma(a: f64) -> Unary {
        let g = special::gamma(a);
        let psi = special::digamma(a);
        Unary::new(g, g * psi, g * (psi * psi + special::trigamma(a)))
    }

    pub fn lgamma(a: f64) -> Unary {
        Unary::new(special::lgamma(a), special::digamma(a), special::trigamma(a))
    }

    pub fn mlgamma(a: f64, k: usize) -> Unary {
        Unary::new(
            special::mlgamma(a, k),
            special::mdigamma(a, k),
            special::mtrigamma(a, k),
        )
    }
}
