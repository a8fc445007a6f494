//! Special functions not covered by `f64` itself.
//!
//! `erf`, `erfc`, `tgamma` and `lgamma` come from [`libm`]; the polygamma
//! functions reflect negative arguments onto `1 - x`, use the recurrence
//! `ψ(x) = ψ(x+1) - 1/x` until the argument reaches 10, then the asymptotic
//! Bernoulli series.

use std::f64::consts::PI;

/// `2/√π`
pub const FRAC_2_SQRT_PI: f64 = std::f64::consts::FRAC_2_SQRT_PI;

/// Error function.
pub fn erf(x: f64) -> f64 {
    libm::erf(x)
}

/// Complementary error function `1 - erf(x)`.
pub fn erfc(x: f64) -> f64 {
    libm::erfc(x)
}

/// `ln(erfc(x))`, accurate where `erfc` itself underflows.
///
/// ```
/// use autodiff::special::{erfc, log_erfc};
///
/// assert!((log_erfc(0.5) - erfc(0.5).ln()).abs() < 1e-14);
/// // erfc(30) underflows to zero, the logarithm does not
/// assert!(log_erfc(30.0).is_finite());
/// ```
pub fn log_erfc(x: f64) -> f64 {
    if x < 26.0 {
        return erfc(x).ln();
    }
    // erfc(x) ~ exp(-x²)/(x√π) · (1 - 1/(2x²) + 3/(4x⁴) - 15/(8x⁶) + 105/(16x⁸))
    let z = 1.0 / (2.0 * x * x);
    let series = 1.0 - z * (1.0 - 3.0 * z * (1.0 - 5.0 * z * (1.0 - 7.0 * z)));
    -x * x - (x * PI.sqrt()).ln() + series.ln()
}

/// Gamma function.
pub fn gamma(x: f64) -> f64 {
    libm::tgamma(x)
}

/// `ln|Γ(x)|` where `Γ(x) > 0`, NaN where `Γ(x) < 0`.
pub fn lgamma(x: f64) -> f64 {
    let (value, sign) = libm::lgamma_r(x);
    if sign < 0 {
        f64::NAN
    } else {
        value
    }
}

/// `x` shifted by an integer into `[-0.5, 0.5]`; `tan(πx)` and `sin²(πx)`
/// are unchanged and stay accurate for large `|x|`.
fn reduce(x: f64) -> f64 {
    x - x.round()
}

/// Digamma function `ψ(x) = Γ'(x)/Γ(x)`.
pub fn digamma(x: f64) -> f64 {
    if x <= 0.0 && x == x.floor() {
        return f64::NAN;
    }
    if x < 0.0 {
        // ψ(x) = ψ(1-x) - π/tan(πx)
        return digamma(1.0 - x) - PI / (PI * reduce(x)).tan();
    }

    let mut x = x;
    let mut result = 0.0;

    while x < 10.0 {
        result -= 1.0 / x;
        x += 1.0;
    }

    result += x.ln() - 0.5 / x;
    let x2 = 1.0 / (x * x);
    result -= x2
        * (1.0 / 12.0 - x2 * (1.0 / 120.0 - x2 * (1.0 / 252.0 - x2 * (1.0 / 240.0 - x2 / 132.0))));

    result
}

/// Trigamma function `ψ'(x)`.
pub fn trigamma(x: f64) -> f64 {
    if x <= 0.0 && x == x.floor() {
        return f64::NAN;
    }
    if x < 0.0 {
        // ψ'(x) = π²/sin²(πx) - ψ'(1-x)
        let s = (PI * reduce(x)).sin();
        return PI * PI / (s * s) - trigamma(1.0 - x);
    }

    let mut x = x;
    let mut result = 0.0;

    while x < 10.0 {
        result += 1.0 / (x * x);
        x += 1.0;
    }

    let r = 1.0 / x;
    let r2 = r * r;
    // 1/x + 1/(2x²) + Σ B_2k / x^(2k+1)
    result += r
        + 0.5 * r2
        + r * r2
            * (1.0 / 6.0 - r2 * (1.0 / 30.0 - r2 * (1.0 / 42.0 - r2 * (1.0 / 30.0 - r2 * 5.0 / 66.0))));

    result
}

/// Multivariate log-gamma `ln Γ_k(x) = k(k-1)/4 · ln π + Σ_{j=1..k} ln Γ(x + (1-j)/2)`.
pub fn mlgamma(x: f64, k: usize) -> f64 {
    let kf = k as f64;
    let mut sum = kf * (kf - 1.0) / 4.0 * PI.ln();
    for j in 1..=k {
        sum += lgamma(x + (1.0 - j as f64) / 2.0);
    }
    sum
}

/// `Σ_{j=1..k} ψ(x + (1-j)/2)`, the derivative of [`mlgamma`].
pub fn mdigamma(x: f64, k: usize) -> f64 {
    (1..=k).map(|j| digamma(x + (1.0 - j as f64) / 2.0)).sum()
}

/// `Σ_{j=1..k} ψ'(x + (1-j)/2)`, the second derivative of [`mlgamma`].
pub fn mtrigamma(x: f64, k: usize) -> f64 {
    (1..=k).map(|j| trigamma(x + (1.0 - j as f64) / 2.0)).sum()
}
