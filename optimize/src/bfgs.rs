//! BFGS quasi-Newton minimisation with a backtracking line search.
//!
//! Once a step passes the Armijo test, the minimiser of the parabola through
//! `f(x)`, the directional slope and the accepted value is tried as well and
//! kept when it is feasible and lower. The search is exact on quadratics,
//! which then terminate in at most `n` iterations.
//!
//! The inverse Hessian approximation `H` starts from the inverse of the
//! supplied `B₀` (identity by default) and receives the rank-2 update
//!
//! ```text
//! H ← H - (H y sᵀ + s yᵀ H) / sᵀy + (sᵀy + yᵀ H y) / (sᵀy)² · s sᵀ
//! ```
//!
//! after every accepted step `s = x₂ - x₁` with gradient change `y = g₂ - g₁`.

use crate::error::{Error, Result};
use crate::objective::{check_iterations, check_value, evaluate, norm};
use crate::Solution;
use autodiff::linalg::{invert, InvertOptions};
use autodiff::{BareReal, Matrix, Scalar, Vector};
use log::{debug, trace};

const ARMIJO_C1: f64 = 1e-3;
const SHRINK: f64 = 0.5;
/// Below this `|sᵀy|` the update is skipped.
const CURVATURE_EPSILON: f64 = 1e-16;
/// Successive iterates closer than this end the run.
const COINCIDENCE_EPSILON: f64 = 1e-20;

/// Where in an iteration a hook is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Start of an iteration, at the current point.
    Step,
    /// After the line search accepted a candidate point.
    LineSearch,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Bfgs {
    /// Stop once the gradient norm falls below this.
    pub epsilon: f64,
    pub max_iterations: Option<usize>,
    /// Initial Hessian estimate `B₀`; its inverse seeds `H`.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub initial_hessian: Option<Matrix<BareReal>>,
}

impl Default for Bfgs {
    fn default() -> Self {
        Self {
            epsilon: crate::DEFAULT_EPSILON,
            max_iterations: None,
            initial_hessian: None,
        }
    }
}

/// Row-major `H · v`.
fn mdotv(h: &[f64], v: &[f64], out: &mut [f64]) {
    let n = v.len();
    for (i, o) in out.iter_mut().enumerate() {
        *o = h[i * n..(i + 1) * n].iter().zip(v).map(|(a, b)| a * b).sum();
    }
}

/// Row-major `vᵀ · H`.
fn vdotm(v: &[f64], h: &[f64], out: &mut [f64]) {
    let n = v.len();
    for (j, o) in out.iter_mut().enumerate() {
        *o = (0..n).map(|i| v[i] * h[i * n + j]).sum();
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

/// Step length at the minimum of the parabola matching `f(0)`, `f'(0) =
/// slope` and `f(alpha)`, given `curvature = 2 (f(alpha) - f(0) - alpha·slope)`.
/// `None` when the parabola opens downwards or its minimum is `alpha` itself.
fn interpolated_step(slope: f64, alpha: f64, curvature: f64) -> Option<f64> {
    if curvature <= 0.0 {
        return None;
    }
    let beta = -slope * alpha * alpha / curvature;
    (beta.is_finite() && beta > 0.0 && beta != alpha).then_some(beta)
}

/// Scratch vectors reused by every update of one run.
struct Workspace {
    s: Vec<f64>,
    y: Vec<f64>,
    hy: Vec<f64>,
    yh: Vec<f64>,
}

impl Workspace {
    fn new(n: usize) -> Self {
        Self {
            s: vec![0.0; n],
            y: vec![0.0; n],
            hy: vec![0.0; n],
            yh: vec![0.0; n],
        }
    }

    /// Apply the BFGS update to `h` in place, or leave it unchanged when
    /// `sᵀy` is numerically zero.
    fn update(&mut self, h: &mut [f64]) -> bool {
        let n = self.s.len();
        let sy = dot(&self.s, &self.y);
        if sy.abs() < CURVATURE_EPSILON {
            return false;
        }
        mdotv(h, &self.y, &mut self.hy);
        vdotm(&self.y, h, &mut self.yh);
        let c = (sy + dot(&self.yh, &self.y)) / (sy * sy);
        for i in 0..n {
            for j in 0..n {
                h[i * n + j] += c * self.s[i] * self.s[j]
                    - (self.hy[i] * self.s[j] + self.s[i] * self.yh[j]) / sy;
            }
        }
        true
    }
}

impl Bfgs {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_initial_hessian(mut self, initial_hessian: Matrix<BareReal>) -> Self {
        self.initial_hessian = Some(initial_hessian);
        self
    }

    /// Minimise `f` starting from `x0`.
    ///
    /// ```
    /// use autodiff::{Real, Scalar, Vector};
    /// use optimize::Bfgs;
    ///
    /// // Rosenbrock: (1 - a)² + 100 (b - a²)²
    /// let f = |x: &Vector<Real>| {
    ///     let t1 = 1.0 - x[0].clone();
    ///     let t2 = x[1].clone() - x[0].clone() * &x[0];
    ///     Ok(t1.clone() * t1 + t2.clone() * t2 * 100.0)
    /// };
    /// let r = Bfgs::default().run(f, &Vector::new(&[-10.0, 10.0])).unwrap();
    ///
    /// assert!((r.x[0].value() - 1.0).abs() < 1e-8);
    /// assert!((r.x[1].value() - 1.0).abs() < 1e-8);
    /// ```
    pub fn run<S, F>(&self, f: F, x0: &Vector<S>) -> Result<Solution<S>>
    where
        S: Scalar,
        F: FnMut(&Vector<S>) -> anyhow::Result<S>,
    {
        self.run_constrained(f, x0, |_| true, |_, _, _, _| false)
    }

    pub fn run_with_hook<S, F, H>(&self, f: F, x0: &Vector<S>, hook: H) -> Result<Solution<S>>
    where
        S: Scalar,
        F: FnMut(&Vector<S>) -> anyhow::Result<S>,
        H: FnMut(Stage, &[f64], &Vector<S>, &S) -> bool,
    {
        self.run_constrained(f, x0, |_| true, hook)
    }

    /// Minimise `f` over the points accepted by `feasible`.
    ///
    /// The line search never evaluates `f` at a point rejected by
    /// `feasible`; it keeps halving the step instead. `x0` itself is not
    /// checked. `hook(stage, gradient, x, value)` is called at the start of
    /// each iteration with [`Stage::Step`] and after each accepted line
    /// search with [`Stage::LineSearch`]; returning `true` stops the run at
    /// the point it was shown.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when `B₀` does not match `x0`,
    /// [`Error::Linalg`] when `B₀` is singular,
    /// [`Error::InvalidInitialValue`] when `f` fails or is not finite at
    /// `x0`, [`Error::InvalidValue`] when `f` fails during the line search,
    /// [`Error::LineSearchFailed`] when a candidate value is not finite or
    /// no shorter step changes `x`, and [`Error::MaxIterations`].
    pub fn run_constrained<S, F, C, H>(
        &self,
        mut f: F,
        x0: &Vector<S>,
        mut feasible: C,
        mut hook: H,
    ) -> Result<Solution<S>>
    where
        S: Scalar,
        F: FnMut(&Vector<S>) -> anyhow::Result<S>,
        C: FnMut(&Vector<S>) -> bool,
        H: FnMut(Stage, &[f64], &Vector<S>, &S) -> bool,
    {
        let n = x0.len();
        let mut h = match &self.initial_hessian {
            Some(b0) if b0.dims() != (n, n) => {
                return Err(Error::InvalidArgument(format!(
                    "initial Hessian is {}x{} but x0 has length {}",
                    b0.rows(),
                    b0.cols(),
                    n
                )))
            }
            Some(b0) => invert(b0, &InvertOptions::default())?.values(),
            None => Matrix::<BareReal>::identity(n).values(),
        };
        debug!("bfgs: n={} epsilon={}", n, self.epsilon);

        let mut x1 = x0.clone();
        let mut x2 = x0.clone();
        let mut g1 = vec![0.0; n];
        let mut g2 = vec![0.0; n];
        let mut x3 = x0.clone();
        let mut g3 = vec![0.0; n];
        let mut p = vec![0.0; n];
        let mut work = Workspace::new(n);

        let mut s1 = evaluate(&mut f, &mut x1, &mut g1, 0)?;
        check_value(&s1, 0)?;
        let mut iteration = 0;
        loop {
            let gn = norm(&g1);
            trace!("iteration {}: value={} |g|={}", iteration, s1.value(), gn);
            if hook(Stage::Step, &g1, &x1, &s1) || gn < self.epsilon {
                break;
            }
            check_iterations(iteration, self.max_iterations)?;
            iteration += 1;

            mdotv(&h, &g1, &mut p);
            p.iter_mut().for_each(|pi| *pi = -*pi);
            let slope = dot(&g1, &p);

            let mut alpha = 1.0;
            let s2 = loop {
                let mut moved = false;
                for i in 0..n {
                    let v = x1[i].value() + alpha * p[i];
                    moved |= v != x1[i].value();
                    x2[i].set_value(v);
                }
                if !moved {
                    return Err(Error::LineSearchFailed { iteration });
                }
                if feasible(&x2) {
                    let s2 = evaluate(&mut f, &mut x2, &mut g2, iteration)?;
                    if !s2.value().is_finite() {
                        return Err(Error::LineSearchFailed { iteration });
                    }
                    if s2.value() <= s1.value() + ARMIJO_C1 * alpha * slope {
                        break s2;
                    }
                }
                alpha *= SHRINK;
            };
            trace!("iteration {}: line search accepted alpha={}", iteration, alpha);

            let curvature = 2.0 * (s2.value() - s1.value() - alpha * slope);
            let s2 = match interpolated_step(slope, alpha, curvature) {
                Some(beta) => {
                    for i in 0..n {
                        x3[i].set_value(x1[i].value() + beta * p[i]);
                    }
                    let better = if feasible(&x3) {
                        match evaluate(&mut f, &mut x3, &mut g3, iteration) {
                            Ok(s3) if s3.value().is_finite() && s3.value() < s2.value() => Some(s3),
                            _ => None,
                        }
                    } else {
                        None
                    };
                    match better {
                        Some(s3) => {
                            trace!("iteration {}: interpolated alpha={}", iteration, beta);
                            std::mem::swap(&mut x2, &mut x3);
                            std::mem::swap(&mut g2, &mut g3);
                            s3
                        }
                        None => s2,
                    }
                }
                None => s2,
            };

            let stop = hook(Stage::LineSearch, &g2, &x2, &s2);
            for i in 0..n {
                work.s[i] = x2[i].value() - x1[i].value();
                work.y[i] = g2[i] - g1[i];
            }
            let distance = norm(&work.s);
            if !work.update(&mut h) {
                debug!("iteration {}: sᵀy vanishes, keeping H", iteration);
            }
            std::mem::swap(&mut x1, &mut x2);
            std::mem::swap(&mut g1, &mut g2);
            s1 = s2;
            if stop || distance < COINCIDENCE_EPSILON {
                break;
            }
        }
        x1.set_constant();
        debug!("bfgs: finished after {} iterations", iteration);
        Ok(Solution {
            value: s1.value(),
            x: x1,
            iterations: iteration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodiff::Real;
    use std::cell::RefCell;

    fn rosenbrock(x: &Vector<Real>) -> anyhow::Result<Real> {
        let t1 = 1.0 - x[0].clone();
        let t2 = x[1].clone() - x[0].clone() * &x[0];
        Ok(t1.clone() * t1 + t2.clone() * t2 * 100.0)
    }

    fn quadratic(x: &Vector<Real>) -> anyhow::Result<Real> {
        let a = x[0].clone() - 1.0;
        let b = x[1].clone() + 2.0;
        Ok(a.clone() * a + b.clone() * b)
    }

    #[test_log::test]
    fn rosenbrock_from_far_away() {
        let bfgs = Bfgs::default().with_epsilon(1e-10);
        let r = bfgs.run(rosenbrock, &Vector::new(&[-10.0, 10.0])).unwrap();
        assert!((r.x[0].value() - 1.0).abs() < 1e-8);
        assert!((r.x[1].value() - 1.0).abs() < 1e-8);
        assert!(r.value < 1e-16);
        assert!(r.iterations < 50, "{} iterations", r.iterations);
    }

    #[test_log::test]
    fn quadratic_terminates() {
        let r = Bfgs::default().run(quadratic, &Vector::new(&[-3.0, 5.0])).unwrap();
        assert!(r.iterations <= 2);
        assert!((r.x[0].value() - 1.0).abs() < 1e-12);
        assert!((r.x[1].value() + 2.0).abs() < 1e-12);

        // (a - 1)² + 10 (b + 2)² + a b, badly conditioned and coupled
        let f = |x: &Vector<Real>| {
            let a = x[0].clone() - 1.0;
            let b = x[1].clone() + 2.0;
            Ok(a.clone() * a + b.clone() * b * 10.0 + x[0].clone() * &x[1])
        };
        let r = Bfgs::default().run(f, &Vector::new(&[-3.0, 5.0])).unwrap();
        assert!(r.iterations <= 2, "{} iterations", r.iterations);
        assert!((r.x[0].value() - 80.0 / 39.0).abs() < 1e-10);
        assert!((r.x[1].value() + 82.0 / 39.0).abs() < 1e-10);
    }

    #[test_log::test]
    fn quadratic_in_three_variables_terminates() {
        // 4a² + 2b² + c² + ab + bc/2 - 3a + c
        let f = |x: &Vector<Real>| {
            let (a, b, c) = (&x[0], &x[1], &x[2]);
            Ok(a.clone() * a * 4.0 + b.clone() * b * 2.0 + c.clone() * c
                + a.clone() * b
                + b.clone() * c * 0.5
                - a.clone() * 3.0
                + c.clone())
        };
        let r = Bfgs::default().run(f, &Vector::new(&[1.0, -2.0, 3.0])).unwrap();
        assert!(r.iterations <= 3, "{} iterations", r.iterations);
        assert!((r.x[0].value() - 91.0 / 240.0).abs() < 1e-10);
        assert!((r.x[1].value() + 1.0 / 30.0).abs() < 1e-10);
        assert!((r.x[2].value() + 59.0 / 120.0).abs() < 1e-10);
    }

    #[test]
    fn interpolated_step_is_exact_on_parabolas() {
        // f(t) = (t - 3)², f(0) = 9, f'(0) = -6, f(1) = 4
        let curvature = 2.0 * (4.0 - 9.0 + 6.0);
        assert_eq!(interpolated_step(-6.0, 1.0, curvature), Some(3.0));
        assert_eq!(interpolated_step(-6.0, 1.0, 0.0), None);
        // minimum already at alpha
        assert_eq!(interpolated_step(-2.0, 1.0, 2.0), None);
    }

    #[test_log::test]
    fn exact_hessian_takes_one_step() {
        // (a - 1)² + 10 (b + 2)² + a b
        let f = |x: &Vector<Real>| {
            let a = x[0].clone() - 1.0;
            let b = x[1].clone() + 2.0;
            Ok(a.clone() * a + b.clone() * b * 10.0 + x[0].clone() * &x[1])
        };
        let b0 = Matrix::new(2, 2, &[2.0, 1.0, 1.0, 20.0]);
        let bfgs = Bfgs::default().with_initial_hessian(b0);
        let r = bfgs.run(f, &Vector::new(&[-3.0, 5.0])).unwrap();
        assert_eq!(r.iterations, 1);
        assert!((r.x[0].value() - 80.0 / 39.0).abs() < 1e-12);
        assert!((r.x[1].value() + 82.0 / 39.0).abs() < 1e-12);
    }

    #[test_log::test]
    fn matyas() {
        let f = |x: &Vector<Real>| {
            let (a, b) = (&x[0], &x[1]);
            Ok((a.clone() * a + b.clone() * b) * 0.26 - a.clone() * b * 0.48)
        };
        let r = Bfgs::default().run(f, &Vector::new(&[-2.5, 2.0])).unwrap();
        assert!(r.x[0].value().abs() < 1e-8);
        assert!(r.x[1].value().abs() < 1e-8);
    }

    #[test_log::test]
    fn infeasible_points_are_never_evaluated() {
        let evaluated = RefCell::new(Vec::new());
        let f = |x: &Vector<Real>| {
            evaluated.borrow_mut().push(x.values());
            quadratic(x)
        };
        let r = Bfgs::default()
            .run_constrained(f, &Vector::new(&[-3.0, 5.0]), |x| x[1].value() >= -5.0, |_, _, _, _| false)
            .unwrap();
        assert!((r.x[1].value() + 2.0).abs() < 1e-12);
        assert!(evaluated.borrow().iter().all(|x| x[1] >= -5.0));
    }

    #[test_log::test]
    fn hook_stages() {
        let mut stages = Vec::new();
        let r = Bfgs::default()
            .run_with_hook(rosenbrock, &Vector::new(&[-10.0, 10.0]), |stage, _, _, _| {
                stages.push(stage);
                stage == Stage::LineSearch && stages.len() == 4
            })
            .unwrap();
        assert_eq!(r.iterations, 2);
        assert_eq!(stages, vec![Stage::Step, Stage::LineSearch, Stage::Step, Stage::LineSearch]);
    }

    #[test_log::test]
    fn invalid_initial_value() {
        let err = Bfgs::default()
            .run(|_: &Vector<Real>| anyhow::bail!("undefined"), &Vector::new(&[0.0]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInitialValue(_)));

        let err = Bfgs::default()
            .run(|x: &Vector<Real>| Ok(x[0].ln()), &Vector::new(&[0.0]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInitialValue(_)));
    }

    #[test_log::test]
    fn line_search_failure() {
        // finite only at the starting point
        let f = |x: &Vector<Real>| {
            let v = x[0].clone();
            Ok(if v.value() == 1.0 { v } else { v * f64::NAN })
        };
        let err = Bfgs::default().run(f, &Vector::new(&[1.0])).unwrap_err();
        assert!(matches!(err, Error::LineSearchFailed { iteration: 1 }), "{err}");

        // a minimum on the far side of a wall the search cannot pass
        let f = |x: &Vector<Real>| {
            let d = x[0].clone() - 3.0;
            Ok(d.clone() * d)
        };
        let err = Bfgs::default()
            .run_constrained(f, &Vector::new(&[0.0]), |x| x[0].value() < 1.0, |_, _, _, _| false)
            .unwrap_err();
        assert!(matches!(err, Error::LineSearchFailed { .. }), "{err}");
    }

    #[test_log::test]
    fn initial_hessian_checks() {
        let bfgs = Bfgs::default().with_initial_hessian(Matrix::identity(3));
        let err = bfgs.run(quadratic, &Vector::new(&[0.0, 0.0])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let bfgs = Bfgs::default().with_initial_hessian(Matrix::new(2, 2, &[1.0, 2.0, 2.0, 4.0]));
        let err = bfgs.run(quadratic, &Vector::new(&[0.0, 0.0])).unwrap_err();
        assert!(err.is_singular(), "{err}");
    }

    #[test]
    fn update_keeps_secant_condition() {
        let mut h = vec![1.0, 0.0, 0.0, 1.0];
        let mut work = Workspace::new(2);
        work.s.copy_from_slice(&[0.5, -1.0]);
        work.y.copy_from_slice(&[2.0, -0.5]);
        assert!(work.update(&mut h));
        let mut hy = [0.0; 2];
        mdotv(&h, &work.y, &mut hy);
        assert!((hy[0] - 0.5).abs() < 1e-12);
        assert!((hy[1] + 1.0).abs() < 1e-12);
        assert!((h[1] - h[2]).abs() < 1e-15);

        work.y.copy_from_slice(&[0.0, 0.0]);
        let before = h.clone();
        assert!(!work.update(&mut h));
        assert_eq!(h, before);
    }
}
