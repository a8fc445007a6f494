//! Resilient backpropagation (Rprop).
//!
//! Every coordinate keeps its own step size. The step grows by `1 + eta`
//! while the partial derivative keeps its sign and shrinks by `1 - eta`
//! when it flips; coordinates move by their step in the direction opposite
//! to the sign of the derivative, whatever its magnitude.

use crate::error::{Error, Result};
use crate::objective::{check_iterations, check_value, evaluate, norm};
use crate::Solution;
use autodiff::{Scalar, Vector};
use log::{debug, trace};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Rprop {
    /// Initial step size of every coordinate.
    pub step_init: f64,
    /// Adaptation rate, in `(0, 1)`.
    pub eta: f64,
    pub epsilon: f64,
    pub max_iterations: Option<usize>,
}

impl Default for Rprop {
    fn default() -> Self {
        Self {
            step_init: 0.01,
            eta: 0.1,
            epsilon: crate::DEFAULT_EPSILON,
            max_iterations: None,
        }
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl Rprop {
    pub fn with_step_init(mut self, step_init: f64) -> Self {
        self.step_init = step_init;
        self
    }

    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.eta > 0.0 && self.eta < 1.0) {
            return Err(Error::InvalidArgument(format!(
                "eta must lie in (0, 1), got {}",
                self.eta
            )));
        }
        if !(self.step_init > 0.0 && self.step_init.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "initial step must be positive, got {}",
                self.step_init
            )));
        }
        Ok(())
    }

    pub fn run<S, F>(&self, f: F, x0: &Vector<S>) -> Result<Solution<S>>
    where
        S: Scalar,
        F: FnMut(&Vector<S>) -> anyhow::Result<S>,
    {
        self.run_with_hook(f, x0, |_, _, _, _| false)
    }

    /// Run Rprop from `x0`, calling `hook(gradient, steps, x, value)` once
    /// per iteration; returning `true` stops at the current point.
    ///
    /// When the objective fails or returns a NaN gradient at a candidate
    /// point, every step size shrinks by `1 - eta` and the move is retried
    /// from the previous point.
    ///
    /// ```
    /// use autodiff::{Real, Scalar, Vector};
    /// use optimize::Rprop;
    ///
    /// // badly scaled: the curvature differs by six orders of magnitude
    /// let f = |x: &Vector<Real>| {
    ///     let a = x[0].clone() - 1.0;
    ///     let b = x[1].clone() + 2.0;
    ///     Ok(a.clone() * a * 1e3 + b.clone() * b * 1e-3)
    /// };
    /// let rprop = Rprop::default().with_step_init(0.1).with_eta(0.5).with_epsilon(1e-10);
    /// let r = rprop.run(f, &Vector::new(&[0.0, 0.0])).unwrap();
    ///
    /// assert!((r.x[0].value() - 1.0).abs() < 1e-6);
    /// assert!((r.x[1].value() + 2.0).abs() < 1e-6);
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for `eta` outside `(0, 1)` or a
    /// non-positive initial step, [`Error::InvalidInitialValue`] when the
    /// objective fails at `x0`, [`Error::InvalidValue`] when the step sizes
    /// shrink to zero without finding a valid point, [`Error::Diverged`]
    /// and [`Error::MaxIterations`].
    pub fn run_with_hook<S, F, H>(&self, mut f: F, x0: &Vector<S>, mut hook: H) -> Result<Solution<S>>
    where
        S: Scalar,
        F: FnMut(&Vector<S>) -> anyhow::Result<S>,
        H: FnMut(&[f64], &[f64], &Vector<S>, &S) -> bool,
    {
        self.validate()?;
        debug!(
            "rprop: n={} step_init={} eta={} epsilon={}",
            x0.len(),
            self.step_init,
            self.eta,
            self.epsilon
        );
        let n = x0.len();
        let mut x = x0.clone();
        let mut steps = vec![self.step_init; n];
        let mut g_old = vec![0.0; n];
        let mut g = vec![0.0; n];
        let mut g_new = vec![0.0; n];
        let mut x_old = vec![0.0; n];

        let mut s = evaluate(&mut f, &mut x, &mut g, 0)?;
        check_value(&s, 0)?;
        if g.iter().any(|gi| gi.is_nan()) {
            return Err(Error::InvalidInitialValue(anyhow::anyhow!("gradient is NaN")));
        }
        let mut iteration = 0;
        loop {
            let gn = norm(&g);
            trace!("iteration {}: value={} |g|={} steps={:?}", iteration, s.value(), gn, steps);
            if hook(&g, &steps, &x, &s) || gn < self.epsilon {
                break;
            }
            check_iterations(iteration, self.max_iterations)?;
            for ((step, go), gi) in steps.iter_mut().zip(&g_old).zip(&g) {
                let p = go * gi;
                if p > 0.0 {
                    *step *= 1.0 + self.eta;
                } else if p < 0.0 {
                    *step *= 1.0 - self.eta;
                }
            }
            for (xo, xi) in x_old.iter_mut().zip(x.iter()) {
                *xo = xi.value();
            }
            iteration += 1;
            s = loop {
                for i in 0..n {
                    let v = x_old[i] - sign(g[i]) * steps[i];
                    if !v.is_finite() {
                        return Err(Error::Diverged { iteration });
                    }
                    x[i].set_value(v);
                }
                let failure = match evaluate(&mut f, &mut x, &mut g_new, iteration) {
                    Ok(s) if !g_new.iter().any(|gi| gi.is_nan()) => break s,
                    Ok(_) => anyhow::anyhow!("gradient is NaN"),
                    Err(Error::InvalidValue { source, .. }) => source,
                    Err(e) => return Err(e),
                };
                debug!("iteration {}: retrying with smaller steps: {}", iteration, failure);
                for step in steps.iter_mut() {
                    *step *= 1.0 - self.eta;
                }
                if steps.iter().all(|&step| step == 0.0) {
                    return Err(Error::InvalidValue {
                        iteration,
                        source: failure,
                    });
                }
            };
            check_value(&s, iteration)?;
            std::mem::swap(&mut g_old, &mut g);
            std::mem::swap(&mut g, &mut g_new);
        }
        x.set_constant();
        debug!("rprop: finished after {} iterations", iteration);
        Ok(Solution {
            value: s.value(),
            x,
            iterations: iteration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GradientDescent;
    use autodiff::{Matrix, Real};
    use std::cell::Cell;

    fn shifted_square(x: &Vector<Real>) -> anyhow::Result<Real> {
        let d = x[0].clone() - 3.0;
        Ok(d.clone() * d)
    }

    #[test_log::test]
    fn beats_gradient_descent_on_misscaled_step() {
        let x0 = Vector::new(&[0.0]);
        let gd = GradientDescent::default().with_step(0.005).run(shifted_square, &x0).unwrap();
        let rp = Rprop::default()
            .with_step_init(0.005)
            .with_eta(0.5)
            .run(shifted_square, &x0)
            .unwrap();

        assert!((gd.x[0].value() - 3.0).abs() < 1e-8);
        assert!((rp.x[0].value() - 3.0).abs() < 1e-8);
        assert_eq!(rp.iterations, 80);
        assert!(rp.iterations * 10 < gd.iterations);
    }

    #[test_log::test]
    fn matrix_inverse() {
        // minimise |M X - I|² over the entries of X
        let m = Matrix::<Real>::new(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let f = |x: &Vector<Real>| {
            let xm = Matrix::from_scalars(2, 2, x.iter().cloned().collect());
            let r = &m.mdotm(&xm) - &Matrix::identity(2);
            Ok((0..2).flat_map(|i| r.row(i)).map(|v| v.clone() * v).sum::<Real>())
        };
        let rprop = Rprop::default().with_step_init(0.01).with_eta(0.5);
        let r = rprop.run(f, &Vector::null(4)).unwrap();

        for (v, e) in r.x.values().iter().zip([-2.0, 1.0, 1.5, -0.5]) {
            assert!((v - e).abs() < 1e-6, "{} != {}", v, e);
        }
    }

    #[test_log::test]
    fn retries_outside_domain() {
        let rejected = Cell::new(0);
        let f = |x: &Vector<Real>| {
            if x[0].value() > 3.5 {
                rejected.set(rejected.get() + 1);
                anyhow::bail!("x = {} out of domain", x[0]);
            }
            shifted_square(x)
        };
        let rprop = Rprop::default().with_step_init(1.0).with_eta(0.5);
        let r = rprop.run(f, &Vector::new(&[0.0])).unwrap();

        assert!((r.x[0].value() - 3.0).abs() < 1e-8);
        assert!(rejected.get() > 0);
    }

    #[test_log::test]
    fn steps_reported_to_hook() {
        let mut history = Vec::new();
        let rprop = Rprop::default().with_step_init(0.5).with_eta(0.5);
        rprop
            .run_with_hook(shifted_square, &Vector::new(&[0.0]), |_, steps, x, _| {
                history.push((steps[0], x[0].value()));
                history.len() == 4
            })
            .unwrap();

        // no adaptation on the first move, then growth while the sign holds
        assert_eq!(history, vec![(0.5, 0.0), (0.5, 0.5), (0.75, 1.25), (1.125, 2.375)]);
    }

    #[test_log::test]
    fn rejects_bad_eta() {
        for eta in [0.0, 1.0, -0.5, f64::NAN] {
            let err = Rprop::default()
                .with_eta(eta)
                .run(shifted_square, &Vector::new(&[0.0]))
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test_log::test]
    fn nan_gradient_at_start() {
        // the derivative of √x · 0 at zero is 0 · ∞
        let f = |x: &Vector<Real>| Ok(x[0].sqrt() * 0.0);
        let err = Rprop::default().run(f, &Vector::new(&[0.0])).unwrap_err();
        assert!(matches!(err, Error::InvalidInitialValue(_)));
    }
}
