//! Plain gradient descent with a fixed step length.

use crate::error::{Error, Result};
use crate::objective::{check_iterations, check_value, evaluate, norm};
use crate::Solution;
use autodiff::{Scalar, Vector};
use log::{debug, trace};

/// Fixed-step gradient descent: `x[i] -= step * ∂f/∂x[i]` until the
/// gradient norm drops below `epsilon`.
///
/// ```
/// use autodiff::{Real, Scalar, Vector};
/// use optimize::GradientDescent;
///
/// let f = |x: &Vector<Real>| {
///     let d = x[0].clone() - 3.0;
///     Ok(d.clone() * d)
/// };
/// let gd = GradientDescent::default().with_step(0.25);
/// let r = gd.run(f, &Vector::new(&[0.0])).unwrap();
///
/// assert!((r.x[0].value() - 3.0).abs() < 1e-8);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GradientDescent {
    pub step: f64,
    pub epsilon: f64,
    pub max_iterations: Option<usize>,
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self {
            step: 0.01,
            epsilon: crate::DEFAULT_EPSILON,
            max_iterations: None,
        }
    }
}

impl GradientDescent {
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
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

    pub fn run<S, F>(&self, f: F, x0: &Vector<S>) -> Result<Solution<S>>
    where
        S: Scalar,
        F: FnMut(&Vector<S>) -> anyhow::Result<S>,
    {
        self.run_with_hook(f, x0, |_, _, _| false)
    }

    /// Like [`run`](Self::run), calling `hook(gradient, x, value)` once per
    /// iteration before the convergence test. Returning `true` stops the
    /// run at the current point.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInitialValue`] or [`Error::InvalidValue`] when the
    /// objective fails, [`Error::Diverged`] when a coordinate or the value
    /// becomes non-finite and [`Error::MaxIterations`] when the limit is hit.
    pub fn run_with_hook<S, F, H>(&self, mut f: F, x0: &Vector<S>, mut hook: H) -> Result<Solution<S>>
    where
        S: Scalar,
        F: FnMut(&Vector<S>) -> anyhow::Result<S>,
        H: FnMut(&[f64], &Vector<S>, &S) -> bool,
    {
        debug!("gradient descent: n={} step={} epsilon={}", x0.len(), self.step, self.epsilon);
        let mut x = x0.clone();
        let mut g = vec![0.0; x.len()];
        let mut iteration = 0;
        let value = loop {
            let s = evaluate(&mut f, &mut x, &mut g, iteration)?;
            check_value(&s, iteration)?;
            let gn = norm(&g);
            trace!("iteration {}: value={} |g|={}", iteration, s.value(), gn);
            if hook(&g, &x, &s) || gn < self.epsilon {
                break s.value();
            }
            check_iterations(iteration, self.max_iterations)?;
            for (xi, gi) in x.iter_mut().zip(&g) {
                let v = xi.value() - self.step * gi;
                if !v.is_finite() {
                    return Err(Error::Diverged { iteration });
                }
                xi.set_value(v);
            }
            iteration += 1;
        };
        x.set_constant();
        debug!("gradient descent: finished after {} iterations", iteration);
        Ok(Solution {
            x,
            value,
            iterations: iteration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodiff::{Probability, Real};

    fn shifted_square(x: &Vector<Real>) -> anyhow::Result<Real> {
        let d = x[0].clone() - 3.0;
        Ok(d.clone() * d)
    }

    #[test_log::test]
    fn converges_on_shifted_square() {
        let gd = GradientDescent::default().with_step(0.005);
        let r = gd.run(shifted_square, &Vector::new(&[0.0])).unwrap();
        assert!((r.x[0].value() - 3.0).abs() < 1e-8);
        assert_eq!(r.iterations, 2012);
        assert_eq!(r.x[0].order(), 0);
        assert!(r.value < 1e-16);
    }

    #[test_log::test]
    fn hook_stops_early() {
        let mut seen = Vec::new();
        let gd = GradientDescent::default().with_step(0.005);
        let r = gd
            .run_with_hook(shifted_square, &Vector::new(&[0.0]), |g, x, _| {
                seen.push((g[0], x[0].value()));
                seen.len() == 3
            })
            .unwrap();
        assert_eq!(r.iterations, 2);
        assert_eq!(seen[0], (-6.0, 0.0));
        assert!((seen[1].1 - 0.03).abs() < 1e-15);
    }

    #[test_log::test]
    fn too_large_step_diverges() {
        let gd = GradientDescent::default().with_step(10.0);
        let err = gd.run(shifted_square, &Vector::new(&[0.0])).unwrap_err();
        assert!(matches!(err, Error::Diverged { .. }), "{err}");
    }

    #[test_log::test]
    fn iteration_limit() {
        let gd = GradientDescent::default().with_step(0.005).with_max_iterations(10);
        let err = gd.run(shifted_square, &Vector::new(&[0.0])).unwrap_err();
        assert!(matches!(err, Error::MaxIterations(10)));
    }

    #[test_log::test]
    fn objective_failure() {
        let gd = GradientDescent::default();
        let err = gd
            .run(|_: &Vector<Real>| anyhow::bail!("out of domain"), &Vector::new(&[0.0]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInitialValue(_)));

        let mut calls = 0;
        let err = gd
            .run(
                |x: &Vector<Real>| {
                    calls += 1;
                    anyhow::ensure!(calls < 3, "out of domain");
                    Ok(x[0].clone() * &x[0])
                },
                &Vector::new(&[1.0]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { iteration: 2, .. }), "{err}");
    }

    #[test_log::test]
    fn probability_objective() {
        // (p - 0.25)² + 1 stays positive everywhere
        let f = |x: &Vector<Probability>| {
            let p = x[0].clone();
            Ok(p.clone() * &p + Probability::new(1.0625) - p * 0.5)
        };
        let gd = GradientDescent::default().with_step(0.1);
        let r = gd.run(f, &Vector::new(&[0.75])).unwrap();
        assert!((r.x[0].value() - 0.25).abs() < 1e-8);
    }
}
