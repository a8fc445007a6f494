//! Newton's method for roots of vector-valued functions.

use crate::error::{Error, Result};
use crate::objective::{check_iterations, norm};
use crate::Solution;
use autodiff::linalg::{self, SolveOptions, DEFAULT_SINGULARITY_EPSILON};
use autodiff::{Matrix, Scalar, Vector};
use log::{debug, trace};

/// Newton iteration `x ← x - Δ` with `J(x) · Δ = f(x)`.
///
/// With an `active` mask, variables marked `false` are clamped: their rows
/// and columns are left out of the linear solve and their `Δ` is zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Newton {
    pub epsilon: f64,
    pub max_iterations: Option<usize>,
    /// Pivot threshold passed to the linear solve.
    pub singularity_epsilon: f64,
    pub active: Option<Vec<bool>>,
}

impl Default for Newton {
    fn default() -> Self {
        Self {
            epsilon: crate::DEFAULT_EPSILON,
            max_iterations: None,
            singularity_epsilon: DEFAULT_SINGULARITY_EPSILON,
            active: None,
        }
    }
}

impl Newton {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_singularity_epsilon(mut self, singularity_epsilon: f64) -> Self {
        self.singularity_epsilon = singularity_epsilon;
        self
    }

    pub fn with_active(mut self, active: Vec<bool>) -> Self {
        self.active = Some(active);
        self
    }

    /// Find `x` with `f(x) = 0`, starting from `x0`.
    ///
    /// ```
    /// use autodiff::{Real, Scalar, Vector};
    /// use optimize::Newton;
    ///
    /// // x₁² + x₂² = 6, x₁³ = x₂²
    /// let f = |x: &Vector<Real>| {
    ///     let (a, b) = (&x[0], &x[1]);
    ///     Ok(Vector::from_scalars(vec![
    ///         a.clone() * a + b.clone() * b - 6.0,
    ///         a.powf(3.0) - b.clone() * b,
    ///     ]))
    /// };
    /// let r = Newton::default().run(f, &Vector::new(&[1.0, 1.0])).unwrap();
    ///
    /// assert!((r.x[0].value() - 1.537656).abs() < 1e-6);
    /// assert!((r.x[1].value() - 1.906728).abs() < 1e-6);
    /// ```
    pub fn run<S, F>(&self, f: F, x0: &Vector<S>) -> Result<Solution<S>>
    where
        S: Scalar,
        F: FnMut(&Vector<S>) -> anyhow::Result<Vector<S>>,
    {
        self.run_with_hook(f, x0, |_, _, _| false)
    }

    /// Like [`run`](Self::run), calling `hook(jacobian, x, f(x))` once per
    /// iteration before the solve. Returning `true` stops at the current
    /// point. The reported value is `|f(x)|` at the last evaluation.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when `f` is not square or the mask has the
    /// wrong length, [`Error::InvalidInitialValue`] and
    /// [`Error::InvalidValue`] when `f` fails, [`Error::Linalg`] when the
    /// Jacobian is singular and [`Error::MaxIterations`].
    pub fn run_with_hook<S, F, H>(&self, mut f: F, x0: &Vector<S>, mut hook: H) -> Result<Solution<S>>
    where
        S: Scalar,
        F: FnMut(&Vector<S>) -> anyhow::Result<Vector<S>>,
        H: FnMut(&Matrix<S>, &Vector<S>, &Vector<S>) -> bool,
    {
        let n = x0.len();
        let active = match &self.active {
            Some(mask) if mask.len() != n => {
                return Err(Error::InvalidArgument(format!(
                    "active mask has length {} but x0 has length {}",
                    mask.len(),
                    n
                )))
            }
            Some(mask) => mask.clone(),
            None => vec![true; n],
        };
        let options = SolveOptions {
            active: self.active.clone(),
            epsilon: self.singularity_epsilon,
        };
        debug!("newton: n={} epsilon={} active={:?}", n, self.epsilon, self.active);

        let mut x = x0.clone();
        let mut iteration = 0;
        let residual = loop {
            x.variables(1);
            let y = f(&x).map_err(|e| Error::objective(iteration, e))?;
            if y.len() != n {
                return Err(Error::InvalidArgument(format!(
                    "f maps {} variables to {} values",
                    n,
                    y.len()
                )));
            }
            let residual = norm(&y.values());
            let mut jacobian = Matrix::jacobian_of(&y, n);
            trace!("iteration {}: |f(x)|={}", iteration, residual);
            if hook(&jacobian, &x, &y) {
                break residual;
            }
            check_iterations(iteration, self.max_iterations)?;

            let mut delta = Vector::<S>::new(&y.values());
            linalg::solve(&mut jacobian, None, &mut delta, &options)?;
            let mut distance = 0.0;
            for (i, xi) in x.iter_mut().enumerate().filter(|(i, _)| active[*i]) {
                let d = delta[i].value();
                distance += d * d;
                xi.set_value(xi.value() - d);
            }
            iteration += 1;
            if distance.sqrt() < self.epsilon {
                break residual;
            }
        };
        x.set_constant();
        debug!("newton: finished after {} iterations", iteration);
        Ok(Solution {
            x,
            value: residual,
            iterations: iteration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodiff::Real;

    fn system(x: &Vector<Real>) -> anyhow::Result<Vector<Real>> {
        let (a, b) = (&x[0], &x[1]);
        Ok(Vector::from_scalars(vec![
            a.clone() * a + b.clone() * b - 6.0,
            a.clone() * a * a - b.clone() * b,
        ]))
    }

    #[test_log::test]
    fn solves_polynomial_system() {
        let r = Newton::default().run(system, &Vector::new(&[1.0, 1.0])).unwrap();
        assert!((r.x[0].value() - 1.537656).abs() < 1e-6);
        assert!((r.x[1].value() - 1.906728).abs() < 1e-6);
        assert_eq!(r.iterations, 6);
        assert!(r.value < 1e-8);
        assert_eq!(r.x[0].order(), 0);
    }

    #[test_log::test]
    fn hook_sees_jacobian() {
        let mut first = None;
        Newton::default()
            .run_with_hook(system, &Vector::new(&[1.0, 1.0]), |j, _, y| {
                first.get_or_insert_with(|| (j.values(), y.values()));
                true
            })
            .unwrap();
        let (j, y) = first.unwrap();
        assert_eq!(j, vec![2.0, 2.0, 3.0, -2.0]);
        assert_eq!(y, vec![-4.0, 0.0]);
    }

    #[test_log::test]
    fn clamped_variable_stays_put() {
        // with x₂ clamped at 2 the first equation alone gives x₁ = √2
        let f = |x: &Vector<Real>| {
            let (a, b) = (&x[0], &x[1]);
            Ok(Vector::from_scalars(vec![
                a.clone() * a + b.clone() * b - 6.0,
                b.clone() - 5.0,
            ]))
        };
        let newton = Newton::default().with_active(vec![true, false]);
        let r = newton.run(f, &Vector::new(&[1.0, 2.0])).unwrap();
        assert!((r.x[0].value() - 2f64.sqrt()).abs() < 1e-10);
        assert_eq!(r.x[1].value(), 2.0);
    }

    #[test_log::test]
    fn singular_jacobian() {
        // both equations depend on x₁ + x₂ only
        let f = |x: &Vector<Real>| {
            let s = x[0].clone() + &x[1];
            Ok(Vector::from_scalars(vec![s.clone() - 1.0, s * 2.0 - 2.0]))
        };
        let err = Newton::default().run(f, &Vector::new(&[0.0, 0.0])).unwrap_err();
        assert!(err.is_singular(), "{err}");
    }

    #[test_log::test]
    fn argument_checks() {
        let err = Newton::default()
            .with_active(vec![true])
            .run(system, &Vector::new(&[1.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = Newton::default()
            .run(|x: &Vector<Real>| Ok(Vector::from_scalars(vec![x[0].clone()])), &Vector::new(&[1.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = Newton::default()
            .run(|_: &Vector<Real>| anyhow::bail!("no"), &Vector::new(&[1.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInitialValue(_)));
    }

    #[test_log::test]
    fn iteration_limit() {
        let err = Newton::default()
            .with_max_iterations(2)
            .run(system, &Vector::new(&[1.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, Error::MaxIterations(2)));
    }
}
