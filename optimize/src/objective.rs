//! Evaluation helpers shared by the optimizers.

use crate::error::{Error, Result};
use autodiff::{Scalar, Vector};

/// First derivatives of `s` with respect to `n` variables.
pub(crate) fn gradient_of<S: Scalar>(s: &S, n: usize, out: &mut [f64]) {
    for (i, g) in out.iter_mut().enumerate().take(n) {
        *g = s.derivative(1, i);
    }
}

pub(crate) fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Evaluate `f` at `x` with every element seeded at order 1, writing the
/// gradient to `gradient`. The seeding is left in place.
pub(crate) fn evaluate<S, F>(
    f: &mut F,
    x: &mut Vector<S>,
    gradient: &mut [f64],
    iteration: usize,
) -> Result<S>
where
    S: Scalar,
    F: FnMut(&Vector<S>) -> anyhow::Result<S>,
{
    x.variables(1);
    let s = f(x).map_err(|e| Error::objective(iteration, e))?;
    gradient_of(&s, x.len(), gradient);
    Ok(s)
}

pub(crate) fn check_iterations(iteration: usize, max_iterations: Option<usize>) -> Result<()> {
    match max_iterations {
        Some(max) if iteration >= max => Err(Error::MaxIterations(max)),
        _ => Ok(()),
    }
}

/// A non-finite value is an invalid starting point, or divergence later on.
pub(crate) fn check_value<S: Scalar>(s: &S, iteration: usize) -> Result<()> {
    if s.value().is_finite() {
        Ok(())
    } else if iteration == 0 {
        Err(Error::InvalidInitialValue(anyhow::anyhow!(
            "objective is {} at the initial point",
            s.value()
        )))
    } else {
        Err(Error::Diverged { iteration })
    }
}
