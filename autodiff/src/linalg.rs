//! Dense linear algebra over any [`Scalar`].
//!
//! All routines work on logical (transpose-aware) indices and propagate
//! derivatives through every arithmetic step, so a solve inside an
//! objective is itself differentiable.

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::scalar::Scalar;
use crate::vector::Vector;
use log::trace;

/// Pivots with a magnitude below this are treated as zero.
pub const DEFAULT_SINGULARITY_EPSILON: f64 = 1e-120;

/// Options for [`solve`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolveOptions {
    /// Rows and columns with `false` are left out of the elimination.
    pub active: Option<Vec<bool>>,
    /// Singularity threshold for pivots.
    pub epsilon: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            active: None,
            epsilon: DEFAULT_SINGULARITY_EPSILON,
        }
    }
}

impl SolveOptions {
    pub fn with_active(mut self, active: Vec<bool>) -> Self {
        self.active = Some(active);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Options for [`invert`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InvertOptions {
    pub solve: SolveOptions,
    /// Invert through the Cholesky factor.
    pub positive_definite: bool,
}

impl InvertOptions {
    pub fn with_active(mut self, active: Vec<bool>) -> Self {
        self.solve.active = Some(active);
        self
    }

    pub fn with_positive_definite(mut self, positive_definite: bool) -> Self {
        self.positive_definite = positive_definite;
        self
    }
}

fn check_system<S: Scalar>(a: &Matrix<S>, x: Option<&Matrix<S>>, b: &Vector<S>) -> Result<usize> {
    let (n, m) = a.dims();
    if n != m {
        return Err(Error::DimensionMismatch {
            expected: (n, n),
            got: (n, m),
        });
    }
    if let Some(x) = x {
        if x.dims() != (n, n) {
            return Err(Error::DimensionMismatch {
                expected: (n, n),
                got: x.dims(),
            });
        }
    }
    if b.len() != n {
        return Err(Error::DimensionMismatch {
            expected: (n, 1),
            got: (b.len(), 1),
        });
    }
    Ok(n)
}

fn active_mask(active: &Option<Vec<bool>>, n: usize) -> Result<Vec<bool>> {
    match active {
        Some(mask) if mask.len() != n => Err(Error::DimensionMismatch {
            expected: (n, 1),
            got: (mask.len(), 1),
        }),
        Some(mask) => Ok(mask.clone()),
        None => Ok(vec![true; n]),
    }
}

/// `m[r, k] -= m[src, k] * c`
fn sub_scaled<S: Scalar>(m: &mut Matrix<S>, r: usize, src: usize, k: usize, c: &S) {
    let v = m.at(r, k).clone() - m.at(src, k).clone() * c;
    *m.at_mut(r, k) = v;
}

fn is_nan<S: Scalar>(s: &S) -> bool {
    s.value().is_nan()
}

/// Solve `a · z = b` by Gauss-Jordan elimination with partial pivoting.
///
/// Every row operation is applied to `a`, to the optional `x` and to `b`
/// alike. On success `a` holds the identity on the active block, `b` the
/// solution `z`, and `x` the matrix `a⁻¹ · x` (so starting `x` from the
/// identity yields the inverse). Inactive rows and columns are untouched.
///
/// ```
/// use autodiff::linalg::{solve, SolveOptions};
/// use autodiff::{BareReal, Matrix, Vector};
///
/// let mut a = Matrix::<BareReal>::new(2, 2, &[0.0, 2.0, 1.0, 1.0]);
/// let mut b = Vector::new(&[4.0, 3.0]);
/// solve(&mut a, None, &mut b, &SolveOptions::default()).unwrap();
///
/// assert_eq!(b.values(), vec![1.0, 2.0]);
/// assert_eq!(a, Matrix::identity(2));
/// ```
///
/// # Errors
///
/// [`Error::DimensionMismatch`] for incompatible shapes and
/// [`Error::Singular`] when a pivot falls below `options.epsilon` or the
/// back-substitution produces NaN.
pub fn solve<S: Scalar>(
    a: &mut Matrix<S>,
    mut x: Option<&mut Matrix<S>>,
    b: &mut Vector<S>,
    options: &SolveOptions,
) -> Result<()> {
    let n = check_system(a, x.as_deref(), b)?;
    let active = active_mask(&options.active, n)?;
    let mut p: Vec<usize> = (0..n).collect();

    for i in (0..n).filter(|&i| active[i]) {
        let mut maxrow = i;
        for j in (i + 1..n).filter(|&j| active[j]) {
            if a.at(p[j], i).value().abs() > a.at(p[maxrow], i).value().abs() {
                maxrow = j;
            }
        }
        if maxrow != i {
            trace!("pivot column {}: swapping rows {} and {}", i, i, maxrow);
            p.swap(i, maxrow);
        }
        let pivot = a.at(p[i], i).value().abs();
        if pivot.is_nan() || pivot < options.epsilon {
            return Err(Error::Singular { pivot: i });
        }
        for j in (i + 1..n).filter(|&j| active[j]) {
            let c = a.at(p[j], i).clone() / a.at(p[i], i);
            for k in (i..n).filter(|&k| active[k]) {
                sub_scaled(a, p[j], p[i], k, &c);
            }
            if let Some(x) = x.as_deref_mut() {
                for k in (0..n).filter(|&k| active[k]) {
                    sub_scaled(x, p[j], p[i], k, &c);
                }
            }
            b[p[j]] = b[p[j]].clone() - b[p[i]].clone() * &c;
        }
    }

    for i in (0..n).rev().filter(|&i| active[i]) {
        let c = a.at(p[i], i).clone();
        for j in (0..i).filter(|&j| active[j]) {
            let f = a.at(p[j], i).clone() / &c;
            b[p[j]] = b[p[j]].clone() - f.clone() * &b[p[i]];
            if is_nan(&b[p[j]]) {
                return Err(Error::Singular { pivot: i });
            }
            if let Some(x) = x.as_deref_mut() {
                for k in (0..n).filter(|&k| active[k]) {
                    sub_scaled(x, p[j], p[i], k, &f);
                    if is_nan(x.at(p[j], k)) {
                        return Err(Error::Singular { pivot: i });
                    }
                }
            }
            for k in (0..n).filter(|&k| active[k]) {
                sub_scaled(a, p[j], p[i], k, &f);
                if is_nan(a.at(p[j], k)) {
                    return Err(Error::Singular { pivot: i });
                }
            }
        }
        let v = a.at(p[i], i).clone() / &c;
        if is_nan(&v) {
            return Err(Error::Singular { pivot: i });
        }
        *a.at_mut(p[i], i) = v;
        if let Some(x) = x.as_deref_mut() {
            for k in (0..n).filter(|&k| active[k]) {
                let v = x.at(p[i], k).clone() / &c;
                *x.at_mut(p[i], k) = v;
            }
        }
        b[p[i]] = b[p[i]].clone() / &c;
    }

    a.permute_rows(&p);
    if let Some(x) = x {
        x.permute_rows(&p);
    }
    b.permute(&p);
    Ok(())
}

/// Back-substitution for an upper-triangular `a`, with the same contract
/// as [`solve`] but no pivoting.
pub fn solve_triangular<S: Scalar>(
    a: &mut Matrix<S>,
    mut x: Option<&mut Matrix<S>>,
    b: &mut Vector<S>,
    options: &SolveOptions,
) -> Result<()> {
    let n = check_system(a, x.as_deref(), b)?;
    let active = active_mask(&options.active, n)?;

    for i in (0..n).rev().filter(|&i| active[i]) {
        let c = a.at(i, i).clone();
        let pivot = c.value().abs();
        if pivot.is_nan() || pivot < options.epsilon {
            return Err(Error::Singular { pivot: i });
        }
        for j in (0..i).filter(|&j| active[j]) {
            let f = a.at(j, i).clone() / &c;
            b[j] = b[j].clone() - f.clone() * &b[i];
            if let Some(x) = x.as_deref_mut() {
                for k in (0..n).filter(|&k| active[k]) {
                    sub_scaled(x, j, i, k, &f);
                }
            }
            for k in (0..n).filter(|&k| active[k]) {
                sub_scaled(a, j, i, k, &f);
            }
        }
        let v = a.at(i, i).clone() / &c;
        *a.at_mut(i, i) = v;
        if let Some(x) = x.as_deref_mut() {
            for k in (i..n).filter(|&k| active[k]) {
                let v = x.at(i, k).clone() / &c;
                *x.at_mut(i, k) = v;
            }
        }
        b[i] = b[i].clone() / &c;
        if is_nan(&b[i]) {
            return Err(Error::Singular { pivot: i });
        }
    }
    Ok(())
}

fn check_square<S: Scalar>(a: &Matrix<S>) -> Result<usize> {
    let (n, m) = a.dims();
    if n != m {
        return Err(Error::DimensionMismatch {
            expected: (n, n),
            got: (n, m),
        });
    }
    if n == 0 {
        return Err(Error::EmptyMatrix);
    }
    Ok(n)
}

/// Inverse of a square matrix.
///
/// ```
/// use autodiff::linalg::{invert, InvertOptions};
/// use autodiff::{BareReal, Matrix};
///
/// let a = Matrix::<BareReal>::new(2, 2, &[4.0, 7.0, 2.0, 6.0]);
/// let inv = invert(&a, &InvertOptions::default()).unwrap();
/// let id = a.mdotm(&inv);
///
/// for (v, e) in id.values().iter().zip(Matrix::<BareReal>::identity(2).values()) {
///     assert!((v - e).abs() < 1e-12);
/// }
/// ```
///
/// With `positive_definite` the inverse is `U⁻¹ U⁻ᵀ` from the Cholesky
/// factor `a = Uᵀ U`; the active mask is ignored on that path.
pub fn invert<S: Scalar>(a: &Matrix<S>, options: &InvertOptions) -> Result<Matrix<S>> {
    let n = check_square(a)?;
    let mut x = Matrix::identity(n);
    let mut b = Vector::new(&vec![1.0; n]);
    if options.positive_definite {
        let mut u = cholesky(a)?.t();
        let triangular = SolveOptions {
            active: None,
            epsilon: options.solve.epsilon,
        };
        solve_triangular(&mut u, Some(&mut x), &mut b, &triangular)?;
        let xt = x.clone().t();
        return Ok(x.mdotm(&xt));
    }
    let mut a = a.clone();
    solve(&mut a, Some(&mut x), &mut b, &options.solve)?;
    Ok(x)
}

/// Lower-triangular `L` with `a = L Lᵀ`.
///
/// # Errors
///
/// [`Error::NotPositiveDefinite`] when a diagonal entry under the square
/// root is not positive.
pub fn cholesky<S: Scalar>(a: &Matrix<S>) -> Result<Matrix<S>> {
    let n = check_square(a)?;
    let mut l = Matrix::<S>::null(n, n);
    for i in 0..n {
        for j in 0..=i {
            let s: S = (0..j).map(|k| l.at(i, k).clone() * l.at(j, k)).sum();
            let t = a.at(i, j).clone() - s;
            let v = if i == j {
                if t.value().is_nan() || t.value() <= 0.0 {
                    return Err(Error::NotPositiveDefinite {
                        pivot: i,
                        value: t.value(),
                    });
                }
                t.sqrt()
            } else {
                t / l.at(j, j)
            };
            *l.at_mut(i, j) = v;
        }
    }
    Ok(l)
}

/// Determinant by pivoted elimination; zero for a singular matrix.
pub fn determinant<S: Scalar>(a: &Matrix<S>) -> Result<S> {
    let n = check_square(a)?;
    let mut a = a.clone();
    let mut det = S::one();
    for i in 0..n {
        let maxrow = (i..n)
            .max_by(|&r, &s| {
                let (r, s) = (a.at(r, i).value().abs(), a.at(s, i).value().abs());
                r.total_cmp(&s)
            })
            .unwrap_or(i);
        if a.at(maxrow, i).value() == 0.0 {
            return Ok(S::zero());
        }
        if maxrow != i {
            let mut p: Vec<usize> = (0..n).collect();
            p.swap(i, maxrow);
            a.permute_rows(&p);
            det = -det;
        }
        for j in i + 1..n {
            let c = a.at(j, i).clone() / a.at(i, i);
            for k in i..n {
                sub_scaled(&mut a, j, i, k, &c);
            }
        }
        det = det * a.at(i, i);
    }
    Ok(det)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BareReal, Real};

    fn m(rows: usize, cols: usize, values: &[f64]) -> Matrix<BareReal> {
        Matrix::new(rows, cols, values)
    }

    fn assert_close(a: &[f64], b: &[f64], eps: f64) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < eps, "{:?} != {:?}", a, b);
        }
    }

    #[test_log::test]
    fn solve_three_by_three() {
        let a0 = m(3, 3, &[2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]);
        let mut a = a0.clone();
        let mut b = Vector::new(&[8.0, -11.0, -3.0]);
        solve(&mut a, None, &mut b, &SolveOptions::default()).unwrap();
        assert_close(&b.values(), &[2.0, 3.0, -1.0], 1e-12);
        assert_close(&a.values(), &Matrix::<BareReal>::identity(3).values(), 1e-12);
    }

    #[test_log::test]
    fn solve_accumulates_inverse_in_x() {
        let a0 = m(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let mut a = a0.clone();
        let mut x = Matrix::identity(2);
        let mut b = Vector::new(&[1.0, 1.0]);
        solve(&mut a, Some(&mut x), &mut b, &SolveOptions::default()).unwrap();
        assert_close(&x.values(), &[-2.0, 1.0, 1.5, -0.5], 1e-12);
        assert_close(&a0.mdotm(&x).values(), &[1.0, 0.0, 0.0, 1.0], 1e-12);
    }

    #[test_log::test]
    fn singular_matrix_is_reported() {
        let mut a = m(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let mut b = Vector::new(&[1.0, 2.0]);
        let err = solve(&mut a, None, &mut b, &SolveOptions::default()).unwrap_err();
        assert_eq!(err, Error::Singular { pivot: 1 });
    }

    #[test_log::test]
    fn epsilon_controls_singularity() {
        let mut a = m(2, 2, &[1e-10, 0.0, 0.0, 1.0]);
        let mut b = Vector::new(&[1.0, 1.0]);
        let options = SolveOptions::default().with_epsilon(1e-8);
        assert!(matches!(
            solve(&mut a, None, &mut b, &options),
            Err(Error::Singular { pivot: 0 })
        ));
    }

    #[test_log::test]
    fn inactive_rows_are_skipped() {
        // second row/column would make the system singular
        let mut a = m(3, 3, &[2.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 3.0]);
        let mut b = Vector::new(&[3.0, 7.0, 4.0]);
        let options = SolveOptions::default().with_active(vec![true, false, true]);
        solve(&mut a, None, &mut b, &options).unwrap();
        assert_close(&b.values(), &[1.0, 7.0, 1.0], 1e-12);
    }

    #[test_log::test]
    fn mask_length_is_checked() {
        let mut a = m(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let mut b = Vector::new(&[1.0, 1.0]);
        let options = SolveOptions::default().with_active(vec![true]);
        assert!(matches!(
            solve(&mut a, None, &mut b, &options),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test_log::test]
    fn invert_general_and_positive_definite() {
        let a = m(3, 3, &[4.0, 12.0, -16.0, 12.0, 37.0, -43.0, -16.0, -43.0, 98.0]);
        let expected = [
            49.36111111111111,
            -13.555555555555555,
            2.1111111111111111,
            -13.555555555555555,
            3.7777777777777777,
            -0.5555555555555556,
            2.1111111111111111,
            -0.5555555555555556,
            0.1111111111111111,
        ];
        let general = invert(&a, &InvertOptions::default()).unwrap();
        assert_close(&general.values(), &expected, 1e-9);
        let pd = invert(&a, &InvertOptions::default().with_positive_definite(true)).unwrap();
        assert_close(&pd.values(), &expected, 1e-9);
    }

    #[test_log::test]
    fn cholesky_factor() {
        let a = m(3, 3, &[4.0, 12.0, -16.0, 12.0, 37.0, -43.0, -16.0, -43.0, 98.0]);
        let l = cholesky(&a).unwrap();
        assert_close(
            &l.values(),
            &[2.0, 0.0, 0.0, 6.0, 1.0, 0.0, -8.0, 5.0, 3.0],
            1e-12,
        );
        let not_pd = m(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            cholesky(&not_pd),
            Err(Error::NotPositiveDefinite { pivot: 1, .. })
        ));
    }

    #[test_log::test]
    fn invert_rejects_bad_shapes() {
        assert!(matches!(
            invert(&m(2, 3, &[0.0; 6]), &InvertOptions::default()),
            Err(Error::DimensionMismatch { .. })
        ));
        assert_eq!(
            invert(&m(0, 0, &[]), &InvertOptions::default()).unwrap_err(),
            Error::EmptyMatrix
        );
    }

    #[test_log::test]
    fn determinant_with_pivoting() {
        let a = m(3, 3, &[0.0, 2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        // 0(3-1) - 2(3-2) + 1(1-2) = -3
        assert!((determinant(&a).unwrap().value() + 3.0).abs() < 1e-12);
        assert_eq!(determinant(&m(2, 2, &[1.0, 2.0, 2.0, 4.0])).unwrap().value(), 0.0);
    }

    #[test_log::test]
    fn solve_is_differentiable() {
        // [[t, 1], [0, 2]] z = [t, 2] ⇒ z₀ = (t - 1)/t, dz₀/dt = 1/t²
        let t = Real::variable(2.0, 0, 1, 1);
        let mut a = Matrix::from_scalars(
            2,
            2,
            vec![t.clone(), Real::new(1.0), Real::new(0.0), Real::new(2.0)],
        );
        let mut b = Vector::from_scalars(vec![t, Real::new(2.0)]);
        solve(&mut a, None, &mut b, &SolveOptions::default()).unwrap();
        assert!((b[0].value() - 0.5).abs() < 1e-12);
        assert!((b[0].derivative(1, 0) - 0.25).abs() < 1e-12);
    }
}
