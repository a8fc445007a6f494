//! Dense matrices of differentiable scalars.
//!
//! Storage is row-major. [`Matrix::t`] flips a flag instead of moving data,
//! and every accessor honours the flag, so `m.t().at(i, j)` is `m.at(j, i)`.

use crate::scalar::Scalar;
use crate::vector::{check_len, check_permutation, Vector};
use std::ops::{Add, Index, IndexMut, Sub};

/// A dense `rows × cols` matrix.
///
/// ```
/// use autodiff::{BareReal, Matrix, Scalar, Vector};
///
/// let a = Matrix::<BareReal>::new(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
/// let x = Vector::new(&[1.0, 0.0, -1.0]);
///
/// assert_eq!(a.mdotv(&x).values(), vec![-2.0, -2.0]);
///
/// let at = a.t();
/// assert_eq!(at.dims(), (3, 2));
/// assert_eq!(at.at(2, 0).value(), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<S> {
    data: Vec<S>,
    rows: usize,
    cols: usize,
    transposed: bool,
}

impl<S: Scalar> Matrix<S> {
    /// Constants from row-major `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, values: &[f64]) -> Self {
        Self::from_scalars(rows, cols, values.iter().map(|&v| S::from_value(v)).collect())
    }

    /// Row-major scalars.
    pub fn from_scalars(rows: usize, cols: usize, data: Vec<S>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "matrix of {}x{} needs {} elements",
            rows,
            cols,
            rows * cols
        );
        Self {
            data,
            rows,
            cols,
            transposed: false,
        }
    }

    /// All zeros.
    pub fn null(rows: usize, cols: usize) -> Self {
        Self::from_scalars(rows, cols, vec![S::zero(); rows * cols])
    }

    /// The `n × n` identity.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::null(n, n);
        for i in 0..n {
            m.data[i * n + i] = S::one();
        }
        m
    }

    /// Convert from another representation, derivatives included.
    pub fn convert<T: Scalar>(other: &Matrix<T>) -> Self {
        Self {
            data: other.data.iter().map(S::convert).collect(),
            rows: other.rows,
            cols: other.cols,
            transposed: other.transposed,
        }
    }

    /// Logical row count.
    pub fn rows(&self) -> usize {
        if self.transposed {
            self.cols
        } else {
            self.rows
        }
    }

    /// Logical column count.
    pub fn cols(&self) -> usize {
        if self.transposed {
            self.rows
        } else {
            self.cols
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    fn offset(&self, i: usize, j: usize) -> usize {
        let (rows, cols) = self.dims();
        assert!(
            i < rows && j < cols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            i,
            j,
            rows,
            cols
        );
        if self.transposed {
            j * self.cols + i
        } else {
            i * self.cols + j
        }
    }

    pub fn at(&self, i: usize, j: usize) -> &S {
        &self.data[self.offset(i, j)]
    }

    pub fn at_mut(&mut self, i: usize, j: usize) -> &mut S {
        let k = self.offset(i, j);
        &mut self.data[k]
    }

    /// Transpose in O(1).
    pub fn t(mut self) -> Self {
        self.transposed = !self.transposed;
        self
    }

    /// Row `i` as a borrowed view.
    pub fn row(&self, i: usize) -> impl Iterator<Item = &S> + '_ {
        (0..self.cols()).map(move |j| self.at(i, j))
    }

    /// Column `j` as a borrowed view.
    pub fn col(&self, j: usize) -> impl Iterator<Item = &S> + '_ {
        (0..self.rows()).map(move |i| self.at(i, j))
    }

    /// Main diagonal as a borrowed view.
    pub fn diag(&self) -> impl Iterator<Item = &S> + '_ {
        (0..self.rows().min(self.cols())).map(move |i| self.at(i, i))
    }

    /// Logical row-major values.
    pub fn values(&self) -> Vec<f64> {
        (0..self.rows())
            .flat_map(|i| self.row(i).map(S::value).collect::<Vec<_>>())
            .collect()
    }

    /// Overwrite from logical row-major values, keeping derivatives.
    pub fn set_values(&mut self, values: &[f64]) {
        check_len(self.rows * self.cols, values.len());
        let cols = self.cols();
        for (k, &v) in values.iter().enumerate() {
            self.at_mut(k / cols, k % cols).set_value(v);
        }
    }

    /// Copy values and derivatives from a matrix of any representation.
    pub fn set_from<T: Scalar>(&mut self, other: &Matrix<T>) {
        assert_eq!(self.dims(), other.dims(), "matrix dimensions do not match");
        for i in 0..self.rows() {
            for j in 0..self.cols() {
                self.at_mut(i, j).set_from(other.at(i, j));
            }
        }
    }

    pub fn set_constant(&mut self) {
        self.data.iter_mut().for_each(S::set_constant);
    }

    /// `A x`
    pub fn mdotv(&self, x: &Vector<S>) -> Vector<S> {
        check_len(self.cols(), x.len());
        (0..self.rows())
            .map(|i| self.row(i).zip(x.iter()).map(|(a, b)| a.clone() * b).sum())
            .collect()
    }

    /// `xᵀ A`
    pub fn vdotm(&self, x: &Vector<S>) -> Vector<S> {
        check_len(self.rows(), x.len());
        (0..self.cols())
            .map(|j| self.col(j).zip(x.iter()).map(|(a, b)| a.clone() * b).sum())
            .collect()
    }

    /// `A B`
    pub fn mdotm(&self, other: &Self) -> Self {
        assert_eq!(self.cols(), other.rows(), "matrix dimensions do not match");
        let (rows, cols) = (self.rows(), other.cols());
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(self.row(i).zip(other.col(j)).map(|(a, b)| a.clone() * b).sum());
            }
        }
        Self::from_scalars(rows, cols, data)
    }

    /// Multiply every element by `c`.
    pub fn scale(&self, c: &S) -> Self {
        let mut m = self.clone();
        m.data.iter_mut().for_each(|s| *s = s.clone() * c);
        m
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> S {
        assert!(self.is_square(), "trace of a non-square matrix");
        self.diag().cloned().sum()
    }

    /// Differentiable Frobenius norm.
    pub fn norm(&self) -> S {
        self.data.iter().map(|s| s.clone() * s).sum::<S>().sqrt()
    }

    /// Reorder rows so that the new row `i` is the old row `p[i]`.
    pub fn permute_rows(&mut self, p: &[usize]) {
        check_permutation(p, self.rows());
        let (rows, cols) = self.dims();
        let mut data = Vec::with_capacity(rows * cols);
        for &src in p {
            data.extend(self.row(src).cloned());
        }
        *self = Self::from_scalars(rows, cols, data);
    }

    /// Jacobian `∂yᵢ/∂xⱼ` of an already evaluated `y` with respect to `n`
    /// seeded variables, as constants.
    pub fn jacobian_of(y: &Vector<S>, n: usize) -> Self {
        let data = y
            .iter()
            .flat_map(|yi| (0..n).map(move |j| S::from_value(yi.derivative(1, j))))
            .collect();
        Self::from_scalars(y.len(), n, data)
    }

    /// Evaluate `f` at `x` with every input seeded and return the value
    /// together with the Jacobian.
    ///
    /// ```
    /// use autodiff::{Matrix, Real, Scalar, Vector};
    ///
    /// // f(x, y) = (x·y, x + y²)
    /// let f = |v: &Vector<Real>| {
    ///     Vector::from_scalars(vec![&v[0] * &v[1], v[0].clone() + &v[1] * &v[1]])
    /// };
    /// let (y, j) = Matrix::jacobian(f, &Vector::new(&[2.0, 3.0]));
    ///
    /// assert_eq!(y.values(), vec![6.0, 11.0]);
    /// assert_eq!(j.values(), vec![3.0, 2.0, 1.0, 6.0]);
    /// ```
    pub fn jacobian<F>(f: F, x: &Vector<S>) -> (Vector<S>, Self)
    where
        F: FnOnce(&Vector<S>) -> Vector<S>,
    {
        let mut x = x.clone();
        x.variables(1);
        let y = f(&x);
        let j = Self::jacobian_of(&y, x.len());
        (y, j)
    }

    fn zip_with(&self, other: &Self, f: impl Fn(S, &S) -> S) -> Self {
        assert_eq!(self.dims(), other.dims(), "matrix dimensions do not match");
        let (rows, cols) = self.dims();
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            data.extend(self.row(i).zip(other.row(i)).map(|(a, b)| f(a.clone(), b)));
        }
        Self::from_scalars(rows, cols, data)
    }
}

impl<'a, S: Scalar> Add for &'a Matrix<S> {
    type Output = Matrix<S>;

    fn add(self, rhs: Self) -> Matrix<S> {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl<'a, S: Scalar> Sub for &'a Matrix<S> {
    type Output = Matrix<S>;

    fn sub(self, rhs: Self) -> Matrix<S> {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl<S: Scalar> Index<(usize, usize)> for Matrix<S> {
    type Output = S;

    fn index(&self, (i, j): (usize, usize)) -> &S {
        self.at(i, j)
    }
}

impl<S: Scalar> IndexMut<(usize, usize)> for Matrix<S> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut S {
        self.at_mut(i, j)
    }
}

impl<S: Scalar> std::fmt::Display for Matrix<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for i in 0..self.rows() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[")?;
            for (j, s) in self.row(i).enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", s)?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}
