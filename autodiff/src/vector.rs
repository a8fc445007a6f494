//! Ordered containers of differentiable scalars.

use crate::matrix::Matrix;
use crate::scalar::Scalar;
use std::ops::{Add, Index, IndexMut, Sub};

/// A fixed-length sequence of scalars.
///
/// Element `i` becomes independent variable `i` when the vector is seeded
/// with [`Vector::variables`].
///
/// # Examples
///
/// ```
/// use autodiff::{Real, Scalar, Vector};
///
/// let mut x = Vector::<Real>::new(&[3.0, 4.0]);
/// x.variables(1);
///
/// let r = x.norm();
/// assert_eq!(r.value(), 5.0);
/// assert!((r.derivative(1, 0) - 0.6).abs() < 1e-15); // x/‖x‖
/// assert!((r.derivative(1, 1) - 0.8).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vector<S> {
    data: Vec<S>,
}

impl<S: Scalar> Vector<S> {
    /// Constants holding `values`.
    pub fn new(values: &[f64]) -> Self {
        values.iter().map(|&v| S::from_value(v)).collect()
    }

    /// `n` zeros.
    pub fn null(n: usize) -> Self {
        Self {
            data: vec![S::zero(); n],
        }
    }

    pub fn from_scalars(data: Vec<S>) -> Self {
        Self { data }
    }

    /// Convert from another representation, derivatives included.
    pub fn convert<T: Scalar>(other: &Vector<T>) -> Self {
        other.iter().map(S::convert).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, S> {
        self.data.iter_mut()
    }

    pub fn as_slice(&self) -> &[S] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<S> {
        self.data
    }

    /// Plain values of all elements.
    pub fn values(&self) -> Vec<f64> {
        self.data.iter().map(S::value).collect()
    }

    /// Overwrite the values, keeping derivatives.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != self.len()`.
    pub fn set_values(&mut self, values: &[f64]) {
        check_len(self.len(), values.len());
        for (s, &v) in self.data.iter_mut().zip(values) {
            s.set_value(v);
        }
    }

    /// Copy values and derivatives from a vector of any representation.
    pub fn set_from<T: Scalar>(&mut self, other: &Vector<T>) {
        check_len(self.len(), other.len());
        for (s, o) in self.data.iter_mut().zip(other.iter()) {
            s.set_from(o);
        }
    }

    /// Seed every element: element `i` becomes variable `i` of `len()`.
    pub fn variables(&mut self, order: usize) {
        let n = self.len();
        for (i, s) in self.data.iter_mut().enumerate() {
            s.set_variable(i, n, order);
        }
    }

    /// Seed the elements at `indices` as variables `0..indices.len()`, in
    /// the order given, and make every other element constant.
    ///
    /// ```
    /// use autodiff::{Real, Scalar, Vector};
    ///
    /// let mut x = Vector::<Real>::new(&[1.0, 2.0, 3.0]);
    /// x.variables_at(1, &[2, 0]);
    ///
    /// let f = x[0].clone() * &x[1] * &x[2];
    /// assert_eq!(f.n(), 2);
    /// assert_eq!(f.derivative(1, 0), 2.0); // ∂f/∂x₂
    /// assert_eq!(f.derivative(1, 1), 6.0); // ∂f/∂x₀
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range or repeated.
    pub fn variables_at(&mut self, order: usize, indices: &[usize]) {
        let mut seeded = vec![false; self.len()];
        for &j in indices {
            assert!(j < self.len(), "index {} out of range for length {}", j, self.len());
            assert!(!seeded[j], "index {} seeded twice", j);
            seeded[j] = true;
        }
        self.set_constant();
        let n = indices.len();
        for (i, &j) in indices.iter().enumerate() {
            self.data[j].set_variable(i, n, order);
        }
    }

    /// Make every element a constant.
    pub fn set_constant(&mut self) {
        self.data.iter_mut().for_each(S::set_constant);
    }

    pub fn reset_derivatives(&mut self) {
        self.data.iter_mut().for_each(S::reset_derivatives);
    }

    /// `Σ aᵢbᵢ`
    pub fn dot(&self, other: &Self) -> S {
        check_len(self.len(), other.len());
        self.iter().zip(other.iter()).map(|(a, b)| a.clone() * b).sum()
    }

    /// Differentiable Euclidean norm.
    pub fn norm(&self) -> S {
        self.dot(self).sqrt()
    }

    /// Euclidean norm of the values only.
    pub fn value_norm(&self) -> f64 {
        self.iter().map(|s| s.value() * s.value()).sum::<f64>().sqrt()
    }

    /// Multiply every element by `c`.
    pub fn scale(&self, c: &S) -> Self {
        self.iter().map(|s| s.clone() * c).collect()
    }

    /// `a bᵀ`
    pub fn outer(&self, other: &Self) -> Matrix<S> {
        let data = self
            .iter()
            .flat_map(|a| other.iter().map(move |b| a.clone() * b))
            .collect();
        Matrix::from_scalars(self.len(), other.len(), data)
    }

    /// Reorder in place so that the new element `i` is the old element `p[i]`.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not a permutation of `0..len()`.
    pub fn permute(&mut self, p: &[usize]) {
        check_permutation(p, self.len());
        let old = std::mem::take(&mut self.data);
        let mut old: Vec<Option<S>> = old.into_iter().map(Some).collect();
        self.data = p.iter().filter_map(|&j| old[j].take()).collect();
    }

    /// Whether every value is finite.
    pub fn is_finite(&self) -> bool {
        self.iter().all(S::is_finite)
    }
}

pub(crate) fn check_len(expected: usize, got: usize) {
    assert_eq!(expected, got, "vector dimensions do not match");
}

pub(crate) fn check_permutation(p: &[usize], n: usize) {
    assert_eq!(p.len(), n, "permutation has length {}, expected {}", p.len(), n);
    let mut seen = vec![false; n];
    for &j in p {
        assert!(j < n && !seen[j], "invalid permutation {:?}", p);
        seen[j] = true;
    }
}

/// Value and gradient of `f` at `point` in a single forward pass.
///
/// ```
/// use autodiff::{gradient, Real, Scalar, Vector};
///
/// // f(x, y) = x² + 2xy + y²
/// let f = |v: &Vector<Real>| {
///     let (x, y) = (&v[0], &v[1]);
///     x * x + y * x * 2.0 + y * y
/// };
///
/// let (value, grad) = gradient(f, &[3.0, 4.0]);
/// assert_eq!(value, 49.0);
/// assert_eq!(grad, vec![14.0, 14.0]);
/// ```
pub fn gradient<S, F>(f: F, point: &[f64]) -> (f64, Vec<f64>)
where
    S: Scalar,
    F: FnOnce(&Vector<S>) -> S,
{
    let mut x = Vector::<S>::new(point);
    x.variables(1);
    let y = f(&x);
    let grad = (0..point.len()).map(|i| y.derivative(1, i)).collect();
    (y.value(), grad)
}

impl<S> Index<usize> for Vector<S> {
    type Output = S;

    fn index(&self, i: usize) -> &S {
        &self.data[i]
    }
}

impl<S> IndexMut<usize> for Vector<S> {
    fn index_mut(&mut self, i: usize) -> &mut S {
        &mut self.data[i]
    }
}

impl<S> FromIterator<S> for Vector<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<S> IntoIterator for Vector<S> {
    type Item = S;
    type IntoIter = std::vec::IntoIter<S>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a, S> IntoIterator for &'a Vector<S> {
    type Item = &'a S;
    type IntoIter = std::slice::Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<'a, S: Scalar> Add for &'a Vector<S> {
    type Output = Vector<S>;

    fn add(self, rhs: Self) -> Vector<S> {
        check_len(self.len(), rhs.len());
        self.iter().zip(rhs.iter()).map(|(a, b)| a.clone() + b).collect()
    }
}

impl<'a, S: Scalar> Sub for &'a Vector<S> {
    type Output = Vector<S>;

    fn sub(self, rhs: Self) -> Vector<S> {
        check_len(self.len(), rhs.len());
        self.iter().zip(rhs.iter()).map(|(a, b)| a.clone() - b).collect()
    }
}

impl<S: std::fmt::Display> std::fmt::Display for Vector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, "]")
    }
}
