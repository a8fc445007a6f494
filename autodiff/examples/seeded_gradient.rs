//! Gradients and Jacobians from seeded vectors.
//!
//! Seeding marks elements of a `Vector` as independent variables; a single
//! evaluation of an ordinary function then yields its full gradient.
//!
//! Run with: `cargo run --example seeded_gradient`

use autodiff::{gradient, Matrix, Real, Scalar, Vector};

fn rosenbrock(v: &Vector<Real>) -> Real {
    let (x, y) = (&v[0], &v[1]);
    let a = 1.0 - x.clone();
    let b = y.clone() - x * x;
    a.clone() * a + b.clone() * b * 100.0
}

fn main() {
    println!("=== Seeded Vectors ===\n");

    // Example 1: Rosenbrock function
    println!("Example 1: Rosenbrock f(x, y) = (1-x)² + 100(y-x²)²");
    for point in [[1.0, 1.0], [0.0, 0.0], [-1.2, 1.0]] {
        let (value, grad) = gradient(rosenbrock, &point);
        println!("  f{:?} = {:.4}, ∇f = {:?}", point, value, grad);
    }
    println!();

    // Example 2: Seeding a subset
    // f(x, y, z) = x·y·z, differentiate with respect to z and x only
    println!("Example 2: f(x, y, z) = xyz at (1, 2, 3), variables (z, x)");
    let mut v = Vector::<Real>::new(&[1.0, 2.0, 3.0]);
    v.variables_at(1, &[2, 0]);
    let f = v[0].clone() * &v[1] * &v[2];
    println!("  ∂f/∂z = {} (expected: xy = 2)", f.derivative(1, 0));
    println!("  ∂f/∂x = {} (expected: yz = 6)", f.derivative(1, 1));
    println!();

    // Example 3: Diagonal second derivatives
    println!("Example 3: f(x, y) = x²y³ at (2, 1), order 2");
    let mut v = Vector::<Real>::new(&[2.0, 1.0]);
    v.variables(2);
    let f = v[0].powf(2.0) * v[1].powf(3.0);
    println!("  ∂²f/∂x² = {} (expected: 2y³ = 2)", f.derivative(2, 0));
    println!("  ∂²f/∂y² = {} (expected: 6x²y = 24)", f.derivative(2, 1));
    println!();

    // Example 4: Jacobian of a vector-valued function
    println!("Example 4: Jacobian of (x² + y² - 6, x³ - y²) at (1, 1)");
    let system = |v: &Vector<Real>| {
        let (x, y) = (&v[0], &v[1]);
        Vector::from_scalars(vec![
            x * x + y * y - 6.0,
            x.powf(3.0) - y * y,
        ])
    };
    let (value, jacobian) = Matrix::jacobian(system, &Vector::new(&[1.0, 1.0]));
    println!("  f = {}", value);
    println!("  J = {}", jacobian);
    println!();

    println!("=== Key Insights ===");
    println!("• One evaluation yields every partial derivative of a seeded vector");
    println!("• Any subset of elements can be seeded, in any order");
    println!("• Jacobians feed Newton's method directly");
}
