//! Minimising the Rosenbrock function with every optimizer.
//!
//! Run with: `RUST_LOG=debug cargo run --example rosenbrock`

use autodiff::{Real, Scalar, Vector};
use optimize::{Bfgs, GradientDescent, Newton, Rprop, Stage};

fn rosenbrock(v: &Vector<Real>) -> anyhow::Result<Real> {
    let (x, y) = (&v[0], &v[1]);
    let a = 1.0 - x.clone();
    let b = y.clone() - x * x;
    Ok(a.clone() * a + b.clone() * b * 100.0)
}

/// Gradient of the Rosenbrock function, as a root-finding problem.
fn rosenbrock_gradient(v: &Vector<Real>) -> anyhow::Result<Vector<Real>> {
    let (x, y) = (&v[0], &v[1]);
    let b = y.clone() - x * x;
    Ok(Vector::from_scalars(vec![
        (x.clone() - 1.0) * 2.0 - x * &b * 400.0,
        b * 200.0,
    ]))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("=== Rosenbrock f(x, y) = (1-x)² + 100(y-x²)² ===\n");
    let x0 = Vector::new(&[-1.2, 1.0]);
    println!("Starting point: {}\n", x0);

    // Example 1: Gradient descent needs a tiny step in the curved valley
    println!("Example 1: Gradient descent, step 1e-3");
    let gd = GradientDescent::default()
        .with_step(1e-3)
        .with_epsilon(1e-6)
        .with_max_iterations(200_000);
    match gd.run(rosenbrock, &x0) {
        Ok(r) => println!("  x = {} after {} iterations", r.x, r.iterations),
        Err(e) => println!("  failed: {}", e),
    }
    println!();

    // Example 2: Rprop adapts one step size per coordinate
    println!("Example 2: Rprop, initial step 1e-3, eta 0.2");
    let rprop = Rprop::default().with_step_init(1e-3).with_eta(0.2).with_epsilon(1e-6);
    let r = rprop.run(rosenbrock, &x0)?;
    println!("  x = {} after {} iterations", r.x, r.iterations);
    println!();

    // Example 3: Newton's method on the gradient
    println!("Example 3: Newton on ∇f = 0");
    let r = Newton::default().run(rosenbrock_gradient, &x0)?;
    println!("  x = {} after {} iterations", r.x, r.iterations);
    println!();

    // Example 4: BFGS, reporting accepted line searches
    println!("Example 4: BFGS");
    let r = Bfgs::default().run_with_hook(rosenbrock, &x0, |stage, g, x, value| {
        if stage == Stage::LineSearch {
            let gn = g.iter().map(|gi| gi * gi).sum::<f64>().sqrt();
            println!("  x = {}, f = {:.3e}, |∇f| = {:.3e}", x, value.value(), gn);
        }
        false
    })?;
    println!("  converged to {} after {} iterations", r.x, r.iterations);
    println!();

    println!("=== Key Insights ===");
    println!("• Gradient descent crawls along the valley floor");
    println!("• Rprop ignores gradient magnitudes, only their signs");
    println!("• Newton and BFGS use curvature and converge in few steps");
    Ok(())
}
