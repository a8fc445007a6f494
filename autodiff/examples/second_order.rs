//! First and second derivatives of elementary and special functions.
//!
//! Every scalar seeded at order 2 carries f, f' and f'' through the
//! computation; no finite differences are involved.
//!
//! Run with: `cargo run --example second_order`

use autodiff::{BareReal, Probability, Real, Scalar};

fn show(label: &str, f: &Real, expected: &str) {
    println!("{}", label);
    println!("  f   = {:.8}", f.value());
    println!("  f'  = {:.8}", f.derivative(1, 0));
    println!("  f'' = {:.8} {}", f.derivative(2, 0), expected);
    println!();
}

fn main() {
    println!("=== Second-Order Forward Differentiation ===\n");

    let x = Real::variable(9.0, 0, 1, 2);
    show("Example 1: f(x) = 2x³ + 4 at x=9", &(x.powf(3.0) * 2.0 + 4.0), "(expected: 486, 108)");

    let x = Real::variable(0.0, 0, 1, 2);
    let sigmoid = 1.0 / (1.0 + (-x).exp());
    show("Example 2: σ(x) = 1/(1 + e^(-x)) at x=0", &sigmoid, "(expected: 0.25, 0)");

    let x = Real::variable(0.23, 0, 1, 2);
    show("Example 3: erf(x) at x=0.23", &x.erf(), "(expected: 1.07023926, -0.49231006)");
    show("Example 4: ln erfc(x) at x=0.23", &x.log_erfc(), "(expected: -1.43660635, -1.40299889)");

    let x = Real::variable(4.321, 0, 1, 2);
    show("Example 5: Γ(x) at x=4.321", &x.gamma(), "(expected: 12.2353264, 18.8065398)");

    // Variable exponent: ∂/∂k xᵏ = xᵏ ln x
    println!("Example 6: f(x, k) = x^k at (3.4, 4.1)");
    let x = Real::variable(3.4, 0, 2, 2);
    let k = Real::variable(4.1, 1, 2, 2);
    let f = x.pow(&k);
    println!("  ∂f/∂x = {:.6}, ∂f/∂k = {:.6}", f.derivative(1, 0), f.derivative(1, 1));
    println!("  ∂²f/∂x² = {:.6}, ∂²f/∂k² = {:.6}", f.derivative(2, 0), f.derivative(2, 1));
    println!();

    // Log-domain probabilities survive products that underflow f64
    println!("Example 7: product of 1000 probabilities of 0.01");
    let p = Probability::new(0.01);
    let product = (0..1000).fold(Probability::new(1.0), |acc, _| acc * &p);
    let naive = (0..1000).fold(BareReal::new(1.0), |acc, _| acc * 0.01);
    println!("  as f64:          {}", naive.value());
    println!("  log-probability: {:.4}", product.log_value());
    println!();

    println!("=== Key Insights ===");
    println!("• Every operation supplies closed-form first and second partials");
    println!("• Results carry the higher order of their operands");
    println!("• Probability keeps ln(p) but differentiates with respect to p");
}
