//! Clifford algebra products: geometric, inner, outer.
//!
//! All four are restrictions of the same Cayley-table sum
//! `(A * B)_k = Σ sign(i, j) A_i B_j` over terms whose result blade is k;
//! inner and outer keep only the terms with the right result grade.

use crate::algebra::CliffordAlgebra;
use crate::multivector::Multivector;

fn graded_product(
    alg: &CliffordAlgebra,
    a: &Multivector,
    b: &Multivector,
    keep: impl Fn(usize, usize, usize) -> bool,
) -> Multivector {
    let mut result = Multivector::zero(alg);
    for t in alg.product_terms() {
        let (av, bv) = (a.coeffs[t.i], b.coeffs[t.j]);
        if av == 0.0 || bv == 0.0 {
            continue;
        }
        if keep(alg.grade(t.i), alg.grade(t.j), alg.grade(t.k)) {
            result.coeffs[t.k] += t.sign * av * bv;
        }
    }
    result
}

/// Geometric product A B.
pub fn geometric(alg: &CliffordAlgebra, a: &Multivector, b: &Multivector) -> Multivector {
    graded_product(alg, a, b, |_, _, _| true)
}

/// Left contraction: <A>_r ⌋ <B>_s = <A B>_{s-r} when s ≥ r, else 0.
pub fn inner(alg: &CliffordAlgebra, a: &Multivector, b: &Multivector) -> Multivector {
    graded_product(alg, a, b, |ga, gb, gr| gb >= ga && gr == gb - ga)
}

/// Outer (wedge) product: <A>_r ∧ <B>_s = <A B>_{r+s}.
pub fn outer(alg: &CliffordAlgebra, a: &Multivector, b: &Multivector) -> Multivector {
    graded_product(alg, a, b, |ga, gb, gr| gr == ga + gb)
}

/// Scalar product <A B>_0.
pub fn scalar_product(alg: &CliffordAlgebra, a: &Multivector, b: &Multivector) -> f32 {
    alg.product_terms()
        .iter()
        .filter(|t| t.k == 0)
        .map(|t| t.sign * a.coeffs[t.i] * b.coeffs[t.j])
        .sum()
}
