//! Rotors and the transformations they induce: sandwich product, reflection.

use crate::algebra::CliffordAlgebra;
use crate::multivector::Multivector;
use crate::products::geometric;

/// Sandwich product R M R̃.
///
/// For a rotor this rotates every grade of M consistently; the equivariant
/// layers are required to commute with it.
pub fn sandwich(alg: &CliffordAlgebra, rotor: &Multivector, mv: &Multivector) -> Multivector {
    let rev = rotor.reverse(alg);
    let temp = geometric(alg, rotor, mv);
    geometric(alg, &temp, &rev)
}

/// Rotor R = exp(-θ B / 2) for a simple bivector B.
///
/// B is normalised internally, so only its plane and orientation matter.
/// Requires B² < 0 (a rotation plane); returns `None` for a zero,
/// degenerate or hyperbolic bivector.
pub fn rotor_from_bivector(alg: &CliffordAlgebra, bivector: &Multivector, angle: f32) -> Option<Multivector> {
    let b_sq = geometric(alg, bivector, bivector).scalar_part();
    if b_sq >= -1e-12 {
        return None;
    }
    let b_norm = (-b_sq).sqrt();
    let half = angle / 2.0;

    // R = cos(θ/2) - sin(θ/2) B̂
    let scalar = Multivector::scalar(alg, half.cos());
    let plane = bivector * (-half.sin() / b_norm);
    Some(&scalar + &plane)
}

/// Whether R R̃ = 1 within `tol`.
pub fn is_rotor(alg: &CliffordAlgebra, r: &Multivector, tol: f32) -> bool {
    let rr = geometric(alg, r, &r.reverse(alg));
    (rr.scalar_part() - 1.0).abs() < tol && (1..alg.dim).all(|i| rr.coeffs[i].abs() < tol)
}

/// Reflect `v` in the hyperplane orthogonal to `normal`: -n v n⁻¹.
pub fn reflect(alg: &CliffordAlgebra, normal: &Multivector, v: &Multivector) -> Option<Multivector> {
    let n_sq = geometric(alg, normal, normal).scalar_part();
    if n_sq.abs() < 1e-10 {
        return None;
    }
    let n_inv = normal * (1.0 / n_sq);
    let temp = geometric(alg, normal, v);
    Some(&geometric(alg, &temp, &n_inv) * -1.0)
}

/// Twisted adjoint action of a versor: `V α(M) V⁻¹` for odd V, `V M V⁻¹`
/// for even V, with α the grade involution.
///
/// A unit vector gives the reflection of every grade of M, a rotor gives the
/// sandwich. Returns `None` when V has no inverse or mixes parities.
pub fn versor_action(alg: &CliffordAlgebra, versor: &Multivector, mv: &Multivector) -> Option<Multivector> {
    let norm = geometric(alg, versor, &versor.reverse(alg)).scalar_part();
    if norm.abs() < 1e-10 {
        return None;
    }
    let has_grade = |parity: usize| {
        (0..alg.dim).any(|i| alg.grade(i) % 2 == parity && versor.coeffs[i].abs() > 1e-12)
    };
    let (even, odd) = (has_grade(0), has_grade(1));
    if even && odd {
        return None;
    }
    let inv = &versor.reverse(alg) * (1.0 / norm);
    let x = if odd { mv.involute(alg) } else { mv.clone() };
    Some(geometric(alg, &geometric(alg, versor, &x), &inv))
}
