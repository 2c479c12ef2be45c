//! A single multivector: one coefficient per basis blade, in grade order.

use crate::algebra::{reverse_sign, CliffordAlgebra};

/// A multivector in a Clifford algebra.
///
/// M = a₀·1 + a₁·e₁ + a₂·e₂ + ... + a₁₂·e₁₂ + ...
#[derive(Debug, Clone, PartialEq)]
pub struct Multivector {
    /// Coefficients for each basis blade (length = 2^n).
    pub coeffs: Vec<f32>,
}

impl Multivector {
    /// Create a zero multivector.
    pub fn zero(alg: &CliffordAlgebra) -> Self {
        Self { coeffs: vec![0.0; alg.dim] }
    }

    /// Create a scalar multivector.
    pub fn scalar(alg: &CliffordAlgebra, value: f32) -> Self {
        let mut mv = Self::zero(alg);
        mv.coeffs[0] = value;
        mv
    }

    /// Create a grade-1 multivector; extra components are ignored.
    pub fn vector(alg: &CliffordAlgebra, components: &[f32]) -> Self {
        let mut mv = Self::zero(alg);
        for (blade, &c) in alg.grade_range(1).zip(components) {
            mv.coeffs[blade] = c;
        }
        mv
    }

    /// Create a grade-2 multivector from components in blade order
    /// (`e12, e13, e23` for Cl(3,0)).
    pub fn bivector(alg: &CliffordAlgebra, components: &[f32]) -> Self {
        let mut mv = Self::zero(alg);
        for (blade, &c) in alg.grade_range(2).zip(components) {
            mv.coeffs[blade] = c;
        }
        mv
    }

    pub fn from_coeffs(coeffs: Vec<f32>) -> Self {
        Self { coeffs }
    }

    /// Get the scalar (grade-0) part.
    pub fn scalar_part(&self) -> f32 {
        self.coeffs[0]
    }

    /// Keep only the grade-k part.
    pub fn grade_project(&self, alg: &CliffordAlgebra, grade: usize) -> Multivector {
        let mut result = Self::zero(alg);
        let range = alg.grade_range(grade);
        result.coeffs[range.clone()].copy_from_slice(&self.coeffs[range]);
        result
    }

    /// Check if this multivector is approximately zero.
    pub fn is_zero(&self, eps: f32) -> bool {
        self.coeffs.iter().all(|&c| c.abs() < eps)
    }

    /// ||M||² = <M̃ M>₀.
    pub fn norm_squared(&self, alg: &CliffordAlgebra) -> f32 {
        self.coeffs
            .iter()
            .zip(alg.quadratic_signs())
            .map(|(&c, &s)| s * c * c)
            .sum()
    }

    /// ||M|| = sqrt(|<M̃ M>₀|).
    pub fn norm(&self, alg: &CliffordAlgebra) -> f32 {
        self.norm_squared(alg).abs().sqrt()
    }

    /// Reverse: a grade-k blade picks up (-1)^(k(k-1)/2).
    pub fn reverse(&self, alg: &CliffordAlgebra) -> Multivector {
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .map(|(i, &c)| c * reverse_sign(alg.grade(i)))
            .collect();
        Multivector { coeffs }
    }

    /// Grade involution: negates odd-grade components.
    pub fn involute(&self, alg: &CliffordAlgebra) -> Multivector {
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .map(|(i, &c)| if alg.grade(i) % 2 == 1 { -c } else { c })
            .collect();
        Multivector { coeffs }
    }

    pub fn dim(&self) -> usize {
        self.coeffs.len()
    }

    /// Render as a sum of named blades, e.g. `0.7071 - 0.7071·e12`.
    pub fn format(&self, alg: &CliffordAlgebra) -> String {
        let mut out = String::new();
        for (i, &c) in self.coeffs.iter().enumerate() {
            if c.abs() < 1e-7 {
                continue;
            }
            if out.is_empty() {
                if c < 0.0 {
                    out.push('-');
                }
            } else {
                out.push_str(if c < 0.0 { " - " } else { " + " });
            }
            if i == 0 {
                out.push_str(&format!("{:.4}", c.abs()));
            } else {
                out.push_str(&format!("{:.4}·{}", c.abs(), alg.blade_name(i)));
            }
        }
        if out.is_empty() {
            out.push('0');
        }
        out
    }
}

impl std::ops::Add for &Multivector {
    type Output = Multivector;
    fn add(self, rhs: &Multivector) -> Multivector {
        let coeffs = self.coeffs.iter().zip(&rhs.coeffs).map(|(&a, &b)| a + b).collect();
        Multivector { coeffs }
    }
}

impl std::ops::Sub for &Multivector {
    type Output = Multivector;
    fn sub(self, rhs: &Multivector) -> Multivector {
        let coeffs = self.coeffs.iter().zip(&rhs.coeffs).map(|(&a, &b)| a - b).collect();
        Multivector { coeffs }
    }
}

impl std::ops::Mul<f32> for &Multivector {
    type Output = Multivector;
    fn mul(self, scalar: f32) -> Multivector {
        Multivector { coeffs: self.coeffs.iter().map(|&c| c * scalar).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_scalar() {
        let alg = CliffordAlgebra::new(3, 0);
        assert!(Multivector::zero(&alg).is_zero(1e-7));
        assert_eq!(Multivector::zero(&alg).dim(), 8);
        let s = Multivector::scalar(&alg, 2.5);
        assert!((s.scalar_part() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_vector_and_bivector_slots() {
        let alg = CliffordAlgebra::new(3, 0);
        let v = Multivector::vector(&alg, &[1.0, 2.0, 3.0]);
        assert_eq!(&v.coeffs[1..4], &[1.0, 2.0, 3.0]);
        let b = Multivector::bivector(&alg, &[4.0, 5.0, 6.0]);
        assert_eq!(&b.coeffs[4..7], &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_add_sub_scale() {
        let alg = CliffordAlgebra::new(2, 0);
        let a = Multivector::vector(&alg, &[1.0, 2.0]);
        let b = Multivector::vector(&alg, &[3.0, 4.0]);
        assert_eq!((&a + &b).coeffs[1..3], [4.0, 6.0]);
        assert_eq!((&a - &b).coeffs[1], -2.0);
        assert_eq!((&a * 3.0).coeffs[2], 6.0);
    }

    #[test]
    fn test_reverse_and_involute() {
        let alg = CliffordAlgebra::new(3, 0);
        let mv = Multivector::from_coeffs(vec![1.0; 8]);
        let rev = mv.reverse(&alg);
        assert_eq!(rev.coeffs, vec![1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0]);
        let inv = mv.involute(&alg);
        assert_eq!(inv.coeffs, vec![1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, -1.0]);
    }

    #[test]
    fn test_norm_euclidean() {
        let alg = CliffordAlgebra::new(3, 0);
        let v = Multivector::vector(&alg, &[3.0, 4.0, 0.0]);
        assert!((v.norm(&alg) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_grade_project() {
        let alg = CliffordAlgebra::new(3, 0);
        let mv = Multivector::from_coeffs((0..8).map(|i| i as f32).collect());
        let g2 = mv.grade_project(&alg, 2);
        assert_eq!(g2.coeffs, vec![0.0, 0.0, 0.0, 0.0, 4.0, 5.0, 6.0, 0.0]);
    }

    #[test]
    fn test_format() {
        let alg = CliffordAlgebra::new(3, 0);
        let mv = Multivector::from_coeffs(vec![1.0, 0.0, 0.0, 0.0, -2.0, 0.0, 0.0, 0.0]);
        assert_eq!(mv.format(&alg), "1.0000 - 2.0000·e12");
        assert_eq!(Multivector::zero(&alg).format(&alg), "0");
    }
}
