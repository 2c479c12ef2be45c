//! Clifford algebra Cl(p,q) definition and Cayley table generation.
//!
//! The algebra is defined by its signature (p, q) where:
//! - p basis vectors square to +1
//! - q basis vectors square to -1
//! - Total dimension n = p + q
//! - Algebra has 2^n basis blades
//!
//! Blades are indexed in *grade order*: the scalar first, then all vectors,
//! then all bivectors and so on, each grade sorted by its bitmask. For
//! Cl(3,0) that is `1, e1, e2, e3, e12, e13, e23, e123`, so every grade
//! occupies a contiguous index range.

use std::ops::Range;

/// Sign result from multiplying two basis blades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Pos,
    Neg,
    Zero,
}

impl Sign {
    pub fn as_f32(self) -> f32 {
        match self {
            Sign::Pos => 1.0,
            Sign::Neg => -1.0,
            Sign::Zero => 0.0,
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Sign::Pos => Sign::Neg,
            Sign::Neg => Sign::Pos,
            Sign::Zero => Sign::Zero,
        }
    }
}

impl std::ops::Mul for Sign {
    type Output = Sign;
    fn mul(self, rhs: Sign) -> Sign {
        match (self, rhs) {
            (Sign::Zero, _) | (_, Sign::Zero) => Sign::Zero,
            (Sign::Pos, s) | (s, Sign::Pos) => s,
            (Sign::Neg, Sign::Neg) => Sign::Pos,
        }
    }
}

/// Entry in the Cayley (multiplication) table.
#[derive(Debug, Clone, Copy)]
pub struct CayleyEntry {
    /// Resulting basis blade index (grade order).
    pub blade: usize,
    /// Sign of the product.
    pub sign: Sign,
}

/// One non-zero term `out[k] += sign * a[i] * b[j]` of the geometric product.
#[derive(Debug, Clone, Copy)]
pub struct ProductTerm {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub sign: f32,
}

/// A Clifford algebra Cl(p,q).
///
/// Stores the precomputed Cayley table for the geometric product, both as
/// a dense `dim x dim` table and as a flat list of non-zero terms for the
/// batched kernels.
#[derive(Debug, Clone)]
pub struct CliffordAlgebra {
    /// Number of basis vectors squaring to +1.
    pub p: usize,
    /// Number of basis vectors squaring to -1.
    pub q: usize,
    /// Total number of basis vectors.
    pub n: usize,
    /// Total number of basis blades (2^n).
    pub dim: usize,
    /// Cayley table: cayley[i][j] = result of blade_i * blade_j.
    pub cayley: Vec<Vec<CayleyEntry>>,
    /// Grade of each basis blade.
    pub grades: Vec<usize>,
    /// Basis-vector bitmask of each blade (bit i set = contains e_{i+1}).
    masks: Vec<usize>,
    terms: Vec<ProductTerm>,
    /// Sign of `<e~ e>_0` for every blade, so `q(x) = Σ qf_signs[i] x_i²`.
    qf_signs: Vec<f32>,
}

impl CliffordAlgebra {
    /// Create a new Clifford algebra Cl(p,q) and precompute the Cayley table.
    pub fn new(p: usize, q: usize) -> Self {
        let n = p + q;
        let dim = 1 << n; // 2^n

        let mut masks: Vec<usize> = (0..dim).collect();
        masks.sort_by_key(|&m| (m.count_ones(), m));

        let mut index_of = vec![0usize; dim];
        for (idx, &m) in masks.iter().enumerate() {
            index_of[m] = idx;
        }

        let grades: Vec<usize> = masks.iter().map(|&m| m.count_ones() as usize).collect();

        let mut cayley = vec![vec![CayleyEntry { blade: 0, sign: Sign::Zero }; dim]; dim];
        let mut terms = Vec::with_capacity(dim * dim);
        for (i, c_row) in cayley.iter_mut().enumerate() {
            for (j, entry) in c_row.iter_mut().enumerate() {
                let (mask, sign) = Self::multiply_blades(masks[i], masks[j], p, n);
                *entry = CayleyEntry { blade: index_of[mask], sign };
                if sign != Sign::Zero {
                    terms.push(ProductTerm { i, j, k: index_of[mask], sign: sign.as_f32() });
                }
            }
        }

        let qf_signs = (0..dim)
            .map(|i| reverse_sign(grades[i]) * cayley[i][i].sign.as_f32())
            .collect();

        Self { p, q, n, dim, cayley, grades, masks, terms, qf_signs }
    }

    /// Multiply two basis blades represented as bitmasks.
    ///
    /// Each bit in the bitmask represents a basis vector.
    /// e.g., for Cl(3,0): e1=0b001, e2=0b010, e3=0b100, e12=0b011, etc.
    fn multiply_blades(a: usize, b: usize, p: usize, n: usize) -> (usize, Sign) {
        let mut sign = Sign::Pos;

        // Every basis vector of b has to move left past each higher-indexed
        // basis vector of a; each swap flips the sign.
        for i in 0..n {
            if (b >> i) & 1 == 1 {
                let higher_in_a = (a >> (i + 1)).count_ones();
                if higher_in_a % 2 == 1 {
                    sign = sign.flip();
                }
            }
        }

        // Repeated basis vectors contract to their metric value.
        let shared = a & b;
        for i in p..n {
            if (shared >> i) & 1 == 1 {
                sign = sign.flip();
            }
        }

        (a ^ b, sign)
    }

    /// Get the grade of a basis blade.
    pub fn grade(&self, blade: usize) -> usize {
        self.grades[blade]
    }

    /// Number of distinct grades (n + 1).
    pub fn num_grades(&self) -> usize {
        self.n + 1
    }

    /// Number of blades of each grade: `[1, 3, 3, 1]` for Cl(3,0).
    pub fn subspaces(&self) -> Vec<usize> {
        (0..=self.n).map(|k| binomial(self.n, k)).collect()
    }

    /// Index range of the blades of `grade`.
    pub fn grade_range(&self, grade: usize) -> Range<usize> {
        let start: usize = (0..grade).map(|k| binomial(self.n, k)).sum();
        start..start + binomial(self.n, grade)
    }

    /// Get all blade indices of a specific grade.
    pub fn blades_of_grade(&self, grade: usize) -> Vec<usize> {
        self.grade_range(grade).collect()
    }

    /// Square of each basis vector: `+1` for the first p, `-1` for the rest.
    pub fn metric(&self) -> Vec<f32> {
        (0..self.n).map(|i| if i < self.p { 1.0 } else { -1.0 }).collect()
    }

    /// Non-zero terms of the geometric product.
    pub fn product_terms(&self) -> &[ProductTerm] {
        &self.terms
    }

    /// Per-blade sign of the quadratic form `<x~ x>_0`.
    pub fn quadratic_signs(&self) -> &[f32] {
        &self.qf_signs
    }

    /// Sign applied to each blade by the reverse.
    pub fn reverse_signs(&self) -> Vec<f32> {
        self.grades.iter().map(|&k| reverse_sign(k)).collect()
    }

    /// Name of a basis blade (for display).
    pub fn blade_name(&self, blade: usize) -> String {
        let mask = self.masks[blade];
        if mask == 0 {
            return "1".to_string();
        }
        let digits: String = (0..self.n)
            .filter(|i| (mask >> i) & 1 == 1)
            .map(|i| (i + 1).to_string())
            .collect();
        format!("e{digits}")
    }
}

/// Reverse sign of a grade-k blade: (-1)^(k(k-1)/2).
pub(crate) fn reverse_sign(k: usize) -> f32 {
    if (k * k.saturating_sub(1) / 2) % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}
