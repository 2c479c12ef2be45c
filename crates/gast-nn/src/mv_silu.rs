//! Grade-gated SiLU for multivectors.
//!
//! For every channel c and grade k an invariant is computed (the scalar
//! coefficient itself for k = 0, the quadratic form of the grade-k part
//! otherwise) and turned into a gate `σ(a[c,k] · s + b[c,k])` that scales
//! every blade of that grade. Gates are rotation invariant, so the
//! nonlinearity is equivariant.

use std::sync::Arc;

use gast_clifford::{CliffordAlgebra, MultivectorTensor};
use gast_core::{GastError, Result, Tensor};

use crate::module::{assign_parameter, check_parameters, Module};

pub struct MVSiLU {
    /// `[C, n + 1]`, initialised to ones.
    a: Tensor,
    /// `[C, n + 1]`, initialised to zeros.
    b: Tensor,
    algebra: Arc<CliffordAlgebra>,
    channels: usize,
}

impl MVSiLU {
    pub fn new(algebra: Arc<CliffordAlgebra>, channels: usize) -> Self {
        let g = algebra.num_grades();
        Self {
            a: Tensor::ones(&[channels, g]),
            b: Tensor::zeros(&[channels, g]),
            algebra,
            channels,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Gate `[N, C, D]`.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let dims = x.dims();
        if dims.len() != 3 || dims[1] != self.channels {
            return Err(GastError::ShapeMismatch {
                expected: vec![0, self.channels, self.algebra.dim],
                got: dims.to_vec(),
            });
        }
        let mv = MultivectorTensor::new(Arc::clone(&self.algebra), x.clone())?;
        let grade_q = mv.grade_quadratic_forms()?; // [N, C, G]

        let g = self.algebra.num_grades();
        let d = self.algebra.dim;
        let c = self.channels;
        let grades = &self.algebra.grades;
        let (a, b) = (self.a.as_f32_slice(), self.b.as_f32_slice());
        let gq = grade_q.as_f32_slice();
        let src = x.as_f32_slice();
        let mut out = vec![0.0f32; src.len()];

        for (row, (xo, xs)) in out.chunks_mut(d).zip(src.chunks(d)).enumerate() {
            let ch = row % c;
            let mut gates = vec![0.0f32; g];
            for (k, gate) in gates.iter_mut().enumerate() {
                let s = if k == 0 { xs[0] } else { gq[row * g + k] };
                let z = a[ch * g + k] * s + b[ch * g + k];
                *gate = 1.0 / (1.0 + (-z).exp());
            }
            for i in 0..d {
                xo[i] = gates[grades[i]] * xs[i];
            }
        }

        Tensor::from_vec(out, dims)
    }
}

impl Module for MVSiLU {
    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.a, &self.b]
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![("a".to_string(), &self.a), ("b".to_string(), &self.b)]
    }

    fn set_parameters(&mut self, params: &[Tensor]) -> Result<usize> {
        check_parameters(&self.parameters(), params)?;
        let mut cursor = 0;
        assign_parameter(&mut self.a, params, &mut cursor)?;
        assign_parameter(&mut self.b, params, &mut cursor)?;
        Ok(cursor)
    }
}
