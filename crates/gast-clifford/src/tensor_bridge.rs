//! Tensor bridge: connect Clifford algebra to gast-core Tensor.
//!
//! `MultivectorTensor` stores a batch of multivectors as a single Tensor
//! with shape `[batch..., algebra_dim]`. Activations in the network are
//! `[tokens, channels, 8]`, so every channel of every token is one
//! multivector and all operations here act channel-wise.

use std::sync::Arc;

use gast_core::{GastError, Result, Tensor};

use crate::algebra::CliffordAlgebra;
use crate::multivector::Multivector;
use crate::ops::{sandwich, versor_action};

/// A batched multivector stored as a Tensor.
///
/// The last dimension holds the blade coefficients in grade order.
#[derive(Debug, Clone)]
pub struct MultivectorTensor {
    data: Tensor,
    algebra: Arc<CliffordAlgebra>,
}

impl MultivectorTensor {
    /// Wrap an existing tensor. Last dim must equal the algebra dim.
    pub fn new(algebra: Arc<CliffordAlgebra>, data: Tensor) -> Result<Self> {
        match data.dims().last() {
            Some(&d) if d == algebra.dim => Ok(Self { data, algebra }),
            _ => Err(GastError::ShapeMismatch {
                expected: vec![algebra.dim],
                got: data.dims().to_vec(),
            }),
        }
    }

    /// A batch of zero multivectors with shape `[batch_shape..., dim]`.
    pub fn zeros(algebra: Arc<CliffordAlgebra>, batch_shape: &[usize]) -> Self {
        let mut shape = batch_shape.to_vec();
        shape.push(algebra.dim);
        Self { data: Tensor::zeros(&shape), algebra }
    }

    /// Place raw features into blades.
    ///
    /// `values` has shape `[..., k]` and `blade_indices` names the target
    /// blade of each of the k features; all other blades are zero. Charges
    /// go to `[0]`, 3D positions to `[1, 2, 3]`.
    pub fn embed(algebra: Arc<CliffordAlgebra>, values: &Tensor, blade_indices: &[usize]) -> Result<Self> {
        let v_dims = values.dims();
        let k = blade_indices.len();
        if v_dims.last() != Some(&k) {
            return Err(GastError::ShapeMismatch {
                expected: vec![k],
                got: v_dims.to_vec(),
            });
        }
        let d = algebra.dim;
        if let Some(&bad) = blade_indices.iter().find(|&&b| b >= d) {
            return Err(GastError::IndexOutOfRange { index: bad, size: d });
        }

        let src = values.as_f32_slice();
        let batch = src.len() / k.max(1);
        let mut out = vec![0.0f32; batch * d];
        for b in 0..batch {
            for (vi, &blade) in blade_indices.iter().enumerate() {
                out[b * d + blade] = src[b * k + vi];
            }
        }

        let mut shape = v_dims[..v_dims.len() - 1].to_vec();
        shape.push(d);
        Ok(Self { data: Tensor::from_vec(out, &shape)?, algebra })
    }

    pub fn tensor(&self) -> &Tensor {
        &self.data
    }

    pub fn into_tensor(self) -> Tensor {
        self.data
    }

    pub fn algebra(&self) -> &Arc<CliffordAlgebra> {
        &self.algebra
    }

    pub fn dims(&self) -> &[usize] {
        self.data.dims()
    }

    /// Number of multivectors (product of all dims except the last).
    pub fn batch_size(&self) -> usize {
        self.data.numel() / self.algebra.dim
    }

    fn batch_dims(&self) -> &[usize] {
        let dims = self.data.dims();
        &dims[..dims.len() - 1]
    }

    fn with_data(&self, out: Vec<f32>, shape: &[usize]) -> Result<Self> {
        Ok(Self { data: Tensor::from_vec(out, shape)?, algebra: Arc::clone(&self.algebra) })
    }

    /// Channel-wise geometric product `self[..., c] * other[..., c]`.
    ///
    /// Both operands must have identical shapes.
    pub fn geometric_product(&self, other: &MultivectorTensor) -> Result<Self> {
        if self.dims() != other.dims() {
            return Err(GastError::ShapeMismatch {
                expected: self.dims().to_vec(),
                got: other.dims().to_vec(),
            });
        }

        let d = self.algebra.dim;
        let a = self.data.as_f32_slice();
        let b = other.data.as_f32_slice();
        let mut out = vec![0.0f32; a.len()];

        for ((o, x), y) in out.chunks_mut(d).zip(a.chunks(d)).zip(b.chunks(d)) {
            for t in self.algebra.product_terms() {
                o[t.k] += t.sign * x[t.i] * y[t.j];
            }
        }

        self.with_data(out, self.dims())
    }

    /// Reverse of every multivector.
    pub fn reverse(&self) -> Result<Self> {
        let signs = self.algebra.reverse_signs();
        let out: Vec<f32> = self
            .data
            .as_f32_slice()
            .iter()
            .enumerate()
            .map(|(i, &v)| v * signs[i % signs.len()])
            .collect();
        self.with_data(out, self.dims())
    }

    /// Zero every blade not of `grade`.
    pub fn grade_project(&self, grade: usize) -> Result<Self> {
        let range = self.algebra.grade_range(grade);
        let d = self.algebra.dim;
        let out: Vec<f32> = self
            .data
            .as_f32_slice()
            .iter()
            .enumerate()
            .map(|(i, &v)| if range.contains(&(i % d)) { v } else { 0.0 })
            .collect();
        self.with_data(out, self.dims())
    }

    /// Quadratic form q(x) = <x̃ x>₀ per multivector, shape `[batch..., 1]`.
    pub fn quadratic_form(&self) -> Result<Tensor> {
        let signs = self.algebra.quadratic_signs();
        let out: Vec<f32> = self
            .data
            .as_f32_slice()
            .chunks(self.algebra.dim)
            .map(|x| x.iter().zip(signs).map(|(&v, &s)| s * v * v).sum())
            .collect();
        let mut shape = self.batch_dims().to_vec();
        shape.push(1);
        Tensor::from_vec(out, &shape)
    }

    /// Quadratic form of each grade part, shape `[batch..., n + 1]`.
    pub fn grade_quadratic_forms(&self) -> Result<Tensor> {
        let signs = self.algebra.quadratic_signs();
        let grades = &self.algebra.grades;
        let g = self.algebra.num_grades();
        let mut out = Vec::with_capacity(self.batch_size() * g);
        for x in self.data.as_f32_slice().chunks(self.algebra.dim) {
            let mut per_grade = vec![0.0f32; g];
            for (i, &v) in x.iter().enumerate() {
                per_grade[grades[i]] += signs[i] * v * v;
            }
            out.extend_from_slice(&per_grade);
        }
        let mut shape = self.batch_dims().to_vec();
        shape.push(g);
        Tensor::from_vec(out, &shape)
    }

    /// Scalar coefficient of every multivector, shape `[batch...]`.
    pub fn scalar_part(&self) -> Result<Tensor> {
        let out: Vec<f32> = self.data.as_f32_slice().chunks(self.algebra.dim).map(|x| x[0]).collect();
        Tensor::from_vec(out, self.batch_dims())
    }

    /// Apply R x R̃ to every multivector.
    pub fn apply_rotor(&self, rotor: &Multivector) -> Result<Self> {
        self.check_operator(rotor)?;
        self.apply_blade_map(|blade| sandwich(&self.algebra, rotor, blade))
    }

    /// Apply the versor action `V α(x) V⁻¹` (odd V) or `V x V⁻¹` (even V)
    /// to every multivector. A unit vector reflects, a rotor rotates.
    pub fn apply_versor(&self, versor: &Multivector) -> Result<Self> {
        self.check_operator(versor)?;
        if versor_action(&self.algebra, versor, &Multivector::zero(&self.algebra)).is_none() {
            return Err(GastError::InvalidConfig(
                "versor must be invertible and of a single parity".to_string(),
            ));
        }
        self.apply_blade_map(|blade| {
            versor_action(&self.algebra, versor, blade).unwrap_or_else(|| Multivector::zero(&self.algebra))
        })
    }

    fn check_operator(&self, op: &Multivector) -> Result<()> {
        let d = self.algebra.dim;
        if op.dim() != d {
            return Err(GastError::ShapeMismatch { expected: vec![d], got: vec![op.dim()] });
        }
        Ok(())
    }

    /// Apply a linear map on multivectors given by its action on basis blades.
    ///
    /// The map is built once as a `dim x dim` matrix (column i = image of
    /// blade i) and applied to the whole batch.
    fn apply_blade_map(&self, image_of: impl Fn(&Multivector) -> Multivector) -> Result<Self> {
        let d = self.algebra.dim;
        let mut map = vec![0.0f32; d * d];
        for i in 0..d {
            let mut blade = Multivector::zero(&self.algebra);
            blade.coeffs[i] = 1.0;
            for (k, &c) in image_of(&blade).coeffs.iter().enumerate() {
                map[k * d + i] = c;
            }
        }

        let mut out = vec![0.0f32; self.data.numel()];
        for (o, x) in out.chunks_mut(d).zip(self.data.as_f32_slice().chunks(d)) {
            for (k, ok) in o.iter_mut().enumerate() {
                *ok = map[k * d..(k + 1) * d].iter().zip(x).map(|(&m, &v)| m * v).sum();
            }
        }
        self.with_data(out, self.dims())
    }

    /// Copy out one multivector by flat batch index.
    pub fn get(&self, batch_idx: usize) -> Option<Multivector> {
        let d = self.algebra.dim;
        let start = batch_idx * d;
        self.data
            .as_f32_slice()
            .get(start..start + d)
            .map(|s| Multivector::from_coeffs(s.to_vec()))
    }
}

impl std::fmt::Display for MultivectorTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MultivectorTensor(Cl({},{}), shape={:?})",
            self.algebra.p,
            self.algebra.q,
            self.dims()
        )
    }
}
