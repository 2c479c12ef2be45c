//! Element-wise arithmetic and matrix multiplication.

use rayon::prelude::*;

use crate::error::GastError;
use crate::shape::Shape;
use crate::tensor::Tensor;
use crate::Result;

/// Below this many output elements per call, matmul stays on one thread.
const PAR_THRESHOLD: usize = 4096;

impl Tensor {
    /// Element-wise addition with broadcasting: self + other.
    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, |a, b| a + b)
    }

    /// Element-wise subtraction with broadcasting: self - other.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, |a, b| a - b)
    }

    /// Element-wise multiplication with broadcasting: self * other.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, |a, b| a * b)
    }

    pub fn neg(&self) -> Tensor {
        self.map(|a| -a)
    }

    pub fn sqrt(&self) -> Tensor {
        self.map(f32::sqrt)
    }

    pub fn exp(&self) -> Tensor {
        self.map(f32::exp)
    }

    /// Logistic sigmoid 1 / (1 + e^-x).
    pub fn sigmoid(&self) -> Tensor {
        self.map(|a| 1.0 / (1.0 + (-a).exp()))
    }

    pub fn add_scalar(&self, scalar: f32) -> Tensor {
        self.map(|a| a + scalar)
    }

    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        self.map(|a| a * scalar)
    }

    /// Apply `op` to every element.
    pub fn map(&self, op: impl Fn(f32) -> f32) -> Tensor {
        let result: Vec<f32> = self.as_f32_slice().iter().map(|&v| op(v)).collect();
        Tensor::from_f32(&result, self.dims())
    }

    /// Matrix multiplication over the last two axes.
    ///
    /// Supports:
    /// - `[M, K] @ [K, N]` → `[M, N]`
    /// - `[..., M, K] @ [..., K, N]` → `[..., M, N]` (identical leading dims)
    /// - `[..., M, K] @ [K, N]` → `[..., M, N]` (shared right-hand matrix)
    ///
    /// Batches are computed in parallel with rayon.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor> {
        let a_dims = self.dims();
        let b_dims = other.dims();
        if a_dims.len() < 2 || b_dims.len() < 2 {
            return Err(GastError::ShapeMismatch {
                expected: a_dims.to_vec(),
                got: b_dims.to_vec(),
            });
        }

        let (m, k1) = (a_dims[a_dims.len() - 2], a_dims[a_dims.len() - 1]);
        let (k2, n) = (b_dims[b_dims.len() - 2], b_dims[b_dims.len() - 1]);
        if k1 != k2 {
            return Err(GastError::MatmulDimMismatch { m, k1, k2, n });
        }

        let lead = &a_dims[..a_dims.len() - 2];
        let shared_rhs = b_dims.len() == 2;
        if !shared_rhs && &b_dims[..b_dims.len() - 2] != lead {
            return Err(GastError::ShapeMismatch {
                expected: a_dims.to_vec(),
                got: b_dims.to_vec(),
            });
        }

        let batch: usize = lead.iter().product();
        let a_data = self.as_f32_slice();
        let b_data = other.as_f32_slice();
        let mut c_data = vec![0.0f32; batch * m * n];

        let kernel = |bi: usize, out: &mut [f32]| {
            let a = &a_data[bi * m * k1..(bi + 1) * m * k1];
            let b = if shared_rhs { b_data } else { &b_data[bi * k1 * n..(bi + 1) * k1 * n] };
            matmul_into(a, b, out, m, k1, n);
        };

        if m * n > 0 {
            if batch * m * n >= PAR_THRESHOLD {
                c_data
                    .par_chunks_mut(m * n)
                    .enumerate()
                    .for_each(|(bi, out)| kernel(bi, out));
            } else {
                c_data
                    .chunks_mut(m * n)
                    .enumerate()
                    .for_each(|(bi, out)| kernel(bi, out));
            }
        }

        let mut out_dims = lead.to_vec();
        out_dims.extend_from_slice(&[m, n]);
        Tensor::from_vec(c_data, &out_dims)
    }
}

/// `out[M, N] = a[M, K] @ b[K, N]`, i-k-j loop order for row-major locality.
fn matmul_into(a: &[f32], b: &[f32], out: &mut [f32], m: usize, k: usize, n: usize) {
    for i in 0..m {
        let row = &mut out[i * n..(i + 1) * n];
        for p in 0..k {
            let av = a[i * k + p];
            let b_row = &b[p * n..(p + 1) * n];
            for (o, &bv) in row.iter_mut().zip(b_row) {
                *o += av * bv;
            }
        }
    }
}

/// Apply a binary operation element-wise with broadcasting.
fn binary_op(a: &Tensor, b: &Tensor, op: impl Fn(f32, f32) -> f32) -> Result<Tensor> {
    let out_shape = a.shape().broadcast_with(b.shape()).ok_or_else(|| {
        GastError::BroadcastError {
            a: a.dims().to_vec(),
            b: b.dims().to_vec(),
        }
    })?;

    let a_data = a.as_f32_slice();
    let b_data = b.as_f32_slice();

    // Fast path: same shape
    let result: Vec<f32> = if a.shape() == b.shape() {
        a_data.iter().zip(b_data).map(|(&x, &y)| op(x, y)).collect()
    } else {
        (0..out_shape.numel())
            .map(|i| {
                let ai = broadcast_index(i, &out_shape, a.shape());
                let bi = broadcast_index(i, &out_shape, b.shape());
                op(a_data[ai], b_data[bi])
            })
            .collect()
    };

    Tensor::from_vec(result, out_shape.dims())
}

/// Source offset of output element `flat_idx` in a broadcast operand.
fn broadcast_index(flat_idx: usize, out_shape: &Shape, src_shape: &Shape) -> usize {
    let out_dims = out_shape.dims();
    let src_dims = src_shape.dims();
    let offset = out_dims.len() - src_dims.len();
    let out_strides = out_shape.contiguous_strides();
    let src_strides = src_shape.contiguous_strides();

    let mut remaining = flat_idx;
    let mut src_idx = 0;
    for i in 0..out_dims.len() {
        let coord = remaining / out_strides[i];
        remaining %= out_strides[i];
        if i >= offset {
            let si = i - offset;
            // size-1 axes are broadcast, coord maps to 0
            if src_dims[si] > 1 {
                src_idx += coord * src_strides[si];
            }
        }
    }
    src_idx
}

impl std::ops::Neg for &Tensor {
    type Output = Tensor;
    fn neg(self) -> Tensor {
        Tensor::neg(self)
    }
}
