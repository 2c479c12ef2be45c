//! Tensor manipulation operations: cat, narrow, index_select, softmax.

use crate::error::GastError;
use crate::tensor::Tensor;
use crate::Result;

/// Split `dims` around `axis` into (outer, axis_size, inner) element counts.
fn split_at_axis(dims: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer: usize = dims[..axis].iter().product();
    let inner: usize = dims[axis + 1..].iter().product();
    (outer, dims[axis], inner)
}

fn check_axis(t: &Tensor, axis: usize) -> Result<()> {
    if axis >= t.ndim() {
        return Err(GastError::InvalidAxis { axis, ndim: t.ndim() });
    }
    Ok(())
}

impl Tensor {
    /// Concatenate tensors along a given axis.
    ///
    /// All tensors must have the same shape except along `axis`.
    pub fn cat(tensors: &[&Tensor], axis: usize) -> Result<Tensor> {
        let first = tensors.first().ok_or(GastError::IndexOutOfRange { index: 0, size: 0 })?;
        check_axis(first, axis)?;
        let ndim = first.ndim();

        for t in &tensors[1..] {
            let same_rank = t.ndim() == ndim;
            let compatible = same_rank
                && (0..ndim).all(|d| d == axis || t.dims()[d] == first.dims()[d]);
            if !compatible {
                return Err(GastError::ShapeMismatch {
                    expected: first.dims().to_vec(),
                    got: t.dims().to_vec(),
                });
            }
        }

        let mut out_shape = first.dims().to_vec();
        let cat_dim: usize = tensors.iter().map(|t| t.dims()[axis]).sum();
        out_shape[axis] = cat_dim;

        let (outer, _, inner) = split_at_axis(&out_shape, axis);
        let mut result = vec![0.0f32; out_shape.iter().product()];

        let mut cat_offset = 0;
        for t in tensors {
            let src = t.as_f32_slice();
            let t_axis = t.dims()[axis];
            let block = t_axis * inner;
            for o in 0..outer {
                let dst_start = (o * cat_dim + cat_offset) * inner;
                result[dst_start..dst_start + block]
                    .copy_from_slice(&src[o * block..(o + 1) * block]);
            }
            cat_offset += t_axis;
        }

        Tensor::from_vec(result, &out_shape)
    }

    /// Slice `len` entries starting at `start` along `axis`.
    pub fn narrow(&self, axis: usize, start: usize, len: usize) -> Result<Tensor> {
        check_axis(self, axis)?;
        let (outer, axis_size, inner) = split_at_axis(self.dims(), axis);
        if start + len > axis_size {
            return Err(GastError::IndexOutOfRange { index: start + len, size: axis_size });
        }

        let src = self.as_f32_slice();
        let mut result = Vec::with_capacity(outer * len * inner);
        for o in 0..outer {
            let from = (o * axis_size + start) * inner;
            result.extend_from_slice(&src[from..from + len * inner]);
        }

        let mut out_shape = self.dims().to_vec();
        out_shape[axis] = len;
        Tensor::from_vec(result, &out_shape)
    }

    /// Gather entries along `axis` by index; indices may repeat.
    pub fn index_select(&self, axis: usize, indices: &[usize]) -> Result<Tensor> {
        check_axis(self, axis)?;
        let (outer, axis_size, inner) = split_at_axis(self.dims(), axis);
        if let Some(&bad) = indices.iter().find(|&&i| i >= axis_size) {
            return Err(GastError::IndexOutOfRange { index: bad, size: axis_size });
        }

        let src = self.as_f32_slice();
        let mut result = Vec::with_capacity(outer * indices.len() * inner);
        for o in 0..outer {
            for &i in indices {
                let from = (o * axis_size + i) * inner;
                result.extend_from_slice(&src[from..from + inner]);
            }
        }

        let mut out_shape = self.dims().to_vec();
        out_shape[axis] = indices.len();
        Tensor::from_vec(result, &out_shape)
    }

    /// Numerically stable softmax over `axis`.
    ///
    /// `-inf` entries receive zero weight. A slice made entirely of `-inf`
    /// has no finite maximum and yields NaN, so callers must guarantee at
    /// least one finite score per slice.
    pub fn softmax(&self, axis: usize) -> Result<Tensor> {
        check_axis(self, axis)?;
        let (outer, axis_size, inner) = split_at_axis(self.dims(), axis);
        let mut result = self.to_vec();

        for o in 0..outer {
            for i in 0..inner {
                let idx = |a: usize| (o * axis_size + a) * inner + i;

                let max_val = (0..axis_size)
                    .map(|a| result[idx(a)])
                    .fold(f32::NEG_INFINITY, f32::max);

                let mut sum = 0.0f32;
                for a in 0..axis_size {
                    let e = (result[idx(a)] - max_val).exp();
                    result[idx(a)] = e;
                    sum += e;
                }

                for a in 0..axis_size {
                    result[idx(a)] /= sum;
                }
            }
        }

        Tensor::from_vec(result, self.dims())
    }
}
