//! Reduction operations: sum, mean.

use rayon::prelude::*;

use crate::error::GastError;
use crate::tensor::Tensor;
use crate::Result;

const PAR_THRESHOLD: usize = 8192;

impl Tensor {
    /// Sum all elements.
    pub fn sum(&self) -> f32 {
        let slice = self.as_f32_slice();
        if slice.len() >= PAR_THRESHOLD {
            slice.par_iter().sum()
        } else {
            slice.iter().sum()
        }
    }

    /// Mean of all elements (NaN for an empty tensor).
    pub fn mean(&self) -> f32 {
        self.sum() / self.numel() as f32
    }

    /// Sum along `axis`. With `keepdim` the axis stays as size 1.
    pub fn sum_axis(&self, axis: usize, keepdim: bool) -> Result<Tensor> {
        if axis >= self.ndim() {
            return Err(GastError::InvalidAxis { axis, ndim: self.ndim() });
        }

        let dims = self.dims();
        let slice = self.as_f32_slice();
        let axis_size = dims[axis];
        let outer_size: usize = dims[..axis].iter().product();
        let inner_size: usize = dims[axis + 1..].iter().product();

        let mut result = vec![0.0f32; outer_size * inner_size];
        for outer in 0..outer_size {
            for k in 0..axis_size {
                let base = (outer * axis_size + k) * inner_size;
                let dst = &mut result[outer * inner_size..(outer + 1) * inner_size];
                for (r, &v) in dst.iter_mut().zip(&slice[base..base + inner_size]) {
                    *r += v;
                }
            }
        }

        let mut out_dims = dims.to_vec();
        if keepdim {
            out_dims[axis] = 1;
        } else {
            out_dims.remove(axis);
        }
        Tensor::from_vec(result, &out_dims)
    }

    /// Mean along `axis`.
    pub fn mean_axis(&self, axis: usize, keepdim: bool) -> Result<Tensor> {
        let s = self.sum_axis(axis, keepdim)?;
        let n = self.dims()[axis] as f32;
        Ok(s.mul_scalar(1.0 / n))
    }
}
