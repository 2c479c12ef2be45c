use std::fmt;
use std::sync::Arc;

use rand::Rng;

use crate::error::GastError;
use crate::shape::Shape;
use crate::Result;

/// A dense, row-major f32 array, the fundamental data structure in GAST.
///
/// Storage is reference counted, so cloning a tensor or reshaping it is
/// cheap; mutation goes through copy-on-write (`as_f32_slice_mut`).
/// Operations that reorder elements (`permute`, `cat`, `select_rows`)
/// materialise a new buffer, which keeps every tensor contiguous.
///
/// # Examples
///
/// ```
/// use gast_core::Tensor;
///
/// let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
/// assert_eq!(t.shape().dims(), &[2, 2]);
///
/// let flat = t.reshape(&[4]).unwrap();
/// assert_eq!(flat.as_f32_slice(), &[1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Clone)]
pub struct Tensor {
    data: Arc<Vec<f32>>,
    shape: Shape,
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a tensor from f32 data with the given shape.
    ///
    /// # Panics
    /// Panics if `data.len()` does not match the shape. Use [`Tensor::from_vec`]
    /// when the length is not known to be correct.
    pub fn from_f32(data: &[f32], shape: &[usize]) -> Self {
        let s = Shape::new(shape);
        assert_eq!(
            s.numel(),
            data.len(),
            "Shape {:?} requires {} elements, got {}",
            shape,
            s.numel(),
            data.len()
        );
        Self { data: Arc::new(data.to_vec()), shape: s }
    }

    /// Take ownership of `data`, checking it against `shape`.
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        let s = Shape::new(shape);
        if s.numel() != data.len() {
            return Err(GastError::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Self { data: Arc::new(data), shape: s })
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, 0.0)
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, 1.0)
    }

    /// Tensor with every element set to `value`.
    pub fn full(shape: &[usize], value: f32) -> Self {
        let s = Shape::new(shape);
        Self { data: Arc::new(vec![value; s.numel()]), shape: s }
    }

    pub fn scalar(value: f32) -> Self {
        Self { data: Arc::new(vec![value]), shape: Shape::scalar() }
    }

    /// Standard normal N(0, 1) samples drawn from `rng`.
    ///
    /// Taking the generator explicitly keeps parameter init reproducible
    /// when callers seed it (`StdRng::seed_from_u64`).
    pub fn randn<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Self {
        let s = Shape::new(shape);
        // Box-Muller transform
        let data: Vec<f32> = (0..s.numel())
            .map(|_| {
                let u1: f32 = rng.gen_range(1e-7f32..1.0f32);
                let u2: f32 = rng.gen_range(0.0f32..std::f32::consts::TAU);
                (-2.0 * u1.ln()).sqrt() * u2.cos()
            })
            .collect();
        Self { data: Arc::new(data), shape: s }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Shorthand for `self.shape().dims()`.
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    // =========================================================================
    // Data access
    // =========================================================================

    pub fn as_f32_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable view of the data; clones the buffer if it is shared.
    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.as_ref().clone()
    }

    /// Element at a multi-dimensional index, `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f32> {
        if index.len() != self.ndim() {
            return None;
        }
        let strides = self.shape.contiguous_strides();
        let mut flat = 0;
        for ((&i, &d), &s) in index.iter().zip(self.dims()).zip(strides.iter()) {
            if i >= d {
                return None;
            }
            flat += i * s;
        }
        self.data.get(flat).copied()
    }

    /// Whether every element is finite (no NaN, no ±inf).
    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Number of NaN elements.
    pub fn count_nan(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Largest absolute element-wise difference to `other` (same shape required).
    pub fn max_abs_diff(&self, other: &Tensor) -> Result<f32> {
        if self.dims() != other.dims() {
            return Err(GastError::ShapeMismatch {
                expected: self.dims().to_vec(),
                got: other.dims().to_vec(),
            });
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max))
    }

    // =========================================================================
    // Shape operations
    // =========================================================================

    /// Reshape (zero-copy: the buffer is shared).
    pub fn reshape(&self, new_shape: &[isize]) -> Result<Tensor> {
        let resolved = self.shape.resolve_reshape(new_shape).ok_or_else(|| {
            GastError::InvalidReshape {
                numel: self.numel(),
                shape: new_shape.to_vec(),
            }
        })?;
        Ok(Tensor { data: Arc::clone(&self.data), shape: resolved })
    }

    /// Reshape to explicit `usize` dims.
    pub fn reshape_dims(&self, dims: &[usize]) -> Result<Tensor> {
        let target: Vec<isize> = dims.iter().map(|&d| d as isize).collect();
        self.reshape(&target)
    }

    /// Reorder axes, materialising the result.
    pub fn permute(&self, axes: &[usize]) -> Result<Tensor> {
        let out_shape = self.shape.permute(axes).ok_or_else(|| GastError::InvalidAxis {
            axis: axes.iter().copied().max().unwrap_or(0),
            ndim: self.ndim(),
        })?;

        let src_strides = self.shape.contiguous_strides();
        let out_dims = out_shape.dims();
        let ndim = out_dims.len();
        let numel = self.numel();
        let mut result = Vec::with_capacity(numel);

        // Walk the output in row-major order with an odometer over its dims.
        let mut coord = vec![0usize; ndim];
        for _ in 0..numel {
            let src: usize = (0..ndim).map(|i| coord[i] * src_strides[axes[i]]).sum();
            result.push(self.data[src]);
            for i in (0..ndim).rev() {
                coord[i] += 1;
                if coord[i] < out_dims[i] {
                    break;
                }
                coord[i] = 0;
            }
        }

        Ok(Tensor { data: Arc::new(result), shape: out_shape })
    }

    /// Swap the last two axes.
    pub fn transpose(&self) -> Result<Tensor> {
        let ndim = self.ndim();
        if ndim < 2 {
            return Err(GastError::InvalidAxis { axis: 1, ndim });
        }
        let mut axes: Vec<usize> = (0..ndim).collect();
        axes.swap(ndim - 2, ndim - 1);
        self.permute(&axes)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor(shape={}, shared={})", self.shape, Arc::strong_count(&self.data) > 1)
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.numel();
        if n <= 20 {
            write!(f, "tensor({:?}, shape={})", self.data.as_slice(), self.shape)
        } else {
            write!(
                f,
                "tensor([{:.4}, {:.4}, ..., {:.4}], shape={})",
                self.data[0],
                self.data[1],
                self.data[n - 1],
                self.shape
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_f32() {
        let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        assert_eq!(t.dims(), &[2, 3]);
        assert_eq!(t.ndim(), 2);
        assert_eq!(t.numel(), 6);
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Tensor::from_vec(vec![1.0; 5], &[2, 3]).is_err());
        assert!(Tensor::from_vec(vec![1.0; 6], &[2, 3]).is_ok());
    }

    #[test]
    fn test_full_and_scalar() {
        let t = Tensor::full(&[2, 2], f32::NEG_INFINITY);
        assert!(t.as_f32_slice().iter().all(|v| v.is_infinite()));
        assert!(!t.all_finite());

        let s = Tensor::scalar(3.5);
        assert!(s.shape().is_scalar());
        assert_eq!(s.get(&[]), Some(3.5));
    }

    #[test]
    fn test_randn_seeded_is_reproducible() {
        let a = Tensor::randn(&[4, 8], &mut StdRng::seed_from_u64(7));
        let b = Tensor::randn(&[4, 8], &mut StdRng::seed_from_u64(7));
        assert_eq!(a.as_f32_slice(), b.as_f32_slice());
        assert!(a.all_finite());
    }

    #[test]
    fn test_get() {
        let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        assert_eq!(t.get(&[1, 2]), Some(6.0));
        assert_eq!(t.get(&[0, 1]), Some(2.0));
        assert_eq!(t.get(&[2, 0]), None);
        assert_eq!(t.get(&[0]), None);
    }

    #[test]
    fn test_copy_on_write() {
        let a = Tensor::from_f32(&[1.0, 2.0], &[2]);
        let mut b = a.clone();
        b.as_f32_slice_mut()[0] = 9.0;
        assert_eq!(a.as_f32_slice(), &[1.0, 2.0]);
        assert_eq!(b.as_f32_slice(), &[9.0, 2.0]);
    }

    #[test]
    fn test_reshape() {
        let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let r = t.reshape(&[-1, 2]).unwrap();
        assert_eq!(r.dims(), &[3, 2]);
        assert_eq!(r.as_f32_slice(), t.as_f32_slice());
        assert!(t.reshape(&[4, 2]).is_err());
    }

    #[test]
    fn test_transpose() {
        let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let tr = t.transpose().unwrap();
        assert_eq!(tr.dims(), &[3, 2]);
        assert_eq!(tr.as_f32_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_permute_3d() {
        // [2, 3, 2] -> [3, 2, 2]
        let data: Vec<f32> = (0..12).map(|i| i as f32).collect();
        let t = Tensor::from_f32(&data, &[2, 3, 2]);
        let p = t.permute(&[1, 0, 2]).unwrap();
        assert_eq!(p.dims(), &[3, 2, 2]);
        assert_eq!(p.get(&[2, 1, 0]), t.get(&[1, 2, 0]));
        assert_eq!(p.get(&[0, 1, 1]), t.get(&[1, 0, 1]));
        assert!(t.permute(&[0, 0, 1]).is_err());
    }

    #[test]
    fn test_max_abs_diff() {
        let a = Tensor::from_f32(&[1.0, 2.0], &[2]);
        let b = Tensor::from_f32(&[1.5, 1.0], &[2]);
        assert!((a.max_abs_diff(&b).unwrap() - 1.0).abs() < 1e-6);
        assert!(a.max_abs_diff(&Tensor::zeros(&[3])).is_err());
    }

    #[test]
    fn test_debug_display() {
        let t = Tensor::from_f32(&[1.0, 2.0], &[2]);
        assert!(format!("{:?}", t).contains("Tensor"));
        assert!(format!("{}", t).contains("tensor"));
    }
}
