//! Multivector layer normalisation.
//!
//! Each token is rescaled by the mean multivector norm over its channels:
//!
//! ```text
//! ||x||  = (q(x)² + eps)^(1/4)
//! y[c]   = a[c] · x[c] / (mean_c ||x[c]|| + eps)
//! ```
//!
//! `q` is the quadratic form, so the scale factor is rotation invariant and
//! the layer stays equivariant. There is no additive shift.

use std::sync::Arc;

use gast_clifford::{CliffordAlgebra, MultivectorTensor};
use gast_core::{GastError, Result, Tensor};

use crate::module::{assign_parameter, check_parameters, Module};

pub struct MVLayerNorm {
    /// Per-channel gain, `[C]`, initialised to ones.
    a: Tensor,
    algebra: Arc<CliffordAlgebra>,
    channels: usize,
    eps: f32,
}

impl MVLayerNorm {
    pub fn new(algebra: Arc<CliffordAlgebra>, channels: usize, eps: f32) -> Self {
        Self { a: Tensor::ones(&[channels]), algebra, channels, eps }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn eps(&self) -> f32 {
        self.eps
    }

    pub fn gain(&self) -> &Tensor {
        &self.a
    }

    /// Normalise `[N, C, D]`.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let dims = x.dims();
        if dims.len() != 3 || dims[1] != self.channels {
            return Err(GastError::ShapeMismatch {
                expected: vec![0, self.channels, self.algebra.dim],
                got: dims.to_vec(),
            });
        }
        let mv = MultivectorTensor::new(Arc::clone(&self.algebra), x.clone())?;
        let q = mv.quadratic_form()?; // [N, C, 1]

        let (n, c, d) = (dims[0], dims[1], dims[2]);
        let q = q.as_f32_slice();
        let gain = self.a.as_f32_slice();
        let src = x.as_f32_slice();
        let mut out = vec![0.0f32; src.len()];

        for t in 0..n {
            let norms = &q[t * c..(t + 1) * c];
            let mean_norm = norms
                .iter()
                .map(|&qv| (qv * qv + self.eps).powf(0.25))
                .sum::<f32>()
                / c as f32;
            let denom = mean_norm + self.eps;
            for ch in 0..c {
                let scale = gain[ch] / denom;
                let base = (t * c + ch) * d;
                for i in base..base + d {
                    out[i] = src[i] * scale;
                }
            }
        }

        Tensor::from_vec(out, dims)
    }
}

impl Module for MVLayerNorm {
    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![("a".to_string(), &self.a)]
    }

    fn set_parameters(&mut self, params: &[Tensor]) -> Result<usize> {
        check_parameters(&self.parameters(), params)?;
        let mut cursor = 0;
        assign_parameter(&mut self.a, params, &mut cursor)?;
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cl30() -> Arc<CliffordAlgebra> {
        Arc::new(CliffordAlgebra::new(3, 0))
    }

    #[test]
    fn test_unit_scalars_are_nearly_unchanged() {
        // q = 1 for every channel, so the mean norm is ~1.
        let ln = MVLayerNorm::new(cl30(), 2, 1e-6);
        let mut data = vec![0.0f32; 16];
        data[0] = 1.0;
        data[8] = 1.0;
        let x = Tensor::from_f32(&data, &[1, 2, 8]);
        let y = ln.forward(&x).unwrap();
        assert!(y.max_abs_diff(&x).unwrap() < 1e-4);
    }

    #[test]
    fn test_output_is_scale_invariant() {
        let ln = MVLayerNorm::new(cl30(), 3, 1e-6);
        let mut rng = crate::init::seeded_rng(2);
        let x = Tensor::randn(&[4, 3, 8], &mut rng);
        let y1 = ln.forward(&x).unwrap();
        let y2 = ln.forward(&x.mul_scalar(5.0)).unwrap();
        assert!(y1.max_abs_diff(&y2).unwrap() < 1e-3);
        assert!(y1.all_finite());
    }

    #[test]
    fn test_zero_input_stays_finite() {
        let ln = MVLayerNorm::new(cl30(), 2, 1e-6);
        let y = ln.forward(&Tensor::zeros(&[3, 2, 8])).unwrap();
        assert!(y.all_finite());
        assert!(y.as_f32_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_gain_parameter() {
        let mut ln = MVLayerNorm::new(cl30(), 2, 1e-6);
        assert_eq!(ln.gain().as_f32_slice(), &[1.0, 1.0]);
        ln.set_parameters(&[Tensor::from_f32(&[2.0, 0.0], &[2])]).unwrap();
        let y = ln.forward(&Tensor::ones(&[1, 2, 8])).unwrap();
        assert!(y.as_f32_slice()[8..].iter().all(|&v| v == 0.0));
        assert!(y.as_f32_slice()[0] > 0.0);
    }

    #[test]
    fn test_rejects_wrong_channels() {
        let ln = MVLayerNorm::new(cl30(), 2, 1e-6);
        assert!(ln.forward(&Tensor::zeros(&[3, 4, 8])).is_err());
    }
}
