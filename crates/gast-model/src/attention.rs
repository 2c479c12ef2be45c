//! Multi-head multivector self-attention.
//!
//! ```text
//! q, k, v = MVLinear(C → H*C)(x)                 [B*T, H*C, D]
//! q, k, v → [B, H, T, C*D]                       heads never split blades
//! a       = softmax(q k^T / sqrt(C*D) + mask) v
//! a       → [B*T, H*C, D]
//! y       = MVLinear(2HC → C)(MVLayerNorm([a, a*a]))
//! ```
//!
//! `a*a` is the channel-wise geometric product of the attention output
//! with itself.

use std::sync::Arc;

use gast_attention::{merge_heads, scaled_dot_product_attention, split_heads, AttentionMask};
use gast_clifford::{CliffordAlgebra, MultivectorTensor};
use gast_core::{GastError, Result, Tensor};
use gast_nn::module::{check_parameters, prefixed};
use gast_nn::{MVLayerNorm, MVLinear, Module};
use rand::Rng;

pub struct MultivectorSelfAttention {
    algebra: Arc<CliffordAlgebra>,
    channels: usize,
    num_heads: usize,
    q_proj: MVLinear,
    k_proj: MVLinear,
    v_proj: MVLinear,
    concat_norm: MVLayerNorm,
    out_proj: MVLinear,
}

impl MultivectorSelfAttention {
    pub fn new<R: Rng + ?Sized>(
        algebra: Arc<CliffordAlgebra>,
        channels: usize,
        num_heads: usize,
        norm_eps: f32,
        rng: &mut R,
    ) -> Self {
        let hc = channels * num_heads;
        let mut proj = |cin: usize, cout: usize| MVLinear::new(Arc::clone(&algebra), cin, cout, true, true, &mut *rng);
        let q_proj = proj(channels, hc);
        let k_proj = proj(channels, hc);
        let v_proj = proj(channels, hc);
        let out_proj = proj(2 * hc, channels);
        let concat_norm = MVLayerNorm::new(Arc::clone(&algebra), 2 * hc, norm_eps);

        Self { algebra, channels, num_heads, q_proj, k_proj, v_proj, concat_norm, out_proj }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    /// Attend over `x: [B*T, C, D]`; returns the same shape.
    pub fn forward(&self, x: &Tensor, mask: &AttentionMask, batch_size: usize) -> Result<Tensor> {
        self.forward_with_weights(x, mask, batch_size).map(|(y, _)| y)
    }

    /// Like [`forward`](Self::forward), also returning the `[B, H, T, T]`
    /// attention weights.
    pub fn forward_with_weights(
        &self,
        x: &Tensor,
        mask: &AttentionMask,
        batch_size: usize,
    ) -> Result<(Tensor, Tensor)> {
        check_layout(x, self.channels, self.algebra.dim, mask, batch_size)?;
        let d = self.algebra.dim;

        let q = split_heads(&self.q_proj.forward(x)?, batch_size, self.num_heads)?;
        let k = split_heads(&self.k_proj.forward(x)?, batch_size, self.num_heads)?;
        let v = split_heads(&self.v_proj.forward(x)?, batch_size, self.num_heads)?;

        let scale = 1.0 / ((self.channels * d) as f32).sqrt();
        let attn = scaled_dot_product_attention(&q, &k, &v, Some(mask.tensor()), Some(scale))?;
        let attended = merge_heads(&attn.output, d)?;

        let mv = MultivectorTensor::new(Arc::clone(&self.algebra), attended.clone())?;
        let product = mv.geometric_product(&mv)?.into_tensor();

        let mixed = Tensor::cat(&[&attended, &product], 1)?;
        let out = self.out_proj.forward(&self.concat_norm.forward(&mixed)?)?;

        tracing::debug!(
            "self-attention: x {:?} -> heads {:?} -> mixed {:?} -> out {:?}",
            x.dims(),
            q.dims(),
            mixed.dims(),
            out.dims()
        );
        Ok((out, attn.weights))
    }
}

/// Check `x: [B*T, C, D]` against the mask and the explicit batch size.
pub(crate) fn check_layout(
    x: &Tensor,
    channels: usize,
    blade_dim: usize,
    mask: &AttentionMask,
    batch_size: usize,
) -> Result<()> {
    let dims = x.dims();
    if dims.len() != 3 || dims[1] != channels || dims[2] != blade_dim {
        return Err(GastError::ShapeMismatch {
            expected: vec![0, channels, blade_dim],
            got: dims.to_vec(),
        });
    }
    let t = mask.tokens_per_graph();
    if dims[0] % t != 0 {
        return Err(GastError::IndivisibleBatch { tokens: dims[0], tokens_per_graph: t });
    }
    if dims[0] / t != batch_size {
        return Err(GastError::BatchSizeMismatch { expected: batch_size, got: dims[0] / t });
    }
    if mask.batch_size() != batch_size {
        return Err(GastError::BatchSizeMismatch { expected: batch_size, got: mask.batch_size() });
    }
    Ok(())
}

impl Module for MultivectorSelfAttention {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.q_proj.parameters();
        params.extend(self.k_proj.parameters());
        params.extend(self.v_proj.parameters());
        params.extend(self.concat_norm.parameters());
        params.extend(self.out_proj.parameters());
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = prefixed("q_proj", self.q_proj.named_parameters());
        params.extend(prefixed("k_proj", self.k_proj.named_parameters()));
        params.extend(prefixed("v_proj", self.v_proj.named_parameters()));
        params.extend(prefixed("concat_norm", self.concat_norm.named_parameters()));
        params.extend(prefixed("out_proj", self.out_proj.named_parameters()));
        params
    }

    fn set_parameters(&mut self, params: &[Tensor]) -> Result<usize> {
        check_parameters(&self.parameters(), params)?;
        let mut cursor = 0;
        cursor += self.q_proj.set_parameters(&params[cursor..])?;
        cursor += self.k_proj.set_parameters(&params[cursor..])?;
        cursor += self.v_proj.set_parameters(&params[cursor..])?;
        cursor += self.concat_norm.set_parameters(&params[cursor..])?;
        cursor += self.out_proj.set_parameters(&params[cursor..])?;
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gast_nn::init::seeded_rng;

    fn cl30() -> Arc<CliffordAlgebra> {
        Arc::new(CliffordAlgebra::new(3, 0))
    }

    fn ring(n: usize) -> Vec<[usize; 2]> {
        (0..n).map(|i| [i, (i + 1) % n]).collect()
    }

    #[test]
    fn test_output_shape_matches_input() {
        let mut rng = seeded_rng(0);
        let attn = MultivectorSelfAttention::new(cl30(), 3, 2, 1e-6, &mut rng);
        let mask = AttentionMask::repeated(4, &ring(4), 2, false).unwrap();
        let x = Tensor::randn(&[16, 3, 8], &mut rng);

        let (y, w) = attn.forward_with_weights(&x, &mask, 2).unwrap();
        assert_eq!(y.dims(), &[16, 3, 8]);
        assert_eq!(w.dims(), &[2, 2, 8, 8]);
        assert!(y.all_finite());
    }

    #[test]
    fn test_weights_respect_mask() {
        let mut rng = seeded_rng(1);
        let attn = MultivectorSelfAttention::new(cl30(), 2, 3, 1e-6, &mut rng);
        let mask = AttentionMask::repeated(4, &ring(4), 1, true).unwrap();
        let x = Tensor::randn(&[8, 2, 8], &mut rng);

        let (_, w) = attn.forward_with_weights(&x, &mask, 1).unwrap();
        for h in 0..3 {
            for i in 0..8 {
                let row: f32 = (0..8).map(|j| w.get(&[0, h, i, j]).unwrap()).sum();
                assert!((row - 1.0).abs() < 1e-5);
                for j in 0..8 {
                    if !mask.is_permitted(0, i, j) {
                        assert_eq!(w.get(&[0, h, i, j]), Some(0.0));
                    }
                }
            }
        }
    }

    #[test]
    fn test_batch_layout_errors() {
        let mut rng = seeded_rng(2);
        let attn = MultivectorSelfAttention::new(cl30(), 2, 1, 1e-6, &mut rng);
        let mask = AttentionMask::repeated(4, &ring(4), 2, false).unwrap();

        let x = Tensor::zeros(&[15, 2, 8]);
        assert!(matches!(
            attn.forward(&x, &mask, 2),
            Err(GastError::IndivisibleBatch { tokens: 15, tokens_per_graph: 8 })
        ));

        let x = Tensor::zeros(&[16, 2, 8]);
        assert!(matches!(
            attn.forward(&x, &mask, 3),
            Err(GastError::BatchSizeMismatch { expected: 3, got: 2 })
        ));

        let x = Tensor::zeros(&[24, 2, 8]);
        assert!(matches!(
            attn.forward(&x, &mask, 3),
            Err(GastError::BatchSizeMismatch { expected: 3, got: 2 })
        ));

        let x = Tensor::zeros(&[16, 3, 8]);
        assert!(matches!(attn.forward(&x, &mask, 2), Err(GastError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_graphs_do_not_interact() {
        // Changing graph 1 must leave graph 0's outputs untouched.
        let mut rng = seeded_rng(3);
        let attn = MultivectorSelfAttention::new(cl30(), 2, 2, 1e-6, &mut rng);
        let mask = AttentionMask::repeated(4, &ring(4), 2, false).unwrap();
        let x = Tensor::randn(&[16, 2, 8], &mut rng);
        let mut x2 = x.clone();
        for v in &mut x2.as_f32_slice_mut()[8 * 16..] {
            *v += 1.0;
        }

        let y1 = attn.forward(&x, &mask, 2).unwrap();
        let y2 = attn.forward(&x2, &mask, 2).unwrap();
        let g0 = |y: &Tensor| y.narrow(0, 0, 8).unwrap();
        assert!(g0(&y1).max_abs_diff(&g0(&y2)).unwrap() < 1e-6);
        assert!(y1.narrow(0, 8, 8).unwrap().max_abs_diff(&y2.narrow(0, 8, 8).unwrap()).unwrap() > 1e-4);
    }

    #[test]
    fn test_parameter_layout() {
        let mut rng = seeded_rng(4);
        let mut attn = MultivectorSelfAttention::new(cl30(), 3, 2, 1e-6, &mut rng);
        let names: Vec<String> = attn.named_parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.len(), 9);
        assert_eq!(names[6], "concat_norm.a");
        assert_eq!(attn.state_dict()["out_proj.weight"].dims(), &[3, 12, 4]);

        let params: Vec<Tensor> = attn.parameters().into_iter().cloned().collect();
        assert_eq!(attn.set_parameters(&params).unwrap(), 9);
    }
}
