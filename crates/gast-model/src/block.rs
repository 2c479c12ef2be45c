//! Equivariant transformer block (pre-norm architecture).
//!
//! Block(x) = x + SelfAttention(MVLayerNorm(x), mask)

use std::sync::Arc;

use gast_attention::AttentionMask;
use gast_clifford::CliffordAlgebra;
use gast_core::{Result, Tensor};
use gast_nn::module::{check_parameters, prefixed};
use gast_nn::{MVLayerNorm, Module};
use rand::Rng;

use crate::attention::MultivectorSelfAttention;

pub struct EquivariantBlock {
    pub norm: MVLayerNorm,
    pub attn: MultivectorSelfAttention,
}

impl EquivariantBlock {
    pub fn new<R: Rng + ?Sized>(
        algebra: Arc<CliffordAlgebra>,
        channels: usize,
        num_heads: usize,
        norm_eps: f32,
        rng: &mut R,
    ) -> Self {
        Self {
            norm: MVLayerNorm::new(Arc::clone(&algebra), channels, norm_eps),
            attn: MultivectorSelfAttention::new(algebra, channels, num_heads, norm_eps, rng),
        }
    }

    /// `x`: `[B*T, C, D]`, returns the same shape.
    pub fn forward(&self, x: &Tensor, mask: &AttentionMask, batch_size: usize) -> Result<Tensor> {
        let normed = self.norm.forward(x)?;
        let attn_out = self.attn.forward(&normed, mask, batch_size)?;
        // Plain elementwise residual.
        x.add(&attn_out)
    }
}

impl Module for EquivariantBlock {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.norm.parameters();
        params.extend(self.attn.parameters());
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = prefixed("norm", self.norm.named_parameters());
        params.extend(prefixed("attn", self.attn.named_parameters()));
        params
    }

    fn set_parameters(&mut self, params: &[Tensor]) -> Result<usize> {
        check_parameters(&self.parameters(), params)?;
        let mut cursor = self.norm.set_parameters(params)?;
        cursor += self.attn.set_parameters(&params[cursor..])?;
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gast_nn::init::seeded_rng;

    #[test]
    fn test_block_residual() {
        let alg = Arc::new(CliffordAlgebra::new(3, 0));
        let mut rng = seeded_rng(0);
        let mut block = EquivariantBlock::new(alg, 2, 2, 1e-6, &mut rng);
        let edges = vec![[0, 1], [1, 2], [2, 0]];
        let mask = AttentionMask::repeated(3, &edges, 2, false).unwrap();
        let x = Tensor::randn(&[12, 2, 8], &mut rng);

        let y = block.forward(&x, &mask, 2).unwrap();
        assert_eq!(y.dims(), x.dims());
        assert!(y.max_abs_diff(&x).unwrap() > 1e-4);

        // With every parameter zeroed the attention branch vanishes.
        let zeroed: Vec<Tensor> = block.parameters().into_iter().map(|t| Tensor::zeros(t.dims())).collect();
        block.set_parameters(&zeroed).unwrap();
        let y = block.forward(&x, &mask, 2).unwrap();
        assert!(y.max_abs_diff(&x).unwrap() < 1e-6);
    }

    #[test]
    fn test_block_parameter_names() {
        let alg = Arc::new(CliffordAlgebra::new(3, 0));
        let block = EquivariantBlock::new(alg, 2, 1, 1e-6, &mut seeded_rng(0));
        let names: Vec<String> = block.named_parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names[0], "norm.a");
        assert_eq!(names[1], "attn.q_proj.weight");
        assert_eq!(names.len(), 1 + 9);
    }
}
