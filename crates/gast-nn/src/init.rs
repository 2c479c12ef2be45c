//! Parameter initialisation.

use gast_core::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Normal N(0, std²) samples.
pub fn normal<R: Rng + ?Sized>(shape: &[usize], std: f32, rng: &mut R) -> Tensor {
    Tensor::randn(shape, rng).mul_scalar(std)
}

/// Deterministic generator for parameter init and synthetic data.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_std() {
        let mut rng = seeded_rng(0);
        let t = normal(&[10_000], 0.5, &mut rng);
        let d = t.as_f32_slice();
        let mean = d.iter().sum::<f32>() / d.len() as f32;
        let var = d.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / d.len() as f32;
        assert!(mean.abs() < 0.03, "mean {}", mean);
        assert!((var.sqrt() - 0.5).abs() < 0.03, "std {}", var.sqrt());
    }
}
