//! Regression losses.

use gast_core::{GastError, Result, Tensor};

/// Mean Squared Error: mean((pred - target)²). Shapes must match exactly.
pub fn mse_loss(pred: &Tensor, target: &Tensor) -> Result<f32> {
    if pred.dims() != target.dims() {
        return Err(GastError::ShapeMismatch {
            expected: pred.dims().to_vec(),
            got: target.dims().to_vec(),
        });
    }
    let diff = pred.sub(target)?;
    Ok(diff.mul(&diff)?.mean())
}
