use std::collections::HashMap;

use gast_core::{GastError, Result, Tensor};

/// Base trait for every layer that owns learnable parameters.
///
/// Training happens outside this workspace: an optimizer reads
/// `parameters()`, computes updates and writes them back with
/// `set_parameters()` between forward passes. Forward passes only borrow
/// the module, so a model can be shared across threads while evaluating.
pub trait Module: Send + Sync {
    /// Get all trainable parameters, in a stable order.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Get named parameters (for state_dict). Nested modules prefix their
    /// children with `name.`.
    fn named_parameters(&self) -> Vec<(String, &Tensor)>;

    /// Write updated parameters back into the module.
    ///
    /// Consumes parameters from the front of the slice in the same order
    /// as `parameters()` returns them. Returns how many were consumed.
    /// Implementations run [`check_parameters`] first, so on error the
    /// module is left untouched.
    fn set_parameters(&mut self, params: &[Tensor]) -> Result<usize>;

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|t| t.numel()).sum()
    }

    /// Export state dictionary.
    fn state_dict(&self) -> HashMap<String, Tensor> {
        self.named_parameters()
            .into_iter()
            .map(|(name, t)| (name, t.clone()))
            .collect()
    }
}

/// Check that `params` starts with tensors shaped like `expected`, in order.
pub fn check_parameters(expected: &[&Tensor], params: &[Tensor]) -> Result<()> {
    if params.len() < expected.len() {
        return Err(GastError::IndexOutOfRange { index: params.len(), size: params.len() });
    }
    for (slot, src) in expected.iter().zip(params) {
        if src.dims() != slot.dims() {
            return Err(GastError::ShapeMismatch {
                expected: slot.dims().to_vec(),
                got: src.dims().to_vec(),
            });
        }
    }
    Ok(())
}

/// Replace `slot` with `params[*cursor]`, requiring an identical shape.
pub fn assign_parameter(slot: &mut Tensor, params: &[Tensor], cursor: &mut usize) -> Result<()> {
    let src = params.get(*cursor).ok_or(GastError::IndexOutOfRange {
        index: *cursor,
        size: params.len(),
    })?;
    if src.dims() != slot.dims() {
        return Err(GastError::ShapeMismatch {
            expected: slot.dims().to_vec(),
            got: src.dims().to_vec(),
        });
    }
    *slot = src.clone();
    *cursor += 1;
    Ok(())
}

/// Prefix every name in `params` with `prefix.`.
pub fn prefixed<'a>(prefix: &str, params: Vec<(String, &'a Tensor)>) -> Vec<(String, &'a Tensor)> {
    params
        .into_iter()
        .map(|(name, t)| (format!("{prefix}.{name}"), t))
        .collect()
}
