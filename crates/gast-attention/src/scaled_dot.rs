//! Scaled dot-product attention over flattened multivector heads.
//!
//! Attention(Q, K, V) = softmax(Q @ K^T * scale + mask) @ V
//!
//! Queries, keys and values are `[B, H, T, E]` where `E = C * D` flattens a
//! head's channels together with their blade coefficients. The kernel itself
//! is agnostic of the algebra; `split_heads` and `merge_heads` convert between
//! the token layout `[B*T, H*C, D]` and the head layout.

use gast_core::{GastError, Result, Tensor};

/// Attention result: the attended values and the normalised weights.
#[derive(Debug, Clone)]
pub struct AttentionOutput {
    /// `[B, H, T, E]`
    pub output: Tensor,
    /// `[B, H, T, T]`, every row sums to one.
    pub weights: Tensor,
}

/// Scaled dot-product attention.
///
/// # Arguments
/// * `query`, `key`, `value` - `[batch, heads, seq, e]`
/// * `mask`  - optional additive `[batch, seq, seq]` mask (`-inf` forbids),
///   broadcast over heads
/// * `scale` - optional score scale (default: `1/sqrt(e)`)
pub fn scaled_dot_product_attention(
    query: &Tensor,
    key: &Tensor,
    value: &Tensor,
    mask: Option<&Tensor>,
    scale: Option<f32>,
) -> Result<AttentionOutput> {
    let q_dims = query.dims();
    if q_dims.len() != 4 {
        return Err(GastError::ShapeMismatch {
            expected: vec![0, 0, 0, 0],
            got: q_dims.to_vec(),
        });
    }
    if key.dims() != q_dims {
        return Err(GastError::ShapeMismatch {
            expected: q_dims.to_vec(),
            got: key.dims().to_vec(),
        });
    }
    let v_dims = value.dims();
    if v_dims.len() != 4 || v_dims[..3] != q_dims[..3] {
        return Err(GastError::ShapeMismatch {
            expected: q_dims.to_vec(),
            got: v_dims.to_vec(),
        });
    }

    let (batch, seq, e) = (q_dims[0], q_dims[2], q_dims[3]);
    let scale = scale.unwrap_or(1.0 / (e.max(1) as f32).sqrt());

    let mut scores = query.mul_scalar(scale).matmul(&key.transpose()?)?;

    if let Some(m) = mask {
        if m.dims() != [batch, seq, seq] {
            return Err(GastError::ShapeMismatch {
                expected: vec![batch, seq, seq],
                got: m.dims().to_vec(),
            });
        }
        // [B, T, T] -> [B, 1, T, T] broadcasts over heads.
        scores = scores.add(&m.reshape_dims(&[batch, 1, seq, seq])?)?;
    }

    let weights = scores.softmax(3)?;
    let output = weights.matmul(value)?;

    Ok(AttentionOutput { output, weights })
}

/// `[B*T, H*C, D]` → `[B, H, T, C*D]`; channel `h*C + c` belongs to head `h`.
pub fn split_heads(x: &Tensor, batch_size: usize, num_heads: usize) -> Result<Tensor> {
    let dims = x.dims();
    if dims.len() != 3 {
        return Err(GastError::ShapeMismatch {
            expected: vec![0, 0, 0],
            got: dims.to_vec(),
        });
    }
    let (tokens, channels, d) = (dims[0], dims[1], dims[2]);
    if batch_size == 0 || tokens % batch_size != 0 {
        return Err(GastError::UnevenBatch { tokens, batch_size });
    }
    if num_heads == 0 || channels % num_heads != 0 {
        return Err(GastError::InvalidReshape {
            numel: channels,
            shape: vec![num_heads as isize, -1],
        });
    }
    let seq = tokens / batch_size;
    let per_head = channels / num_heads * d;

    x.reshape_dims(&[batch_size, seq, num_heads, per_head])?
        .permute(&[0, 2, 1, 3])
}

/// Inverse of [`split_heads`]: `[B, H, T, C*D]` → `[B*T, H*C, D]`.
pub fn merge_heads(x: &Tensor, blade_dim: usize) -> Result<Tensor> {
    let dims = x.dims();
    if dims.len() != 4 || blade_dim == 0 || dims[3] % blade_dim != 0 {
        return Err(GastError::ShapeMismatch {
            expected: vec![0, 0, 0, blade_dim],
            got: dims.to_vec(),
        });
    }
    let (batch, heads, seq, per_head) = (dims[0], dims[1], dims[2], dims[3]);
    let channels = heads * per_head / blade_dim;

    x.permute(&[0, 2, 1, 3])?
        .reshape_dims(&[batch * seq, channels, blade_dim])
}
