//! # gast-attention
//!
//! Attention primitives for graph-structured multivector sequences.
//!
//! Provides:
//! - Structural node/edge attention masks (additive, `0` / `-inf`)
//! - Scaled dot-product attention over `[B, H, T, C*D]` heads
//! - Head split/merge between token and head layouts

pub mod mask;
pub mod scaled_dot;

pub use mask::{AttentionMask, MaskCounts};
pub use scaled_dot::{merge_heads, scaled_dot_product_attention, split_heads, AttentionOutput};
