//! # gast
//!
//! Umbrella crate for the GAST workspace: a Clifford-algebra equivariant
//! graph transformer for N-body dynamics.
//!
//! - [`core`]: dense f32 tensors and the shared error type
//! - [`clifford`]: Cl(p,q) algebra, multivectors, batched products
//! - [`nn`]: equivariant layers (`MVLinear`, `MVLayerNorm`, `MVSiLU`)
//! - [`attention`]: graph attention masks and the multivector attention kernel
//! - [`data`]: N-body batches and a synthetic generator
//! - [`model`]: embedder, self-attention, blocks and the full network

pub use gast_attention as attention;
pub use gast_clifford as clifford;
pub use gast_core as core;
pub use gast_data as data;
pub use gast_model as model;
pub use gast_nn as nn;
