//! # gast-nn
//!
//! Equivariant multivector layers for GAST.
//!
//! Every layer maps `[tokens, channels, blades]` to the same layout and
//! commutes with rotors applied to all of its inputs.

pub mod init;
pub mod loss;
pub mod module;
pub mod mv_layer_norm;
pub mod mv_linear;
pub mod mv_silu;
pub mod prelude;

pub use loss::mse_loss;
pub use module::Module;
pub use mv_layer_norm::MVLayerNorm;
pub use mv_linear::MVLinear;
pub use mv_silu::MVSiLU;
