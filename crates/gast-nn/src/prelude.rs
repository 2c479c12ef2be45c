//! Convenience re-exports for common gast-nn types.
//!
//! ```rust
//! use gast_nn::prelude::*;
//! ```

pub use crate::mse_loss;
pub use crate::Module;
pub use crate::{MVLayerNorm, MVLinear, MVSiLU};
