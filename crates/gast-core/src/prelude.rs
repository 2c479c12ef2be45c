//! Convenience re-exports for common gast-core types.
//!
//! ```rust
//! use gast_core::prelude::*;
//! ```

pub use crate::GastError;
pub use crate::Result;
pub use crate::Shape;
pub use crate::Tensor;
