//! Tensor operations: arithmetic, reduction, manipulation.
//!
//! All operations return new tensors (functional style).

pub mod arithmetic;
pub mod manipulation;
pub mod reduction;
