//! # gast-core
//!
//! Core tensor engine for the GAST workspace.
//!
//! Provides the `Tensor` type used by every other crate:
//! - contiguous row-major f32 storage shared behind an `Arc`
//! - `Shape` with stack-allocated dims for the common ≤4D case
//! - batched matmul (parallel over batch matrices), softmax, cat, permute
//! - one error type, `GastError`, for every shape and graph contract

pub mod error;
pub mod ops;
pub mod shape;
pub mod tensor;
pub mod prelude;

pub use error::GastError;
pub use shape::Shape;
pub use tensor::Tensor;

pub type Result<T> = std::result::Result<T, GastError>;
