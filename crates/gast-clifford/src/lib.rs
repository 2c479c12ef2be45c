//! # gast-clifford
//!
//! Geometric algebra engine for GAST.
//!
//! Provides Clifford algebras Cl(p,q) with:
//! - Cayley table generation over grade-ordered blades
//! - Multivector storage and arithmetic
//! - Geometric, inner, outer products
//! - Rotors, sandwich product and reflections
//! - `MultivectorTensor`, the batched channel-wise view used by the network

pub mod algebra;
pub mod multivector;
pub mod ops;
pub mod products;
pub mod tensor_bridge;

pub use algebra::CliffordAlgebra;
pub use multivector::Multivector;
pub use tensor_bridge::MultivectorTensor;
