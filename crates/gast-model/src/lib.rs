//! # gast-model
//!
//! Geometric algebra self-attention transformer for N-body graphs:
//! - `GastConfig`: hyperparameters, JSON loadable
//! - `EdgeSet`: batch-global edge indices with optional undirected dedup
//! - `NBodyGraphEmbedder`: batch → multivector tokens + structural mask
//! - `MultivectorSelfAttention`: multi-head attention with geometric-product mixing
//! - `EquivariantBlock`: pre-norm residual block
//! - `Gast`: block stack with a shared gated activation
//! - `NBodyTransformer`: embedder, stack and position readout

pub mod attention;
pub mod block;
pub mod config;
pub mod edges;
pub mod embedder;
pub mod model;

pub use attention::MultivectorSelfAttention;
pub use block::EquivariantBlock;
pub use config::GastConfig;
pub use edges::EdgeSet;
pub use embedder::{GraphEmbedding, NBodyGraphEmbedder};
pub use model::{Evaluation, Gast, NBodyTransformer};
