//! # gast-data
//!
//! N-body graph data for GAST.
//!
//! Provides:
//! - `NBodySample` / `NBodyBatch`: validated per-graph and stacked inputs
//! - `mock_batch`: seeded synthetic batches with random topology
//! - `DataLoader`: shuffled, collated iteration over a `Dataset`

pub mod batch;
pub mod dataloader;
pub mod synthetic;

pub use batch::{NBodyBatch, NBodySample};
pub use dataloader::{DataLoader, DataLoaderIter, Dataset, NBodyDataset};
pub use synthetic::{mock_batch, mock_sample, random_edges, MockConfig};
