//! Synthetic N-body batches.
//!
//! Features are drawn uniformly from `[0, 1)`. Edges are random node pairs;
//! by default self-loops and repeated pairs may occur, which is what the
//! unique-edges mode of the embedder is for.

use gast_core::{GastError, Result};
use rand::seq::index;
use rand::Rng;

use crate::batch::{NBodyBatch, NBodySample};

/// Shape and topology options for generated graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockConfig {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub edge_attr_dim: usize,
    /// Draw distinct undirected pairs without self-loops.
    pub distinct_edges: bool,
    /// Reuse one edge list for every graph of a batch.
    pub shared_topology: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_nodes: 5,
            num_edges: 20,
            edge_attr_dim: 1,
            distinct_edges: false,
            shared_topology: true,
        }
    }
}

impl MockConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_nodes == 0 || self.num_edges == 0 {
            return Err(GastError::EmptyGraph { nodes: self.num_nodes, edges: self.num_edges });
        }
        let max_pairs = self.num_nodes * (self.num_nodes - 1) / 2;
        if self.distinct_edges && self.num_edges > max_pairs {
            return Err(GastError::InvalidConfig(format!(
                "{} distinct edges requested but {} nodes only have {} pairs",
                self.num_edges, self.num_nodes, max_pairs
            )));
        }
        Ok(())
    }
}

/// Random edge list for one graph.
pub fn random_edges<R: Rng + ?Sized>(config: &MockConfig, rng: &mut R) -> Result<Vec<[usize; 2]>> {
    config.validate()?;
    let n = config.num_nodes;
    if !config.distinct_edges {
        return Ok((0..config.num_edges)
            .map(|_| [rng.gen_range(0..n), rng.gen_range(0..n)])
            .collect());
    }

    let pairs: Vec<[usize; 2]> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| [i, j]))
        .collect();
    Ok(index::sample(rng, pairs.len(), config.num_edges)
        .into_iter()
        .map(|k| {
            let [i, j] = pairs[k];
            if rng.gen_bool(0.5) { [i, j] } else { [j, i] }
        })
        .collect())
}

fn uniform_rows<R: Rng + ?Sized>(rows: usize, rng: &mut R) -> Vec<[f32; 3]> {
    (0..rows).map(|_| [rng.gen(), rng.gen(), rng.gen()]).collect()
}

/// One random graph. Pass `edges` to fix the topology.
pub fn mock_sample<R: Rng + ?Sized>(
    config: &MockConfig,
    edges: Option<&[[usize; 2]]>,
    rng: &mut R,
) -> Result<NBodySample> {
    let edges = match edges {
        Some(e) => e.to_vec(),
        None => random_edges(config, rng)?,
    };
    let n = config.num_nodes;
    let sample = NBodySample {
        loc: uniform_rows(n, rng),
        vel: uniform_rows(n, rng),
        charges: (0..n).map(|_| rng.gen()).collect(),
        edge_attr: (0..edges.len() * config.edge_attr_dim).map(|_| rng.gen()).collect(),
        edge_attr_dim: config.edge_attr_dim,
        loc_end: uniform_rows(n, rng),
        edges,
    };
    sample.validate()?;
    Ok(sample)
}

/// A batch of `batch_size` random graphs.
pub fn mock_batch<R: Rng + ?Sized>(config: &MockConfig, batch_size: usize, rng: &mut R) -> Result<NBodyBatch> {
    if batch_size == 0 {
        return Err(GastError::BatchSizeMismatch { expected: 1, got: 0 });
    }
    let shared = if config.shared_topology { Some(random_edges(config, rng)?) } else { None };
    let samples = (0..batch_size)
        .map(|_| mock_sample(config, shared.as_deref(), rng))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        "mock batch: {} graphs, {} nodes, {} edges, shared topology: {}",
        batch_size,
        config.num_nodes,
        config.num_edges,
        config.shared_topology
    );
    NBodyBatch::collate(&samples)
}
