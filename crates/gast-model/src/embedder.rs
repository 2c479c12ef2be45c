//! Graph embedder: N-body batch → multivector token sequence + mask.
//!
//! Node tokens carry a 3-channel stack `[charge, centered position,
//! velocity]` (grades 0, 1, 1). Edge tokens carry
//! `[attributes, start stack, end stack, start * end]` where the last group
//! is the channel-wise geometric product of the endpoint stacks. Both stacks
//! are projected to the embedding width by non-subspace `MVLinear`s and laid
//! out graph by graph, nodes first.

use std::sync::Arc;

use gast_attention::AttentionMask;
use gast_clifford::{CliffordAlgebra, MultivectorTensor};
use gast_core::{GastError, Result, Tensor};
use gast_data::NBodyBatch;
use gast_nn::module::{check_parameters, prefixed};
use gast_nn::{MVLinear, Module};
use rand::Rng;

use crate::config::GastConfig;
use crate::edges::EdgeSet;

const SCALAR: [usize; 1] = [0];
const VECTOR: [usize; 3] = [1, 2, 3];

/// Embedded batch, ready for the stacked network.
#[derive(Debug, Clone)]
pub struct GraphEmbedding {
    /// `[B * T, C, D]`, graph-major, nodes before edges.
    pub tokens: Tensor,
    pub mask: AttentionMask,
    /// `loc_end` in grade 1, `[B * N, D]`.
    pub target: Tensor,
    pub edges: EdgeSet,
    pub batch_size: usize,
}

impl GraphEmbedding {
    pub fn num_nodes(&self) -> usize {
        self.mask.num_nodes()
    }

    pub fn tokens_per_graph(&self) -> usize {
        self.mask.tokens_per_graph()
    }
}

pub struct NBodyGraphEmbedder {
    algebra: Arc<CliffordAlgebra>,
    node_proj: MVLinear,
    edge_proj: MVLinear,
    num_nodes: usize,
    edge_attr_dim: usize,
    unique_edges: bool,
    edge_to_edge: bool,
}

impl NBodyGraphEmbedder {
    pub fn new<R: Rng + ?Sized>(algebra: Arc<CliffordAlgebra>, config: &GastConfig, rng: &mut R) -> Self {
        let node_proj = MVLinear::new(
            Arc::clone(&algebra),
            config.node_features,
            config.channels,
            false,
            true,
            rng,
        );
        let edge_proj = MVLinear::new(
            Arc::clone(&algebra),
            config.edge_features(),
            config.channels,
            false,
            true,
            rng,
        );
        Self {
            algebra,
            node_proj,
            edge_proj,
            num_nodes: config.num_nodes,
            edge_attr_dim: config.edge_attr_dim,
            unique_edges: config.unique_edges,
            edge_to_edge: config.edge_to_edge,
        }
    }

    /// Per-node stack `[B * N, 3, D]` with positions centered per graph.
    pub fn node_stack(&self, batch: &NBodyBatch) -> Result<Tensor> {
        let (b, n) = (batch.batch_size(), batch.num_nodes());
        let bn = b * n;
        let d = self.algebra.dim;

        let centered = batch.loc.sub(&batch.loc.mean_axis(1, true)?)?;

        let charge = self.embed(&batch.charges.reshape_dims(&[bn, 1])?, &SCALAR)?;
        let loc = self.embed(&centered.reshape_dims(&[bn, 3])?, &VECTOR)?;
        let vel = self.embed(&batch.vel.reshape_dims(&[bn, 3])?, &VECTOR)?;

        let channels = [charge, loc, vel]
            .iter()
            .map(|t| t.reshape_dims(&[bn, 1, d]))
            .collect::<Result<Vec<_>>>()?;
        Tensor::cat(&channels.iter().collect::<Vec<_>>(), 1)
    }

    /// Per-edge stack `[B * E, A + 9, D]` for the kept edges.
    pub fn edge_stack(&self, batch: &NBodyBatch, nodes: &Tensor, edges: &EdgeSet) -> Result<Tensor> {
        let kept = edges.global.len();

        let start = nodes.index_select(0, &edges.start_nodes())?;
        let end = nodes.index_select(0, &edges.end_nodes())?;
        let product = self
            .wrap(start.clone())?
            .geometric_product(&self.wrap(end.clone())?)?
            .into_tensor();

        let a = batch.edge_attr_dim();
        let attr = batch
            .edge_attr
            .reshape_dims(&[batch.batch_size() * batch.num_edges(), a])?
            .index_select(0, &edges.provenance)?
            .reshape_dims(&[kept, a, 1])?;
        let attr = self.embed(&attr, &SCALAR)?;

        Tensor::cat(&[&attr, &start, &end, &product], 1)
    }

    /// Embed a batch into tokens, mask and readout target.
    pub fn embed_batch(&self, batch: &NBodyBatch) -> Result<GraphEmbedding> {
        batch.validate()?;
        if batch.num_nodes() != self.num_nodes || batch.edge_attr_dim() != self.edge_attr_dim {
            return Err(GastError::ShapeMismatch {
                expected: vec![self.num_nodes, self.edge_attr_dim],
                got: vec![batch.num_nodes(), batch.edge_attr_dim()],
            });
        }
        let (b, n) = (batch.batch_size(), batch.num_nodes());

        let edges = EdgeSet::build(&batch.edges, n, self.unique_edges)?;
        let e = edges.edges_per_graph();

        let stack = self.node_stack(batch)?;
        let node_tokens = self.node_proj.forward(&stack)?;
        let edge_tokens = self.edge_proj.forward(&self.edge_stack(batch, &stack, &edges)?)?;

        // [all nodes; all edges] -> [g0 nodes, g0 edges, g1 nodes, ...]
        let order: Vec<usize> = (0..b)
            .flat_map(|g| (g * n..(g + 1) * n).chain(b * n + g * e..b * n + (g + 1) * e))
            .collect();
        let tokens = Tensor::cat(&[&node_tokens, &edge_tokens], 0)?.index_select(0, &order)?;

        let mask = AttentionMask::from_graphs(n, &edges.local, self.edge_to_edge)?;
        let target = self.embed(&batch.loc_end.reshape_dims(&[b * n, 3])?, &VECTOR)?;

        tracing::debug!(
            "embedded {} graphs: tokens {:?}, {} nodes + {} edges per graph",
            b,
            tokens.dims(),
            n,
            e
        );

        Ok(GraphEmbedding { tokens, mask, target, edges, batch_size: b })
    }

    fn embed(&self, values: &Tensor, blades: &[usize]) -> Result<Tensor> {
        Ok(MultivectorTensor::embed(Arc::clone(&self.algebra), values, blades)?.into_tensor())
    }

    fn wrap(&self, t: Tensor) -> Result<MultivectorTensor> {
        MultivectorTensor::new(Arc::clone(&self.algebra), t)
    }
}

impl Module for NBodyGraphEmbedder {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.node_proj.parameters();
        params.extend(self.edge_proj.parameters());
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = prefixed("node_proj", self.node_proj.named_parameters());
        params.extend(prefixed("edge_proj", self.edge_proj.named_parameters()));
        params
    }

    fn set_parameters(&mut self, params: &[Tensor]) -> Result<usize> {
        check_parameters(&self.parameters(), params)?;
        let mut cursor = self.node_proj.set_parameters(params)?;
        cursor += self.edge_proj.set_parameters(&params[cursor..])?;
        Ok(cursor)
    }
}
