//! Structural attention masks for node/edge token sequences.
//!
//! A graph with N nodes and E edges becomes T = N + E tokens, nodes first.
//! The additive mask is `0.0` where a query token may attend to a key
//! token and `-inf` elsewhere:
//!
//! - node → node within the graph, except itself
//! - edge → its two endpoint nodes
//! - node → every incident edge
//! - edge → edge only when enabled, and then only between distinct edges
//!   sharing an endpoint
//!
//! Masks are built per graph and stacked to `[B, T, T]`; tokens of
//! different graphs never see each other.

use gast_core::{GastError, Result, Tensor};

/// Permitted-entry counts of one graph's mask, by token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskCounts {
    pub node_node: usize,
    pub node_edge: usize,
    pub edge_node: usize,
    pub edge_edge: usize,
}

impl MaskCounts {
    pub fn total(&self) -> usize {
        self.node_node + self.node_edge + self.edge_node + self.edge_edge
    }
}

/// Additive mask `[B, T, T]` for a batch of graphs with equal token counts.
#[derive(Debug, Clone)]
pub struct AttentionMask {
    data: Tensor,
    num_nodes: usize,
    num_edges: usize,
}

impl AttentionMask {
    /// Build the mask for a batch of graphs.
    ///
    /// `graphs[b]` holds graph b's edges as local `(start, end)` node
    /// indices in `0..num_nodes`. Every graph must have the same number of
    /// edges, and every token must be left with at least one permitted key.
    pub fn from_graphs(num_nodes: usize, graphs: &[Vec<[usize; 2]>], edge_to_edge: bool) -> Result<Self> {
        let num_edges = graphs.first().map_or(0, Vec::len);
        if num_nodes == 0 || num_edges == 0 {
            return Err(GastError::EmptyGraph { nodes: num_nodes, edges: num_edges });
        }

        let t = num_nodes + num_edges;
        let mut data = Vec::with_capacity(graphs.len() * t * t);
        for (g, edges) in graphs.iter().enumerate() {
            if edges.len() != num_edges {
                return Err(GastError::EdgeCountMismatch { graph: g, expected: num_edges, got: edges.len() });
            }
            let permitted = graph_permissions(g, num_nodes, edges, edge_to_edge)?;
            if let Some(row) = (0..t).find(|&i| !permitted[i * t..(i + 1) * t].iter().any(|&p| p)) {
                return Err(GastError::EmptyAttentionRow { row: g * t + row });
            }
            data.extend(permitted.iter().map(|&p| if p { 0.0 } else { f32::NEG_INFINITY }));
        }

        tracing::debug!(
            "attention mask: {} graphs x {} tokens ({} nodes, {} edges)",
            graphs.len(),
            t,
            num_nodes,
            num_edges
        );

        Ok(Self {
            data: Tensor::from_vec(data, &[graphs.len(), t, t])?,
            num_nodes,
            num_edges,
        })
    }

    /// Wrap a precomputed `[B, T, T]` additive mask whose first
    /// `num_nodes` tokens of every graph are nodes.
    pub fn from_tensor(data: Tensor, num_nodes: usize) -> Result<Self> {
        let dims = data.dims();
        if dims.len() != 3 || dims[1] != dims[2] {
            return Err(GastError::ShapeMismatch { expected: vec![0, 0, 0], got: dims.to_vec() });
        }
        let t = dims[1];
        if num_nodes == 0 || num_nodes >= t {
            return Err(GastError::EmptyGraph { nodes: num_nodes, edges: t.saturating_sub(num_nodes) });
        }
        if let Some(row) = data
            .as_f32_slice()
            .chunks(t)
            .position(|r| r.iter().all(|&v| v == f32::NEG_INFINITY))
        {
            return Err(GastError::EmptyAttentionRow { row });
        }
        Ok(Self { data, num_nodes, num_edges: t - num_nodes })
    }

    /// Mask for one graph repeated `batch_size` times.
    pub fn repeated(num_nodes: usize, edges: &[[usize; 2]], batch_size: usize, edge_to_edge: bool) -> Result<Self> {
        let graphs = vec![edges.to_vec(); batch_size];
        Self::from_graphs(num_nodes, &graphs, edge_to_edge)
    }

    /// The additive mask, `[B, T, T]`.
    pub fn tensor(&self) -> &Tensor {
        &self.data
    }

    pub fn batch_size(&self) -> usize {
        self.data.dims()[0]
    }

    pub fn tokens_per_graph(&self) -> usize {
        self.num_nodes + self.num_edges
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Whether token `i` of graph `graph` may attend to token `j`.
    pub fn is_permitted(&self, graph: usize, i: usize, j: usize) -> bool {
        self.data
            .get(&[graph, i, j])
            .is_some_and(|v| v == 0.0)
    }

    /// Permitted entries of one graph, split by token kind.
    pub fn counts(&self, graph: usize) -> MaskCounts {
        let t = self.tokens_per_graph();
        let n = self.num_nodes;
        let mut counts = MaskCounts::default();
        for i in 0..t {
            for j in 0..t {
                if !self.is_permitted(graph, i, j) {
                    continue;
                }
                match (i < n, j < n) {
                    (true, true) => counts.node_node += 1,
                    (true, false) => counts.node_edge += 1,
                    (false, true) => counts.edge_node += 1,
                    (false, false) => counts.edge_edge += 1,
                }
            }
        }
        counts
    }

    /// Full `[B*T, B*T]` view with every cross-graph entry at `-inf`.
    pub fn block_diagonal(&self) -> Tensor {
        let b = self.batch_size();
        let t = self.tokens_per_graph();
        let bt = b * t;
        let src = self.data.as_f32_slice();
        let mut out = vec![f32::NEG_INFINITY; bt * bt];
        for g in 0..b {
            for i in 0..t {
                let dst = (g * t + i) * bt + g * t;
                let from = (g * t + i) * t;
                out[dst..dst + t].copy_from_slice(&src[from..from + t]);
            }
        }
        Tensor::from_f32(&out, &[bt, bt])
    }
}

/// Boolean `[T, T]` permission matrix of one graph.
fn graph_permissions(graph: usize, num_nodes: usize, edges: &[[usize; 2]], edge_to_edge: bool) -> Result<Vec<bool>> {
    let t = num_nodes + edges.len();
    let mut permitted = vec![false; t * t];

    for i in 0..num_nodes {
        for j in 0..num_nodes {
            permitted[i * t + j] = i != j;
        }
    }

    for (e, &[start, end]) in edges.iter().enumerate() {
        for index in [start, end] {
            if index >= num_nodes {
                return Err(GastError::EdgeIndexOutOfRange { graph, edge: e, index, num_nodes });
            }
        }
        let edge_tok = num_nodes + e;
        for node in [start, end] {
            permitted[edge_tok * t + node] = true;
            permitted[node * t + edge_tok] = true;
        }
    }

    if edge_to_edge {
        for (a, ea) in edges.iter().enumerate() {
            for (b, eb) in edges.iter().enumerate() {
                let shares_endpoint = ea.iter().any(|n| eb.contains(n));
                if a != b && shares_endpoint {
                    permitted[(num_nodes + a) * t + num_nodes + b] = true;
                }
            }
        }
    }

    Ok(permitted)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 5 nodes, 8 edges, no self loops, no repeated pairs.
    fn sample_edges() -> Vec<[usize; 2]> {
        vec![[0, 1], [1, 2], [2, 3], [3, 4], [4, 0], [0, 2], [1, 3], [2, 4]]
    }

    #[test]
    fn test_single_graph_counts() {
        let mask = AttentionMask::from_graphs(5, &[sample_edges()], false).unwrap();
        assert_eq!(mask.tensor().dims(), &[1, 13, 13]);
        let c = mask.counts(0);
        assert_eq!(c.node_node, 20);
        assert_eq!(c.node_edge, 16);
        assert_eq!(c.edge_node, 16);
        assert_eq!(c.edge_edge, 0);
    }

    #[test]
    fn test_self_exclusion_and_symmetry() {
        let mask = AttentionMask::from_graphs(5, &[sample_edges()], false).unwrap();
        for i in 0..5 {
            assert!(!mask.is_permitted(0, i, i));
        }
        for i in 0..13 {
            for j in 0..13 {
                assert_eq!(mask.is_permitted(0, i, j), mask.is_permitted(0, j, i));
            }
        }
        // edge token 5 is (0, 1)
        assert!(mask.is_permitted(0, 5, 0));
        assert!(mask.is_permitted(0, 5, 1));
        assert!(!mask.is_permitted(0, 5, 2));
    }

    #[test]
    fn test_edge_to_edge_line_graph() {
        let edges = vec![[0, 1], [1, 2], [3, 4]];
        let mask = AttentionMask::from_graphs(5, &[edges], true).unwrap();
        // edges 0 and 1 share node 1; edge 2 is disjoint
        assert!(mask.is_permitted(0, 5, 6));
        assert!(mask.is_permitted(0, 6, 5));
        assert!(!mask.is_permitted(0, 5, 7));
        assert!(!mask.is_permitted(0, 5, 5));
        assert_eq!(mask.counts(0).edge_edge, 2);
    }

    #[test]
    fn test_batch_isolation() {
        let mask = AttentionMask::repeated(5, &sample_edges(), 4, false).unwrap();
        assert_eq!(mask.tensor().dims(), &[4, 13, 13]);
        let full = mask.block_diagonal();
        assert_eq!(full.dims(), &[52, 52]);
        for i in 0..52 {
            for j in 0..52 {
                let v = full.get(&[i, j]).unwrap();
                if i / 13 != j / 13 {
                    assert_eq!(v, f32::NEG_INFINITY);
                } else {
                    assert_eq!(v, mask.tensor().get(&[i / 13, i % 13, j % 13]).unwrap());
                }
            }
        }
        for g in 1..4 {
            assert_eq!(mask.counts(g), mask.counts(0));
        }
    }

    #[test]
    fn test_rejects_out_of_range_edge() {
        let err = AttentionMask::from_graphs(3, &[vec![[0, 3]]], false).unwrap_err();
        assert!(matches!(err, GastError::EdgeIndexOutOfRange { index: 3, .. }));
    }

    #[test]
    fn test_rejects_empty_graph() {
        assert!(matches!(
            AttentionMask::from_graphs(0, &[vec![[0, 0]]], false),
            Err(GastError::EmptyGraph { .. })
        ));
        assert!(matches!(
            AttentionMask::from_graphs(3, &[vec![]], false),
            Err(GastError::EmptyGraph { .. })
        ));
    }

    #[test]
    fn test_rejects_unequal_edge_counts() {
        let graphs = vec![vec![[0, 1], [1, 2]], vec![[0, 1]]];
        assert!(matches!(
            AttentionMask::from_graphs(3, &graphs, false),
            Err(GastError::EdgeCountMismatch { graph: 1, expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_single_node_with_self_loop() {
        // No peer nodes, but the self-loop edge keeps the row non-empty.
        let mask = AttentionMask::from_graphs(1, &[vec![[0, 0]]], false).unwrap();
        assert!(mask.is_permitted(0, 0, 1));
        assert!(mask.is_permitted(0, 1, 0));
        assert!(!mask.is_permitted(0, 0, 0));
    }

    #[test]
    fn test_from_tensor_rejects_empty_row() {
        let mut data = vec![0.0f32; 2 * 3 * 3];
        for v in &mut data[9 + 3..9 + 6] {
            *v = f32::NEG_INFINITY;
        }
        let t = Tensor::from_f32(&data, &[2, 3, 3]);
        let err = AttentionMask::from_tensor(t, 2).unwrap_err();
        assert!(matches!(err, GastError::EmptyAttentionRow { row: 4 }));
    }

    #[test]
    fn test_from_tensor_roundtrip() {
        let mask = AttentionMask::from_graphs(5, &[sample_edges()], false).unwrap();
        let again = AttentionMask::from_tensor(mask.tensor().clone(), 5).unwrap();
        assert_eq!(again.num_edges(), 8);
        assert_eq!(again.counts(0), mask.counts(0));
        assert!(AttentionMask::from_tensor(Tensor::zeros(&[1, 3, 4]), 1).is_err());
        assert!(AttentionMask::from_tensor(Tensor::zeros(&[1, 3, 3]), 3).is_err());
    }
}
