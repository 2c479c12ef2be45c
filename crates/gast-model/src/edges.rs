//! Edge construction: per-graph dedup and batch-global node indices.
//!
//! Graph `g`'s local node `i` is node `g * num_nodes + i` of the flattened
//! batch. In unique-edges mode `(i, j)` and `(j, i)` collapse to the first
//! occurrence; `provenance` records which input edge every kept edge came
//! from so attributes are gathered with the same index set.

use std::collections::BTreeSet;

use gast_core::{GastError, Result};

/// Edges of a batch after optional deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSet {
    /// Kept edges of every graph, local node indices.
    pub local: Vec<Vec<[usize; 2]>>,
    /// Kept edges of the whole batch, global node indices, graph-major.
    pub global: Vec<[usize; 2]>,
    /// Row of `[B * E_in, A]` edge attributes for every kept edge.
    pub provenance: Vec<usize>,
    pub num_nodes: usize,
}

impl EdgeSet {
    /// Build the edge set of a batch.
    ///
    /// Every graph must have the same number of input edges and, after
    /// deduplication, the same number of kept edges.
    pub fn build(graphs: &[Vec<[usize; 2]>], num_nodes: usize, unique: bool) -> Result<Self> {
        let edges_in = graphs.first().map_or(0, Vec::len);
        if num_nodes == 0 || edges_in == 0 {
            return Err(GastError::EmptyGraph { nodes: num_nodes, edges: edges_in });
        }

        let mut local: Vec<Vec<[usize; 2]>> = Vec::with_capacity(graphs.len());
        let mut global = Vec::new();
        let mut provenance = Vec::new();

        for (g, edges) in graphs.iter().enumerate() {
            if edges.len() != edges_in {
                return Err(GastError::EdgeCountMismatch { graph: g, expected: edges_in, got: edges.len() });
            }
            let kept = if unique { first_occurrences(edges) } else { (0..edges.len()).collect() };

            let offset = g * num_nodes;
            let mut graph_edges = Vec::with_capacity(kept.len());
            for &k in &kept {
                let [i, j] = edges[k];
                if let Some(&index) = [i, j].iter().find(|&&v| v >= num_nodes) {
                    return Err(GastError::EdgeIndexOutOfRange { graph: g, edge: k, index, num_nodes });
                }
                graph_edges.push([i, j]);
                global.push([i + offset, j + offset]);
                provenance.push(g * edges_in + k);
            }

            if let Some(first) = local.first().map(Vec::len) {
                if graph_edges.len() != first {
                    return Err(GastError::EdgeCountMismatch { graph: g, expected: first, got: graph_edges.len() });
                }
            }
            local.push(graph_edges);
        }

        tracing::debug!(
            "edge set: {} graphs, {} -> {} edges per graph (unique: {})",
            graphs.len(),
            edges_in,
            local.first().map_or(0, Vec::len),
            unique
        );

        Ok(Self { local, global, provenance, num_nodes })
    }

    pub fn batch_size(&self) -> usize {
        self.local.len()
    }

    /// Kept edges per graph.
    pub fn edges_per_graph(&self) -> usize {
        self.local.first().map_or(0, Vec::len)
    }

    pub fn start_nodes(&self) -> Vec<usize> {
        self.global.iter().map(|e| e[0]).collect()
    }

    pub fn end_nodes(&self) -> Vec<usize> {
        self.global.iter().map(|e| e[1]).collect()
    }
}

/// Indices of the first occurrence of every undirected edge, in input order.
pub fn first_occurrences(edges: &[[usize; 2]]) -> Vec<usize> {
    let mut seen = BTreeSet::new();
    edges
        .iter()
        .enumerate()
        .filter(|&(_, &[i, j])| seen.insert((i.min(j), i.max(j))))
        .map(|(k, _)| k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_stay_inside_graphs() {
        let graphs = vec![vec![[0, 1], [2, 0]], vec![[1, 2], [2, 2]]];
        let set = EdgeSet::build(&graphs, 3, false).unwrap();
        assert_eq!(set.global, vec![[0, 1], [2, 0], [4, 5], [5, 5]]);
        assert_eq!(set.provenance, vec![0, 1, 2, 3]);
        for (k, e) in set.global.iter().enumerate() {
            let g = k / set.edges_per_graph();
            assert!(e.iter().all(|&v| v / 3 == g));
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let edges = [[0, 1], [1, 0], [2, 3], [0, 1], [3, 2], [1, 2]];
        assert_eq!(first_occurrences(&edges), vec![0, 2, 5]);
    }

    #[test]
    fn test_dedup_is_deterministic() {
        let graphs = vec![
            vec![[3, 1], [1, 3], [0, 4], [4, 0], [2, 2]],
            vec![[0, 1], [2, 3], [1, 0], [3, 2], [4, 4]],
        ];
        let first = EdgeSet::build(&graphs, 5, true).unwrap();
        for _ in 0..5 {
            assert_eq!(EdgeSet::build(&graphs, 5, true).unwrap(), first);
        }
        assert_eq!(first.local[0], vec![[3, 1], [0, 4], [2, 2]]);
        assert_eq!(first.provenance, vec![0, 2, 4, 5, 6, 9]);
        assert_eq!(first.global[3..], [[5, 6], [7, 8], [9, 9]]);
    }

    #[test]
    fn test_unequal_dedup_counts_rejected() {
        let graphs = vec![vec![[0, 1], [1, 0]], vec![[0, 1], [1, 2]]];
        assert!(matches!(
            EdgeSet::build(&graphs, 3, true),
            Err(GastError::EdgeCountMismatch { graph: 1, expected: 1, got: 2 })
        ));
        assert!(EdgeSet::build(&graphs, 3, false).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let graphs = vec![vec![[0, 1]], vec![[0, 3]]];
        assert!(matches!(
            EdgeSet::build(&graphs, 3, false),
            Err(GastError::EdgeIndexOutOfRange { graph: 1, edge: 0, index: 3, num_nodes: 3 })
        ));
    }
}
