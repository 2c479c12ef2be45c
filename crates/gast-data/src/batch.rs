//! N-body graph samples and batches.
//!
//! A sample is one particle system: per-node position, velocity and charge,
//! per-edge scalar attributes, the edge list, and the target positions
//! `loc_end` after the simulated interval. A batch stacks samples with equal
//! node and edge counts into dense tensors.

use gast_core::{GastError, Result, Tensor};

/// One graph instance.
#[derive(Debug, Clone, PartialEq)]
pub struct NBodySample {
    pub loc: Vec<[f32; 3]>,
    pub vel: Vec<[f32; 3]>,
    pub charges: Vec<f32>,
    /// Row-major `[num_edges, edge_attr_dim]`.
    pub edge_attr: Vec<f32>,
    pub edge_attr_dim: usize,
    pub loc_end: Vec<[f32; 3]>,
    /// Local `(start, end)` node indices.
    pub edges: Vec<[usize; 2]>,
}

impl NBodySample {
    pub fn num_nodes(&self) -> usize {
        self.loc.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Check per-node and per-edge lengths and edge index ranges.
    pub fn validate(&self) -> Result<()> {
        let n = self.num_nodes();
        let e = self.num_edges();
        if n == 0 || e == 0 {
            return Err(GastError::EmptyGraph { nodes: n, edges: e });
        }
        for (name, len) in [("vel", self.vel.len()), ("charges", self.charges.len()), ("loc_end", self.loc_end.len())] {
            if len != n {
                tracing::debug!("sample field {} has {} rows, expected {}", name, len, n);
                return Err(GastError::ShapeMismatch { expected: vec![n], got: vec![len] });
            }
        }
        if self.edge_attr.len() != e * self.edge_attr_dim {
            return Err(GastError::ShapeMismatch {
                expected: vec![e, self.edge_attr_dim],
                got: vec![self.edge_attr.len()],
            });
        }
        check_edges(0, &self.edges, n)
    }
}

fn check_edges(graph: usize, edges: &[[usize; 2]], num_nodes: usize) -> Result<()> {
    for (edge, pair) in edges.iter().enumerate() {
        if let Some(&index) = pair.iter().find(|&&i| i >= num_nodes) {
            return Err(GastError::EdgeIndexOutOfRange { graph, edge, index, num_nodes });
        }
    }
    Ok(())
}

/// A batch of graphs with identical node and edge counts.
///
/// Tensor shapes: `loc`, `vel`, `loc_end` are `[B, N, 3]`; `charges` is
/// `[B, N, 1]`; `edge_attr` is `[B, E, A]`. `edges[b]` holds graph b's
/// local edge list.
#[derive(Debug, Clone)]
pub struct NBodyBatch {
    pub loc: Tensor,
    pub vel: Tensor,
    pub charges: Tensor,
    pub edge_attr: Tensor,
    pub loc_end: Tensor,
    pub edges: Vec<Vec<[usize; 2]>>,
}

impl NBodyBatch {
    /// Assemble a batch from tensors, validating every shape.
    pub fn from_tensors(
        loc: Tensor,
        vel: Tensor,
        charges: Tensor,
        edge_attr: Tensor,
        loc_end: Tensor,
        edges: Vec<Vec<[usize; 2]>>,
    ) -> Result<Self> {
        let batch = Self { loc, vel, charges, edge_attr, loc_end, edges };
        batch.validate()?;
        Ok(batch)
    }

    /// Stack samples into a batch.
    pub fn collate(samples: &[NBodySample]) -> Result<Self> {
        let first = samples.first().ok_or(GastError::EmptyGraph { nodes: 0, edges: 0 })?;
        let (n, e, a) = (first.num_nodes(), first.num_edges(), first.edge_attr_dim);
        let b = samples.len();

        let mut loc = Vec::with_capacity(b * n * 3);
        let mut vel = Vec::with_capacity(b * n * 3);
        let mut loc_end = Vec::with_capacity(b * n * 3);
        let mut charges = Vec::with_capacity(b * n);
        let mut edge_attr = Vec::with_capacity(b * e * a);
        let mut edges = Vec::with_capacity(b);

        for (g, s) in samples.iter().enumerate() {
            s.validate()?;
            if s.num_nodes() != n || s.edge_attr_dim != a {
                return Err(GastError::ShapeMismatch {
                    expected: vec![n, a],
                    got: vec![s.num_nodes(), s.edge_attr_dim],
                });
            }
            if s.num_edges() != e {
                return Err(GastError::EdgeCountMismatch { graph: g, expected: e, got: s.num_edges() });
            }
            loc.extend(s.loc.iter().flatten());
            vel.extend(s.vel.iter().flatten());
            loc_end.extend(s.loc_end.iter().flatten());
            charges.extend_from_slice(&s.charges);
            edge_attr.extend_from_slice(&s.edge_attr);
            edges.push(s.edges.clone());
        }

        Self::from_tensors(
            Tensor::from_vec(loc, &[b, n, 3])?,
            Tensor::from_vec(vel, &[b, n, 3])?,
            Tensor::from_vec(charges, &[b, n, 1])?,
            Tensor::from_vec(edge_attr, &[b, e, a])?,
            Tensor::from_vec(loc_end, &[b, n, 3])?,
            edges,
        )
    }

    pub fn batch_size(&self) -> usize {
        self.loc.dims().first().copied().unwrap_or(0)
    }

    pub fn num_nodes(&self) -> usize {
        self.loc.dims().get(1).copied().unwrap_or(0)
    }

    /// Edges per graph before any deduplication.
    pub fn num_edges(&self) -> usize {
        self.edge_attr.dims().get(1).copied().unwrap_or(0)
    }

    pub fn edge_attr_dim(&self) -> usize {
        self.edge_attr.dims().get(2).copied().unwrap_or(0)
    }

    /// Check tensor shapes against each other and every edge index range.
    pub fn validate(&self) -> Result<()> {
        let loc = self.loc.dims();
        if loc.len() != 3 || loc[2] != 3 {
            return Err(GastError::ShapeMismatch { expected: vec![0, 0, 3], got: loc.to_vec() });
        }
        let (b, n) = (loc[0], loc[1]);
        for t in [&self.vel, &self.loc_end] {
            if t.dims() != loc {
                return Err(GastError::ShapeMismatch { expected: loc.to_vec(), got: t.dims().to_vec() });
            }
        }
        if self.charges.dims() != [b, n, 1] {
            return Err(GastError::ShapeMismatch {
                expected: vec![b, n, 1],
                got: self.charges.dims().to_vec(),
            });
        }

        let attr = self.edge_attr.dims();
        if attr.len() != 3 || attr[0] != b {
            return Err(GastError::ShapeMismatch { expected: vec![b, 0, 0], got: attr.to_vec() });
        }
        let e = attr[1];
        if n == 0 || e == 0 {
            return Err(GastError::EmptyGraph { nodes: n, edges: e });
        }
        if self.edges.len() != b {
            return Err(GastError::BatchSizeMismatch { expected: b, got: self.edges.len() });
        }
        for (g, edges) in self.edges.iter().enumerate() {
            if edges.len() != e {
                return Err(GastError::EdgeCountMismatch { graph: g, expected: e, got: edges.len() });
            }
            check_edges(g, edges, n)?;
        }
        Ok(())
    }
}
