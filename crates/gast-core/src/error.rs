//! Error type shared by every GAST crate.
//!
//! The pipeline is purely numerical, so every variant describes a broken
//! caller contract (shape, index range, batch layout) detected at a component
//! boundary before it can surface as garbage inside a kernel.

/// Errors raised by tensor operations and model components.
#[derive(Debug, thiserror::Error)]
pub enum GastError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("cannot reshape {numel} elements into {shape:?}")]
    InvalidReshape { numel: usize, shape: Vec<isize> },

    #[error("axis {axis} out of range for {ndim}-D tensor")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("matmul inner dims differ: [{m}, {k1}] @ [{k2}, {n}]")]
    MatmulDimMismatch { m: usize, k1: usize, k2: usize, n: usize },

    #[error("cannot broadcast {a:?} with {b:?}")]
    BroadcastError { a: Vec<usize>, b: Vec<usize> },

    #[error("{tokens} tokens is not a multiple of {tokens_per_graph} tokens per graph")]
    IndivisibleBatch { tokens: usize, tokens_per_graph: usize },

    #[error("{tokens} tokens cannot be split evenly into {batch_size} graphs")]
    UnevenBatch { tokens: usize, batch_size: usize },

    #[error("batch size mismatch: expected {expected}, got {got}")]
    BatchSizeMismatch { expected: usize, got: usize },

    #[error("graph {graph}, edge {edge}: node index {index} out of range for {num_nodes} nodes")]
    EdgeIndexOutOfRange {
        graph: usize,
        edge: usize,
        index: usize,
        num_nodes: usize,
    },

    #[error("graphs need at least one node and one edge (got {nodes} nodes, {edges} edges)")]
    EmptyGraph { nodes: usize, edges: usize },

    #[error("graph {graph} has {got} edges, expected {expected}")]
    EdgeCountMismatch { graph: usize, expected: usize, got: usize },

    #[error("attention mask row {row} permits no target")]
    EmptyAttentionRow { row: usize },

    #[error("index {index} out of range for axis of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_contract() {
        let e = GastError::IndivisibleBatch { tokens: 26, tokens_per_graph: 25 };
        assert!(e.to_string().contains("26"));
        assert!(e.to_string().contains("25"));

        let e = GastError::UnevenBatch { tokens: 7, batch_size: 2 };
        assert_eq!(e.to_string(), "7 tokens cannot be split evenly into 2 graphs");

        let e = GastError::EdgeIndexOutOfRange { graph: 1, edge: 3, index: 7, num_nodes: 5 };
        let msg = e.to_string();
        assert!(msg.contains("graph 1"));
        assert!(msg.contains("index 7"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: GastError = io.into();
        assert!(matches!(e, GastError::Io(_)));
    }
}
