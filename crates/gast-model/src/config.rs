//! Model configuration.

use std::path::Path;

use gast_core::{GastError, Result};
use serde::{Deserialize, Serialize};

/// Hyperparameters of an N-body GAST model.
///
/// Missing JSON fields fall back to [`GastConfig::nbody`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GastConfig {
    /// Positive-square basis vectors of the algebra.
    pub p: usize,
    /// Negative-square basis vectors of the algebra.
    pub q: usize,
    pub num_nodes: usize,
    /// Edges per graph, after deduplication when `unique_edges` is set.
    pub num_edges: usize,
    /// Node stack channels: charge, centered position, velocity.
    pub node_features: usize,
    pub edge_attr_dim: usize,
    /// Embedding width C.
    pub channels: usize,
    pub num_heads: usize,
    pub num_layers: usize,
    pub unique_edges: bool,
    pub edge_to_edge: bool,
    pub norm_eps: f32,
    pub seed: u64,
}

impl Default for GastConfig {
    fn default() -> Self {
        Self::nbody()
    }
}

impl GastConfig {
    /// Five charged particles, fully connected by 20 directed edges.
    pub fn nbody() -> Self {
        Self {
            p: 3,
            q: 0,
            num_nodes: 5,
            num_edges: 20,
            node_features: 3,
            edge_attr_dim: 1,
            channels: 16,
            num_heads: 4,
            num_layers: 4,
            unique_edges: false,
            edge_to_edge: false,
            norm_eps: 1e-6,
            seed: 42,
        }
    }

    /// A small config for tests.
    pub fn tiny() -> Self {
        Self {
            num_edges: 8,
            channels: 4,
            num_heads: 2,
            num_layers: 2,
            ..Self::nbody()
        }
    }

    pub fn tokens_per_graph(&self) -> usize {
        self.num_nodes + self.num_edges
    }

    /// Blades of the configured algebra.
    pub fn blade_dim(&self) -> usize {
        1 << (self.p + self.q)
    }

    /// Edge stack width: attributes, both endpoint stacks and their product.
    pub fn edge_features(&self) -> usize {
        self.edge_attr_dim + 3 * self.node_features
    }

    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("num_nodes", self.num_nodes),
            ("num_edges", self.num_edges),
            ("edge_attr_dim", self.edge_attr_dim),
            ("channels", self.channels),
            ("num_heads", self.num_heads),
            ("num_layers", self.num_layers),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(GastError::InvalidConfig(format!("{name} must be positive")));
        }
        if self.p + self.q < 3 {
            return Err(GastError::InvalidConfig(format!(
                "positions and velocities need at least 3 basis vectors, got Cl({},{})",
                self.p, self.q
            )));
        }
        if self.p + self.q > 6 {
            return Err(GastError::InvalidConfig(format!(
                "Cl({},{}) has too many blades",
                self.p, self.q
            )));
        }
        if self.node_features != 3 {
            return Err(GastError::InvalidConfig(format!(
                "node_features must be 3 (charge, position, velocity), got {}",
                self.node_features
            )));
        }
        // Readout reads channel 1.
        if self.channels < 2 {
            return Err(GastError::InvalidConfig("channels must be at least 2".into()));
        }
        if !(self.norm_eps > 0.0 && self.norm_eps.is_finite()) {
            return Err(GastError::InvalidConfig(format!("norm_eps must be positive, got {}", self.norm_eps)));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| GastError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GastError::Json(e.to_string()))
    }
}
