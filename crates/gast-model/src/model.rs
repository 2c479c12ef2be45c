//! Stacked network and the N-body model.
//!
//! Gast           = N × (EquivariantBlock → MVSiLU)
//! NBodyTransformer = NBodyGraphEmbedder → Gast → node readout

use std::sync::Arc;

use gast_attention::AttentionMask;
use gast_clifford::CliffordAlgebra;
use gast_core::{Result, Tensor};
use gast_data::NBodyBatch;
use gast_nn::init::seeded_rng;
use gast_nn::module::{check_parameters, prefixed};
use gast_nn::{mse_loss, MVSiLU, Module};
use rand::Rng;

use crate::attention::check_layout;
use crate::block::EquivariantBlock;
use crate::config::GastConfig;
use crate::embedder::{GraphEmbedding, NBodyGraphEmbedder};

/// Stack of equivariant blocks with one shared gated activation.
pub struct Gast {
    pub layers: Vec<EquivariantBlock>,
    pub activation: MVSiLU,
    algebra: Arc<CliffordAlgebra>,
    channels: usize,
}

impl Gast {
    pub fn new<R: Rng + ?Sized>(
        algebra: Arc<CliffordAlgebra>,
        channels: usize,
        num_heads: usize,
        num_layers: usize,
        norm_eps: f32,
        rng: &mut R,
    ) -> Self {
        let layers = (0..num_layers)
            .map(|_| EquivariantBlock::new(Arc::clone(&algebra), channels, num_heads, norm_eps, &mut *rng))
            .collect();
        let activation = MVSiLU::new(Arc::clone(&algebra), channels);
        Self { layers, activation, algebra, channels }
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// `x`: `[B*T, C, D]`, returns the same shape.
    pub fn forward(&self, x: &Tensor, mask: &AttentionMask, batch_size: usize) -> Result<Tensor> {
        check_layout(x, self.channels, self.algebra.dim, mask, batch_size)?;
        let mut h = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = self.activation.forward(&layer.forward(&h, mask, batch_size)?)?;
            tracing::trace!("block {}: {:?}", i, h.dims());
        }
        Ok(h)
    }
}

impl Module for Gast {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut params: Vec<&Tensor> = self.layers.iter().flat_map(|l| l.parameters()).collect();
        params.extend(self.activation.parameters());
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = Vec::new();
        for (i, layer) in self.layers.iter().enumerate() {
            params.extend(prefixed(&format!("layers.{i}"), layer.named_parameters()));
        }
        params.extend(prefixed("activation", self.activation.named_parameters()));
        params
    }

    fn set_parameters(&mut self, params: &[Tensor]) -> Result<usize> {
        check_parameters(&self.parameters(), params)?;
        let mut cursor = 0;
        for layer in &mut self.layers {
            cursor += layer.set_parameters(&params[cursor..])?;
        }
        cursor += self.activation.set_parameters(&params[cursor..])?;
        Ok(cursor)
    }
}

/// Prediction, target and MSE of one batch.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// `[B*N, D]`
    pub prediction: Tensor,
    /// `[B*N, D]`
    pub target: Tensor,
    pub loss: f32,
}

/// Embedder, stacked network and position readout.
pub struct NBodyTransformer {
    pub config: GastConfig,
    pub embedder: NBodyGraphEmbedder,
    pub gast: Gast,
    algebra: Arc<CliffordAlgebra>,
}

impl NBodyTransformer {
    /// Build a model with weights drawn from `config.seed`.
    pub fn new(config: GastConfig) -> Result<Self> {
        config.validate()?;
        let algebra = Arc::new(CliffordAlgebra::new(config.p, config.q));
        let mut rng = seeded_rng(config.seed);

        let embedder = NBodyGraphEmbedder::new(Arc::clone(&algebra), &config, &mut rng);
        let gast = Gast::new(
            Arc::clone(&algebra),
            config.channels,
            config.num_heads,
            config.num_layers,
            config.norm_eps,
            &mut rng,
        );

        let model = Self { config, embedder, gast, algebra };
        tracing::info!(
            "NBodyTransformer: Cl({},{}), {} layers, {} heads, {} channels, {} parameters",
            model.config.p,
            model.config.q,
            model.config.num_layers,
            model.config.num_heads,
            model.config.channels,
            model.num_parameters()
        );
        Ok(model)
    }

    pub fn algebra(&self) -> &Arc<CliffordAlgebra> {
        &self.algebra
    }

    /// Run the stacked network on an embedded batch, `[B*T, C, D]`.
    pub fn encode(&self, embedding: &GraphEmbedding) -> Result<Tensor> {
        let out = self.gast.forward(&embedding.tokens, &embedding.mask, embedding.batch_size)?;
        let nan = out.count_nan();
        if nan > 0 {
            tracing::warn!("encoder output has {} NaN values", nan);
        }
        Ok(out)
    }

    /// Channel 1 of every node token, `[B*N, D]`.
    pub fn readout(&self, encoded: &Tensor, embedding: &GraphEmbedding) -> Result<Tensor> {
        let (n, t) = (embedding.num_nodes(), embedding.tokens_per_graph());
        let nodes: Vec<usize> = (0..embedding.batch_size)
            .flat_map(|g| g * t..g * t + n)
            .collect();
        let d = self.algebra.dim;
        encoded
            .index_select(0, &nodes)?
            .narrow(1, 1, 1)?
            .reshape_dims(&[nodes.len(), d])
    }

    /// Predicted end positions (grade 1), `[B*N, D]`.
    pub fn forward(&self, batch: &NBodyBatch) -> Result<Tensor> {
        let embedding = self.embedder.embed_batch(batch)?;
        let encoded = self.encode(&embedding)?;
        self.readout(&encoded, &embedding)
    }

    pub fn evaluate(&self, batch: &NBodyBatch) -> Result<Evaluation> {
        let embedding = self.embedder.embed_batch(batch)?;
        let encoded = self.encode(&embedding)?;
        let prediction = self.readout(&encoded, &embedding)?;
        let loss = mse_loss(&prediction, &embedding.target)?;
        tracing::debug!("evaluate: prediction {:?}, mse {:.6}", prediction.dims(), loss);
        Ok(Evaluation { prediction, target: embedding.target, loss })
    }
}

impl Module for NBodyTransformer {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.embedder.parameters();
        params.extend(self.gast.parameters());
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = prefixed("embedder", self.embedder.named_parameters());
        params.extend(prefixed("gast", self.gast.named_parameters()));
        params
    }

    fn set_parameters(&mut self, params: &[Tensor]) -> Result<usize> {
        check_parameters(&self.parameters(), params)?;
        let mut cursor = self.embedder.set_parameters(params)?;
        cursor += self.gast.set_parameters(&params[cursor..])?;
        Ok(cursor)
    }
}
