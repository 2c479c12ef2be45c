//! End-to-end tests: mask construction, attention, the stacked network and
//! the full N-body model on small hand-built and synthetic graphs.

use std::sync::Arc;

use gast_attention::AttentionMask;
use gast_clifford::ops::rotor_from_bivector;
use gast_clifford::{CliffordAlgebra, Multivector, MultivectorTensor};
use gast_core::{GastError, Tensor};
use gast_data::{mock_batch, MockConfig, NBodyBatch};
use gast_model::{EdgeSet, Gast, GastConfig, MultivectorSelfAttention, NBodyTransformer};
use gast_nn::init::seeded_rng;

fn assert_close(a: &[f32], b: &[f32], tol: f32) {
    assert_eq!(a.len(), b.len(), "length mismatch: {} vs {}", a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert!((x - y).abs() < tol, "element {} differs: {} vs {} (tol={})", i, x, y, tol);
    }
}

fn cl30() -> Arc<CliffordAlgebra> {
    Arc::new(CliffordAlgebra::new(3, 0))
}

/// Five nodes, eight distinct undirected edges.
fn five_node_graph() -> Vec<[usize; 2]> {
    vec![[0, 1], [0, 2], [0, 3], [0, 4], [1, 2], [1, 3], [2, 4], [3, 4]]
}

fn synthetic(config: &GastConfig, batch_size: usize, seed: u64) -> NBodyBatch {
    let mock = MockConfig {
        num_nodes: config.num_nodes,
        num_edges: config.num_edges,
        edge_attr_dim: config.edge_attr_dim,
        distinct_edges: true,
        shared_topology: false,
    };
    mock_batch(&mock, batch_size, &mut seeded_rng(seed)).unwrap()
}

/// Rotate the `[..., 3]` vectors of `t` with `rotor`.
/// Apply a rotor or reflection to `[..., 3]` vectors.
fn transform_vectors(alg: &Arc<CliffordAlgebra>, versor: &Multivector, t: &Tensor) -> Tensor {
    let last = t.ndim() - 1;
    MultivectorTensor::embed(alg.clone(), t, &[1, 2, 3])
        .and_then(|m| m.apply_versor(versor))
        .and_then(|m| m.into_tensor().narrow(last, 1, 3))
        .unwrap()
}

// ============================================================================
// Single graph: 5 nodes, 8 edges, 1 channel, 1 head
// ============================================================================

#[test]
fn test_single_graph_mask_and_forward() {
    let mask = AttentionMask::repeated(5, &five_node_graph(), 1, false).unwrap();
    assert_eq!(mask.tensor().dims(), &[1, 13, 13]);

    let counts = mask.counts(0);
    assert_eq!(counts.node_node, 5 * 5 - 5);
    assert_eq!(counts.node_edge, 2 * 8);
    assert_eq!(counts.edge_node, 2 * 8);
    assert_eq!(counts.edge_edge, 0);

    let mut rng = seeded_rng(11);
    let attn = MultivectorSelfAttention::new(cl30(), 1, 1, 1e-6, &mut rng);
    let x = Tensor::randn(&[13, 1, 8], &mut rng);
    let y = attn.forward(&x, &mask, 1).unwrap();
    assert_eq!(y.dims(), &[13, 1, 8]);
    assert_eq!(y.count_nan(), 0);
}

#[test]
fn test_mask_symmetry_and_self_exclusion() {
    for seed in 0..5 {
        let config = MockConfig { num_edges: 7, distinct_edges: false, shared_topology: false, ..MockConfig::default() };
        let batch = mock_batch(&config, 3, &mut seeded_rng(seed)).unwrap();
        for e2e in [false, true] {
            let mask = AttentionMask::from_graphs(5, &batch.edges, e2e).unwrap();
            let t = mask.tokens_per_graph();
            for g in 0..3 {
                for i in 0..t {
                    for j in 0..t {
                        assert_eq!(mask.is_permitted(g, i, j), mask.is_permitted(g, j, i));
                    }
                }
                for i in 0..5 {
                    assert!(!mask.is_permitted(g, i, i));
                }
            }
        }
    }
}

// ============================================================================
// Batch of four identical graphs
// ============================================================================

#[test]
fn test_batch_of_identical_graphs() {
    let single = AttentionMask::repeated(5, &five_node_graph(), 1, false).unwrap();
    let batch = AttentionMask::repeated(5, &five_node_graph(), 4, false).unwrap();
    assert_eq!(batch.tensor().dims(), &[4, 13, 13]);

    for g in 0..4 {
        let slice = batch.tensor().narrow(0, g, 1).unwrap();
        assert_eq!(slice.as_f32_slice(), single.tensor().as_f32_slice());
    }

    let full = batch.block_diagonal();
    assert_eq!(full.dims(), &[52, 52]);
    for i in 0..52 {
        for j in 0..52 {
            if i / 13 != j / 13 {
                assert_eq!(full.get(&[i, j]), Some(f32::NEG_INFINITY));
            }
        }
    }

    // Identical inputs per graph give identical outputs per graph.
    let mut rng = seeded_rng(12);
    let attn = MultivectorSelfAttention::new(cl30(), 2, 2, 1e-6, &mut rng);
    let one = Tensor::randn(&[13, 2, 8], &mut rng);
    let x = Tensor::cat(&[&one, &one, &one, &one], 0).unwrap();
    let y = attn.forward(&x, &batch, 4).unwrap();
    let y0 = attn.forward(&one, &single, 1).unwrap();
    for g in 0..4 {
        let yg = y.narrow(0, g * 13, 13).unwrap();
        assert_close(yg.as_f32_slice(), y0.as_f32_slice(), 1e-5);
    }
}

// ============================================================================
// Shapes and batch layout
// ============================================================================

#[test]
fn test_stack_shape_invariance() {
    let mut rng = seeded_rng(13);
    let gast = Gast::new(cl30(), 3, 2, 4, 1e-6, &mut rng);
    let mask = AttentionMask::repeated(5, &five_node_graph(), 2, true).unwrap();
    let x = Tensor::randn(&[26, 3, 8], &mut rng);
    let y = gast.forward(&x, &mask, 2).unwrap();
    assert_eq!(y.dims(), x.dims());
    assert!(y.all_finite());
}

#[test]
fn test_batch_size_is_validated() {
    let mut rng = seeded_rng(14);
    let gast = Gast::new(cl30(), 2, 1, 1, 1e-6, &mut rng);
    let mask = AttentionMask::repeated(5, &five_node_graph(), 2, false).unwrap();

    let x = Tensor::zeros(&[27, 2, 8]);
    assert!(matches!(gast.forward(&x, &mask, 2), Err(GastError::IndivisibleBatch { .. })));

    let x = Tensor::zeros(&[26, 2, 8]);
    assert!(matches!(gast.forward(&x, &mask, 1), Err(GastError::BatchSizeMismatch { .. })));
}

// ============================================================================
// Unique-edges mode
// ============================================================================

#[test]
fn test_unique_edges_end_to_end() {
    let config = GastConfig { unique_edges: true, num_edges: 3, ..GastConfig::tiny() };
    let model = NBodyTransformer::new(config).unwrap();

    let mut batch = synthetic(&GastConfig { num_edges: 5, ..GastConfig::tiny() }, 2, 15);
    batch.edges = vec![
        vec![[0, 1], [1, 0], [2, 3], [3, 2], [4, 0]],
        vec![[1, 2], [3, 4], [2, 1], [0, 4], [4, 3]],
    ];

    let a = model.embedder.embed_batch(&batch).unwrap();
    let b = model.embedder.embed_batch(&batch).unwrap();
    assert_eq!(a.edges, b.edges);
    assert_eq!(a.tokens.as_f32_slice(), b.tokens.as_f32_slice());
    assert_eq!(a.edges.local[0], vec![[0, 1], [2, 3], [4, 0]]);
    assert_eq!(a.edges.provenance, vec![0, 2, 4, 5, 6, 8]);
    assert_eq!(a.tokens.dims(), &[16, 4, 8]);
    assert_eq!(a.mask.tensor().dims(), &[2, 8, 8]);

    let eval = model.evaluate(&batch).unwrap();
    assert_eq!(eval.prediction.dims(), &[10, 8]);

    // Duplicate directions collapse, so an unequal count is an error.
    batch.edges[1] = vec![[1, 2], [2, 1], [1, 2], [0, 4], [4, 0]];
    assert!(matches!(
        model.embedder.embed_batch(&batch),
        Err(GastError::EdgeCountMismatch { graph: 1, .. })
    ));
    assert!(EdgeSet::build(&batch.edges, 5, false).is_ok());
}

// ============================================================================
// Equivariance
// ============================================================================

#[test]
fn test_model_is_rotation_equivariant() {
    let config = GastConfig::tiny();
    let model = NBodyTransformer::new(config.clone()).unwrap();
    let alg = model.algebra().clone();
    let batch = synthetic(&config, 2, 16);

    let bivector = Multivector::bivector(&alg, &[0.3, -0.8, 0.5]);
    let rotor = rotor_from_bivector(&alg, &bivector, 1.1).unwrap();

    let mut rotated = batch.clone();
    rotated.loc = transform_vectors(&alg, &rotor, &batch.loc);
    rotated.vel = transform_vectors(&alg, &rotor, &batch.vel);
    rotated.loc_end = transform_vectors(&alg, &rotor, &batch.loc_end);

    let pred = model.forward(&batch).unwrap();
    let pred_rot = model.forward(&rotated).unwrap();
    let expected = MultivectorTensor::new(alg.clone(), pred)
        .and_then(|m| m.apply_rotor(&rotor))
        .unwrap()
        .into_tensor();
    assert_close(pred_rot.as_f32_slice(), expected.as_f32_slice(), 1e-3);

    // Invariant loss: the target rotates with the inputs.
    let loss = model.evaluate(&batch).unwrap().loss;
    let loss_rot = model.evaluate(&rotated).unwrap().loss;
    assert!((loss - loss_rot).abs() < 1e-3 * loss.max(1.0));
}

#[test]
fn test_attention_is_rotation_equivariant() {
    let alg = cl30();
    let mut rng = seeded_rng(17);
    let attn = MultivectorSelfAttention::new(alg.clone(), 2, 3, 1e-6, &mut rng);
    let mask = AttentionMask::repeated(5, &five_node_graph(), 2, true).unwrap();
    let x = Tensor::randn(&[26, 2, 8], &mut rng);

    let rotor = rotor_from_bivector(&alg, &Multivector::bivector(&alg, &[1.0, 0.2, -0.4]), 2.3).unwrap();
    let rotate = |t: &Tensor| {
        MultivectorTensor::new(alg.clone(), t.clone())
            .and_then(|m| m.apply_rotor(&rotor))
            .unwrap()
            .into_tensor()
    };

    let a = attn.forward(&rotate(&x), &mask, 2).unwrap();
    let b = rotate(&attn.forward(&x, &mask, 2).unwrap());
    assert_close(a.as_f32_slice(), b.as_f32_slice(), 1e-3);
}

#[test]
fn test_model_is_reflection_equivariant() {
    let config = GastConfig::tiny();
    let model = NBodyTransformer::new(config.clone()).unwrap();
    let alg = model.algebra().clone();
    let batch = synthetic(&config, 2, 18);
    let normal = Multivector::vector(&alg, &[0.3, -0.7, 0.65]);

    let mut mirrored = batch.clone();
    mirrored.loc = transform_vectors(&alg, &normal, &batch.loc);
    mirrored.vel = transform_vectors(&alg, &normal, &batch.vel);
    mirrored.loc_end = transform_vectors(&alg, &normal, &batch.loc_end);

    let pred = model.forward(&batch).unwrap();
    let pred_mirrored = model.forward(&mirrored).unwrap();
    let expected = MultivectorTensor::new(alg.clone(), pred)
        .and_then(|m| m.apply_versor(&normal))
        .unwrap()
        .into_tensor();
    assert_close(pred_mirrored.as_f32_slice(), expected.as_f32_slice(), 1e-3);

    let loss = model.evaluate(&batch).unwrap().loss;
    let loss_mirrored = model.evaluate(&mirrored).unwrap().loss;
    assert!((loss - loss_mirrored).abs() < 1e-3 * loss.max(1.0));
}

#[test]
fn test_attention_and_stack_are_reflection_equivariant() {
    let alg = cl30();
    let mut rng = seeded_rng(19);
    let attn = MultivectorSelfAttention::new(alg.clone(), 2, 2, 1e-6, &mut rng);
    let gast = Gast::new(alg.clone(), 2, 2, 2, 1e-6, &mut rng);
    let mask = AttentionMask::repeated(5, &five_node_graph(), 2, false).unwrap();
    let x = Tensor::randn(&[26, 2, 8], &mut rng);

    let normal = Multivector::vector(&alg, &[0.3, -0.7, 0.65]);
    let reflect = |t: &Tensor| {
        MultivectorTensor::new(alg.clone(), t.clone())
            .and_then(|m| m.apply_versor(&normal))
            .unwrap()
            .into_tensor()
    };

    let a = attn.forward(&reflect(&x), &mask, 2).unwrap();
    let b = reflect(&attn.forward(&x, &mask, 2).unwrap());
    assert_close(a.as_f32_slice(), b.as_f32_slice(), 1e-3);

    let a = gast.forward(&reflect(&x), &mask, 2).unwrap();
    let b = reflect(&gast.forward(&x, &mask, 2).unwrap());
    assert_close(a.as_f32_slice(), b.as_f32_slice(), 1e-3);
}
