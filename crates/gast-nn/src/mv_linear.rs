//! Equivariant linear map between multivector channels.
//!
//! Mixing channels with real weights commutes with any rotor sandwich, as
//! long as the weights do not mix blades of different grades. With
//! `subspaces = true` every grade gets its own weight:
//!
//! ```text
//! y[n, o, i] = Σ_c W[o, c, grade(i)] · x[n, c, i]
//! ```
//!
//! With `subspaces = false` a single weight per channel pair scales the
//! whole multivector. The optional bias only touches the scalar blade,
//! which is rotation invariant.

use std::sync::Arc;

use gast_clifford::CliffordAlgebra;
use gast_core::{GastError, Result, Tensor};
use rand::Rng;

use crate::init;
use crate::module::{assign_parameter, check_parameters, Module};

/// Channel-mixing linear layer on `[N, C_in, D] → [N, C_out, D]`.
pub struct MVLinear {
    /// `[out, in, G]` with `G = n + 1` when subspace-aware, else `G = 1`.
    weight: Tensor,
    /// Scalar-blade bias, `[out]`.
    bias: Option<Tensor>,
    algebra: Arc<CliffordAlgebra>,
    in_features: usize,
    out_features: usize,
    subspaces: bool,
}

impl MVLinear {
    /// Create a layer with N(0, 1/in) weights and a zero bias.
    pub fn new<R: Rng + ?Sized>(
        algebra: Arc<CliffordAlgebra>,
        in_features: usize,
        out_features: usize,
        subspaces: bool,
        bias: bool,
        rng: &mut R,
    ) -> Self {
        let groups = if subspaces { algebra.num_grades() } else { 1 };
        let std = 1.0 / (in_features.max(1) as f32).sqrt();
        let weight = init::normal(&[out_features, in_features, groups], std, rng);
        let bias = bias.then(|| Tensor::zeros(&[out_features]));

        Self { weight, bias, algebra, in_features, out_features, subspaces }
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn subspaces(&self) -> bool {
        self.subspaces
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    /// Apply the map to `[N, in, D]`.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let d = self.algebra.dim;
        let dims = x.dims();
        if dims.len() != 3 || dims[1] != self.in_features || dims[2] != d {
            return Err(GastError::ShapeMismatch {
                expected: vec![0, self.in_features, d],
                got: dims.to_vec(),
            });
        }
        let n = dims[0];
        let (cin, cout) = (self.in_features, self.out_features);

        // Expand per-grade weights to per-blade: w[o, c, i].
        let groups = self.weight.dims()[2];
        let w = self.weight.as_f32_slice();
        let grades = &self.algebra.grades;
        let mut w_full = vec![0.0f32; cout * cin * d];
        for oc in 0..cout * cin {
            for i in 0..d {
                let g = if groups == 1 { 0 } else { grades[i] };
                w_full[oc * d + i] = w[oc * groups + g];
            }
        }

        let src = x.as_f32_slice();
        let mut out = vec![0.0f32; n * cout * d];
        for t in 0..n {
            let xt = &src[t * cin * d..(t + 1) * cin * d];
            let yt = &mut out[t * cout * d..(t + 1) * cout * d];
            for o in 0..cout {
                let yo = &mut yt[o * d..(o + 1) * d];
                for c in 0..cin {
                    let wo = &w_full[(o * cin + c) * d..(o * cin + c + 1) * d];
                    let xc = &xt[c * d..(c + 1) * d];
                    for ((y, &wv), &xv) in yo.iter_mut().zip(wo).zip(xc) {
                        *y += wv * xv;
                    }
                }
            }
        }

        if let Some(bias) = &self.bias {
            for (t_o, &b) in out.chunks_mut(d).zip(bias.as_f32_slice().iter().cycle()) {
                t_o[0] += b;
            }
        }

        Tensor::from_vec(out, &[n, cout, d])
    }
}

impl Module for MVLinear {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = vec![&self.weight];
        if let Some(b) = &self.bias {
            params.push(b);
        }
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = vec![("weight".to_string(), &self.weight)];
        if let Some(b) = &self.bias {
            params.push(("bias".to_string(), b));
        }
        params
    }

    fn set_parameters(&mut self, params: &[Tensor]) -> Result<usize> {
        check_parameters(&self.parameters(), params)?;
        let mut cursor = 0;
        assign_parameter(&mut self.weight, params, &mut cursor)?;
        if let Some(b) = &mut self.bias {
            assign_parameter(b, params, &mut cursor)?;
        }
        Ok(cursor)
    }
}
