/// The three-term licchavi loss and its gradients.
///
/// - fit: how well each local model explains its contributor's comparisons
/// - generalization: weighted distance between local models and the consensus
/// - regularization: norm of the consensus model
///
/// Every model is linear over one-hot inputs, so gradients are written out
/// in closed form instead of going through an autodiff tape.
use std::f64::consts::LN_2;
use std::fmt::Debug;

use crate::config::{LicchaviConfig, Power};
use crate::constants::{FIT_SCALE_NUMERATOR, NOTATION_SCALE};
use crate::model::{
    accumulate_dist_grad, accumulate_norm_grad, model_norm, params_dist, ScoringModel,
};
use crate::types::NodeData;

/// Loss of one comparison given the (scaled) score difference
/// `t = s · (score(item1) − score(item2))` and the rating in `[-1, 1]`.
///
/// Implementations must be differentiable almost everywhere and finite for
/// every finite input.
pub trait PairwiseLoss: Debug + Send + Sync {
    fn value(&self, diff: f64, rating: f64) -> f64;
    fn derivative(&self, diff: f64, rating: f64) -> f64;
}

/// Continuous Bradley-Terry loss `ln(sinh(t)/t) + r·t`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuousBradleyTerry;

/// Below this |t| the series expansions are used.
const SMALL_DIFF: f64 = 1e-4;

impl PairwiseLoss for ContinuousBradleyTerry {
    fn value(&self, diff: f64, rating: f64) -> f64 {
        let a = diff.abs();
        let log_sinhc = if a < SMALL_DIFF {
            a * a / 6.0
        } else {
            // ln(sinh a) without overflow for large a.
            a + (-(-2.0 * a).exp()).ln_1p() - LN_2 - a.ln()
        };
        log_sinhc + rating * diff
    }

    fn derivative(&self, diff: f64, rating: f64) -> f64 {
        let d = if diff.abs() < SMALL_DIFF {
            diff / 3.0
        } else {
            1.0 / diff.tanh() - 1.0 / diff
        };
        d + rating
    }
}

/// Sum of the pairwise loss over a contributor's batch.
pub fn node_local_loss(
    loss: &dyn PairwiseLoss,
    model: &ScoringModel,
    scale: f64,
    data: &NodeData,
) -> f64 {
    let params = model.parameters();
    data.rows()
        .map(|(a, b, r)| loss.value(scale * (params[a] - params[b]), r))
        .sum()
}

/// Accumulate `factor · ∂ node_local_loss / ∂θ` into `grad`.
fn accumulate_local_grad(
    loss: &dyn PairwiseLoss,
    params: &[f64],
    scale: f64,
    data: &NodeData,
    factor: f64,
    grad: &mut [f64],
) {
    for (a, b, r) in data.rows() {
        let g = factor * scale * loss.derivative(scale * (params[a] - params[b]), r);
        grad[a] += g;
        grad[b] -= g;
    }
}

/// Per-node contribution to one step's loss.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeTerms {
    /// Scaled fit loss, 0 when the fit term was not requested.
    pub fit: f64,
    /// Scaled generalization loss.
    pub gen: f64,
}

impl std::ops::Add for NodeTerms {
    type Output = NodeTerms;

    fn add(self, other: NodeTerms) -> NodeTerms {
        NodeTerms { fit: self.fit + other.fit, gen: self.gen + other.gen }
    }
}

/// Scales and exponents of the three terms, fixed for one `train` call.
#[derive(Debug, Clone, Copy)]
pub struct LossEngine {
    fit_scale: f64,
    gen_scale: f64,
    reg_scale: f64,
    pow_gen: Power,
    pow_reg: Power,
}

impl LossEngine {
    /// `size` is the parameter count of the consensus model divided by
    /// `SIZE_NORMALIZER`, computed once when the engine is built.
    pub fn new(nb_nodes: usize, size: f64, config: &LicchaviConfig) -> Self {
        let nb = nb_nodes as f64;
        LossEngine {
            fit_scale: FIT_SCALE_NUMERATOR / nb,
            gen_scale: 1.0 / nb / size,
            reg_scale: config.w0 / size,
            pow_gen: config.pow_gen,
            pow_reg: config.pow_reg,
        }
    }

    pub fn fit_scale(&self) -> f64 {
        self.fit_scale
    }

    pub fn gen_scale(&self) -> f64 {
        self.gen_scale
    }

    pub fn reg_scale(&self) -> f64 {
        self.reg_scale
    }

    /// Compute one node's terms and backpropagate them.
    ///
    /// The node's own gradient lands in `model`; its share of the consensus
    /// gradient is added to `consensus_grad`.
    pub fn node_terms(
        &self,
        fit_loss: &dyn PairwiseLoss,
        model: &mut ScoringModel,
        data: &NodeData,
        weight: f64,
        consensus: &[f64],
        with_fit: bool,
        consensus_grad: &mut [f64],
    ) -> NodeTerms {
        let mut terms = NodeTerms::default();

        if with_fit {
            terms.fit = self.fit_scale * node_local_loss(fit_loss, model, NOTATION_SCALE, data);
        }
        terms.gen =
            self.gen_scale * weight * params_dist(model.parameters(), consensus, self.pow_gen);

        let gen_factor = self.gen_scale * weight;
        let params = model.parameters().to_vec();
        let grad = model.grad_mut();
        if with_fit {
            accumulate_local_grad(fit_loss, &params, NOTATION_SCALE, data, self.fit_scale, grad);
        }
        accumulate_dist_grad(&params, consensus, self.pow_gen, gen_factor, grad);
        accumulate_dist_grad(consensus, &params, self.pow_gen, gen_factor, consensus_grad);

        terms
    }

    /// Scaled regularization loss, without touching gradients.
    pub fn reg_value(&self, consensus: &ScoringModel) -> f64 {
        self.reg_scale * model_norm(consensus, self.pow_reg)
    }

    /// Scaled regularization loss, backpropagated into `consensus`.
    pub fn reg_term(&self, consensus: &mut ScoringModel) -> f64 {
        let value = self.reg_value(consensus);
        let params = consensus.parameters().to_vec();
        accumulate_norm_grad(&params, self.pow_reg, self.reg_scale, consensus.grad_mut());
        value
    }
}
