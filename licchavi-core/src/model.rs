/// Linear scorer over one-hot item vectors and the numeric utilities that
/// operate on its parameters.
///
/// A model holds one parameter per item index and a gradient buffer of the
/// same length. Parameters only change through `Adam::step`.
use rand::Rng;

use crate::config::Power;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringModel {
    params: Vec<f64>,
    grad: Vec<f64>,
}

impl ScoringModel {
    /// Fresh model, parameters uniform in `[-1/sqrt(n), 1/sqrt(n)]`.
    pub fn new(nb_items: usize, rng: &mut impl Rng) -> Self {
        let bound = if nb_items == 0 { 0.0 } else { 1.0 / (nb_items as f64).sqrt() };
        let params = (0..nb_items)
            .map(|_| (rng.random::<f64>() * 2.0 - 1.0) * bound)
            .collect();
        ScoringModel {
            params,
            grad: vec![0.0; nb_items],
        }
    }

    pub fn from_parameters(params: Vec<f64>) -> Self {
        let grad = vec![0.0; params.len()];
        ScoringModel { params, grad }
    }

    /// Dot product between a (dense) one-hot vector and the parameters.
    pub fn score(&self, encoding: &[f64]) -> f64 {
        assert_eq!(
            encoding.len(),
            self.params.len(),
            "encoding has {} entries, model has {} parameters",
            encoding.len(),
            self.params.len()
        );
        encoding.iter().zip(self.params.iter()).map(|(x, p)| x * p).sum()
    }

    /// Score of the one-hot vector whose hot position is `idx`.
    pub fn score_index(&self, idx: usize) -> f64 {
        self.params[idx]
    }

    pub fn parameters(&self) -> &[f64] {
        &self.params
    }

    pub fn grad(&self) -> &[f64] {
        &self.grad
    }

    pub(crate) fn grad_mut(&mut self) -> &mut [f64] {
        &mut self.grad
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [f64], &[f64]) {
        (&mut self.params, &self.grad)
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Total number of scalar parameters of a model.
pub fn nb_params(model: &ScoringModel) -> usize {
    model.len()
}

/// Snapshot of a model's current gradient.
pub fn extract_grad(model: &ScoringModel) -> Vec<f64> {
    model.grad.clone()
}

/// Scalar product of two gradient snapshots.
pub fn scalar_product(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "gradient snapshots have different lengths");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Round for display and history.
pub fn round_loss(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `(Σ |x_i|^inner)^outer`.
pub fn generalized_norm(values: impl Iterator<Item = f64>, power: Power) -> f64 {
    let sum: f64 = values.map(|x| x.abs().powf(power.inner)).sum();
    sum.powf(power.outer)
}

pub fn model_norm(model: &ScoringModel, power: Power) -> f64 {
    generalized_norm(model.params.iter().copied(), power)
}

/// Distance between two models over the same item space.
pub fn models_dist(a: &ScoringModel, b: &ScoringModel, power: Power) -> f64 {
    params_dist(&a.params, &b.params, power)
}

pub fn params_dist(a: &[f64], b: &[f64], power: Power) -> f64 {
    assert_eq!(a.len(), b.len(), "models have different dimensions");
    generalized_norm(a.iter().zip(b.iter()).map(|(x, y)| x - y), power)
}

/// Accumulate `factor · ∂/∂x (Σ |x_i|^inner)^outer` into `out`.
///
/// Points where the derivative does not exist get the subgradient 0.
pub fn accumulate_norm_grad(values: &[f64], power: Power, factor: f64, out: &mut [f64]) {
    accumulate_grad_of(values.iter().copied(), power, factor, out);
}

/// Accumulate `factor · ∂/∂a dist(a, b)` into `out`. The gradient with
/// respect to `b` is its negation.
pub fn accumulate_dist_grad(a: &[f64], b: &[f64], power: Power, factor: f64, out: &mut [f64]) {
    accumulate_grad_of(a.iter().zip(b.iter()).map(|(x, y)| x - y), power, factor, out);
}

fn accumulate_grad_of(
    diffs: impl Iterator<Item = f64> + Clone,
    power: Power,
    factor: f64,
    out: &mut [f64],
) {
    let Power { inner, outer } = power;
    if factor == 0.0 || inner == 0.0 || outer == 0.0 {
        return;
    }
    let sum: f64 = diffs.clone().map(|x| x.abs().powf(inner)).sum();
    if sum == 0.0 && outer < 1.0 {
        return;
    }
    let outer_term = if outer == 1.0 { 1.0 } else { outer * sum.powf(outer - 1.0) };
    let scale = factor * outer_term * inner;

    for (slot, x) in out.iter_mut().zip(diffs) {
        if x == 0.0 {
            continue;
        }
        let inner_term = if inner == 1.0 { 1.0 } else { x.abs().powf(inner - 1.0) };
        *slot += scale * inner_term * x.signum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn numeric_grad(f: impl Fn(&[f64]) -> f64, x: &[f64]) -> Vec<f64> {
        let eps = 1e-6;
        (0..x.len())
            .map(|i| {
                let mut plus = x.to_vec();
                let mut minus = x.to_vec();
                plus[i] += eps;
                minus[i] -= eps;
                (f(&plus) - f(&minus)) / (2.0 * eps)
            })
            .collect()
    }

    #[test]
    fn test_score_is_dot_product() {
        let model = ScoringModel::from_parameters(vec![0.5, -1.0, 2.0]);
        assert_relative_eq!(model.score(&[0.0, 1.0, 0.0]), -1.0);
        assert_relative_eq!(model.score(&[1.0, 0.0, 1.0]), 2.5);
        assert_relative_eq!(model.score_index(2), 2.0);
    }

    #[test]
    fn test_initialization_is_bounded_and_independent() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = ScoringModel::new(16, &mut rng);
        let b = ScoringModel::new(16, &mut rng);
        assert!(a.parameters().iter().all(|p| p.abs() <= 0.25));
        assert_ne!(a.parameters(), b.parameters());
        assert!(a.grad().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut model = ScoringModel::from_parameters(vec![1.0, 2.0]);
        let snapshot = model.clone();
        model.parts_mut().0[0] = 5.0;
        assert_eq!(snapshot.parameters(), &[1.0, 2.0]);
    }

    #[test]
    fn test_norm_and_distance() {
        let a = ScoringModel::from_parameters(vec![3.0, -4.0]);
        let b = ScoringModel::from_parameters(vec![0.0, 0.0]);
        assert_relative_eq!(model_norm(&a, Power::EUCLIDEAN), 5.0);
        assert_relative_eq!(model_norm(&a, Power::new(1.0, 1.0)), 7.0);
        assert_relative_eq!(model_norm(&a, Power::new(2.0, 1.0)), 25.0);
        assert_relative_eq!(models_dist(&a, &b, Power::EUCLIDEAN), 5.0);
        assert_eq!(models_dist(&a, &a, Power::new(1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_norm_grad_matches_finite_differences() {
        let x = vec![0.7, -1.3, 0.2];
        for power in [Power::new(2.0, 1.0), Power::new(2.0, 0.5), Power::new(1.5, 2.0)] {
            let mut grad = vec![0.0; 3];
            accumulate_norm_grad(&x, power, 1.0, &mut grad);
            let expected = numeric_grad(|v| generalized_norm(v.iter().copied(), power), &x);
            for (g, e) in grad.iter().zip(expected.iter()) {
                assert_relative_eq!(g, e, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_dist_grad_is_sign_for_l1() {
        let a = vec![1.0, 0.0, -2.0];
        let b = vec![0.0, 0.0, 1.0];
        let mut grad = vec![0.0; 3];
        accumulate_dist_grad(&a, &b, Power::new(1.0, 1.0), 2.0, &mut grad);
        assert_eq!(grad, vec![2.0, 0.0, -2.0]);
    }

    #[test]
    fn test_grad_at_zero_is_zero() {
        let mut grad = vec![0.0; 2];
        accumulate_norm_grad(&[0.0, 0.0], Power::EUCLIDEAN, 1.0, &mut grad);
        assert_eq!(grad, vec![0.0, 0.0]);
    }

    #[test]
    fn test_scalar_product_and_rounding() {
        assert_relative_eq!(scalar_product(&[1.0, 2.0], &[3.0, -1.0]), 1.0);
        assert_eq!(round_loss(1.23456, 2), 1.23);
        assert_eq!(round_loss(7.96, 1), 8.0);
        assert_eq!(round_loss(2.5, 0), 3.0);
    }
}
