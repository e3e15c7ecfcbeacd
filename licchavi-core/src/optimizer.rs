/// Adam optimizer with bias correction, bound to one model's dimension.
///
/// The optimizer reads the gradient buffer of the model it steps, so a
/// step after `zero_grad` without any backward pass leaves the parameters
/// where they are only up to the momentum already accumulated.
use crate::model::ScoringModel;

#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: u32,
}

impl Adam {
    pub fn new(dim: usize, lr: f64) -> Self {
        Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            m: vec![0.0; dim],
            v: vec![0.0; dim],
            t: 0,
        }
    }

    pub fn step(&mut self, model: &mut ScoringModel) {
        let (params, grad) = model.parts_mut();
        assert_eq!(params.len(), self.m.len(), "optimizer bound to a model of another size");

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for i in 0..params.len() {
            let g = grad[i];
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;

            let m_hat = self.m[i] / bias_correction1;
            let v_hat = self.v[i] / bias_correction2;
            params[i] -= self.lr * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    pub fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }

    /// Number of parameters this optimizer keeps moments for.
    pub fn dim(&self) -> usize {
        self.m.len()
    }

    /// Steps taken so far.
    pub fn steps(&self) -> u32 {
        self.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut model = ScoringModel::from_parameters(vec![1.0, -1.0, 0.0]);
        model.grad_mut().copy_from_slice(&[2.0, -0.5, 0.0]);
        let mut opt = Adam::new(3, 0.1);
        opt.step(&mut model);
        // Bias-corrected first step is lr * sign(g).
        assert_relative_eq!(model.parameters()[0], 0.9, epsilon = 1e-6);
        assert_relative_eq!(model.parameters()[1], -0.9, epsilon = 1e-6);
        assert_eq!(model.parameters()[2], 0.0);
        assert_eq!(opt.steps(), 1);
    }

    #[test]
    fn test_minimizes_quadratic() {
        let mut model = ScoringModel::from_parameters(vec![3.0]);
        let mut opt = Adam::new(1, 0.1);
        for _ in 0..500 {
            model.zero_grad();
            let x = model.parameters()[0];
            model.grad_mut()[0] = 2.0 * (x - 1.0);
            opt.step(&mut model);
        }
        assert_relative_eq!(model.parameters()[0], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_learning_rate_is_mutable() {
        let mut opt = Adam::new(2, 0.2);
        opt.set_learning_rate(0.05);
        assert_eq!(opt.learning_rate(), 0.05);
        assert_eq!(opt.dim(), 2);
    }
}
