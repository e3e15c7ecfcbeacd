/// Per-epoch training diagnostics.
use crate::config::Power;
use crate::constants::{DIAGNOSTIC_DECIMALS, LOSS_DECIMALS};
use crate::model::{extract_grad, model_norm, params_dist, round_loss, scalar_product, ScoringModel};

/// Eight parallel sequences, one entry per completed epoch.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct History {
    pub fit: Vec<f64>,
    pub gen: Vec<f64>,
    pub reg: Vec<f64>,
    /// Reserved for a test-accuracy measure; always `None` for now.
    pub accuracy: Vec<Option<f64>>,
    /// Euclidean distance of the consensus model from its initial state.
    pub drift: Vec<f64>,
    /// Euclidean norm of the consensus model.
    pub norm: Vec<f64>,
    /// Scalar product of the consensus gradient with the previous epoch's.
    pub grad_alignment: Vec<f64>,
    /// Squared norm of the consensus gradient.
    pub grad_norm: Vec<f64>,
}

impl History {
    /// Lengths of the eight sequences, in declaration order.
    pub fn lengths(&self) -> [usize; 8] {
        [
            self.fit.len(),
            self.gen.len(),
            self.reg.len(),
            self.accuracy.len(),
            self.drift.len(),
            self.norm.len(),
            self.grad_alignment.len(),
            self.grad_norm.len(),
        ]
    }

    /// Completed epochs.
    pub fn len(&self) -> usize {
        self.fit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fit.is_empty()
    }
}

/// Owns the history and the snapshots it is computed from: the initial
/// consensus parameters and the consensus gradient of the previous epoch.
#[derive(Debug, Clone)]
pub struct HistoryTracker {
    history: History,
    initial: Vec<f64>,
    last_grad: Option<Vec<f64>>,
}

impl HistoryTracker {
    pub fn new(consensus: &ScoringModel) -> Self {
        HistoryTracker {
            history: History::default(),
            initial: consensus.parameters().to_vec(),
            last_grad: None,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Initial consensus parameters.
    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    /// Forget the previous gradient so the first epoch of the next run
    /// records an alignment of 0.
    pub fn start_run(&mut self) {
        self.last_grad = None;
    }

    /// Append one epoch of diagnostics.
    pub fn update(&mut self, fit: f64, gen: f64, reg: f64, consensus: &ScoringModel) {
        let h = &mut self.history;
        h.fit.push(round_loss(fit, LOSS_DECIMALS));
        h.gen.push(round_loss(gen, LOSS_DECIMALS));
        h.reg.push(round_loss(reg, LOSS_DECIMALS));
        h.accuracy.push(None);

        let drift = params_dist(&self.initial, consensus.parameters(), Power::EUCLIDEAN);
        let norm = model_norm(consensus, Power::EUCLIDEAN);
        h.drift.push(round_loss(drift, DIAGNOSTIC_DECIMALS));
        h.norm.push(round_loss(norm, DIAGNOSTIC_DECIMALS));

        let grad = extract_grad(consensus);
        let alignment = match &self.last_grad {
            Some(last) => scalar_product(last, &grad),
            None => 0.0,
        };
        h.grad_alignment.push(alignment);
        h.grad_norm.push(scalar_product(&grad, &grad));
        self.last_grad = Some(grad);
    }
}
