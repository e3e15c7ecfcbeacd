/// Licchavi training engine.
///
/// Owns the item dictionary, the contributor population, the consensus model
/// with its optimizer, and the history tracker. Pure computation: the caller
/// prepares node batches, trains, then reads scores back.
use std::ops::Range;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::check::{self, ConsistencyReport};
use crate::config::{Device, LicchaviConfig};
use crate::constants::{DEFAULT_EPOCHS, LOSS_DECIMALS, SIZE_NORMALIZER};
use crate::error::{ConsistencyError, PopulationError, TrainingError};
use crate::history::{History, HistoryTracker};
use crate::loss::{ContinuousBradleyTerry, LossEngine, NodeTerms, PairwiseLoss};
use crate::model::{nb_params, round_loss, ScoringModel};
use crate::optimizer::Adam;
use crate::population::{NodePopulation, Removal};
use crate::schedule::{Phase, StepCounts, StepSchedule};
use crate::types::{Category, ContributorId, GlobalScores, ItemDictionary, NodeData, Scores};

pub struct Licchavi {
    dictionary: ItemDictionary,
    population: NodePopulation,
    consensus: ScoringModel,
    consensus_optimizer: Adam,
    tracker: HistoryTracker,
    /// Parameter count / `SIZE_NORMALIZER`, fixed at construction.
    size: f64,
    default_weight: f64,
    lr_node: f64,
    fit_loss: Box<dyn PairwiseLoss>,
    rng: StdRng,
    steps: StepCounts,
}

impl Licchavi {
    pub fn new(dictionary: ItemDictionary, config: &LicchaviConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let nb_items = dictionary.len();
        let consensus = ScoringModel::new(nb_items, &mut rng);
        let size = nb_params(&consensus) as f64 / SIZE_NORMALIZER;

        Licchavi {
            population: NodePopulation::new(nb_items),
            consensus_optimizer: Adam::new(nb_items, config.lr_gen),
            tracker: HistoryTracker::new(&consensus),
            consensus,
            dictionary,
            size,
            default_weight: config.w,
            lr_node: config.lr_node,
            fit_loss: Box::new(ContinuousBradleyTerry),
            rng,
            steps: StepCounts::default(),
        }
    }

    /// Replace the pairwise loss used for the fit term.
    pub fn with_fit_loss(mut self, loss: impl PairwiseLoss + 'static) -> Self {
        self.fit_loss = Box::new(loss);
        self
    }

    // ------------ population ------------

    /// Put one node per batch in the engine, replacing any previous nodes.
    pub fn set_allnodes(
        &mut self,
        data_distrib: Vec<NodeData>,
        contributor_ids: Vec<ContributorId>,
    ) -> Result<usize, PopulationError> {
        self.population.set_allnodes(
            data_distrib,
            contributor_ids,
            self.default_weight,
            self.lr_node,
            &self.dictionary,
            &mut self.rng,
        )
    }

    /// Add `pop.0` nodes of `pop.1` comparisons sampled from `source`.
    pub fn add_nodes(
        &mut self,
        source: &NodeData,
        pop: (usize, usize),
        category: Category,
        weight: f64,
    ) -> Result<Range<usize>, PopulationError> {
        self.population.add_nodes(
            source,
            pop,
            category,
            weight,
            self.lr_node,
            &self.dictionary,
            &mut self.rng,
        )
    }

    /// Remove nodes `[first, last)`.
    pub fn rem_nodes(&mut self, first: usize, last: usize) -> Result<Removal, PopulationError> {
        self.population.rem_nodes(first, last)
    }

    pub fn nb_nodes(&self) -> usize {
        self.population.nb_nodes()
    }

    pub fn population(&self) -> &NodePopulation {
        &self.population
    }

    pub fn dictionary(&self) -> &ItemDictionary {
        &self.dictionary
    }

    pub fn consensus(&self) -> &ScoringModel {
        &self.consensus
    }

    pub fn history(&self) -> &History {
        self.tracker.history()
    }

    pub fn step_counts(&self) -> StepCounts {
        self.steps
    }

    /// Global scores from the consensus model, local scores from each node's
    /// model over the items that node compared.
    pub fn output_scores(&self) -> Scores {
        Scores {
            global: GlobalScores {
                item_ids: self.dictionary.ids().to_vec(),
                scores: self.consensus.parameters().to_vec(),
            },
            local: self.population.local_scores(&self.dictionary),
        }
    }

    // ------------ training ------------

    /// Run `config.epochs` epochs (2 if unset) of alternating updates.
    pub fn train(&mut self, config: &LicchaviConfig) -> Result<&History, TrainingError> {
        config.validate()?;
        if self.population.is_empty() {
            return Err(TrainingError::EmptyPopulation);
        }
        let nb_epochs = config.epochs.unwrap_or(DEFAULT_EPOCHS);
        let time_train = Instant::now();
        self.set_lr(config);
        self.tracker.start_run();

        let engine = LossEngine::new(self.population.nb_nodes(), self.size, config);
        let mut terms = NodeTerms::default();
        let mut reg_loss = engine.reg_value(&self.consensus);

        let mut schedule = StepSchedule::new(config.gen_freq);
        let nb_steps = schedule.steps_per_epoch();

        for epoch in 1..=nb_epochs {
            info!("epoch {}/{}", epoch, nb_epochs);
            let time_ep = Instant::now();

            for step in 1..=nb_steps {
                let phase = schedule.next_phase();
                self.zero_grad();

                match phase {
                    Phase::Fit => {
                        terms = self.backprop_nodes(&engine, true, config.device);
                    }
                    Phase::Generalize => {
                        terms.gen = self.backprop_nodes(&engine, false, config.device).gen;
                        reg_loss = engine.reg_term(&mut self.consensus);
                    }
                }

                debug!(
                    "step {}/{} ({}) total: {}, fit: {}, gen: {}, reg: {}",
                    step,
                    nb_steps,
                    phase,
                    round_loss(terms.fit + terms.gen + reg_loss, LOSS_DECIMALS),
                    round_loss(terms.fit, LOSS_DECIMALS),
                    round_loss(terms.gen, LOSS_DECIMALS),
                    round_loss(reg_loss, LOSS_DECIMALS),
                );
                self.ensure_finite(epoch, step, phase, terms, reg_loss)?;
                self.do_step(phase);
                self.steps.record(phase);
            }

            info!("epoch time: {:.2}s", time_ep.elapsed().as_secs_f64());
            self.tracker.update(terms.fit, terms.gen, reg_loss, &self.consensus);
            self.population.grow_older(1);
        }

        info!("training time: {:.2}s", time_train.elapsed().as_secs_f64());
        Ok(self.tracker.history())
    }

    fn set_lr(&mut self, config: &LicchaviConfig) {
        self.population.set_learning_rate(config.lr_node);
        self.consensus_optimizer.set_learning_rate(config.lr_gen);
        self.lr_node = config.lr_node;
    }

    fn zero_grad(&mut self) {
        self.population.zero_grad();
        self.consensus.zero_grad();
    }

    /// Per-node fit (optional) and generalization terms, backpropagated into
    /// every local model and, summed, into the consensus model.
    fn backprop_nodes(&mut self, engine: &LossEngine, with_fit: bool, device: Device) -> NodeTerms {
        let fit_loss = self.fit_loss.as_ref();
        let consensus = self.consensus.parameters();
        let nb_items = consensus.len();

        let (total, partial_grad) = match device {
            Device::Cpu => {
                let mut grad = vec![0.0; nb_items];
                let mut total = NodeTerms::default();
                for node in self.population.nodes_mut() {
                    total = total
                        + engine.node_terms(
                            fit_loss,
                            &mut node.model,
                            &node.data,
                            node.weight,
                            consensus,
                            with_fit,
                            &mut grad,
                        );
                }
                (total, grad)
            }
            Device::Parallel => self
                .population
                .nodes_mut()
                .par_iter_mut()
                .fold(
                    || (NodeTerms::default(), vec![0.0; nb_items]),
                    |(total, mut grad), node| {
                        let terms = engine.node_terms(
                            fit_loss,
                            &mut node.model,
                            &node.data,
                            node.weight,
                            consensus,
                            with_fit,
                            &mut grad,
                        );
                        (total + terms, grad)
                    },
                )
                .reduce(
                    || (NodeTerms::default(), vec![0.0; nb_items]),
                    |(total_a, mut grad_a), (total_b, grad_b)| {
                        for (a, b) in grad_a.iter_mut().zip(grad_b) {
                            *a += b;
                        }
                        (total_a + total_b, grad_a)
                    },
                ),
        };

        for (slot, g) in self.consensus.grad_mut().iter_mut().zip(partial_grad) {
            *slot += g;
        }
        total
    }

    fn do_step(&mut self, phase: Phase) {
        match phase {
            Phase::Fit => self.population.step(),
            Phase::Generalize => self.consensus_optimizer.step(&mut self.consensus),
        }
    }

    fn ensure_finite(
        &self,
        epoch: usize,
        step: usize,
        phase: Phase,
        terms: NodeTerms,
        reg_loss: f64,
    ) -> Result<(), TrainingError> {
        let term = if !terms.fit.is_finite() {
            Some("fit loss")
        } else if !terms.gen.is_finite() {
            Some("generalization loss")
        } else if !reg_loss.is_finite() {
            Some("regularization loss")
        } else if !self.consensus.grad().iter().all(|g| g.is_finite()) {
            Some("consensus gradient")
        } else {
            None
        };
        match term {
            Some(term) => Err(TrainingError::Diverged { epoch, step, phase, term }),
            None => Ok(()),
        }
    }

    // ------------ checks ------------

    pub fn check(&self) -> ConsistencyReport {
        check::check(&self.population, self.tracker.history(), &self.dictionary)
    }

    pub fn assert_consistent(&self) -> Result<(), ConsistencyError> {
        self.check().into_result()
    }
}
