/// Contributor population.
///
/// Each node is one record holding everything that belongs to a contributor
/// (data, local model, optimizer, weight, age, category), so growing or
/// shrinking the population can never leave per-node state out of step.
/// Every mutation is validated before anything is touched.
use std::ops::Range;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::PopulationError;
use crate::model::ScoringModel;
use crate::optimizer::Adam;
use crate::types::{Category, ContributorId, ItemDictionary, LocalScores, NodeData};

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: ContributorId,
    pub(crate) data: NodeData,
    pub(crate) model: ScoringModel,
    pub(crate) optimizer: Adam,
    pub(crate) weight: f64,
    pub(crate) age: u32,
    pub(crate) category: Category,
}

impl Node {
    fn new(
        id: ContributorId,
        data: NodeData,
        nb_items: usize,
        weight: f64,
        category: Category,
        lr: f64,
        rng: &mut impl Rng,
    ) -> Self {
        Node {
            id,
            data,
            model: ScoringModel::new(nb_items, rng),
            optimizer: Adam::new(nb_items, lr),
            weight,
            age: 0,
            category,
        }
    }

    pub fn id(&self) -> ContributorId {
        self.id
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    pub fn optimizer(&self) -> &Adam {
        &self.optimizer
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

/// Outcome of a successful `rem_nodes` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Empty range; the population is unchanged.
    Nothing,
    Removed(usize),
}

#[derive(Debug, Clone)]
pub struct NodePopulation {
    nodes: Vec<Node>,
    nb_items: usize,
}

impl NodePopulation {
    pub fn new(nb_items: usize) -> Self {
        NodePopulation { nodes: Vec::new(), nb_items }
    }

    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nb_items(&self) -> usize {
        self.nb_items
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn contributor_ids(&self) -> Vec<ContributorId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn max_age(&self) -> u32 {
        self.nodes.iter().map(|n| n.age).max().unwrap_or(0)
    }

    /// Replace the population with one node per batch.
    pub fn set_allnodes(
        &mut self,
        data_distrib: Vec<NodeData>,
        contributor_ids: Vec<ContributorId>,
        weight: f64,
        lr: f64,
        dictionary: &ItemDictionary,
        rng: &mut impl Rng,
    ) -> Result<usize, PopulationError> {
        if data_distrib.len() != contributor_ids.len() {
            return Err(PopulationError::LengthMismatch {
                data: data_distrib.len(),
                ids: contributor_ids.len(),
            });
        }
        check_weight(weight)?;
        for data in &data_distrib {
            data.validate(dictionary)?;
        }

        let nb_items = self.nb_items;
        self.nodes = data_distrib
            .into_iter()
            .zip(contributor_ids)
            .map(|(data, id)| Node::new(id, data, nb_items, weight, Category::Unknown, lr, &mut *rng))
            .collect();

        debug!("Total number of nodes: {}", self.nodes.len());
        Ok(self.nodes.len())
    }

    /// Append `count` contributors of `sample_size` comparisons sampled with
    /// replacement from `source`. Returns the slot range of the new nodes.
    pub fn add_nodes(
        &mut self,
        source: &NodeData,
        (count, sample_size): (usize, usize),
        category: Category,
        weight: f64,
        lr: f64,
        dictionary: &ItemDictionary,
        rng: &mut impl Rng,
    ) -> Result<Range<usize>, PopulationError> {
        check_weight(weight)?;
        source.validate(dictionary)?;
        if count > 0 && sample_size > 0 && source.is_empty() {
            return Err(PopulationError::EmptySource);
        }
        let favorite = match category {
            Category::Adversarial { favorite, strength } => {
                if !strength.is_finite() {
                    return Err(PopulationError::InvalidStrength(strength));
                }
                let idx = dictionary
                    .index_of(favorite)
                    .ok_or(PopulationError::UnknownItem(favorite))?;
                Some((idx, strength))
            }
            Category::Unknown | Category::Honest => None,
        };

        let first_slot = self.nodes.len();
        let mut next_id = self.nodes.iter().map(|n| n.id).max().map_or(0, |id| id + 1);

        let mut fresh = Vec::with_capacity(count);
        for _ in 0..count {
            let rows: Vec<(usize, usize, f64)> = (0..sample_size)
                .map(|_| {
                    let k = rng.random_range(0..source.len());
                    let (a, b, r) = (source.item1[k], source.item2[k], source.ratings[k]);
                    (a, b, bias_rating(a, b, r, favorite, &mut *rng))
                })
                .collect();
            let data = NodeData::from_indexed(dictionary, &rows)?;
            fresh.push(Node::new(next_id, data, self.nb_items, weight, category, lr, &mut *rng));
            next_id += 1;
        }
        self.nodes.extend(fresh);

        debug!(
            "Added {} {} nodes of {} data points, total number of nodes: {}",
            count,
            category.label(),
            sample_size,
            self.nodes.len()
        );
        Ok(first_slot..self.nodes.len())
    }

    /// Remove the nodes in slots `[first, last)`.
    pub fn rem_nodes(&mut self, first: usize, last: usize) -> Result<Removal, PopulationError> {
        if last > self.nodes.len() {
            warn!("Remove canceled: upper bound {} out of range", last);
            return Err(PopulationError::RangeOutOfBounds { last, nb_nodes: self.nodes.len() });
        }
        if first > last {
            return Err(PopulationError::InvertedRange { first, last });
        }
        if first == last {
            return Ok(Removal::Nothing);
        }
        self.nodes.drain(first..last);
        debug!("Removed {} nodes, total number of nodes: {}", last - first, self.nodes.len());
        Ok(Removal::Removed(last - first))
    }

    /// Each node's model evaluated on the items it compared.
    pub fn local_scores(&self, dictionary: &ItemDictionary) -> Vec<LocalScores> {
        self.nodes
            .iter()
            .map(|node| {
                let scores = node
                    .data
                    .items
                    .iter()
                    .map(|&id| {
                        dictionary
                            .index_of(id)
                            .map_or(f64::NAN, |idx| node.model.score_index(idx))
                    })
                    .collect();
                LocalScores {
                    contributor: node.id,
                    item_ids: node.data.items.clone(),
                    scores,
                }
            })
            .collect()
    }

    pub(crate) fn set_learning_rate(&mut self, lr: f64) {
        for node in &mut self.nodes {
            node.optimizer.set_learning_rate(lr);
        }
    }

    pub(crate) fn zero_grad(&mut self) {
        for node in &mut self.nodes {
            node.model.zero_grad();
        }
    }

    pub(crate) fn step(&mut self) {
        for node in &mut self.nodes {
            node.optimizer.step(&mut node.model);
        }
    }

    pub(crate) fn grow_older(&mut self, years: u32) {
        for node in &mut self.nodes {
            node.age += years;
        }
    }
}

fn check_weight(weight: f64) -> Result<(), PopulationError> {
    if weight >= 0.0 && weight.is_finite() {
        Ok(())
    } else {
        Err(PopulationError::InvalidWeight(weight))
    }
}

/// Push a rating toward the favorite item with probability `strength`.
/// Positive ratings favour item 2.
fn bias_rating(
    a: usize,
    b: usize,
    rating: f64,
    favorite: Option<(usize, f64)>,
    rng: &mut impl Rng,
) -> f64 {
    match favorite {
        Some((fav, strength)) if (a == fav) != (b == fav) => {
            if rng.random::<f64>() < strength {
                if a == fav { -1.0 } else { 1.0 }
            } else {
                rating
            }
        }
        _ => rating,
    }
}
