use std::collections::HashMap;
use std::str::FromStr;

use crate::constants::SCORE_DECIMALS;
use crate::error::PopulationError;
use crate::model::round_loss;

/// Caller-provided contributor identifier.
pub type ContributorId = i64;

/// Caller-provided item identifier.
pub type ItemId = i64;

/// Maps between caller-provided item IDs and dense `0..N` indices.
///
/// Built once per run; the index of an item never changes while the engine
/// that owns the dictionary is alive.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDictionary {
    ids: Vec<ItemId>,
    id_to_idx: HashMap<ItemId, usize>,
}

impl ItemDictionary {
    pub fn from_ids(ids: &[ItemId]) -> Self {
        let mut id_to_idx = HashMap::with_capacity(ids.len());
        for (idx, &id) in ids.iter().enumerate() {
            let prev = id_to_idx.insert(id, idx);
            assert!(prev.is_none(), "Duplicate item ID: {}", id);
        }
        ItemDictionary {
            ids: ids.to_vec(),
            id_to_idx,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.id_to_idx.get(&id).copied()
    }

    pub fn id_at(&self, idx: usize) -> ItemId {
        self.ids[idx]
    }

    /// All item IDs, in index order.
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }
}

/// One contributor's comparisons.
///
/// Each comparison row is a pair of one-hot encodings stored by their hot
/// position (the dense item index), plus a rating in `[-1, 1]` where positive
/// values favour item 2. `items` lists the distinct item IDs the contributor
/// touched, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub item1: Vec<usize>,
    pub item2: Vec<usize>,
    pub ratings: Vec<f64>,
    pub items: Vec<ItemId>,
}

impl NodeData {
    /// Build a batch from `(item1, item2, rating)` triples given by item ID.
    pub fn from_comparisons(
        dictionary: &ItemDictionary,
        comparisons: &[(ItemId, ItemId, f64)],
    ) -> Result<Self, PopulationError> {
        let mut indexed = Vec::with_capacity(comparisons.len());
        for &(id1, id2, rating) in comparisons {
            let i1 = dictionary.index_of(id1).ok_or(PopulationError::UnknownItem(id1))?;
            let i2 = dictionary.index_of(id2).ok_or(PopulationError::UnknownItem(id2))?;
            indexed.push((i1, i2, rating));
        }
        Self::from_indexed(dictionary, &indexed)
    }

    /// Build a batch from already indexed triples.
    pub fn from_indexed(
        dictionary: &ItemDictionary,
        comparisons: &[(usize, usize, f64)],
    ) -> Result<Self, PopulationError> {
        let nb_items = dictionary.len();
        if let Some(index) = comparisons
            .iter()
            .flat_map(|&(a, b, _)| [a, b])
            .find(|&i| i >= nb_items)
        {
            return Err(PopulationError::DimensionMismatch { index, nb_items });
        }

        let item1: Vec<usize> = comparisons.iter().map(|c| c.0).collect();
        let item2: Vec<usize> = comparisons.iter().map(|c| c.1).collect();
        let ratings: Vec<f64> = comparisons.iter().map(|c| c.2).collect();

        let mut touched: Vec<usize> = item1.iter().chain(item2.iter()).copied().collect();
        touched.sort_unstable();
        touched.dedup();
        let mut items: Vec<ItemId> = touched.into_iter().map(|i| dictionary.id_at(i)).collect();
        items.sort_unstable();

        Ok(NodeData { item1, item2, ratings, items })
    }

    /// Number of comparisons.
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Iterate `(item1_idx, item2_idx, rating)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.item1
            .iter()
            .zip(self.item2.iter())
            .zip(self.ratings.iter())
            .map(|((&a, &b), &r)| (a, b, r))
    }

    /// Check that the batch is rectangular and only refers to `dictionary`.
    pub(crate) fn validate(&self, dictionary: &ItemDictionary) -> Result<(), PopulationError> {
        let nb_items = dictionary.len();
        if self.item1.len() != self.ratings.len() || self.item2.len() != self.ratings.len() {
            return Err(PopulationError::RaggedBatch {
                item1: self.item1.len(),
                item2: self.item2.len(),
                ratings: self.ratings.len(),
            });
        }
        if let Some(&index) = self.item1.iter().chain(self.item2.iter()).find(|&&i| i >= nb_items) {
            return Err(PopulationError::DimensionMismatch { index, nb_items });
        }
        if let Some(&id) = self.items.iter().find(|&&id| dictionary.index_of(id).is_none()) {
            return Err(PopulationError::UnknownItem(id));
        }
        Ok(())
    }
}

/// Dense one-hot encoding of item index `idx` over `nb_items` items.
pub fn one_hot(idx: usize, nb_items: usize) -> Result<Vec<f64>, PopulationError> {
    if idx >= nb_items {
        return Err(PopulationError::DimensionMismatch { index: idx, nb_items });
    }
    let mut v = vec![0.0; nb_items];
    v[idx] = 1.0;
    Ok(v)
}

/// What kind of contributor a node simulates or represents.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// Real contributor, reliability not assessed.
    Unknown,
    Honest,
    /// Ratings on comparisons involving `favorite` are pushed to the extreme
    /// in its favour with probability `strength`.
    Adversarial { favorite: ItemId, strength: f64 },
}

/// Label-only category, as read from user input before a favorite is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryLabel {
    Unknown,
    Honest,
    Adversarial,
}

impl FromStr for CategoryLabel {
    type Err = PopulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(CategoryLabel::Unknown),
            "honest" => Ok(CategoryLabel::Honest),
            "adversarial" | "dishonest" => Ok(CategoryLabel::Adversarial),
            _ => Err(PopulationError::UnknownCategory(s.to_string())),
        }
    }
}

impl Category {
    /// Resolve a user-supplied label into a category.
    pub fn from_label(
        label: &str,
        favorite: Option<ItemId>,
        strength: f64,
    ) -> Result<Self, PopulationError> {
        match label.parse::<CategoryLabel>()? {
            CategoryLabel::Unknown => Ok(Category::Unknown),
            CategoryLabel::Honest => Ok(Category::Honest),
            CategoryLabel::Adversarial => {
                let favorite = favorite.ok_or(PopulationError::MissingFavorite)?;
                if !strength.is_finite() {
                    return Err(PopulationError::InvalidStrength(strength));
                }
                Ok(Category::Adversarial { favorite, strength: strength.clamp(0.0, 1.0) })
            }
        }
    }

    pub fn is_dishonest(&self) -> bool {
        matches!(self, Category::Adversarial { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Unknown => "unknown",
            Category::Honest => "honest",
            Category::Adversarial { .. } => "adversarial",
        }
    }
}

/// Consensus scores over every item of the dictionary, in index order.
#[derive(Debug, Clone)]
pub struct GlobalScores {
    pub item_ids: Vec<ItemId>,
    pub scores: Vec<f64>,
}

/// One contributor's scores over the items it compared.
#[derive(Debug, Clone)]
pub struct LocalScores {
    pub contributor: ContributorId,
    pub item_ids: Vec<ItemId>,
    pub scores: Vec<f64>,
}

/// Result of `Licchavi::output_scores`.
#[derive(Debug, Clone)]
pub struct Scores {
    pub global: GlobalScores,
    pub local: Vec<LocalScores>,
}

/// Flat global score record for one criterion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemScore {
    pub item: ItemId,
    pub criterion: String,
    pub score: f64,
    /// Always 0 for now.
    pub uncertainty: f64,
}

/// Flat per-contributor score record for one criterion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContributorScore {
    pub contributor: ContributorId,
    pub item: ItemId,
    pub criterion: String,
    pub score: f64,
    pub uncertainty: f64,
}

impl Scores {
    pub fn global_records(&self, criterion: &str) -> Vec<ItemScore> {
        self.global
            .item_ids
            .iter()
            .zip(self.global.scores.iter())
            .map(|(&item, &score)| ItemScore {
                item,
                criterion: criterion.to_string(),
                score: round_loss(score, SCORE_DECIMALS),
                uncertainty: 0.0,
            })
            .collect()
    }

    pub fn local_records(&self, criterion: &str) -> Vec<ContributorScore> {
        self.local
            .iter()
            .flat_map(|node| {
                node.item_ids.iter().zip(node.scores.iter()).map(move |(&item, &score)| {
                    ContributorScore {
                        contributor: node.contributor,
                        item,
                        criterion: criterion.to_string(),
                        score: round_loss(score, SCORE_DECIMALS),
                        uncertainty: 0.0,
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_round_trips_ids() {
        let dic = ItemDictionary::from_ids(&[40, 10, 30]);
        assert_eq!(dic.len(), 3);
        assert_eq!(dic.index_of(10), Some(1));
        assert_eq!(dic.id_at(2), 30);
        assert_eq!(dic.index_of(99), None);
    }

    #[test]
    #[should_panic(expected = "Duplicate item ID")]
    fn test_dictionary_rejects_duplicates() {
        let _ = ItemDictionary::from_ids(&[1, 2, 1]);
    }

    #[test]
    fn test_node_data_lists_touched_items() {
        let dic = ItemDictionary::from_ids(&[1, 2, 3, 4]);
        let data = NodeData::from_comparisons(&dic, &[(3, 1, 0.5), (1, 2, -0.2)]).unwrap();
        assert_eq!(data.item1, vec![2, 0]);
        assert_eq!(data.item2, vec![0, 1]);
        assert_eq!(data.items, vec![1, 2, 3]);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_one_hot_matches_index_path() {
        use crate::model::ScoringModel;
        let model = ScoringModel::from_parameters(vec![0.3, -0.7, 1.5]);
        let encoding = one_hot(1, 3).unwrap();
        assert_eq!(encoding, vec![0.0, 1.0, 0.0]);
        assert_eq!(model.score(&encoding), model.score_index(1));
        assert_eq!(one_hot(3, 3), Err(PopulationError::DimensionMismatch { index: 3, nb_items: 3 }));
    }

    #[test]
    fn test_from_indexed_rejects_out_of_range() {
        let dic = ItemDictionary::from_ids(&[1, 2]);
        assert_eq!(
            NodeData::from_indexed(&dic, &[(0, 1, 0.5), (1, 2, 0.0)]),
            Err(PopulationError::DimensionMismatch { index: 2, nb_items: 2 })
        );
        let data = NodeData::from_indexed(&dic, &[(1, 0, 0.5)]).unwrap();
        assert_eq!(data.items, vec![1, 2]);
    }

    #[test]
    fn test_node_data_unknown_item() {
        let dic = ItemDictionary::from_ids(&[1, 2]);
        let err = NodeData::from_comparisons(&dic, &[(1, 7, 0.0)]).unwrap_err();
        assert_eq!(err, PopulationError::UnknownItem(7));
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::from_label("honest", None, 1.0), Ok(Category::Honest));
        assert_eq!(Category::from_label("UNKNOWN", None, 1.0), Ok(Category::Unknown));
        assert_eq!(
            Category::from_label("adversarial", Some(5), 2.0),
            Ok(Category::Adversarial { favorite: 5, strength: 1.0 })
        );
        assert_eq!(
            Category::from_label("adversarial", None, 1.0),
            Err(PopulationError::MissingFavorite)
        );
        assert_eq!(
            Category::from_label("adversarial", Some(5), f64::NAN).map_err(|e| e.to_string()),
            Err(PopulationError::InvalidStrength(f64::NAN).to_string())
        );
        assert!(Category::from_label("adversarial", Some(5), f64::INFINITY).is_err());
        assert_eq!(
            Category::from_label("sneaky", None, 1.0),
            Err(PopulationError::UnknownCategory("sneaky".to_string()))
        );
    }

    #[test]
    fn test_records_are_rounded() {
        let scores = Scores {
            global: GlobalScores { item_ids: vec![7, 8], scores: vec![0.123456, -1.005] },
            local: vec![LocalScores { contributor: 3, item_ids: vec![7], scores: vec![0.987] }],
        };
        let global = scores.global_records("reliability");
        assert_eq!(global.len(), 2);
        assert_eq!(global[0].score, 0.12);
        assert_eq!(global[0].criterion, "reliability");
        let local = scores.local_records("reliability");
        assert_eq!(local, vec![ContributorScore {
            contributor: 3,
            item: 7,
            criterion: "reliability".to_string(),
            score: 0.99,
            uncertainty: 0.0,
        }]);
    }
}
