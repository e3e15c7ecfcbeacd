/// Raw comparison records to per-contributor batches.
use std::collections::BTreeSet;

use crate::error::DatasetError;
use crate::types::{ContributorId, ItemDictionary, ItemId, NodeData};

/// One contributor's judgement of two items on one criterion.
///
/// `score` is on the `[0, 100]` slider scale, `None` when the contributor
/// skipped the criterion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonRecord {
    pub contributor: ContributorId,
    pub item1: ItemId,
    pub item2: ItemId,
    pub criterion: String,
    pub score: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default = "default_record_weight"))]
    pub weight: f64,
}

#[cfg(feature = "serde")]
fn default_record_weight() -> f64 {
    1.0
}

/// Records of `criterion` that carry a score.
pub fn select_criterion<'a>(
    records: &'a [ComparisonRecord],
    criterion: &str,
) -> Result<Vec<&'a ComparisonRecord>, DatasetError> {
    let selected: Vec<&ComparisonRecord> = records
        .iter()
        .filter(|r| r.criterion == criterion && r.score.is_some())
        .collect();
    if selected.is_empty() {
        return Err(DatasetError::EmptyCriterion(criterion.to_string()));
    }
    Ok(selected)
}

/// Map a `[0, 100]` slider score to a `[-1, 1]` rating.
pub fn rescale_rating(score: f64) -> Result<f64, DatasetError> {
    if !(0.0..=100.0).contains(&score) {
        return Err(DatasetError::RatingOutOfRange(score));
    }
    Ok((score - 50.0) / 50.0)
}

/// Distinct criteria, in order of first appearance.
pub fn criteria(records: &[ComparisonRecord]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.criterion.as_str()))
        .map(|r| r.criterion.clone())
        .collect()
}

/// Everything `Licchavi` needs for one criterion.
#[derive(Debug, Clone)]
pub struct DistributedData {
    /// One batch per contributor, ordered like `contributor_ids`.
    pub nodes: Vec<NodeData>,
    /// Ascending.
    pub contributor_ids: Vec<ContributorId>,
    /// Every item of every record, ascending id.
    pub dictionary: ItemDictionary,
}

/// Group records by contributor. Records without a score are skipped.
pub fn distribute_data(records: &[&ComparisonRecord]) -> Result<DistributedData, DatasetError> {
    let mut rows: Vec<(ContributorId, ItemId, ItemId, f64)> = Vec::with_capacity(records.len());
    for r in records {
        if let Some(score) = r.score {
            rows.push((r.contributor, r.item1, r.item2, rescale_rating(score)?));
        }
    }
    // stable: keeps each contributor's comparisons in input order
    rows.sort_by_key(|row| row.0);

    let ids: BTreeSet<ItemId> = rows.iter().flat_map(|row| [row.1, row.2]).collect();
    let ids: Vec<ItemId> = ids.into_iter().collect();
    let dictionary = ItemDictionary::from_ids(&ids);

    let mut nodes = Vec::new();
    let mut contributor_ids = Vec::new();
    for group in rows.chunk_by(|a, b| a.0 == b.0) {
        let mut indexed = Vec::with_capacity(group.len());
        for &(_, id1, id2, rating) in group {
            let i1 = dictionary.index_of(id1).ok_or(DatasetError::UnknownItem(id1))?;
            let i2 = dictionary.index_of(id2).ok_or(DatasetError::UnknownItem(id2))?;
            indexed.push((i1, i2, rating));
        }
        nodes.push(NodeData::from_indexed(&dictionary, &indexed)?);
        contributor_ids.push(group[0].0);
    }

    Ok(DistributedData { nodes, contributor_ids, dictionary })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(contributor: i64, item1: i64, item2: i64, criterion: &str, score: Option<f64>) -> ComparisonRecord {
        ComparisonRecord {
            contributor,
            item1,
            item2,
            criterion: criterion.to_string(),
            score,
            weight: 1.0,
        }
    }

    #[test]
    fn test_rescale_rating() {
        assert_eq!(rescale_rating(0.0), Ok(-1.0));
        assert_eq!(rescale_rating(50.0), Ok(0.0));
        assert_eq!(rescale_rating(100.0), Ok(1.0));
        assert_eq!(rescale_rating(75.0), Ok(0.5));
        assert_eq!(rescale_rating(101.0), Err(DatasetError::RatingOutOfRange(101.0)));
        assert!(rescale_rating(f64::NAN).is_err());
    }

    #[test]
    fn test_select_criterion_skips_missing_scores() {
        let records = vec![
            record(1, 10, 20, "reliability", Some(30.0)),
            record(1, 10, 30, "reliability", None),
            record(2, 20, 30, "importance", Some(80.0)),
        ];
        let selected = select_criterion(&records, "reliability").unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].item2, 20);
        assert_eq!(
            select_criterion(&records, "pedagogy").unwrap_err(),
            DatasetError::EmptyCriterion("pedagogy".to_string())
        );
    }

    #[test]
    fn test_criteria_in_order_of_appearance() {
        let records = vec![
            record(1, 1, 2, "importance", Some(1.0)),
            record(1, 1, 2, "reliability", Some(1.0)),
            record(2, 1, 2, "importance", None),
        ];
        assert_eq!(criteria(&records), vec!["importance", "reliability"]);
    }

    #[test]
    fn test_distribute_groups_by_contributor() {
        let records = vec![
            record(7, 30, 10, "reliability", Some(0.0)),
            record(3, 10, 20, "reliability", Some(100.0)),
            record(7, 20, 40, "reliability", Some(50.0)),
        ];
        let refs: Vec<&ComparisonRecord> = records.iter().collect();
        let distributed = distribute_data(&refs).unwrap();

        assert_eq!(distributed.contributor_ids, vec![3, 7]);
        assert_eq!(distributed.dictionary.ids(), &[10, 20, 30, 40]);
        assert_eq!(distributed.nodes.len(), 2);

        let first = &distributed.nodes[0];
        assert_eq!((first.item1.clone(), first.item2.clone()), (vec![0], vec![1]));
        assert_eq!(first.ratings, vec![1.0]);

        let second = &distributed.nodes[1];
        assert_eq!(second.item1, vec![2, 1]);
        assert_eq!(second.item2, vec![0, 3]);
        assert_eq!(second.ratings, vec![-1.0, 0.0]);
        assert_eq!(second.items, vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_distribute_rejects_bad_score() {
        let records = vec![record(1, 1, 2, "reliability", Some(-3.0))];
        let refs: Vec<&ComparisonRecord> = records.iter().collect();
        assert_eq!(distribute_data(&refs).unwrap_err(), DatasetError::RatingOutOfRange(-3.0));
    }

    #[test]
    fn test_distribute_empty() {
        let distributed = distribute_data(&[]).unwrap();
        assert!(distributed.nodes.is_empty());
        assert!(distributed.dictionary.is_empty());
    }
}
