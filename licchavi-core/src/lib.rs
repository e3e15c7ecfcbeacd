//! licchavi-core: consensus and personalized scores from pairwise comparisons.
//!
//! Every contributor gets a local linear scoring model fitted to its own
//! comparisons; one consensus model is pulled toward all of them. Training
//! alternates contributor steps and consensus steps. Pure computation: the
//! caller builds the per-contributor batches and reads the scores back.
//!
//! Items are identified by caller-provided `i64` IDs. The `ItemDictionary`
//! maps them to dense indices once per run.
//!
//! # Quick start
//!
//! ```rust
//! use licchavi_core::{ItemDictionary, Licchavi, LicchaviConfig, NodeData};
//!
//! let dictionary = ItemDictionary::from_ids(&[100, 200, 300]);
//! let config = LicchaviConfig { seed: Some(42), ..Default::default() };
//!
//! // (item1, item2, rating in [-1, 1]); positive ratings favour item 2
//! let alice = NodeData::from_comparisons(&dictionary, &[(100, 200, 0.8), (200, 300, 0.5)])?;
//! let bob = NodeData::from_comparisons(&dictionary, &[(100, 300, 1.0)])?;
//!
//! let mut licchavi = Licchavi::new(dictionary, &config);
//! licchavi.set_allnodes(vec![alice, bob], vec![1, 2])?;
//! licchavi.train(&config)?;
//!
//! for record in licchavi.output_scores().global_records("reliability") {
//!     println!("Item {}: {:.2}", record.item, record.score);
//! }
//! # Ok::<(), licchavi_core::LicchaviError>(())
//! ```

pub mod check;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod history;
pub mod loss;
pub mod model;
pub mod optimizer;
pub mod population;
pub mod schedule;
pub mod types;

// Re-export primary public API at crate root.
pub use check::ConsistencyReport;
pub use config::{Device, LicchaviConfig, Power};
pub use dataset::{criteria, distribute_data, rescale_rating, select_criterion, ComparisonRecord, DistributedData};
pub use engine::Licchavi;
pub use error::{
    ConfigError, ConsistencyError, DatasetError, LicchaviError, PopulationError, Result, TrainingError,
};
pub use history::History;
pub use loss::{ContinuousBradleyTerry, PairwiseLoss};
pub use population::{Node, NodePopulation, Removal};
pub use schedule::{Phase, StepCounts};
pub use types::{
    one_hot, Category, CategoryLabel, ContributorId, ContributorScore, GlobalScores, ItemDictionary,
    ItemId, ItemScore, LocalScores, NodeData, Scores,
};
