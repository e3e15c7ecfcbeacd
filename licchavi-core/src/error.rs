/// Error types for the licchavi engine.
///
/// Population and configuration errors are recoverable: the operation that
/// reports them has not mutated anything. Training errors are fatal for the
/// run and carry the epoch/step where they happened.
use thiserror::Error;

use crate::schedule::Phase;

/// Convenient `Result` alias for orchestration-level functions.
pub type Result<T> = std::result::Result<T, LicchaviError>;

/// Top-level error, every module-specific error converts into it.
#[derive(Debug, Error)]
pub enum LicchaviError {
    #[error("Population error: {0}")]
    Population(#[from] PopulationError),

    #[error("Training error: {0}")]
    Training(#[from] TrainingError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),
}

/// Errors from growing or shrinking the contributor population.
#[derive(Debug, Error, PartialEq)]
pub enum PopulationError {
    #[error("{data} data batches but {ids} contributor ids")]
    LengthMismatch { data: usize, ids: usize },

    #[error("Upper bound {last} is out of range for {nb_nodes} nodes, nothing removed")]
    RangeOutOfBounds { last: usize, nb_nodes: usize },

    #[error("Range {first}..{last} is inverted, nothing removed")]
    InvertedRange { first: usize, last: usize },

    #[error("Invalid node weight {0} (must be finite and >= 0)")]
    InvalidWeight(f64),

    #[error("Unknown contributor category \"{0}\"")]
    UnknownCategory(String),

    #[error("Adversarial nodes need a favorite item")]
    MissingFavorite,

    #[error("Invalid adversarial strength {0} (must be finite)")]
    InvalidStrength(f64),

    #[error("Unknown item ID: {0}")]
    UnknownItem(i64),

    #[error("Item index {index} out of range for {nb_items} items")]
    DimensionMismatch { index: usize, nb_items: usize },

    #[error("Cannot sample nodes from an empty comparison source")]
    EmptySource,

    #[error("Batch columns have different lengths ({item1}, {item2}, {ratings})")]
    RaggedBatch { item1: usize, item2: usize, ratings: usize },
}

/// Errors that abort a training run.
#[derive(Debug, Error, PartialEq)]
pub enum TrainingError {
    #[error("Cannot train without any node")]
    EmptyPopulation,

    #[error("Non-finite {term} at epoch {epoch}, step {step} ({phase})")]
    Diverged {
        epoch: usize,
        step: usize,
        phase: Phase,
        term: &'static str,
    },

    #[error("Invalid training configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Errors while turning raw comparison records into node batches.
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("No comparison with a score for criterion \"{0}\"")]
    EmptyCriterion(String),

    #[error("Rating {0} is outside [0, 100]")]
    RatingOutOfRange(f64),

    #[error("Unknown item ID: {0}")]
    UnknownItem(i64),

    #[error(transparent)]
    Population(#[from] PopulationError),
}

/// Invalid hyperparameters.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be > 0, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be >= 0, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("gen_freq must be >= 1")]
    ZeroGenFreq,
}

/// A failed consistency check, turned into an error by `assert_consistent`.
#[derive(Debug, Error, PartialEq)]
pub enum ConsistencyError {
    #[error("Population state is inconsistent: {0}")]
    Population(String),

    #[error("History is inconsistent: {0}")]
    History(String),
}
