/// Default regularization strength of the consensus model.
pub const DEFAULT_W0: f64 = 0.2;

/// Default pull of each contributor toward the consensus.
pub const DEFAULT_NODE_WEIGHT: f64 = 0.05;

/// Default learning rate of the contributor optimizers.
pub const DEFAULT_LR_NODE: f64 = 0.2;

/// Default learning rate of the consensus optimizer.
pub const DEFAULT_LR_GEN: f64 = 0.2;

/// Default number of consensus steps per contributor step.
pub const DEFAULT_GEN_FREQ: usize = 1;

/// Number of epochs when the configuration leaves it unset.
pub const DEFAULT_EPOCHS: usize = 2;

/// Fit loss is scaled by `FIT_SCALE_NUMERATOR / nb_nodes`.
pub const FIT_SCALE_NUMERATOR: f64 = 20.0;

/// Parameter count is divided by this to get the size factor used in the
/// generalization and regularization scales.
pub const SIZE_NORMALIZER: f64 = 10_000.0;

/// Notation-style constant applied to every contributor's score differences.
pub const NOTATION_SCALE: f64 = 1.0;

/// Decimals kept for the loss terms recorded in the history.
pub const LOSS_DECIMALS: u32 = 2;

/// Decimals kept for drift and norm diagnostics.
pub const DIAGNOSTIC_DECIMALS: u32 = 1;

/// Decimals kept in exported score records.
pub const SCORE_DECIMALS: u32 = 2;

/// Criteria rated by contributors, in the order they are processed.
pub const CRITERIA: [&str; 9] = [
    "reliability",
    "importance",
    "engaging",
    "pedagogy",
    "layman_friendly",
    "diversity_inclusion",
    "backfire_risk",
    "better_habits",
    "entertaining_relaxing",
];
