/// Engine hyperparameters.
///
/// A `LicchaviConfig` is an immutable value handed to `Licchavi::new` (for
/// population defaults) and to every `Licchavi::train` call (learning rates,
/// loss exponents, cadence). Changing hyperparameters between runs means
/// passing a different value, not mutating the engine.
use crate::constants::{
    DEFAULT_GEN_FREQ, DEFAULT_LR_GEN, DEFAULT_LR_NODE, DEFAULT_NODE_WEIGHT, DEFAULT_W0,
};
use crate::error::ConfigError;

/// Two-part exponent of the generalized norm: `(Σ |x_i|^inner)^outer`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Power {
    pub inner: f64,
    pub outer: f64,
}

impl Power {
    pub const fn new(inner: f64, outer: f64) -> Self {
        Power { inner, outer }
    }

    /// Euclidean norm, used for the drift and norm diagnostics.
    pub const EUCLIDEAN: Power = Power::new(2.0, 0.5);
}

impl From<(f64, f64)> for Power {
    fn from((inner, outer): (f64, f64)) -> Self {
        Power { inner, outer }
    }
}

/// Where per-node loss terms are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Device {
    /// Sequential, one node after the other.
    #[default]
    Cpu,
    /// Nodes spread over the rayon thread pool, consensus gradient reduced
    /// after every node is done.
    Parallel,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LicchaviConfig {
    /// Regularization strength of the consensus model.
    pub w0: f64,
    /// Default weight given to nodes created by `set_allnodes`.
    pub w: f64,
    pub lr_node: f64,
    pub lr_gen: f64,
    /// Consensus steps per contributor step (>= 1).
    pub gen_freq: usize,
    pub pow_gen: Power,
    pub pow_reg: Power,
    pub device: Device,
    /// Epochs per `train` call. `None` = 2.
    pub epochs: Option<usize>,
    /// Seed for model initialization and node sampling. `None` = entropy.
    pub seed: Option<u64>,
}

impl Default for LicchaviConfig {
    fn default() -> Self {
        LicchaviConfig {
            w0: DEFAULT_W0,
            w: DEFAULT_NODE_WEIGHT,
            lr_node: DEFAULT_LR_NODE,
            lr_gen: DEFAULT_LR_GEN,
            gen_freq: DEFAULT_GEN_FREQ,
            pow_gen: Power::new(1.0, 1.0),
            pow_reg: Power::new(2.0, 1.0),
            device: Device::Cpu,
            epochs: None,
            seed: None,
        }
    }
}

impl LicchaviConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("lr_node", self.lr_node)?;
        positive("lr_gen", self.lr_gen)?;
        non_negative("w0", self.w0)?;
        non_negative("w", self.w)?;
        non_negative("pow_gen.inner", self.pow_gen.inner)?;
        non_negative("pow_gen.outer", self.pow_gen.outer)?;
        non_negative("pow_reg.inner", self.pow_reg.inner)?;
        non_negative("pow_reg.outer", self.pow_reg.outer)?;
        if self.gen_freq == 0 {
            return Err(ConfigError::ZeroGenFreq);
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}
