/// Config file loading and creation for the licchavi CLI.
///
/// Config lives at ~/.config/licchavi/config.toml.
/// All fields are optional; CLI args override config values, which override
/// the engine defaults.
use licchavi_core::{Device, Power};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bail;

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub epochs: Option<usize>,
    pub w0: Option<f64>,
    pub w: Option<f64>,
    pub lr_node: Option<f64>,
    pub lr_gen: Option<f64>,
    pub gen_freq: Option<usize>,
    pub pow_gen: Option<Power>,
    pub pow_reg: Option<Power>,
    pub device: Option<Device>,
    pub seed: Option<u64>,
    /// Criteria trained when no --criterion is passed.
    pub criteria: Option<Vec<String>>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# licchavi configuration
# All values here can be overridden by CLI flags.

# Number of training epochs per criterion
# epochs = 2

# Consensus regularization strength
# w0 = 0.2

# Pull of each contributor toward the consensus
# w = 0.05

# Learning rates of the contributor and consensus optimizers
# lr_node = 0.2
# lr_gen = 0.2

# Consensus steps per contributor step
# gen_freq = 1

# Exponents of the generalization distance and of the regularization norm:
# (sum |x|^inner)^outer
# pow_gen = { inner = 1.0, outer = 1.0 }
# pow_reg = { inner = 2.0, outer = 1.0 }

# \"cpu\" (sequential) or \"parallel\" (one thread per core)
# device = \"cpu\"

# Seed for model initialization and sampling; unset means random
# seed = 42

# Criteria to train when --criterion is not given
# criteria = [\"reliability\", \"importance\"]
";

/// Returns the default config path: ~/.config/licchavi/config.toml
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home).join(".config").join("licchavi").join("config.toml")
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> FileConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config() -> PathBuf {
    let path = config_path();
    create_config_at(&path);
    path
}

pub fn create_config_at(path: &Path) {
    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("nope.toml"));
        assert_eq!(cfg, FileConfig::default());
    }

    #[test]
    fn test_template_is_all_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("licchavi").join("config.toml");
        create_config_at(&path);
        assert!(path.exists());
        assert_eq!(load_config(&path), FileConfig::default());
    }

    #[test]
    fn test_load_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "epochs = 5\nlr_gen = 0.1\ndevice = \"parallel\"\npow_gen = { inner = 2.0, outer = 0.5 }\ncriteria = [\"pedagogy\"]\n",
        )
        .unwrap();

        let cfg = load_config(&path);
        assert_eq!(cfg.epochs, Some(5));
        assert_eq!(cfg.lr_gen, Some(0.1));
        assert_eq!(cfg.device, Some(Device::Parallel));
        assert_eq!(cfg.pow_gen, Some(Power::EUCLIDEAN));
        assert_eq!(cfg.criteria, Some(vec!["pedagogy".to_string()]));
        assert_eq!(cfg.w0, None);
    }
}
