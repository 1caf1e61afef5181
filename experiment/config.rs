//! # Experiment Configuration
//!
//! Every knob of a run, deserialized from an optional TOML file. Each section
//! is `#[serde(default)]`, so a file only needs to mention what it changes and
//! an absent file reproduces the reference experiment.
//!
//! ```toml
//! seed = 7
//!
//! [data]
//! path = "./data/NN_data_avg.tsv"
//! label_policy = "strict"
//!
//! [cross_validation]
//! n_splits = 17
//!
//! [search.grid]
//! batch_sizes = [10, 20, 40]
//! epochs = [10, 50]
//! ```

use crate::model::{HyperParameters, NetworkConfig};
use crate::shower::{LabelPolicy, ShowerCuts};
use crate::validate::{KFold, ParameterGrid};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_DATA_PATH: &str = "./data/NN_data_avg.tsv";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: PathBuf,
    pub label_policy: LabelPolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
            label_policy: LabelPolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub grid: ParameterGrid,
    /// Sample `n_iter` grid points instead of trying every combination.
    pub randomized: bool,
    pub n_iter: usize,
    /// Worker threads; `None` uses one per core.
    pub n_jobs: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid: ParameterGrid::default(),
            randomized: false,
            n_iter: 10,
            n_jobs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Base seed for network initialization and batch shuffling.
    pub seed: u64,
    pub data: DataConfig,
    pub cuts: ShowerCuts,
    pub network: NetworkConfig,
    pub training: HyperParameters,
    pub cross_validation: KFold,
    pub search: SearchConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            data: DataConfig::default(),
            cuts: ShowerCuts::default(),
            network: NetworkConfig::default(),
            training: HyperParameters::default(),
            cross_validation: KFold::default(),
            search: SearchConfig::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Reading experiment configuration from '{}'", path.display());
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The file at `path` if given, the defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_describe_the_reference_experiment() {
        let config = ExperimentConfig::default();
        assert_eq!(config.cross_validation.n_splits, 17);
        assert_eq!(config.cross_validation.seed, 7);
        assert_eq!(config.network.inputs, 4);
        assert_eq!(config.network.hidden, 4);
        assert_eq!(config.cuts.min_cos_zenith, 0.9);
        assert_eq!(config.search.grid.len(), 18);
        assert_eq!(config.data.path, PathBuf::from(DEFAULT_DATA_PATH));
    }

    #[test]
    fn partial_file_overrides_only_what_it_names() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
seed = 99

[data]
label_policy = "permissive"

[cross_validation]
n_splits = 5
shuffle = false

[search.grid]
epochs = [1, 2]
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.data.label_policy, LabelPolicy::Permissive);
        assert_eq!(config.data.path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(config.cross_validation.n_splits, 5);
        assert!(!config.cross_validation.shuffle);
        assert_eq!(config.cross_validation.seed, 7);
        assert_eq!(config.search.grid.epochs, vec![1, 2]);
        assert_eq!(config.search.grid.batch_sizes, ParameterGrid::default().batch_sizes);
        assert_eq!(config.training, HyperParameters::default());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "seed = \"seven\"").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            ExperimentConfig::load(file.path()),
            Err(ConfigError::TomlParseError(_))
        ));
    }

    #[test]
    fn missing_path_falls_back_to_defaults() {
        let config = ExperimentConfig::load_or_default(None).unwrap();
        assert_eq!(config, ExperimentConfig::default());
    }
}
