//! # Experiment Driver
//!
//! Wires the stages together: load the record file, apply the quality cuts,
//! split features from the target, then either cross-validate the
//! standardization + network pipeline or search its training
//! hyperparameters.

use crate::config::{ConfigError, ExperimentConfig};
use crate::model::{ModelError, NetworkFactory, PipelineFactory};
use crate::shower::prepare::PrepareError;
use crate::shower::{DataError, ShowerTable, load_showers, split_features_target};
use crate::validate::{
    CrossValidation, GridSearch, RandomizedSearch, SearchOutcome, ValidationError,
    cross_val_score,
};
use ndarray::{Array1, Array2};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Prepare(#[from] PrepareError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Training-ready arrays plus the row counts seen along the way.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub target: Array1<f64>,
    pub loaded: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

/// Applies the configured cuts to an already loaded table and splits it.
pub fn prepare_dataset(
    table: &ShowerTable,
    config: &ExperimentConfig,
) -> Result<Dataset, ExperimentError> {
    let filtered = config.cuts.apply(table);
    if filtered.is_empty() {
        log::warn!("No showers survived the cuts; downstream fitting will fail");
    }
    let (features, target) = split_features_target(&filtered)?;
    Ok(Dataset {
        features,
        target,
        loaded: table.len(),
    })
}

/// Loads, filters and splits the configured record file.
pub fn load_dataset(config: &ExperimentConfig) -> Result<Dataset, ExperimentError> {
    let table = load_showers(&config.data.path, config.data.label_policy)?;
    prepare_dataset(&table, config)
}

/// The standardization + network pipeline factory described by `config`.
pub fn build_factory(
    config: &ExperimentConfig,
) -> Result<PipelineFactory<NetworkFactory>, ModelError> {
    let network = NetworkFactory::new(config.network, config.training, config.seed)?;
    Ok(PipelineFactory::new(network))
}

pub fn evaluate_dataset(
    dataset: &Dataset,
    config: &ExperimentConfig,
) -> Result<CrossValidation, ExperimentError> {
    let factory = build_factory(config)?;
    log::info!(
        "Cross-validating on {} of {} showers ({} folds, {})",
        dataset.len(),
        dataset.loaded,
        config.cross_validation.n_splits,
        config.training
    );
    Ok(cross_val_score(
        &factory,
        dataset.features.view(),
        dataset.target.view(),
        &config.cross_validation,
    )?)
}

pub fn search_dataset(
    dataset: &Dataset,
    config: &ExperimentConfig,
) -> Result<SearchOutcome, ExperimentError> {
    let factory = build_factory(config)?;
    let n_jobs = config.search.n_jobs.unwrap_or_else(num_cpus::get);
    let x = dataset.features.view();
    let y = dataset.target.view();

    let outcome = if config.search.randomized {
        let mut search = RandomizedSearch::new(
            config.search.grid.clone(),
            config.search.n_iter,
            config.cross_validation,
        );
        search.seed = config.seed;
        search.n_jobs = n_jobs;
        search.fit(&factory, x, y)?
    } else {
        let mut search = GridSearch::new(config.search.grid.clone(), config.cross_validation);
        search.n_jobs = n_jobs;
        search.fit(&factory, x, y)?
    };
    Ok(outcome)
}

pub fn evaluate(config: &ExperimentConfig) -> Result<CrossValidation, ExperimentError> {
    let dataset = load_dataset(config)?;
    evaluate_dataset(&dataset, config)
}

pub fn search(config: &ExperimentConfig) -> Result<SearchOutcome, ExperimentError> {
    let dataset = load_dataset(config)?;
    search_dataset(&dataset, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn two_row_table_keeps_the_row_passing_both_cuts() {
        let table = ShowerTable::from_matrix(array![
            [11.0, 2.0e16, 0.20, 35.0, 2.5, 0.7, 8.0, 1.0],
            [12.0, 2.0e16, 0.80, 36.0, 2.6, 0.9, 9.0, 2.0],
        ])
        .unwrap();
        let dataset = prepare_dataset(&table, &ExperimentConfig::default()).unwrap();

        assert_eq!(dataset.loaded, 2);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.features.shape(), &[1, 4]);
        assert_eq!(dataset.features.row(0).to_vec(), vec![2.0e16, 0.20, 35.0, 2.5]);
        assert_eq!(dataset.target[0], 0.7);
    }

    #[test]
    fn empty_filtered_set_is_rejected_by_cross_validation() {
        let table = ShowerTable::from_matrix(array![[1.0, 1.0e15, 0.1, 0.0, 0.0, 0.0, 0.0, 1.0]])
            .unwrap();
        let config = ExperimentConfig::default();
        let dataset = prepare_dataset(&table, &config).unwrap();
        assert!(dataset.is_empty());
        assert!(matches!(
            evaluate_dataset(&dataset, &config),
            Err(ExperimentError::Validation(ValidationError::TooFewSamples { samples: 0, .. }))
        ));
    }

    #[test]
    fn invalid_network_config_surfaces_as_model_error() {
        let mut config = ExperimentConfig::default();
        config.network.inputs = 0;
        assert!(matches!(build_factory(&config), Err(ModelError::InvalidNetwork(_))));
    }
}
