//! # Regression Models
//!
//! The estimator side of the experiment: a small feed-forward network trained
//! with Adam, a standardization step, and the two-stage pipeline that chains
//! them. Every model is produced by a [`RegressorFactory`], so validation code
//! can build a fresh, untrained model for each fold without knowing which
//! concrete model it is evaluating.

pub mod network;
pub mod pipeline;
pub mod scaler;

pub use network::{FeedForwardRegressor, NetworkConfig, NetworkFactory};
pub use pipeline::{Pipeline, PipelineFactory};
pub use scaler::StandardScaler;

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Cannot fit a model on an empty training set.")]
    EmptyTrainingSet,
    #[error("Input has {found} feature columns, but the model expects {expected}.")]
    FeatureCountMismatch { expected: usize, found: usize },
    #[error("Feature matrix has {rows} rows but the target has {targets} values.")]
    TargetLengthMismatch { rows: usize, targets: usize },
    #[error("Training diverged: the loss became non-finite in epoch {epoch}.")]
    NonFiniteLoss { epoch: usize },
    #[error("Hyperparameter '{name}' must be at least 1.")]
    InvalidHyperParameter { name: &'static str },
    #[error("Invalid network configuration: {0}")]
    InvalidNetwork(String),
}

/// A model that learns a scalar target from a feature matrix.
pub trait Regressor {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError>;
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError>;
}

/// Builds fresh, untrained regressors. Implementations must not hand out
/// shared state: two models from two calls train independently.
pub trait RegressorFactory: Sync {
    type Model: Regressor;

    fn build(&self) -> Self::Model;
}

/// A factory whose training hyperparameters can be swapped for a search.
pub trait Tunable: Sized {
    fn with_hyperparameters(&self, params: HyperParameters) -> Self;
}

/// Training-loop settings tuned by the searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperParameters {
    pub batch_size: usize,
    pub epochs: usize,
}

impl Default for HyperParameters {
    fn default() -> Self {
        Self {
            batch_size: 5,
            epochs: 50,
        }
    }
}

impl HyperParameters {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.batch_size == 0 {
            return Err(ModelError::InvalidHyperParameter { name: "batch_size" });
        }
        if self.epochs == 0 {
            return Err(ModelError::InvalidHyperParameter { name: "epochs" });
        }
        Ok(())
    }
}

impl fmt::Display for HyperParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{batch_size: {}, epochs: {}}}",
            self.batch_size, self.epochs
        )
    }
}

/// Mean squared error between two equally long vectors.
pub fn mean_squared_error(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> f64 {
    let n = truth.len();
    if n == 0 {
        return 0.0;
    }
    truth
        .iter()
        .zip(predicted.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n as f64
}
