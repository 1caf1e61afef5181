//! # Model Validation
//!
//! K-fold splitting, cross-validated scoring, and the hyperparameter searches
//! that are built on top of it. Scores follow the "greater is better"
//! convention: a fold's score is the negated mean squared error on its
//! held-out rows.

pub mod cross_val;
pub mod kfold;
pub mod report;
pub mod search;

pub use cross_val::{CrossValidation, cross_val_score};
pub use kfold::{Fold, KFold};
pub use search::{CandidateScore, GridSearch, ParameterGrid, RandomizedSearch, SearchOutcome};

use crate::model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("K-fold cross-validation needs at least 2 folds, got {0}.")]
    TooFewFolds(usize),
    #[error("Cannot split {samples} samples into {folds} folds.")]
    TooFewSamples { samples: usize, folds: usize },
    #[error("Feature matrix has {rows} rows but the target has {targets} values.")]
    LengthMismatch { rows: usize, targets: usize },
    #[error("The parameter grid is empty: {0}")]
    EmptyGrid(&'static str),
    #[error("Failed to start the search worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Model failed during fold {fold}: {source}")]
    Model {
        fold: usize,
        #[source]
        source: ModelError,
    },
    #[error("Invalid search candidate: {0}")]
    InvalidCandidate(#[from] ModelError),
}
